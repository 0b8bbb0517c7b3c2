//! The host input-method framework as seen from the controller.
//!
//! Everything the controller does to the screen goes through [`Host`]. The
//! host also owns the timer used for delayed callback commands.

use std::time::Duration;

/// Host-assigned id of an input field.
pub type ContextId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderlineStyle {
    Underline,
    DoubleUnderline,
}

/// Styled span of the composition, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionSegment {
    pub start: usize,
    pub end: usize,
    pub style: UnderlineStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub text: String,
    pub segments: Vec<CompositionSegment>,
    /// Only used by the host to place the candidate popup.
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageText {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCandidate {
    pub candidate: String,
    pub id: i32,
    pub label: Option<String>,
    pub annotation: Option<String>,
    pub usage: Option<UsageText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    Cursor,
    Composition,
}

/// Candidate window properties. `None` means "leave unchanged", so the same
/// type serves as the full snapshot and as the partial update pushed to the
/// host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateWindowProperties {
    pub visible: Option<bool>,
    pub cursor_visible: Option<bool>,
    pub vertical: Option<bool>,
    pub page_size: Option<u32>,
    pub auxiliary_text: Option<String>,
    pub auxiliary_text_visible: Option<bool>,
    pub window_position: Option<WindowPosition>,
}

fn changed<T: Clone + PartialEq>(last: &Option<T>, next: &Option<T>) -> Option<T> {
    match next {
        Some(value) if last.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    }
}

impl CandidateWindowProperties {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Properties set in `next` whose value differs from `self`.
    pub fn diff(&self, next: &Self) -> Self {
        Self {
            visible: changed(&self.visible, &next.visible),
            cursor_visible: changed(&self.cursor_visible, &next.cursor_visible),
            vertical: changed(&self.vertical, &next.vertical),
            page_size: changed(&self.page_size, &next.page_size),
            auxiliary_text: changed(&self.auxiliary_text, &next.auxiliary_text),
            auxiliary_text_visible: changed(
                &self.auxiliary_text_visible,
                &next.auxiliary_text_visible,
            ),
            window_position: changed(&self.window_position, &next.window_position),
        }
    }

    /// Overlay every property set in `update`.
    pub fn merge(&mut self, update: &Self) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(value) = &update.$field {
                    self.$field = Some(value.clone());
                })*
            };
        }
        overlay!(
            visible,
            cursor_visible,
            vertical,
            page_size,
            auxiliary_text,
            auxiliary_text_visible,
            window_position
        );
    }
}

/// Radio item in the host's input-method menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldKind {
    #[default]
    Text,
    Search,
    Email,
    Number,
    Tel,
    Url,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputContext {
    pub context_id: ContextId,
    pub kind: FieldKind,
}

/// Text around the caret as reported by the host. `focus` and `anchor` are
/// character offsets into `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurroundingText {
    pub text: String,
    pub focus: usize,
    pub anchor: usize,
}

impl SurroundingText {
    /// The selected text, if the selection is non-empty.
    pub fn selection(&self) -> Option<String> {
        if self.focus == self.anchor {
            return None;
        }
        let start = self.focus.min(self.anchor);
        let end = self.focus.max(self.anchor);
        let selected: String = self.text.chars().skip(start).take(end - start).collect();
        (!selected.is_empty()).then_some(selected)
    }
}

pub trait Host {
    fn set_composition(&mut self, context_id: ContextId, composition: &Composition);
    fn clear_composition(&mut self, context_id: ContextId);
    fn set_candidates(&mut self, context_id: ContextId, candidates: &[HostCandidate]);
    fn set_cursor_position(&mut self, context_id: ContextId, candidate_id: i32);
    fn set_candidate_window_properties(
        &mut self,
        engine_id: &str,
        properties: &CandidateWindowProperties,
    );
    fn commit_text(&mut self, context_id: ContextId, text: &str);
    fn set_menu_items(&mut self, engine_id: &str, items: &[MenuItem]);
    fn update_menu_items(&mut self, engine_id: &str, items: &[MenuItem]);
    fn delete_surrounding_text(
        &mut self,
        engine_id: &str,
        context_id: ContextId,
        offset: i32,
        length: u32,
    );
    fn key_event_handled(&mut self, request_id: &str, handled: bool);

    /// Arrange for a callback-timer host event carrying `generation` to be
    /// delivered after `delay`.
    fn schedule_callback(&mut self, delay: Duration, generation: u64);

    fn supports_delete_surrounding_text(&self) -> bool {
        true
    }
}
