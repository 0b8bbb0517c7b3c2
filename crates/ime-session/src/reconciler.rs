//! Engine output → host calls.
//!
//! Keeps the last candidate list and window properties pushed to the host so
//! that a response which changes nothing on screen produces no host traffic
//! beyond the cursor position.

use tracing::{debug, debug_span};

use ime_core::command::{Callback, CandidateCategory, Candidates, Output, Preedit, SegmentAnnotation};
use ime_core::key_event::CompositionMode;
use ime_core::settings::Settings;

use crate::host::{
    CandidateWindowProperties, Composition, CompositionSegment, ContextId, Host, HostCandidate,
    UnderlineStyle, UsageText, WindowPosition,
};
use crate::menu::menu_items;

#[derive(Debug)]
pub struct Reconciler {
    candidates: Option<Vec<HostCandidate>>,
    window: CandidateWindowProperties,
    mode: CompositionMode,
    direct: bool,
    max_page_size: u32,
    vertical: bool,
}

fn hidden_window() -> CandidateWindowProperties {
    CandidateWindowProperties {
        visible: Some(false),
        auxiliary_text_visible: Some(false),
        ..Default::default()
    }
}

impl Reconciler {
    pub fn new(settings: &Settings) -> Self {
        Self {
            candidates: None,
            window: hidden_window(),
            mode: settings.input.default_mode,
            direct: false,
            max_page_size: settings.candidates.max_page_size,
            vertical: settings.candidates.vertical,
        }
    }

    /// Forget what the host is showing. The tracked mode survives.
    pub fn reset(&mut self) {
        self.candidates = None;
        self.window = hidden_window();
    }

    /// Composition mode last reported by the engine (or chosen locally).
    pub fn mode(&self) -> CompositionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CompositionMode) {
        self.mode = mode;
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    pub fn set_direct(&mut self, direct: bool) {
        self.direct = direct;
    }

    /// The mode shown as checked in the menu.
    pub fn menu_mode(&self) -> CompositionMode {
        if self.direct {
            CompositionMode::Direct
        } else {
            self.mode
        }
    }

    /// Push everything `output` says to the host. Returns the callback
    /// command, if any, for the caller to send or schedule.
    pub fn apply<H: Host>(
        &mut self,
        host: &mut H,
        engine_id: &str,
        context_id: ContextId,
        output: &Output,
    ) -> Option<Callback> {
        let _span = debug_span!("reconcile", context_id).entered();

        if let Some(result) = &output.result {
            host.commit_text(context_id, &result.value);
        }

        match &output.preedit {
            Some(preedit) => host.set_composition(context_id, &build_composition(preedit)),
            None => host.clear_composition(context_id),
        }

        match &output.candidates {
            Some(candidates) if !candidates.candidate.is_empty() => {
                self.show_candidates(host, engine_id, context_id, candidates)
            }
            _ => self.hide_candidates(host, engine_id),
        }

        if let Some(mode) = output.mode {
            if mode != self.mode {
                debug!(?mode, "composition mode changed");
                self.mode = mode;
                host.update_menu_items(engine_id, &menu_items(self.menu_mode()));
            }
        }

        output.callback.clone()
    }

    fn show_candidates<H: Host>(
        &mut self,
        host: &mut H,
        engine_id: &str,
        context_id: ContextId,
        candidates: &Candidates,
    ) {
        let list = build_candidates(candidates);
        if self.candidates.as_ref() != Some(&list) {
            host.set_candidates(context_id, &list);
            self.candidates = Some(list);
        }

        let focused = candidates.focused_index.and_then(|index| {
            candidates
                .candidate
                .iter()
                .find(|c| c.index == index)
                .map(|c| c.id)
        });
        if let Some(id) = focused.or_else(|| candidates.candidate.first().map(|c| c.id)) {
            host.set_cursor_position(context_id, id);
        }

        let auxiliary = auxiliary_text(candidates);
        let next = CandidateWindowProperties {
            visible: Some(true),
            cursor_visible: Some(candidates.focused_index.is_some()),
            vertical: Some(self.vertical),
            page_size: Some(page_size(self.max_page_size, candidates)),
            auxiliary_text_visible: Some(auxiliary.is_some()),
            auxiliary_text: Some(auxiliary.unwrap_or_default()),
            window_position: Some(anchor(candidates.category)),
        };
        self.push_window(host, engine_id, &next);
    }

    /// Take down everything shown for `context_id` and forget it.
    pub fn clear<H: Host>(&mut self, host: &mut H, engine_id: &str, context_id: ContextId) {
        host.clear_composition(context_id);
        self.hide_candidates(host, engine_id);
    }

    fn hide_candidates<H: Host>(&mut self, host: &mut H, engine_id: &str) {
        self.candidates = None;
        self.push_window(host, engine_id, &hidden_window());
    }

    fn push_window<H: Host>(
        &mut self,
        host: &mut H,
        engine_id: &str,
        next: &CandidateWindowProperties,
    ) {
        let diff = self.window.diff(next);
        if !diff.is_empty() {
            host.set_candidate_window_properties(engine_id, &diff);
            self.window.merge(&diff);
        }
    }
}

pub fn build_composition(preedit: &Preedit) -> Composition {
    let mut text = String::new();
    let mut segments = Vec::with_capacity(preedit.segment.len());
    let mut start = 0;
    for segment in &preedit.segment {
        let end = start + segment.value.chars().count();
        let style = match segment.annotation {
            SegmentAnnotation::Highlight => UnderlineStyle::DoubleUnderline,
            _ => UnderlineStyle::Underline,
        };
        segments.push(CompositionSegment { start, end, style });
        text.push_str(&segment.value);
        start = end;
    }
    let cursor = preedit
        .highlighted_position
        .or(preedit.cursor)
        .unwrap_or(0) as usize;
    Composition {
        text,
        segments,
        cursor,
    }
}

pub fn build_candidates(candidates: &Candidates) -> Vec<HostCandidate> {
    let usages = candidates
        .usages
        .as_ref()
        .map(|u| u.information.as_slice())
        .unwrap_or_default();
    candidates
        .candidate
        .iter()
        .map(|c| {
            let annotation = c.annotation.as_ref();
            let usage = usages
                .iter()
                .find(|info| info.candidate_id.contains(&c.id))
                .map(|info| UsageText {
                    title: info.title.clone(),
                    body: info.description.clone(),
                });
            HostCandidate {
                candidate: c.value.clone(),
                id: c.id,
                label: annotation.and_then(|a| a.shortcut.clone()),
                annotation: annotation.and_then(|a| a.description.clone()),
                usage,
            }
        })
        .collect()
}

/// Footer label (or sub-label), followed by "position/size" when the footer
/// asks for the index.
pub fn auxiliary_text(candidates: &Candidates) -> Option<String> {
    let footer = candidates.footer.as_ref()?;
    let mut text = footer
        .label
        .clone()
        .or_else(|| footer.sub_label.clone())
        .unwrap_or_default();
    if footer.index_visible {
        if let Some(focused) = candidates.focused_index {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("{}/{}", focused.saturating_add(1), candidates.size));
        }
    }
    (!text.is_empty()).then_some(text)
}

pub fn page_size(max_page_size: u32, candidates: &Candidates) -> u32 {
    if candidates.category == CandidateCategory::Suggestion {
        max_page_size.min(candidates.candidate.len() as u32)
    } else {
        max_page_size
    }
}

pub fn anchor(category: CandidateCategory) -> WindowPosition {
    match category {
        CandidateCategory::Suggestion | CandidateCategory::Prediction => {
            WindowPosition::Composition
        }
        _ => WindowPosition::Cursor,
    }
}
