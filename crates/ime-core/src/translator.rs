//! Physical key event → engine key event.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::key_event::{KeyEvent, ModifierMask};
use crate::keymap::{self, KeyboardLayout, SWITCH_WINDOW_LABEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
}

/// Key event as delivered by the host.
///
/// The modifier flags describe the state *before* this event, so a Shift
/// key-down arrives with `shift == false` and the matching key-up with
/// `shift == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyEvent {
    #[serde(rename = "type")]
    pub kind: KeyEventKind,
    /// Produced key label (`"a"`, `"Enter"`, `"BrowserBack"`).
    pub key: String,
    /// Physical key code (`"KeyA"`, `"ShiftLeft"`).
    pub code: String,
    #[serde(default, rename = "altKey")]
    pub alt: bool,
    #[serde(default, rename = "ctrlKey")]
    pub ctrl: bool,
    #[serde(default, rename = "shiftKey")]
    pub shift: bool,
}

impl RawKeyEvent {
    pub fn key_down(key: &str, code: &str) -> Self {
        Self {
            kind: KeyEventKind::KeyDown,
            key: key.to_string(),
            code: code.to_string(),
            alt: false,
            ctrl: false,
            shift: false,
        }
    }

    pub fn key_up(key: &str, code: &str) -> Self {
        Self {
            kind: KeyEventKind::KeyUp,
            ..Self::key_down(key, code)
        }
    }

    pub fn with_modifiers(mut self, alt: bool, ctrl: bool, shift: bool) -> Self {
        self.alt = alt;
        self.ctrl = ctrl;
        self.shift = shift;
        self
    }

    pub fn live_modifiers(&self) -> ModifierMask {
        ModifierMask::from_flags(self.alt, self.ctrl, self.shift)
    }
}

/// Stateful translator. The only state is the set of modifiers held since the
/// last non-modifier key-down, used to report a modifier-only chord when the
/// last of them is released.
#[derive(Debug, Default)]
pub struct KeyTranslator {
    held: ModifierMask,
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held_modifiers(&self) -> ModifierMask {
        self.held
    }

    pub fn reset(&mut self) {
        self.held = ModifierMask::EMPTY;
    }

    /// Translate one host key event. An empty result means "nothing to send".
    pub fn translate(
        &mut self,
        raw: &RawKeyEvent,
        kana_mode: bool,
        layout: KeyboardLayout,
    ) -> KeyEvent {
        let live = raw.live_modifiers();
        let own = keymap::modifier_mask_of(&raw.code);
        if !own.is_empty() {
            return self.track_modifier(live ^ own);
        }
        if raw.kind != KeyEventKind::KeyDown {
            return KeyEvent::default();
        }

        self.held = ModifierMask::EMPTY;

        if raw.key == SWITCH_WINDOW_LABEL && live.contains(ModifierMask::CTRL) {
            debug!(key = %raw.key, "suppressing screenshot shortcut");
            return KeyEvent::default();
        }

        let special_key = keymap::function_key_by_label(&raw.key)
            .or_else(|| keymap::special_key(layout, &raw.code));
        let glyphs = match special_key {
            Some(_) => None,
            None => keymap::normal_key(layout, &raw.code),
        };

        // Shift alone only picks the shifted glyph; it is not a modifier then.
        let shift_selects_glyph = live == ModifierMask::SHIFT && glyphs.is_some();

        let mut event = KeyEvent {
            special_key,
            ..KeyEvent::default()
        };
        if let Some(glyphs) = glyphs {
            event.key_code = glyphs
                .glyph(shift_selects_glyph)
                .chars()
                .next()
                .map(u32::from);
            if kana_mode {
                let kana = glyphs.kana_glyph(shift_selects_glyph);
                if !kana.is_empty() {
                    event.key_string = Some(kana.to_string());
                }
            }
        }
        if event.special_key.is_none() && event.key_code.is_none() {
            return KeyEvent::default();
        }
        if !shift_selects_glyph {
            event.modifier_keys = live.keys();
        }
        event
    }

    fn track_modifier(&mut self, current: ModifierMask) -> KeyEvent {
        if current.has_bits_outside(self.held) {
            self.held = current;
            return KeyEvent::default();
        }
        if self.held.is_empty() || !current.is_empty() {
            return KeyEvent::default();
        }
        let keys = self.held.keys();
        self.held = ModifierMask::EMPTY;
        KeyEvent::modifiers_only(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_event::{ModifierKey, SpecialKey};

    const US: KeyboardLayout = KeyboardLayout::Us;
    const JP: KeyboardLayout = KeyboardLayout::Jp;

    fn shift_down(ctrl: bool) -> RawKeyEvent {
        RawKeyEvent::key_down("Shift", "ShiftLeft").with_modifiers(false, ctrl, false)
    }

    fn shift_up(ctrl: bool) -> RawKeyEvent {
        RawKeyEvent::key_up("Shift", "ShiftLeft").with_modifiers(false, ctrl, true)
    }

    fn ctrl_down(shift: bool) -> RawKeyEvent {
        RawKeyEvent::key_down("Control", "ControlLeft").with_modifiers(false, false, shift)
    }

    fn ctrl_up(shift: bool) -> RawKeyEvent {
        RawKeyEvent::key_up("Control", "ControlLeft").with_modifiers(false, true, shift)
    }

    #[test]
    fn plain_letter() {
        let mut t = KeyTranslator::new();
        let event = t.translate(&RawKeyEvent::key_down("a", "KeyA"), false, JP);
        assert_eq!(event.key_code, Some(97));
        assert!(event.modifier_keys.is_empty());
        assert!(event.key_string.is_none());
        assert!(event.special_key.is_none());
    }

    #[test]
    fn shift_only_selects_shifted_glyph() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("A", "KeyA").with_modifiers(false, false, true);
        let event = t.translate(&raw, false, US);
        assert_eq!(event.key_code, Some('A' as u32));
        assert!(event.modifier_keys.is_empty());
    }

    #[test]
    fn shift_with_ctrl_is_reported() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("A", "KeyA").with_modifiers(false, true, true);
        let event = t.translate(&raw, false, US);
        assert_eq!(event.key_code, Some('a' as u32));
        assert_eq!(
            event.modifier_keys,
            vec![ModifierKey::Ctrl, ModifierKey::Shift]
        );
    }

    #[test]
    fn shift_on_special_key_is_reported() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("Enter", "Enter").with_modifiers(false, false, true);
        let event = t.translate(&raw, false, US);
        assert_eq!(event.special_key, Some(SpecialKey::Enter));
        assert_eq!(event.modifier_keys, vec![ModifierKey::Shift]);
        assert!(event.key_code.is_none());
    }

    #[test]
    fn kana_mode_adds_key_string() {
        let mut t = KeyTranslator::new();
        let event = t.translate(&RawKeyEvent::key_down("a", "KeyA"), true, JP);
        assert_eq!(event.key_code, Some(97));
        assert_eq!(event.key_string.as_deref(), Some("ち"));

        let raw = RawKeyEvent::key_down("#", "Digit3").with_modifiers(false, false, true);
        let event = t.translate(&raw, true, JP);
        assert_eq!(event.key_code, Some('#' as u32));
        assert_eq!(event.key_string.as_deref(), Some("ぁ"));
    }

    #[test]
    fn glyphless_shifted_key_is_empty() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("0", "Digit0").with_modifiers(false, false, true);
        assert!(t.translate(&raw, false, JP).is_empty());
    }

    #[test]
    fn unknown_key_is_empty() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("Unidentified", "Fn").with_modifiers(false, true, false);
        assert!(t.translate(&raw, false, US).is_empty());
    }

    #[test]
    fn function_key_label_overrides_code() {
        let mut t = KeyTranslator::new();
        let raw = RawKeyEvent::key_down("BrowserBack", "BrowserBack");
        assert_eq!(t.translate(&raw, false, US).special_key, Some(SpecialKey::F1));
        let raw = RawKeyEvent::key_down("AudioVolumeUp", "F10");
        assert_eq!(
            t.translate(&raw, false, US).special_key,
            Some(SpecialKey::F10)
        );
    }

    #[test]
    fn screenshot_shortcut_is_suppressed() {
        let mut t = KeyTranslator::new();
        let raw =
            RawKeyEvent::key_down(SWITCH_WINDOW_LABEL, "F5").with_modifiers(false, true, false);
        assert!(t.translate(&raw, false, US).is_empty());

        let raw = RawKeyEvent::key_down(SWITCH_WINDOW_LABEL, "F5");
        assert_eq!(t.translate(&raw, false, US).special_key, Some(SpecialKey::F5));
    }

    #[test]
    fn modifier_chord_reports_on_last_release() {
        let mut t = KeyTranslator::new();
        assert!(t.translate(&ctrl_down(false), false, US).is_empty());
        assert!(t.translate(&shift_down(true), false, US).is_empty());
        assert!(t.translate(&shift_up(true), false, US).is_empty());
        let event = t.translate(&ctrl_up(false), false, US);
        assert_eq!(
            event.modifier_keys,
            vec![ModifierKey::Ctrl, ModifierKey::Shift]
        );
        assert!(event.key_code.is_none());
        assert!(t.held_modifiers().is_empty());
    }

    #[test]
    fn single_modifier_tap() {
        let mut t = KeyTranslator::new();
        assert!(t.translate(&shift_down(false), false, US).is_empty());
        let event = t.translate(&shift_up(false), false, US);
        assert_eq!(event.modifier_keys, vec![ModifierKey::Shift]);
    }

    #[test]
    fn modifier_used_with_key_reports_nothing() {
        let mut t = KeyTranslator::new();
        t.translate(&shift_down(false), false, US);
        let raw = RawKeyEvent::key_down("A", "KeyA").with_modifiers(false, false, true);
        t.translate(&raw, false, US);
        assert!(t.held_modifiers().is_empty());
        assert!(t.translate(&shift_up(false), false, US).is_empty());
    }

    #[test]
    fn residual_ctrl_after_consuming_key() {
        // Ctrl+Shift+Backspace, then Shift and Ctrl released: the Shift release
        // looks like a fresh Ctrl press, so the Ctrl release reports [CTRL].
        let mut t = KeyTranslator::new();
        t.translate(&ctrl_down(false), false, US);
        t.translate(&shift_down(true), false, US);
        let backspace =
            RawKeyEvent::key_down("Backspace", "Backspace").with_modifiers(false, true, true);
        let event = t.translate(&backspace, false, US);
        assert_eq!(event.special_key, Some(SpecialKey::Backspace));
        assert_eq!(
            event.modifier_keys,
            vec![ModifierKey::Ctrl, ModifierKey::Shift]
        );
        assert!(t.translate(&shift_up(true), false, US).is_empty());
        assert_eq!(t.held_modifiers(), ModifierMask::CTRL);
        let event = t.translate(&ctrl_up(false), false, US);
        assert_eq!(event.modifier_keys, vec![ModifierKey::Ctrl]);
    }

    #[test]
    fn non_modifier_key_up_is_empty() {
        let mut t = KeyTranslator::new();
        t.translate(&ctrl_down(false), false, US);
        let raw = RawKeyEvent::key_up("a", "KeyA").with_modifiers(false, true, false);
        assert!(t.translate(&raw, false, US).is_empty());
        assert_eq!(t.held_modifiers(), ModifierMask::CTRL);
    }

    #[test]
    fn raw_event_json() {
        let raw: RawKeyEvent = serde_json::from_str(
            r#"{"type":"keydown","key":"a","code":"KeyA","ctrlKey":true}"#,
        )
        .unwrap();
        assert_eq!(raw.kind, KeyEventKind::KeyDown);
        assert!(raw.ctrl);
        assert!(!raw.shift);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_raw() -> impl Strategy<Value = RawKeyEvent> {
            let codes = prop::sample::select(vec![
                ("Shift", "ShiftLeft"),
                ("Control", "ControlRight"),
                ("Alt", "AltLeft"),
                ("a", "KeyA"),
                ("Enter", "Enter"),
                ("Backspace", "Backspace"),
                ("3", "Digit3"),
                ("BrowserBack", "BrowserBack"),
                ("Unidentified", "Fn"),
            ]);
            (codes, any::<bool>(), any::<(bool, bool, bool)>()).prop_map(
                |((key, code), down, (alt, ctrl, shift))| {
                    let raw = if down {
                        RawKeyEvent::key_down(key, code)
                    } else {
                        RawKeyEvent::key_up(key, code)
                    };
                    raw.with_modifiers(alt, ctrl, shift)
                },
            )
        }

        proptest! {
            #[test]
            fn held_state_invariants(
                events in prop::collection::vec(arb_raw(), 1..40),
                kana in any::<bool>(),
            ) {
                let mut t = KeyTranslator::new();
                for raw in events {
                    let event = t.translate(&raw, kana, US);
                    let is_modifier = keymap::is_modifier(&raw.code);
                    if !is_modifier && raw.kind == KeyEventKind::KeyDown {
                        prop_assert!(t.held_modifiers().is_empty());
                    }
                    if !is_modifier && raw.kind == KeyEventKind::KeyUp {
                        prop_assert!(event.is_empty());
                    }
                    if is_modifier && !event.is_empty() {
                        prop_assert!(event.key_code.is_none());
                        prop_assert!(event.special_key.is_none());
                        prop_assert!(t.held_modifiers().is_empty());
                    }
                    if event.key_string.is_some() {
                        prop_assert!(kana);
                    }
                }
            }
        }
    }
}
