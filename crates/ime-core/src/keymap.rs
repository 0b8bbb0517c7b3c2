//! Static keyboard-layout tables.
//!
//! Keys are identified by the host's physical `code` strings (`KeyA`,
//! `Digit3`, `IntlRo`, ...). Function keys on the host keyboard report
//! unreliable codes, so they are resolved by the produced key label instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::key_event::{ModifierMask, SpecialKey};

/// Physical keyboard layout the host is configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardLayout {
    #[default]
    Us,
    Jp,
}

impl FromStr for KeyboardLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" => Ok(Self::Us),
            "jp" => Ok(Self::Jp),
            other => Err(format!("unknown keyboard layout: {other}")),
        }
    }
}

impl fmt::Display for KeyboardLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Us => "us",
            Self::Jp => "jp",
        })
    }
}

/// Glyphs a printable key produces: `[unshifted, shifted, kana, kana-shifted]`.
/// An empty string means the key produces nothing in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGlyphs {
    pub unshifted: &'static str,
    pub shifted: &'static str,
    pub kana: &'static str,
    pub kana_shifted: &'static str,
}

impl KeyGlyphs {
    pub fn glyph(&self, shifted: bool) -> &'static str {
        if shifted {
            self.shifted
        } else {
            self.unshifted
        }
    }

    pub fn kana_glyph(&self, shifted: bool) -> &'static str {
        if shifted {
            self.kana_shifted
        } else {
            self.kana
        }
    }
}

/// Key label of the window-switcher key. Ctrl + this key is the host's
/// screenshot shortcut.
pub const SWITCH_WINDOW_LABEL: &str = "ChromeOSSwitchWindow";

pub fn modifier_mask_of(code: &str) -> ModifierMask {
    match code {
        "ShiftLeft" | "ShiftRight" => ModifierMask::SHIFT,
        "ControlLeft" | "ControlRight" => ModifierMask::CTRL,
        "AltLeft" | "AltRight" => ModifierMask::ALT,
        _ => ModifierMask::EMPTY,
    }
}

pub fn is_modifier(code: &str) -> bool {
    !modifier_mask_of(code).is_empty()
}

const COMMON_SPECIAL_KEYS: &[(&str, SpecialKey)] = &[
    ("Backspace", SpecialKey::Backspace),
    ("Tab", SpecialKey::Tab),
    ("Enter", SpecialKey::Enter),
    ("Escape", SpecialKey::Escape),
    ("Space", SpecialKey::Space),
    ("PageUp", SpecialKey::PageUp),
    ("PageDown", SpecialKey::PageDown),
    ("End", SpecialKey::End),
    ("Home", SpecialKey::Home),
    ("ArrowLeft", SpecialKey::Left),
    ("ArrowUp", SpecialKey::Up),
    ("ArrowRight", SpecialKey::Right),
    ("ArrowDown", SpecialKey::Down),
    ("Insert", SpecialKey::Insert),
    ("Delete", SpecialKey::Del),
    ("CapsLock", SpecialKey::CapsLock),
    ("Numpad0", SpecialKey::Numpad0),
    ("Numpad1", SpecialKey::Numpad1),
    ("Numpad2", SpecialKey::Numpad2),
    ("Numpad3", SpecialKey::Numpad3),
    ("Numpad4", SpecialKey::Numpad4),
    ("Numpad5", SpecialKey::Numpad5),
    ("Numpad6", SpecialKey::Numpad6),
    ("Numpad7", SpecialKey::Numpad7),
    ("Numpad8", SpecialKey::Numpad8),
    ("Numpad9", SpecialKey::Numpad9),
    ("NumpadMultiply", SpecialKey::Multiply),
    ("NumpadAdd", SpecialKey::Add),
    ("NumpadComma", SpecialKey::Separator),
    ("NumpadSubtract", SpecialKey::Subtract),
    ("NumpadDecimal", SpecialKey::Decimal),
    ("NumpadDivide", SpecialKey::Divide),
    ("NumpadEqual", SpecialKey::Equals),
    ("NumpadEnter", SpecialKey::Enter),
    ("F1", SpecialKey::F1),
    ("F2", SpecialKey::F2),
    ("F3", SpecialKey::F3),
    ("F4", SpecialKey::F4),
    ("F5", SpecialKey::F5),
    ("F6", SpecialKey::F6),
    ("F7", SpecialKey::F7),
    ("F8", SpecialKey::F8),
    ("F9", SpecialKey::F9),
    ("F10", SpecialKey::F10),
    ("F11", SpecialKey::F11),
    ("F12", SpecialKey::F12),
];

// JIS-only keys. Backquote is the zenkaku/hankaku key on JIS boards.
const JP_SPECIAL_KEYS: &[(&str, SpecialKey)] = &[
    ("Convert", SpecialKey::Henkan),
    ("NonConvert", SpecialKey::Muhenkan),
    ("KanaMode", SpecialKey::Kana),
    ("Lang1", SpecialKey::Kana),
    ("Lang2", SpecialKey::Eisu),
    ("Backquote", SpecialKey::Hankaku),
];

const FUNCTION_KEYS_BY_LABEL: &[(&str, SpecialKey)] = &[
    ("BrowserBack", SpecialKey::F1),
    ("BrowserForward", SpecialKey::F2),
    ("BrowserRefresh", SpecialKey::F3),
    ("ChromeOSFullscreen", SpecialKey::F4),
    (SWITCH_WINDOW_LABEL, SpecialKey::F5),
    ("BrightnessDown", SpecialKey::F6),
    ("BrightnessUp", SpecialKey::F7),
    ("AudioVolumeMute", SpecialKey::F8),
    ("AudioVolumeDown", SpecialKey::F9),
    ("AudioVolumeUp", SpecialKey::F10),
    ("F1", SpecialKey::F1),
    ("F2", SpecialKey::F2),
    ("F3", SpecialKey::F3),
    ("F4", SpecialKey::F4),
    ("F5", SpecialKey::F5),
    ("F6", SpecialKey::F6),
    ("F7", SpecialKey::F7),
    ("F8", SpecialKey::F8),
    ("F9", SpecialKey::F9),
    ("F10", SpecialKey::F10),
    ("F11", SpecialKey::F11),
    ("F12", SpecialKey::F12),
];

macro_rules! glyphs {
    ($code:expr, $u:expr, $s:expr, $k:expr, $ks:expr) => {
        (
            $code,
            KeyGlyphs {
                unshifted: $u,
                shifted: $s,
                kana: $k,
                kana_shifted: $ks,
            },
        )
    };
}

const LETTER_KEYS: &[(&str, KeyGlyphs)] = &[
    glyphs!("KeyA", "a", "A", "ち", "ち"),
    glyphs!("KeyB", "b", "B", "こ", "こ"),
    glyphs!("KeyC", "c", "C", "そ", "そ"),
    glyphs!("KeyD", "d", "D", "し", "し"),
    glyphs!("KeyE", "e", "E", "い", "ぃ"),
    glyphs!("KeyF", "f", "F", "は", "は"),
    glyphs!("KeyG", "g", "G", "き", "き"),
    glyphs!("KeyH", "h", "H", "く", "く"),
    glyphs!("KeyI", "i", "I", "に", "に"),
    glyphs!("KeyJ", "j", "J", "ま", "ま"),
    glyphs!("KeyK", "k", "K", "の", "の"),
    glyphs!("KeyL", "l", "L", "り", "り"),
    glyphs!("KeyM", "m", "M", "も", "も"),
    glyphs!("KeyN", "n", "N", "み", "み"),
    glyphs!("KeyO", "o", "O", "ら", "ら"),
    glyphs!("KeyP", "p", "P", "せ", "せ"),
    glyphs!("KeyQ", "q", "Q", "た", "た"),
    glyphs!("KeyR", "r", "R", "す", "す"),
    glyphs!("KeyS", "s", "S", "と", "と"),
    glyphs!("KeyT", "t", "T", "か", "か"),
    glyphs!("KeyU", "u", "U", "な", "な"),
    glyphs!("KeyV", "v", "V", "ひ", "ひ"),
    glyphs!("KeyW", "w", "W", "て", "て"),
    glyphs!("KeyX", "x", "X", "さ", "さ"),
    glyphs!("KeyY", "y", "Y", "ん", "ん"),
    glyphs!("KeyZ", "z", "Z", "つ", "っ"),
    glyphs!("Comma", ",", "<", "ね", "、"),
    glyphs!("Period", ".", ">", "る", "。"),
    glyphs!("Slash", "/", "?", "め", "・"),
];

const US_SYMBOL_KEYS: &[(&str, KeyGlyphs)] = &[
    glyphs!("Digit1", "1", "!", "ぬ", "ぬ"),
    glyphs!("Digit2", "2", "@", "ふ", "ふ"),
    glyphs!("Digit3", "3", "#", "あ", "ぁ"),
    glyphs!("Digit4", "4", "$", "う", "ぅ"),
    glyphs!("Digit5", "5", "%", "え", "ぇ"),
    glyphs!("Digit6", "6", "^", "お", "ぉ"),
    glyphs!("Digit7", "7", "&", "や", "ゃ"),
    glyphs!("Digit8", "8", "*", "ゆ", "ゅ"),
    glyphs!("Digit9", "9", "(", "よ", "ょ"),
    glyphs!("Digit0", "0", ")", "わ", "を"),
    glyphs!("Minus", "-", "_", "ほ", "ほ"),
    glyphs!("Equal", "=", "+", "へ", "へ"),
    glyphs!("BracketLeft", "[", "{", "゛", "゛"),
    glyphs!("BracketRight", "]", "}", "゜", "「"),
    glyphs!("Backslash", "\\", "|", "む", "」"),
    glyphs!("Semicolon", ";", ":", "れ", "れ"),
    glyphs!("Quote", "'", "\"", "け", "け"),
    glyphs!("Backquote", "`", "~", "ろ", "ろ"),
];

const JP_SYMBOL_KEYS: &[(&str, KeyGlyphs)] = &[
    glyphs!("Digit1", "1", "!", "ぬ", "ぬ"),
    glyphs!("Digit2", "2", "\"", "ふ", "ふ"),
    glyphs!("Digit3", "3", "#", "あ", "ぁ"),
    glyphs!("Digit4", "4", "$", "う", "ぅ"),
    glyphs!("Digit5", "5", "%", "え", "ぇ"),
    glyphs!("Digit6", "6", "&", "お", "ぉ"),
    glyphs!("Digit7", "7", "'", "や", "ゃ"),
    glyphs!("Digit8", "8", "(", "ゆ", "ゅ"),
    glyphs!("Digit9", "9", ")", "よ", "ょ"),
    glyphs!("Digit0", "0", "", "わ", "を"),
    glyphs!("Minus", "-", "=", "ほ", "ほ"),
    glyphs!("Equal", "^", "~", "へ", "へ"),
    glyphs!("IntlYen", "\\", "|", "ー", "ー"),
    glyphs!("BracketLeft", "@", "`", "゛", "゛"),
    glyphs!("BracketRight", "[", "{", "゜", "「"),
    glyphs!("Backslash", "]", "}", "む", "」"),
    glyphs!("Semicolon", ";", "+", "れ", "れ"),
    glyphs!("Quote", ":", "*", "け", "け"),
    glyphs!("IntlRo", "\\", "_", "ろ", "ろ"),
];

fn lookup<T: Copy>(table: &[(&str, T)], code: &str) -> Option<T> {
    table
        .iter()
        .find_map(|(c, value)| (*c == code).then_some(*value))
}

pub fn special_key(layout: KeyboardLayout, code: &str) -> Option<SpecialKey> {
    let layout_specific = match layout {
        KeyboardLayout::Jp => lookup(JP_SPECIAL_KEYS, code),
        KeyboardLayout::Us => None,
    };
    layout_specific.or_else(|| lookup(COMMON_SPECIAL_KEYS, code))
}

pub fn function_key_by_label(label: &str) -> Option<SpecialKey> {
    lookup(FUNCTION_KEYS_BY_LABEL, label)
}

pub fn normal_key(layout: KeyboardLayout, code: &str) -> Option<KeyGlyphs> {
    let symbols = match layout {
        KeyboardLayout::Us => US_SYMBOL_KEYS,
        KeyboardLayout::Jp => JP_SYMBOL_KEYS,
    };
    lookup(LETTER_KEYS, code).or_else(|| lookup(symbols, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jp_only_special_keys() {
        assert_eq!(
            special_key(KeyboardLayout::Jp, "Convert"),
            Some(SpecialKey::Henkan)
        );
        assert_eq!(special_key(KeyboardLayout::Us, "Convert"), None);
        assert_eq!(
            special_key(KeyboardLayout::Jp, "Backquote"),
            Some(SpecialKey::Hankaku)
        );
        assert!(normal_key(KeyboardLayout::Us, "Backquote").is_some());
    }

    #[test]
    fn common_special_keys_in_both_layouts() {
        for layout in [KeyboardLayout::Us, KeyboardLayout::Jp] {
            assert_eq!(special_key(layout, "Enter"), Some(SpecialKey::Enter));
            assert_eq!(special_key(layout, "ArrowLeft"), Some(SpecialKey::Left));
            assert_eq!(special_key(layout, "KeyA"), None);
        }
    }

    #[test]
    fn function_keys_resolve_by_label() {
        assert_eq!(function_key_by_label("BrowserBack"), Some(SpecialKey::F1));
        assert_eq!(function_key_by_label("AudioVolumeUp"), Some(SpecialKey::F10));
        assert_eq!(function_key_by_label("F12"), Some(SpecialKey::F12));
        assert_eq!(function_key_by_label("a"), None);
    }

    #[test]
    fn layout_specific_glyphs() {
        let us = normal_key(KeyboardLayout::Us, "Digit2").unwrap();
        let jp = normal_key(KeyboardLayout::Jp, "Digit2").unwrap();
        assert_eq!(us.glyph(true), "@");
        assert_eq!(jp.glyph(true), "\"");
        assert!(normal_key(KeyboardLayout::Us, "IntlRo").is_none());
        assert_eq!(
            normal_key(KeyboardLayout::Jp, "IntlRo").unwrap().kana_glyph(false),
            "ろ"
        );
    }

    #[test]
    fn modifier_codes() {
        assert_eq!(modifier_mask_of("ShiftRight"), ModifierMask::SHIFT);
        assert_eq!(modifier_mask_of("ControlLeft"), ModifierMask::CTRL);
        assert_eq!(modifier_mask_of("AltRight"), ModifierMask::ALT);
        assert!(!is_modifier("KeyA"));
    }

    #[test]
    fn layout_parse_round_trip() {
        assert_eq!("jp".parse::<KeyboardLayout>(), Ok(KeyboardLayout::Jp));
        assert!("dvorak".parse::<KeyboardLayout>().is_err());
        assert_eq!(KeyboardLayout::Us.to_string(), "us");
    }
}
