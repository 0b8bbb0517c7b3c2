use std::ops::{BitOr, BitXor};

use serde::{Deserialize, Serialize};

/// Modifier reported to the engine. Variant order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierKey {
    Alt,
    Ctrl,
    Shift,
}

/// Bitset over {Shift, Ctrl, Alt}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierMask(u8);

impl ModifierMask {
    pub const EMPTY: Self = Self(0);
    pub const SHIFT: Self = Self(1);
    pub const CTRL: Self = Self(2);
    pub const ALT: Self = Self(4);

    pub fn from_flags(alt: bool, ctrl: bool, shift: bool) -> Self {
        let mut mask = Self::EMPTY;
        if alt {
            mask = mask | Self::ALT;
        }
        if ctrl {
            mask = mask | Self::CTRL;
        }
        if shift {
            mask = mask | Self::SHIFT;
        }
        mask
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` has a bit that `base` lacks.
    pub fn has_bits_outside(self, base: Self) -> bool {
        self.0 & !base.0 != 0
    }

    /// Modifiers in engine reporting order: ALT, CTRL, SHIFT.
    pub fn keys(self) -> Vec<ModifierKey> {
        let mut keys = Vec::with_capacity(3);
        if self.contains(Self::ALT) {
            keys.push(ModifierKey::Alt);
        }
        if self.contains(Self::CTRL) {
            keys.push(ModifierKey::Ctrl);
        }
        if self.contains(Self::SHIFT) {
            keys.push(ModifierKey::Shift);
        }
        keys
    }
}

impl BitOr for ModifierMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for ModifierMask {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

/// Named non-printable keys understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialKey {
    Space,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Del,
    Backspace,
    Henkan,
    Muhenkan,
    Kana,
    Eisu,
    Hankaku,
    Home,
    End,
    Tab,
    PageUp,
    PageDown,
    Insert,
    CapsLock,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    Multiply,
    Add,
    Separator,
    Subtract,
    Decimal,
    Divide,
    Equals,
}

/// Input mode of the engine's composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositionMode {
    Direct,
    Hiragana,
    FullKatakana,
    HalfAscii,
    FullAscii,
    HalfKatakana,
}

/// Key event in the engine's vocabulary.
///
/// Built once by the translator and never mutated afterwards except for
/// stamping the composition `mode` right before sending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_key: Option<SpecialKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifier_keys: Vec<ModifierKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CompositionMode>,
}

impl KeyEvent {
    /// An event carrying nothing for the engine. Never sent.
    pub fn is_empty(&self) -> bool {
        self.special_key.is_none()
            && self.key_code.is_none()
            && self.modifier_keys.is_empty()
            && self.key_string.is_none()
    }

    pub fn modifiers_only(keys: Vec<ModifierKey>) -> Self {
        Self {
            modifier_keys: keys,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: CompositionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}
