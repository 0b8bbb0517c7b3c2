//! Core types shared by the IME front end: the engine wire protocol, keyboard
//! layout tables, the physical-to-engine key translator, and TOML settings.

pub mod command;
pub mod key_event;
pub mod keymap;
pub mod protocol;
pub mod settings;
pub mod translator;

pub use command::{CommandFailure, Output, SessionCommand, SessionId};
pub use key_event::{CompositionMode, KeyEvent, ModifierKey, ModifierMask, SpecialKey};
pub use keymap::KeyboardLayout;
pub use translator::{KeyEventKind, KeyTranslator, RawKeyEvent};
