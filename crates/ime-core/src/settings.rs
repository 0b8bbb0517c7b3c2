//! Front-end settings loaded from TOML.
//!
//! - `parse_settings_toml(content)` parses and validates a custom file
//! - `Settings::default()` parses the embedded defaults
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::key_event::CompositionMode;
use crate::keymap::KeyboardLayout;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Largest candidate page the host window can display.
pub const HOST_MAX_PAGE_SIZE: u32 = 10;

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub candidates: CandidateSettings,
    pub input: InputSettings,
    #[serde(default)]
    engines: HashMap<String, KeyboardLayout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateSettings {
    pub max_page_size: u32,
    #[serde(default = "default_vertical")]
    pub vertical: bool,
}

fn default_vertical() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputSettings {
    pub default_mode: CompositionMode,
}

impl Settings {
    /// Keyboard layout for a host engine id. Unknown ids fall back to US.
    pub fn layout_for(&self, engine_id: &str) -> KeyboardLayout {
        match self.engines.get(engine_id) {
            Some(layout) => *layout,
            None => {
                warn!(engine_id, "no layout configured for engine, using us");
                KeyboardLayout::default()
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        parse_settings_toml(DEFAULT_SETTINGS_TOML).expect("embedded settings TOML must be valid")
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    let page = s.candidates.max_page_size;
    if page == 0 || page > HOST_MAX_PAGE_SIZE {
        return Err(SettingsError::InvalidValue {
            field: "candidates.max_page_size".to_string(),
            reason: format!("must be between 1 and {HOST_MAX_PAGE_SIZE}"),
        });
    }
    if s.input.default_mode == CompositionMode::Direct {
        return Err(SettingsError::InvalidValue {
            field: "input.default_mode".to_string(),
            reason: "must be a composing mode".to_string(),
        });
    }
    Ok(())
}
