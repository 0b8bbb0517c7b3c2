//! Replays host key events through the translator and prints what the engine
//! would receive.

use std::fs;
use std::io::{self, Read};
use std::process;

use ime_core::key_event::CompositionMode;
use ime_core::keymap::KeyboardLayout;
use ime_core::translator::{KeyTranslator, RawKeyEvent};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Debug, thiserror::Error)]
pub enum KeyOpsError {
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    pub layout: KeyboardLayout,
    pub kana: bool,
    pub mode: Option<CompositionMode>,
}

/// Translate a JSON-lines stream of host key events. Each non-blank input line
/// yields one output line: the engine key event, or `-` when nothing would be
/// sent.
pub fn replay(input: &str, opts: &ReplayOptions) -> Result<Vec<String>, KeyOpsError> {
    let mut translator = KeyTranslator::new();
    let mut out = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let raw: RawKeyEvent =
            serde_json::from_str(line).map_err(|source| KeyOpsError::Json { line: i + 1, source })?;
        let event = translator.translate(&raw, opts.kana, opts.layout);
        if event.is_empty() {
            out.push("-".to_string());
            continue;
        }
        let event = match opts.mode {
            Some(mode) => event.with_mode(mode),
            None => event,
        };
        let json = serde_json::to_string(&event)
            .map_err(|source| KeyOpsError::Json { line: i + 1, source })?;
        out.push(json);
    }
    Ok(out)
}

/// Down then up for a single key, as a host would deliver a tap.
pub fn tap(key: &str, code: &str, alt: bool, ctrl: bool, shift: bool) -> String {
    let down = RawKeyEvent::key_down(key, code).with_modifiers(alt, ctrl, shift);
    let up = RawKeyEvent::key_up(key, code).with_modifiers(alt, ctrl, shift);
    [down, up]
        .iter()
        .filter_map(|raw| serde_json::to_string(raw).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn replay_cmd(file: Option<&str>, opts: &ReplayOptions) {
    let input = match file {
        Some(path) => die!(fs::read_to_string(path), "Error reading {path}: {}"),
        None => {
            let mut buf = String::new();
            die!(io::stdin().read_to_string(&mut buf), "Error reading stdin: {}");
            buf
        }
    };
    for line in die!(replay(&input, opts), "Error: {}") {
        println!("{line}");
    }
}

pub fn key_cmd(key: &str, code: &str, mods: (bool, bool, bool), opts: &ReplayOptions) {
    let (alt, ctrl, shift) = mods;
    let input = tap(key, code, alt, ctrl, shift);
    for line in die!(replay(&input, opts), "Error: {}") {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us() -> ReplayOptions {
        ReplayOptions {
            layout: KeyboardLayout::Us,
            kana: false,
            mode: None,
        }
    }

    #[test]
    fn printable_tap_yields_key_then_nothing() {
        let out = replay(&tap("a", "KeyA", false, false, false), &us()).unwrap();
        assert_eq!(out, vec![r#"{"key_code":97}"#, "-"]);
    }

    #[test]
    fn lone_shift_reports_on_release() {
        let input = [
            r#"{"type":"keydown","key":"Shift","code":"ShiftLeft"}"#,
            r#"{"type":"keyup","key":"Shift","code":"ShiftLeft","shiftKey":true}"#,
        ]
        .join("\n");
        let out = replay(&input, &us()).unwrap();
        assert_eq!(out, vec!["-", r#"{"modifier_keys":["SHIFT"]}"#]);
    }

    #[test]
    fn mode_is_stamped_and_comments_skipped() {
        let opts = ReplayOptions {
            mode: Some(CompositionMode::Hiragana),
            ..us()
        };
        let input = format!("# tap a\n\n{}", tap("a", "KeyA", false, false, false));
        let out = replay(&input, &opts).unwrap();
        assert_eq!(out[0], r#"{"key_code":97,"mode":"HIRAGANA"}"#);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let input = format!("{}\nnot json", tap("a", "KeyA", false, false, false));
        let err = replay(&input, &us()).unwrap_err();
        assert!(matches!(err, KeyOpsError::Json { line: 3, .. }));
    }

    #[test]
    fn replay_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.jsonl");
        fs::write(&path, tap("Enter", "Enter", false, false, false)).unwrap();
        let input = fs::read_to_string(&path).unwrap();
        let out = replay(&input, &us()).unwrap();
        assert_eq!(out, vec![r#"{"special_key":"ENTER"}"#, "-"]);
    }
}
