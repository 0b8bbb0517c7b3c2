use std::fs;
use std::path::Path;
use std::process;

use ime_core::settings::{self, Settings, SettingsError};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigOpsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigOpsError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigOpsError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(settings::parse_settings_toml(&content)?)
}

/// One-line summary printed after a successful validation.
pub fn summary(s: &Settings) -> String {
    format!(
        "OK: candidates.max_page_size={}, candidates.vertical={}, input.default_mode={:?}",
        s.candidates.max_page_size, s.candidates.vertical, s.input.default_mode
    )
}

pub fn settings_export() {
    print!("{}", settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let s = die!(load_settings(Path::new(file)), "Error: {}");
    println!("{}", summary(&s));
}

pub fn settings_layout(file: Option<&str>, engine_id: &str) {
    let s = match file {
        Some(file) => die!(load_settings(Path::new(file)), "Error: {}"),
        None => Settings::default(),
    };
    println!("{engine_id}\t{}", s.layout_for(engine_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn exported_defaults_validate() {
        let file = write_temp(settings::default_toml());
        let s = load_settings(file.path()).unwrap();
        assert_eq!(
            summary(&s),
            "OK: candidates.max_page_size=9, candidates.vertical=true, input.default_mode=Hiragana"
        );
    }

    #[test]
    fn invalid_file_reports_settings_error() {
        let file = write_temp("[candidates]\nmax_page_size = \"nine\"\n");
        assert!(matches!(
            load_settings(file.path()),
            Err(ConfigOpsError::Settings(SettingsError::Parse(_)))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
