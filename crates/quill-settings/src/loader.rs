//! Settings loading: file layer + environment overrides.

use std::path::Path;

use crate::types::QuillSettings;

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON for [`QuillSettings`].
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load settings from the path in `QUILL_SETTINGS` (if set), then apply
/// environment overrides and validation.
///
/// A missing `QUILL_SETTINGS` variable means compiled defaults; a set but
/// unreadable path is an error, since the operator asked for that file.
pub fn load_settings() -> Result<QuillSettings, SettingsError> {
    let mut settings = match std::env::var("QUILL_SETTINGS") {
        Ok(path) => read_file(Path::new(&path))?,
        Err(_) => QuillSettings::default(),
    };
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Load settings from a specific file, then apply environment overrides
/// and validation.
pub fn load_settings_from_path(path: &Path) -> Result<QuillSettings, SettingsError> {
    let mut settings = read_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

fn read_file(path: &Path) -> Result<QuillSettings, SettingsError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn apply_env_overrides(settings: &mut QuillSettings) {
    if let Ok(host) = std::env::var("QUILL_HOST") {
        settings.server.host = host;
    }
    if let Ok(port) = std::env::var("QUILL_PORT") {
        match port.parse() {
            Ok(p) => settings.server.port = p,
            Err(_) => tracing::warn!(%port, "QUILL_PORT is not a valid port, ignoring"),
        }
    }
    if let Ok(filter) = std::env::var("QUILL_LOG") {
        settings.logging.filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_file_merges_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "ingest": {{ "chunkSize": 1000 }}, "server": {{ "port": 9000 }} }}"#
        )
        .unwrap();

        let settings = load_settings_from_path(file.path()).unwrap();
        assert_eq!(settings.ingest.chunk_size, 1000);
        assert_eq!(settings.server.port, 9000);
        // untouched sections keep defaults
        assert_eq!(settings.ingest.chunk_overlap, 100);
        assert_eq!(settings.search.chunk_limit, 2);
    }

    #[test]
    fn invalid_file_values_are_corrected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ingest": {{ "maxConcurrentItems": 0 }} }}"#).unwrap();

        let settings = load_settings_from_path(file.path()).unwrap();
        assert_eq!(settings.ingest.max_concurrent_items, 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_settings_from_path(Path::new("/nonexistent/quill.json"));
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = load_settings_from_path(file.path());
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }
}
