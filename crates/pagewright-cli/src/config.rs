//! Settings discovery for the CLI.

use std::path::Path;

use pagewright_core::settings_loader;
use pagewright_core::{PagewrightError, PagewrightResult, Settings};

/// Settings file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "pagewright.toml";

/// Loads settings for one CLI invocation.
///
/// An explicit `--config` path must exist. Without one, `pagewright.toml` in
/// the working directory is used if present, else the defaults. Environment
/// overrides are applied either way.
pub fn load_settings(explicit: Option<&Path>) -> PagewrightResult<Settings> {
    match explicit {
        Some(path) if !path.exists() => Err(PagewrightError::Configuration(format!(
            "settings file {} does not exist",
            path.display()
        ))),
        Some(path) => settings_loader::from_toml_file_with_env(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            settings_loader::from_toml_file_with_env(DEFAULT_CONFIG_FILE)
        }
        None => Ok(settings_loader::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("site.toml");
        std::fs::write(&path, "port = 9100\ndefault_layout = \"wide\"\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.default_layout, "wide");
        assert_eq!(settings.max_include_depth, 32);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = load_settings(Some(Path::new("/nonexistent/pagewright.toml"))).unwrap_err();
        assert!(matches!(err, PagewrightError::Configuration(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "port = [").unwrap();
        assert!(load_settings(Some(&path)).is_err());
    }
}
