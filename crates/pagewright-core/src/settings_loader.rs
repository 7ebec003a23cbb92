//! Settings loading from configuration files.
//!
//! This module loads [`Settings`] from TOML or JSON files and applies
//! environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `PAGEWRIGHT_SITE_URL` | `site_url` |
//! | `PAGEWRIGHT_TEMPLATE_DIR` | `template_dir` |
//! | `PAGEWRIGHT_CACHE_DIR` | `cache_dir` |
//! | `PAGEWRIGHT_HOST` | `host` |
//! | `PAGEWRIGHT_PORT` | `port` |
//! | `PAGEWRIGHT_LOG_LEVEL` | `log_level` |
//! | `PAGEWRIGHT_DEBUG` | `debug` |
//! | `PAGEWRIGHT_PASSWORD` | `password` |
//! | `PAGEWRIGHT_TIMEOUT` | `request_timeout_secs` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use pagewright_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("pagewright.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::PagewrightError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Keys absent from the document keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, PagewrightError> {
    toml::from_str(toml_str)
        .map_err(|e| PagewrightError::Configuration(format!("Invalid TOML settings: {e}")))
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, PagewrightError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, PagewrightError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, PagewrightError> {
    serde_json::from_str(json_str)
        .map_err(|e| PagewrightError::Configuration(format!("Invalid JSON settings: {e}")))
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, PagewrightError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `PAGEWRIGHT_*` environment variable overrides to a settings struct.
///
/// Unparsable numeric values are ignored and the previous value is kept.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Applies overrides from an arbitrary lookup function.
///
/// [`apply_env_overrides`] calls this with the process environment.
pub fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("PAGEWRIGHT_SITE_URL") {
        settings.site_url = val;
    }

    if let Some(val) = lookup("PAGEWRIGHT_TEMPLATE_DIR") {
        settings.template_dir = PathBuf::from(val);
    }

    if let Some(val) = lookup("PAGEWRIGHT_CACHE_DIR") {
        settings.cache_dir = PathBuf::from(val);
    }

    if let Some(val) = lookup("PAGEWRIGHT_HOST") {
        settings.host = val;
    }

    if let Some(port) = lookup("PAGEWRIGHT_PORT").and_then(|v| v.parse::<u16>().ok()) {
        settings.port = port;
    }

    if let Some(val) = lookup("PAGEWRIGHT_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("PAGEWRIGHT_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("PAGEWRIGHT_PASSWORD") {
        settings.password = if val.is_empty() { None } else { Some(val) };
    }

    if let Some(secs) = lookup("PAGEWRIGHT_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        settings.request_timeout_secs = secs;
    }
}

fn read_config(path: &Path, format: &str) -> Result<String, PagewrightError> {
    std::fs::read_to_string(path).map_err(|e| {
        PagewrightError::Configuration(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}
