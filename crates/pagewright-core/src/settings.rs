//! Settings for the pagewright server.
//!
//! [`Settings`] holds everything the server and the render pipeline need:
//! where the remote site lives, where template fragments and the cache are
//! on disk, and the bounds applied to directive expansion.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The complete set of server settings.
///
/// # Examples
///
/// ```
/// use pagewright_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.port, 9000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs, diagnostic comments).
    pub debug: bool,
    /// The log level filter (e.g. "info", "pagewright_template=debug").
    pub log_level: String,

    // ── Server ───────────────────────────────────────────────────────

    /// The interface to bind.
    pub host: String,
    /// The port to bind.
    pub port: u16,

    // ── Remote platform ──────────────────────────────────────────────

    /// Base URL of the remote content platform, e.g. `https://example.site`.
    pub site_url: String,
    /// Optional shared site password forwarded to the remote platform.
    pub password: Option<String>,
    /// Timeout applied to every remote request, in seconds.
    pub request_timeout_secs: u64,

    // ── Templates ────────────────────────────────────────────────────

    /// Root directory of the template fragments (`template.conf`, regions, ...).
    pub template_dir: PathBuf,
    /// Layout used when neither the collection nor the page names one.
    pub default_layout: String,
    /// Maximum nesting depth for block includes.
    pub max_include_depth: usize,
    /// Maximum number of query directives resolved in a single render.
    pub max_directives: usize,

    // ── Cache ────────────────────────────────────────────────────────

    /// Root directory of the durable disk cache.
    pub cache_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),

            host: "127.0.0.1".to_string(),
            port: 9000,

            site_url: String::new(),
            password: None,
            request_timeout_secs: 30,

            template_dir: PathBuf::from("."),
            default_layout: "default".to_string(),
            max_include_depth: 32,
            max_directives: 256,

            cache_dir: PathBuf::from(".pagewright-cache"),
        }
    }
}

impl Settings {
    /// Returns the bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the remote request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns `site_url` without a trailing slash.
    pub fn site_root(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}
