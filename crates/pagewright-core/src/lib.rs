//! # pagewright-core
//!
//! Core types, settings, logging, and the durable disk cache for pagewright.
//! Every other crate in the workspace builds on these.
//!
//! ## Modules
//!
//! - [`error`] - Error type and result alias
//! - [`settings`] - Server settings with defaults
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`cache`] - Slug-keyed JSON and HTML payloads persisted under one cache root

pub mod cache;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use cache::DiskCache;
pub use error::{PagewrightError, PagewrightResult};
pub use settings::Settings;
