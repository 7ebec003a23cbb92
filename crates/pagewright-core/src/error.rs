//! Core error types for pagewright.
//!
//! This module provides the [`PagewrightError`] enum covering every failure the
//! render pipeline can surface: remote API failures, malformed directives,
//! cyclic block includes, template errors, configuration errors, and I/O.
//! Each variant maps to an HTTP status code so that the server always answers.

use thiserror::Error;

/// The primary error type for pagewright.
///
/// Each variant maps to an appropriate HTTP status code via
/// [`PagewrightError::status_code`].
#[derive(Error, Debug)]
pub enum PagewrightError {
    // ── Request errors ───────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── Remote platform ──────────────────────────────────────────────

    /// The remote content API failed or answered with a non-success status.
    #[error("Upstream error: {0}")]
    Upstream(String),

    // ── Directives ───────────────────────────────────────────────────

    /// A directive tag could not be parsed.
    #[error("Malformed directive `{directive}`: {reason}")]
    MalformedDirective {
        /// The offending directive text.
        directive: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A block include chain refers back to itself or nests too deeply.
    #[error("Cyclic block include: {}", chain.join(" -> "))]
    CyclicInclude {
        /// The block names of the include chain, outermost first.
        chain: Vec<String>,
    },

    /// More directives were produced than a single render may resolve.
    #[error("Too many directives: more than {limit} {kind} directives in one render")]
    TooManyDirectives {
        /// The directive kind (e.g. "query").
        kind: &'static str,
        /// The configured limit.
        limit: usize,
    },

    // ── Templates ────────────────────────────────────────────────────

    /// A template contains invalid syntax for the generic engine.
    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    /// The generic engine failed while rendering.
    #[error("Template render error: {0}")]
    TemplateRender(String),

    /// A required template source file was not found.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PagewrightError {
    /// Creates a [`PagewrightError::MalformedDirective`].
    pub fn malformed(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDirective {
            directive: directive.into(),
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest` -> 400
    /// - `NotFound` -> 404
    /// - `Upstream` -> 502
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Upstream(_) => 502,
            Self::MalformedDirective { .. }
            | Self::CyclicInclude { .. }
            | Self::TooManyDirectives { .. }
            | Self::TemplateSyntax(_)
            | Self::TemplateRender(_)
            | Self::TemplateDoesNotExist(_)
            | Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Io(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PagewrightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A convenience type alias for `Result<T, PagewrightError>`.
pub type PagewrightResult<T> = Result<T, PagewrightError>;
