//! Typed wildcard conditions for route segments.
//!
//! A wildcard segment written `:name!cond` only matches path segments that
//! satisfy `cond`.
//!
//! | Name   | Regex                          |
//! |--------|--------------------------------|
//! | `num`  | `^[0-9]+$`                     |
//! | `slug` | `^[A-Za-z][A-Za-z0-9\-_.]*$`   |
//!
//! A wildcard without a condition accepts any non-empty segment.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use pagewright_core::{PagewrightError, PagewrightResult};

static NUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(Condition::Num.regex()).unwrap_or_else(|e| unreachable!("num regex: {e}"))
});

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(Condition::Slug.regex()).unwrap_or_else(|e| unreachable!("slug regex: {e}"))
});

/// The condition attached to a wildcard segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// No condition: any non-empty segment.
    Any,
    /// Digits only, no sign and no decimal point.
    Num,
    /// Starts with a letter, then letters, digits, `-`, `_` or `.`.
    Slug,
}

impl Condition {
    /// Looks up a condition by the name written after `!`.
    pub fn from_name(name: &str) -> PagewrightResult<Self> {
        match name {
            "num" => Ok(Self::Num),
            "slug" => Ok(Self::Slug),
            other => Err(PagewrightError::Configuration(format!(
                "Unknown route condition '!{other}' (expected '!num' or '!slug')"
            ))),
        }
    }

    /// Returns the anchored regex a segment must match.
    pub const fn regex(self) -> &'static str {
        match self {
            Self::Any => "^.+$",
            Self::Num => "^[0-9]+$",
            Self::Slug => r"^[A-Za-z][A-Za-z0-9\-_.]*$",
        }
    }

    /// Returns `true` if the path segment satisfies this condition.
    pub fn accepts(self, segment: &str) -> bool {
        match self {
            Self::Any => !segment.is_empty(),
            Self::Num => NUM_RE.is_match(segment),
            Self::Slug => SLUG_RE.is_match(segment),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Num => f.write_str("!num"),
            Self::Slug => f.write_str("!slug"),
        }
    }
}
