//! Path normalization and ordered route matching.
//!
//! Patterns are tried in the order the caller supplies them and the first
//! full match wins; later patterns are never evaluated. A failed match is not
//! an error, it is a [`MatchResult`] with `matched == false`.

use std::collections::HashMap;

use super::pattern::{RoutePattern, Segment};

/// The outcome of matching a path against one or more patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Whether a pattern matched.
    pub matched: bool,
    /// The matching pattern.
    pub pattern: Option<RoutePattern>,
    /// Position of the matching pattern in the supplied list.
    pub index: Option<usize>,
    /// Wildcard values keyed by wildcard name.
    pub bindings: HashMap<String, String>,
}

impl MatchResult {
    /// A result for "nothing matched".
    pub fn no_match() -> Self {
        Self::default()
    }
}

/// Normalizes a request path or URL for matching.
///
/// Strips a `scheme://host` prefix, any `?query` or `#hash` suffix, and
/// leading/trailing slashes. An empty result normalizes to `/`.
/// Normalizing twice gives the same result as normalizing once.
///
/// # Examples
///
/// ```
/// use pagewright_http::urls::matcher::normalize_path;
///
/// assert_eq!(normalize_path("https://example.site/blog/post/?page=2#top"), "blog/post");
/// assert_eq!(normalize_path(""), "/");
/// assert_eq!(normalize_path("blog/post"), "blog/post");
/// ```
pub fn normalize_path(path: &str) -> String {
    // A stripped path can itself start with `scheme://`; repeat until stable.
    let mut current = normalize_once(path);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(path: &str) -> String {
    let without_host = match path.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => {
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        _ => path,
    };

    let without_suffix = without_host
        .find(['?', '#'])
        .map_or(without_host, |pos| &without_host[..pos]);

    let trimmed = without_suffix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_scheme(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Compares one pattern against a path.
pub fn compare(pattern: &RoutePattern, path: &str) -> MatchResult {
    compare_normalized(pattern, &normalize_path(path))
}

/// Matches a path against an ordered list of patterns; the first match wins.
pub fn match_path(path: &str, patterns: &[RoutePattern]) -> MatchResult {
    let normalized = normalize_path(path);
    for (index, pattern) in patterns.iter().enumerate() {
        let mut result = compare_normalized(pattern, &normalized);
        if result.matched {
            result.index = Some(index);
            tracing::debug!(path, pattern = %pattern, "route matched");
            return result;
        }
    }
    MatchResult::no_match()
}

fn compare_normalized(pattern: &RoutePattern, normalized: &str) -> MatchResult {
    if pattern.is_root() || normalized == "/" {
        return if pattern.is_root() && normalized == "/" {
            matched(pattern, HashMap::new())
        } else {
            MatchResult::no_match()
        };
    }

    let segments: Vec<&str> = normalized.split('/').collect();
    if segments.len() != pattern.len() {
        return MatchResult::no_match();
    }

    let mut bindings = HashMap::new();
    for (rule, segment) in pattern.segments().iter().zip(&segments) {
        if !rule.accepts(segment) {
            return MatchResult::no_match();
        }
        if let Segment::Wildcard { name, .. } = rule {
            bindings.insert(name.clone(), (*segment).to_string());
        }
    }

    matched(pattern, bindings)
}

fn matched(pattern: &RoutePattern, bindings: HashMap<String, String>) -> MatchResult {
    MatchResult {
        matched: true,
        pattern: Some(pattern.clone()),
        index: None,
        bindings,
    }
}
