//! Route pattern parsing.
//!
//! A [`RoutePattern`] is an ordered list of `/`-delimited segments. Each
//! segment is either a literal that must equal the path segment, or a named
//! wildcard `:name` with an optional typed condition (`:id!num`, `:slug!slug`).

use std::fmt;

use pagewright_core::{PagewrightError, PagewrightResult};

use super::conditions::Condition;
use super::matcher::normalize_path;

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Binds the path segment under `name` if it satisfies `condition`.
    Wildcard {
        /// The binding name, without the condition suffix.
        name: String,
        /// The condition the segment must satisfy.
        condition: Condition,
    },
}

impl Segment {
    /// Returns `true` if this segment accepts the given path segment.
    pub fn accepts(&self, segment: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == segment,
            Self::Wildcard { condition, .. } => condition.accepts(segment),
        }
    }
}

/// A parsed route pattern such as `/blog/:slug!slug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// The pattern as written.
    source: String,
    /// Segments of the normalized pattern; empty for the root pattern `/`.
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parses a route pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagewright_http::urls::pattern::RoutePattern;
    ///
    /// let p = RoutePattern::parse("/events/:year!num/:name").unwrap();
    /// assert_eq!(p.len(), 3);
    /// assert!(!p.is_root());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty wildcard name or an unknown
    /// condition.
    pub fn parse(source: &str) -> PagewrightResult<Self> {
        let normalized = normalize_path(source);
        if normalized == "/" {
            return Ok(Self {
                source: source.to_string(),
                segments: Vec::new(),
            });
        }

        let segments = normalized
            .split('/')
            .map(|raw| parse_segment(source, raw))
            .collect::<PagewrightResult<Vec<_>>>()?;

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Returns the pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of segments (zero for the root pattern).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root pattern `/`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` for the root pattern `/`.
    pub fn is_root(&self) -> bool {
        self.is_empty()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segment(source: &str, raw: &str) -> PagewrightResult<Segment> {
    let Some(param) = raw.strip_prefix(':') else {
        return Ok(Segment::Literal(raw.to_string()));
    };

    let (name, condition) = match param.split_once('!') {
        Some((name, cond)) => (name, Condition::from_name(cond)?),
        None => (param, Condition::Any),
    };

    if name.is_empty() {
        return Err(PagewrightError::Configuration(format!(
            "Wildcard without a name in route '{source}'"
        )));
    }

    Ok(Segment::Wildcard {
        name: name.to_string(),
        condition,
    })
}
