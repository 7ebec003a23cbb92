//! Route matching.
//!
//! This module decides which template fragment answers a request path:
//!
//! - [`conditions`]: Typed wildcard conditions (`num`, `slug`)
//! - [`pattern`]: Route patterns made of literal and wildcard segments
//! - [`matcher`]: Path normalization and first-match-wins resolution
//!
//! # Examples
//!
//! ```
//! use pagewright_http::urls::matcher::match_path;
//! use pagewright_http::urls::pattern::RoutePattern;
//!
//! let patterns = vec![
//!     RoutePattern::parse("/blog/:slug!slug").unwrap(),
//!     RoutePattern::parse("/blog/:id!num").unwrap(),
//! ];
//!
//! let m = match_path("/blog/42", &patterns);
//! assert!(m.matched);
//! assert_eq!(m.index, Some(1));
//! assert_eq!(m.bindings.get("id").unwrap(), "42");
//! ```

pub mod conditions;
pub mod matcher;
pub mod pattern;
