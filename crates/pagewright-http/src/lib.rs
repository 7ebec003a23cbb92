//! # pagewright-http
//!
//! HTTP-facing building blocks for pagewright:
//!
//! - [`urls`] - Ordered route matching with typed wildcard segments
//! - [`params`] - Query parameters forwarded from the inbound request
//! - [`client`] - The remote content API trait and its `reqwest` implementation
//! - [`memory`] - An in-memory content API for tests and offline rendering

pub mod client;
pub mod memory;
pub mod params;
pub mod urls;

pub use client::{ContentApi, HttpContentApi, PageData, QueryParams};
pub use memory::{ApiCall, InMemoryContentApi};
pub use params::ForwardedParams;
pub use urls::matcher::{match_path, MatchResult};
pub use urls::pattern::RoutePattern;
