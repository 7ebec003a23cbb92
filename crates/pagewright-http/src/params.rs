//! Query parameters forwarded from the inbound request.
//!
//! Only a fixed set of parameters is recognized; everything else in the
//! inbound query string is dropped. `format`, `password` and `nocache` steer
//! the server itself and never take part in cache keys.

use std::collections::BTreeMap;

/// Every query parameter the server forwards.
pub const RECOGNIZED: [&str; 6] = ["format", "category", "tag", "month", "password", "nocache"];

/// Parameters that steer the server and are excluded from cache keys.
const CONTROL: [&str; 3] = ["format", "password", "nocache"];

/// The recognized query parameters of one inbound request.
///
/// # Examples
///
/// ```
/// use pagewright_http::params::ForwardedParams;
///
/// let params = ForwardedParams::from_query(Some("tag=news&format=json&utm=x"));
/// assert!(params.wants_json());
/// assert_eq!(params.get("tag"), Some("news"));
/// assert_eq!(params.get("utm"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedParams {
    values: BTreeMap<String, String>,
}

impl ForwardedParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an inbound query string (without the leading `?`).
    ///
    /// When a parameter repeats, the last value wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::new();
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.insert(&key, &value);
            }
        }
        params
    }

    /// Sets a parameter. Unrecognized keys are ignored.
    pub fn insert(&mut self, key: &str, value: &str) {
        if RECOGNIZED.contains(&key) {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    /// Returns a builder-style copy with one more parameter.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns `true` if `format=json` was requested.
    pub fn wants_json(&self) -> bool {
        self.get("format") == Some("json")
    }

    /// Returns the shared site password, if one was supplied.
    pub fn password(&self) -> Option<&str> {
        self.get("password").filter(|p| !p.is_empty())
    }

    /// Returns `true` if the caller asked to bypass the cache.
    ///
    /// A bare `nocache`, `nocache=1` or `nocache=true` all count.
    pub fn nocache(&self) -> bool {
        self.get("nocache")
            .is_some_and(|v| !matches!(v, "0" | "false" | "no"))
    }

    /// Returns the parameters that take part in cache keys, sorted by name.
    pub fn cache_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(k, _)| !CONTROL.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns every parameter, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if no recognized parameter was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
