//! An in-memory [`ContentApi`] serving canned payloads.
//!
//! Used by tests and by offline rendering. Every call is recorded in order so
//! callers can assert on sequencing.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use pagewright_core::{PagewrightError, PagewrightResult};

use crate::client::{ContentApi, PageData, QueryParams};
use crate::params::ForwardedParams;
use crate::urls::matcher::normalize_path;

/// One recorded call against an [`InMemoryContentApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `site_layout()`
    SiteLayout,
    /// `collections()`
    Collections,
    /// `query(collection, params)`
    Query {
        /// The concrete collection identifier.
        collection: String,
        /// The query parameters as sent.
        params: QueryParams,
    },
    /// `block_field(id)`
    BlockField(String),
    /// `page(path, params)`
    Page(String),
}

/// A [`ContentApi`] backed by maps.
///
/// # Examples
///
/// ```
/// use pagewright_http::InMemoryContentApi;
/// use serde_json::json;
///
/// let api = InMemoryContentApi::new().with_query("blog", json!({"items": []}));
/// assert!(api.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryContentApi {
    site_layout: Value,
    collections: Value,
    queries: HashMap<String, Value>,
    blocks: HashMap<String, Value>,
    pages: HashMap<String, PageData>,
    failing: HashSet<String>,
    calls: Mutex<Vec<ApiCall>>,
}

impl InMemoryContentApi {
    /// Creates an API with no content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the site layout payload.
    #[must_use]
    pub fn with_site_layout(mut self, layout: Value) -> Self {
        self.site_layout = layout;
        self
    }

    /// Sets the collections payload.
    #[must_use]
    pub fn with_collections(mut self, collections: Value) -> Self {
        self.collections = collections;
        self
    }

    /// Sets the result of querying `collection`.
    #[must_use]
    pub fn with_query(mut self, collection: &str, result: Value) -> Self {
        self.queries.insert(collection.to_string(), result);
        self
    }

    /// Sets the payload of a block field.
    #[must_use]
    pub fn with_block_field(mut self, id: &str, payload: Value) -> Self {
        self.blocks.insert(id.to_string(), payload);
        self
    }

    /// Sets the page served at `path`.
    #[must_use]
    pub fn with_page(mut self, path: &str, json: Value, html: &str) -> Self {
        self.pages.insert(
            normalize_path(path),
            PageData {
                json,
                html: html.to_string(),
            },
        );
        self
    }

    /// Makes every call for `target` fail with an upstream error.
    ///
    /// `target` is a collection id, a block id, a page path, or one of
    /// `"site_layout"` and `"collections"`.
    #[must_use]
    pub fn failing(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().clone()
    }

    /// Returns the collections queried so far, in order.
    pub fn queried_collections(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                ApiCall::Query { collection, .. } => Some(collection.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ApiCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ApiCall, target: &str) -> PagewrightResult<()> {
        self.lock().push(call);
        if self.failing.contains(target) {
            return Err(PagewrightError::Upstream(format!(
                "simulated failure for '{target}'"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentApi for InMemoryContentApi {
    async fn site_layout(&self) -> PagewrightResult<Value> {
        self.record(ApiCall::SiteLayout, "site_layout")?;
        Ok(self.site_layout.clone())
    }

    async fn collections(&self) -> PagewrightResult<Value> {
        self.record(ApiCall::Collections, "collections")?;
        Ok(self.collections.clone())
    }

    async fn query(&self, collection: &str, params: &QueryParams) -> PagewrightResult<Value> {
        self.record(
            ApiCall::Query {
                collection: collection.to_string(),
                params: params.clone(),
            },
            collection,
        )?;
        self.queries
            .get(collection)
            .cloned()
            .ok_or_else(|| PagewrightError::NotFound(format!("collection '{collection}'")))
    }

    async fn block_field(&self, id: &str) -> PagewrightResult<Option<Value>> {
        self.record(ApiCall::BlockField(id.to_string()), id)?;
        Ok(self.blocks.get(id).cloned())
    }

    async fn page(&self, path: &str, _params: &ForwardedParams) -> PagewrightResult<PageData> {
        let key = normalize_path(path);
        self.record(ApiCall::Page(key.clone()), &key)?;
        self.pages
            .get(&key)
            .cloned()
            .ok_or_else(|| PagewrightError::NotFound(path.to_string()))
    }
}
