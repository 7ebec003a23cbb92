//! The remote content API.
//!
//! [`ContentApi`] is the seam between the render pipeline and the remote
//! content platform. [`HttpContentApi`] talks to the platform over HTTP with
//! `reqwest`; [`InMemoryContentApi`](crate::memory::InMemoryContentApi) serves
//! canned payloads for tests.
//!
//! Every failure is surfaced as a [`PagewrightError`]; a request never hangs
//! past the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pagewright_core::{PagewrightError, PagewrightResult, Settings};

use crate::params::ForwardedParams;

/// User agent sent with every remote request.
pub const USER_AGENT: &str = concat!("pagewright/", env!("CARGO_PKG_VERSION"));

/// Path of the site-layout endpoint.
pub const SITE_LAYOUT_PATH: &str = "/api/commondata/GetSiteLayout";
/// Path of the collections endpoint.
pub const COLLECTIONS_PATH: &str = "/api/commondata/GetCollections";
/// Path prefix of the block-field endpoint.
pub const BLOCK_FIELDS_PATH: &str = "/api/block-fields";

/// JSON and HTML representations of one page on the remote site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData {
    /// The page content JSON.
    pub json: Value,
    /// The rendered HTML of the live page.
    pub html: String,
}

/// Parameters of one collection query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Restrict to items with this tag.
    pub tag: Option<String>,
    /// Restrict to items in this category.
    pub category: Option<String>,
    /// Shared site password.
    pub password: Option<String>,
}

impl QueryParams {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![("format", "json")];
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category));
        }
        if let Some(password) = &self.password {
            pairs.push(("password", password));
        }
        pairs
    }
}

/// Read access to the remote content platform.
///
/// Implementations must be `Send + Sync`; the pipeline calls them one at a
/// time per request, never concurrently.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetches the site layout (navigation structures).
    async fn site_layout(&self) -> PagewrightResult<Value>;

    /// Fetches every collection keyed by collection id.
    async fn collections(&self) -> PagewrightResult<Value>;

    /// Fetches the JSON of one collection query.
    async fn query(&self, collection: &str, params: &QueryParams) -> PagewrightResult<Value>;

    /// Fetches a block field by id. `None` means the platform had no payload.
    async fn block_field(&self, id: &str) -> PagewrightResult<Option<Value>>;

    /// Fetches the JSON and HTML representations of a page.
    async fn page(&self, path: &str, params: &ForwardedParams) -> PagewrightResult<PageData>;
}

/// A [`ContentApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: reqwest::Client,
    site_url: String,
    password: Option<String>,
}

impl HttpContentApi {
    /// Creates a client for the site at `site_url`.
    pub fn new(
        site_url: &str,
        timeout: Duration,
        password: Option<String>,
    ) -> PagewrightResult<Self> {
        let site_url = site_url.trim_end_matches('/');
        if site_url.is_empty() {
            return Err(PagewrightError::Configuration(
                "site_url is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PagewrightError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            site_url: site_url.to_string(),
            password,
        })
    }

    /// Creates a client from the server settings.
    pub fn from_settings(settings: &Settings) -> PagewrightResult<Self> {
        Self::new(
            &settings.site_url,
            settings.request_timeout(),
            settings.password.clone(),
        )
    }

    /// Returns the absolute URL for a site-relative path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.site_url)
        } else {
            format!("{}/{path}", self.site_url)
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> PagewrightResult<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!(%url, "remote GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| PagewrightError::Upstream(format!("GET {url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PagewrightError::NotFound(url));
        }
        if !status.is_success() {
            return Err(PagewrightError::Upstream(format!("GET {url}: HTTP {status}")));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> PagewrightResult<Value> {
        let response = self.get(path, query).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| PagewrightError::Upstream(format!("Invalid JSON from {path}: {e}")))
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> PagewrightResult<String> {
        let response = self.get(path, query).await?;
        response
            .text()
            .await
            .map_err(|e| PagewrightError::Upstream(format!("Unreadable body from {path}: {e}")))
    }

    fn shared_password<'a>(&'a self, params: &'a ForwardedParams) -> Option<&'a str> {
        params.password().or(self.password.as_deref())
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn site_layout(&self) -> PagewrightResult<Value> {
        self.get_json(SITE_LAYOUT_PATH, &[]).await
    }

    async fn collections(&self) -> PagewrightResult<Value> {
        self.get_json(COLLECTIONS_PATH, &[]).await
    }

    async fn query(&self, collection: &str, params: &QueryParams) -> PagewrightResult<Value> {
        let mut params = params.clone();
        if params.password.is_none() {
            params.password.clone_from(&self.password);
        }
        let path = format!("/{}", collection.trim_matches('/'));
        self.get_json(&path, &params.pairs()).await
    }

    async fn block_field(&self, id: &str) -> PagewrightResult<Option<Value>> {
        let path = format!("{BLOCK_FIELDS_PATH}/{id}");
        match self.get_json(&path, &[]).await {
            Ok(Value::Null) | Err(PagewrightError::NotFound(_)) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(e),
        }
    }

    async fn page(&self, path: &str, params: &ForwardedParams) -> PagewrightResult<PageData> {
        let mut query: Vec<(&str, &str)> = params.cache_params().collect();
        if let Some(password) = self.shared_password(params) {
            query.push(("password", password));
        }

        let html = self.get_text(path, &query).await?;
        query.push(("format", "json"));
        let json = self.get_json(path, &query).await?;

        Ok(PageData { json, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_site_url() {
        let err = HttpContentApi::new("", Duration::from_secs(1), None).unwrap_err();
        assert!(matches!(err, PagewrightError::Configuration(_)));
    }

    #[test]
    fn test_url_joins_paths() {
        let api = HttpContentApi::new("https://example.site/", Duration::from_secs(1), None)
            .unwrap();
        assert_eq!(api.url("/blog"), "https://example.site/blog");
        assert_eq!(api.url("blog"), "https://example.site/blog");
    }

    #[test]
    fn test_query_pairs() {
        let params = QueryParams {
            tag: Some("news".into()),
            category: None,
            password: Some("pw".into()),
        };
        assert_eq!(
            params.pairs(),
            vec![("format", "json"), ("tag", "news"), ("password", "pw")]
        );
    }

    #[test]
    fn test_shared_password_prefers_request() {
        let api = HttpContentApi::new(
            "https://example.site",
            Duration::from_secs(1),
            Some("site".into()),
        )
        .unwrap();
        let params = ForwardedParams::new().with("password", "req");
        assert_eq!(api.shared_password(&params), Some("req"));
        assert_eq!(api.shared_password(&ForwardedParams::new()), Some("site"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_upstream_error() {
        let api = HttpContentApi::new("http://127.0.0.1:1", Duration::from_millis(500), None)
            .unwrap();
        let err = api.site_layout().await.unwrap_err();
        assert!(matches!(err, PagewrightError::Upstream(_)));
        assert_eq!(err.status_code(), 502);
    }
}
