//! Query directive resolution.
//!
//! `<site:query collection="…">body</site:query>` directives are resolved
//! strictly one at a time, in document order. For each one the collection
//! is fetched (or read from the disk cache), post-filtered, and the body is
//! expanded against the result. Query directives the output emits are
//! resolved the same way, in order, before the output is sealed in the
//! render's [`Guard`] and spliced back in place of the body. Sealed output
//! holds remote item data, so the final engine pass never expands it again.

use serde_json::Value;

use pagewright_core::{DiskCache, PagewrightError, PagewrightResult};
use pagewright_http::{ContentApi, ForwardedParams, QueryParams};

use crate::directive::{next_query, QueryDirective};
use crate::engine::Engine;
use crate::fetch::read_through;
use crate::script_guard::Guard;

/// Builds the cache key of one query.
///
/// The key is made from the collection id, every forwarded parameter that
/// takes part in cache keys, and the directive's own `tag` and `category`.
///
/// # Examples
///
/// ```
/// use pagewright_http::ForwardedParams;
/// use pagewright_template::query::query_slug;
///
/// let params = ForwardedParams::from_query(Some("month=03-2024&nocache=1"));
/// assert_eq!(query_slug("blog", &params, Some("news"), None), "query-blog&month=03-2024&tag=news");
/// ```
pub fn query_slug(
    collection: &str,
    params: &ForwardedParams,
    tag: Option<&str>,
    category: Option<&str>,
) -> String {
    let mut key = format!("query-{collection}");
    for (name, value) in params.cache_params() {
        push_key_param(&mut key, name, value);
    }
    if let Some(tag) = tag {
        push_key_param(&mut key, "tag", tag);
    }
    if let Some(category) = category {
        push_key_param(&mut key, "category", category);
    }
    key
}

/// Appends `&name=value` to a cache key, escaping `%` and `&` in the value.
pub(crate) fn push_key_param(key: &mut String, name: &str, value: &str) {
    key.push('&');
    key.push_str(name);
    key.push('=');
    for ch in value.chars() {
        match ch {
            '%' => key.push_str("%25"),
            '&' => key.push_str("%26"),
            _ => key.push(ch),
        }
    }
}

/// Keeps only items whose `starred` flag is `true`, in order.
pub fn keep_featured(items: &mut Vec<Value>) {
    items.retain(|item| item.get("starred").and_then(Value::as_bool) == Some(true));
}

/// Keeps the last `n` items, in order. Nothing is removed when `n` is at
/// least the length.
pub fn keep_last(items: &mut Vec<Value>, n: usize) {
    if n < items.len() {
        items.drain(..items.len() - n);
    }
}

/// Applies the `featured` and then the `limit` post-filter to a query result.
///
/// The item list is the result's `items` array, or the result itself when it
/// is an array.
pub fn apply_filters(result: &mut Value, featured: bool, limit: Option<usize>) {
    let items = match result {
        Value::Array(items) => items,
        Value::Object(map) => match map.get_mut("items") {
            Some(Value::Array(items)) => items,
            _ => return,
        },
        _ => return,
    };

    if featured {
        keep_featured(items);
    }
    if let Some(n) = limit {
        keep_last(items, n);
    }
}

/// Resolves query directives against the remote API and the disk cache.
pub struct QueryResolver<'a> {
    api: &'a dyn ContentApi,
    cache: &'a DiskCache,
    engine: &'a Engine,
    params: &'a ForwardedParams,
    password: Option<&'a str>,
    max_directives: usize,
}

impl<'a> QueryResolver<'a> {
    /// Creates a resolver for one request.
    pub const fn new(
        api: &'a dyn ContentApi,
        cache: &'a DiskCache,
        engine: &'a Engine,
        params: &'a ForwardedParams,
    ) -> Self {
        Self {
            api,
            cache,
            engine,
            params,
            password: None,
            max_directives: usize::MAX,
        }
    }

    /// Sets the shared site password sent when the request carries none.
    #[must_use]
    pub const fn with_password(mut self, password: Option<&'a str>) -> Self {
        self.password = password;
        self
    }

    /// Caps the number of queries one render may resolve.
    #[must_use]
    pub const fn with_limit(mut self, max_directives: usize) -> Self {
        self.max_directives = max_directives;
        self
    }

    /// Resolves every query directive in `text`, one at a time.
    ///
    /// Each query's output is sealed in `guard`. Returns the text and the
    /// number of queries resolved, nested ones included.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed directive, remote failure or expansion
    /// error, and with `TooManyDirectives` once the cap is exceeded.
    pub async fn resolve_all(
        &self,
        mut text: String,
        page_json: &Value,
        guard: &mut Guard,
    ) -> PagewrightResult<(String, usize)> {
        let mut from = 0;
        let mut resolved = 0;

        while let Some(query) = next_query(&text, from)? {
            self.check_limit(resolved)?;
            let mut output = self.resolve_one(&query, &text, page_json).await?;
            resolved += 1;

            let mut inner_from = 0;
            while let Some(inner) = next_query(&output, inner_from)? {
                self.check_limit(resolved)?;
                let inner_output = self.resolve_one(&inner, &output, page_json).await?;
                output.replace_range(inner.body.clone(), &inner_output);
                inner_from = inner.body.start;
                resolved += 1;
            }

            let token = guard.seal(&output);
            text.replace_range(query.body.clone(), &token);
            from = query.body.start + token.len();
        }

        if resolved > 0 {
            tracing::debug!(resolved, "queries resolved");
        }
        Ok((text, resolved))
    }

    fn check_limit(&self, resolved: usize) -> PagewrightResult<()> {
        if resolved == self.max_directives {
            return Err(PagewrightError::TooManyDirectives {
                kind: "query",
                limit: self.max_directives,
            });
        }
        Ok(())
    }

    async fn resolve_one(
        &self,
        query: &QueryDirective,
        text: &str,
        page_json: &Value,
    ) -> PagewrightResult<String> {
        let raw = query.require("collection")?;
        let collection = if Engine::is_expression(raw) {
            self.engine.render(raw, page_json)?.trim().to_string()
        } else {
            raw.to_string()
        };
        if collection.is_empty() {
            return Err(PagewrightError::malformed(
                &query.source,
                "collection expression expanded to nothing",
            ));
        }

        let limit = query
            .attrs
            .get("limit")
            .map(|n| {
                n.trim().parse::<usize>().map_err(|_| {
                    PagewrightError::malformed(&query.source, format!("invalid limit `{n}`"))
                })
            })
            .transpose()?;

        let tag = query.attrs.get("tag");
        let category = query.attrs.get("category");
        let slug = query_slug(&collection, self.params, tag, category);
        let request = QueryParams {
            tag: tag.or_else(|| self.params.get("tag")).map(str::to_string),
            category: category
                .or_else(|| self.params.get("category"))
                .map(str::to_string),
            password: self
                .params
                .password()
                .or(self.password)
                .map(str::to_string),
        };

        tracing::debug!(collection = %collection, slug = %slug, "resolving query");
        let mut result = read_through(self.cache, &slug, self.params.nocache(), async {
            self.api.query(&collection, &request).await
        })
        .await?;

        apply_filters(&mut result, query.attrs.flag("featured"), limit);
        self.engine.render(query.body_template(text), &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_http::InMemoryContentApi;
    use proptest::prelude::*;
    use serde_json::json;

    impl QueryResolver<'_> {
        async fn resolve_restored(
            &self,
            text: String,
            page_json: &Value,
        ) -> PagewrightResult<(String, usize)> {
            let mut guard = Guard::new();
            let (out, resolved) = self.resolve_all(text, page_json, &mut guard).await?;
            Ok((guard.restore(&out), resolved))
        }
    }

    fn numbered(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": i})).collect()
    }

    #[test]
    fn test_keep_last() {
        let mut items = numbered(5);
        keep_last(&mut items, 2);
        assert_eq!(items, vec![json!({"id": 3}), json!({"id": 4})]);

        let mut items = numbered(2);
        keep_last(&mut items, 9);
        assert_eq!(items.len(), 2);

        let mut items = numbered(3);
        keep_last(&mut items, 0);
        assert!(items.is_empty());
    }

    #[test]
    fn test_featured_then_limit() {
        let mut result = json!({"items": [
            {"id": 1, "starred": true},
            {"id": 2},
            {"id": 3, "starred": true},
            {"id": 4, "starred": true},
        ]});
        apply_filters(&mut result, true, Some(2));
        assert_eq!(result["items"], json!([{"id": 3, "starred": true}, {"id": 4, "starred": true}]));
    }

    #[test]
    fn test_filters_on_bare_array() {
        let mut result = json!([1, 2, 3]);
        apply_filters(&mut result, false, Some(1));
        assert_eq!(result, json!([3]));
    }

    #[test]
    fn test_query_slug_ignores_control_params() {
        let params = ForwardedParams::from_query(Some("format=json&password=x&category=Food"));
        assert_eq!(query_slug("blog", &params, None, None), "query-blog&category=Food");
    }

    #[test]
    fn test_query_slug_values_cannot_forge_params() {
        let forged = ForwardedParams::from_query(Some("category=x%26tag%3Dy"));
        let split = ForwardedParams::from_query(Some("category=x&tag=y"));
        assert_ne!(
            query_slug("blog", &forged, None, None),
            query_slug("blog", &split, None, None)
        );
    }

    #[tokio::test]
    async fn test_resolve_single_query() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().with_query(
            "blog",
            json!({"items": [{"title": "a"}, {"title": "b", "starred": true}]}),
        );

        let text = r#"<div><site:query collection="blog" featured>{% for i in items %}{{ i.title }}{% endfor %}</site:query></div>"#;
        let (out, count) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(text.to_string(), &json!({}))
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            out,
            r#"<div><site:query collection="blog" featured>b</site:query></div>"#
        );
        assert!(cache.exists("query-blog", "json").await);
    }

    #[tokio::test]
    async fn test_output_is_sealed() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().with_query(
            "blog",
            json!({"items": [{"body": "Write {{ name }} in a {% block %}"}]}),
        );

        let text = r#"<site:query collection="blog">{% for i in items %}{{ i.body }}{% endfor %}</site:query>"#;
        let mut guard = Guard::new();
        let (out, _) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_all(text.to_string(), &json!({}), &mut guard)
            .await
            .unwrap();

        assert!(!out.contains("{{"));
        assert_eq!(guard.len(), 1);
        let expanded = engine.render(&out, &json!({})).unwrap();
        assert_eq!(
            guard.restore(&expanded),
            r#"<site:query collection="blog">Write {{ name }} in a {% block %}</site:query>"#
        );
    }

    #[tokio::test]
    async fn test_emitted_queries_resolve_before_sealing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new()
            .with_query("blog", json!({"items": [{"related": "events"}]}))
            .with_query("events", json!({"items": [{"name": "x"}]}));

        let text = concat!(
            r#"<site:query collection="blog">{% for item in items %}"#,
            r#"<site:query collection="{{ item.related }}">{% raw %}{{ items.0.name }}{% endraw %}</site:query>"#,
            r#"{% endfor %}</site:query>|"#,
        );
        let mut guard = Guard::new();
        let (out, count) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_all(text.to_string(), &json!({}), &mut guard)
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(guard.len(), 1);
        assert_eq!(
            guard.restore(&out),
            r#"<site:query collection="blog"><site:query collection="events">x</site:query></site:query>|"#
        );
    }

    #[tokio::test]
    async fn test_collection_expression_uses_page_json() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().with_query("events", json!({"items": [1, 2]}));

        let text = r#"<site:query collection="{{ collection.urlId }}">{{ items | length }}</site:query>"#;
        let (out, _) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(text.to_string(), &json!({"collection": {"urlId": "events"}}))
            .await
            .unwrap();
        assert!(out.contains(">2</site:query>"));
        assert_eq!(api.queried_collections(), vec!["events"]);
    }

    #[tokio::test]
    async fn test_cached_result_skips_api_unless_nocache() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        cache.write_json("query-blog", &json!({"items": ["cached"]})).await.unwrap();
        let engine = Engine::new();
        let api = InMemoryContentApi::new().with_query("blog", json!({"items": ["fresh"]}));
        let text = r#"<site:query collection="blog">{{ items.0 }}</site:query>"#;

        let params = ForwardedParams::new();
        let (out, _) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(text.to_string(), &json!({}))
            .await
            .unwrap();
        assert!(out.contains(">cached<"));
        assert!(api.calls().is_empty());

        let params = ForwardedParams::from_query(Some("nocache=1"));
        let (out, _) = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(text.to_string(), &json!({}))
            .await
            .unwrap();
        assert!(out.contains(">fresh<"));
        assert_eq!(
            cache.read_json("query-blog").await.unwrap(),
            Some(json!({"items": ["fresh"]}))
        );
    }

    #[tokio::test]
    async fn test_password_forwarded() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().with_query("blog", json!({}));

        QueryResolver::new(&api, &cache, &engine, &params)
            .with_password(Some("site-pw"))
            .resolve_restored(
                r#"<site:query collection="blog" tag="news"></site:query>"#.to_string(),
                &json!({}),
            )
            .await
            .unwrap();

        match &api.calls()[0] {
            pagewright_http::ApiCall::Query { params, .. } => {
                assert_eq!(params.password.as_deref(), Some("site-pw"));
                assert_eq!(params.tag.as_deref(), Some("news"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_limit_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().with_query("blog", json!({"items": []}));

        let err = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(
                r#"<site:query collection="blog" limit="many">x</site:query>"#.to_string(),
                &json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PagewrightError::MalformedDirective { .. }));
    }

    #[tokio::test]
    async fn test_runaway_queries_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        // Each expansion emits another query with the same body.
        let api = InMemoryContentApi::new().with_query(
            "loop",
            json!({"next": r#"<site:query collection="loop">{{ next }}</site:query>"#}),
        );

        let text = r#"<site:query collection="loop">{{ next }}</site:query>"#;
        let err = QueryResolver::new(&api, &cache, &engine, &params)
            .with_limit(3)
            .resolve_restored(text.to_string(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PagewrightError::TooManyDirectives { kind: "query", limit: 3 }
        ));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let engine = Engine::new();
        let params = ForwardedParams::new();
        let api = InMemoryContentApi::new().failing("blog");

        let err = QueryResolver::new(&api, &cache, &engine, &params)
            .resolve_restored(
                r#"<site:query collection="blog">x</site:query>"#.to_string(),
                &json!({}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    proptest! {
        #[test]
        fn limit_keeps_final_n(len in 0usize..20, n in 0usize..25) {
            let original = numbered(len);
            let mut items = original.clone();
            keep_last(&mut items, n);
            if n <= len {
                prop_assert_eq!(items.len(), n);
                prop_assert_eq!(&items[..], &original[len - n..]);
            } else {
                prop_assert_eq!(items, original);
            }
        }

        #[test]
        fn featured_keeps_exactly_starred(flags in proptest::collection::vec(any::<Option<bool>>(), 0..20)) {
            let items: Vec<Value> = flags
                .iter()
                .enumerate()
                .map(|(i, f)| match f {
                    Some(b) => json!({"id": i, "starred": b}),
                    None => json!({"id": i}),
                })
                .collect();
            let mut filtered = items.clone();
            keep_featured(&mut filtered);
            let expected: Vec<Value> = items
                .into_iter()
                .zip(&flags)
                .filter(|(_, f)| **f == Some(true))
                .map(|(v, _)| v)
                .collect();
            prop_assert_eq!(filtered, expected);
        }
    }
}
