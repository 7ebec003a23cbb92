//! Per-request render state.
//!
//! A [`RenderContext`] is created when a request starts rendering and dropped
//! when it finishes. Every pipeline stage reads and writes only the context it
//! is handed, so overlapping requests never share fragment maps, guard
//! tokens or page chrome.

use std::collections::HashMap;

use serde_json::{Map, Value};

use pagewright_http::{ForwardedParams, PageData};

use crate::composer::{PageChrome, PageInfo};
use crate::loaders::FragmentMap;
use crate::script_guard::Guard;

/// Everything one render knows about its request.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// The request path as received.
    pub path: String,
    /// Forwarded query parameters.
    pub params: ForwardedParams,
    /// Route wildcard bindings.
    pub bindings: HashMap<String, String>,
    /// The fetched page.
    pub page: PageData,
    /// Facts read from the page JSON.
    pub info: PageInfo,
    /// Head and trailing elements of the live page.
    pub chrome: PageChrome,
    /// Fragments for the selected layout.
    pub fragments: FragmentMap,
    /// The fragment key answering this request.
    pub template_key: String,
    /// Scripts and remote text shielded from the engine.
    pub guard: Guard,
    /// Number of queries resolved so far.
    pub queries_resolved: usize,
}

impl RenderContext {
    /// Creates the context for a fetched page.
    pub fn new(path: impl Into<String>, params: ForwardedParams, page: PageData) -> Self {
        let info = PageInfo::from_json(&page.json);
        let chrome = PageChrome::from_html(&page.html);
        Self {
            path: path.into(),
            params,
            bindings: HashMap::new(),
            page,
            info,
            chrome,
            fragments: FragmentMap::default(),
            template_key: String::new(),
            guard: Guard::new(),
            queries_resolved: 0,
        }
    }

    /// The page's own body HTML, `mainContent` in the page JSON.
    pub fn main_content(&self) -> &str {
        self.page
            .json
            .get("mainContent")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The data the final engine pass expands against.
    ///
    /// The page JSON with route bindings added under `params`. A page JSON
    /// that is not an object is exposed as `page`.
    pub fn engine_data(&self) -> Value {
        let mut data = match &self.page.json {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("page".to_string(), other.clone());
                map
            }
        };

        let bindings: Map<String, Value> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        data.insert("params".to_string(), Value::Object(bindings));
        data.entry("website").or_insert(Value::Null);
        Value::Object(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_reads_page_facts() {
        let page = PageData {
            json: json!({"collection": {"id": "c", "typeName": "blog"}, "items": []}),
            html: "<html><head><meta name=\"x\"></head><body></body></html>".into(),
        };
        let ctx = RenderContext::new("/blog", ForwardedParams::new(), page);
        assert_eq!(ctx.info.template_key("default"), "blog.list");
        assert_eq!(ctx.chrome.headers, "<meta name=\"x\">");
        assert!(ctx.guard.is_empty());
        assert_eq!(ctx.main_content(), "");
    }

    #[test]
    fn test_main_content() {
        let page = PageData {
            json: json!({"mainContent": "<p>About us</p>"}),
            html: String::new(),
        };
        let ctx = RenderContext::new("/about", ForwardedParams::new(), page);
        assert_eq!(ctx.main_content(), "<p>About us</p>");
    }

    #[test]
    fn test_engine_data() {
        let page = PageData {
            json: json!({"website": {"siteTitle": "S"}, "title": "T"}),
            html: String::new(),
        };
        let mut ctx = RenderContext::new("/blog/x", ForwardedParams::new(), page);
        ctx.bindings.insert("slug".into(), "x".into());

        let data = ctx.engine_data();
        assert_eq!(data["title"], "T");
        assert_eq!(data["params"], json!({"slug": "x"}));
        assert_eq!(data["website"]["siteTitle"], "S");
    }

    #[test]
    fn test_engine_data_non_object() {
        let ctx = RenderContext::new("/", ForwardedParams::new(), PageData::default());
        let data = ctx.engine_data();
        assert_eq!(data["page"], Value::Null);
        assert_eq!(data["params"], json!({}));
        assert_eq!(data["website"], Value::Null);
    }
}
