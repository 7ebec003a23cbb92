//! Navigation injection.
//!
//! `<site:navigation navigationId="mainNav" template="nav" />` is replaced by
//! the `nav` block expanded against a navigation context:
//!
//! ```json
//! {"website": {...}, "active": false, "folderActive": false,
//!  "items": [{"active": false, "folderActive": false, "collection": {...}}, ...]}
//! ```
//!
//! Items come from the site-layout entry whose `identifier` is the
//! navigation id. Links carrying a `collectionId` are resolved against the
//! collections dictionary; any other link passes through unchanged.

use serde_json::{json, Map, Value};

use pagewright_core::PagewrightResult;

use crate::blocks::{self, BlockSource};
use crate::directive::{find_tags, NAVIGATION_TAG};
use crate::engine::Engine;
use crate::html::diagnostic_comment;

/// Builds the context a navigation template is expanded against.
pub fn navigation_context(
    navigation_id: &str,
    page_json: &Value,
    site_layout: &Value,
    collections: &Value,
) -> Value {
    let links = layout_entries(site_layout)
        .iter()
        .find(|entry| entry.get("identifier").and_then(Value::as_str) == Some(navigation_id))
        .and_then(|entry| entry.get("links"))
        .and_then(Value::as_array);

    if links.is_none() {
        tracing::warn!(navigation_id, "navigation not found in site layout");
    }

    let items: Vec<Value> = links
        .into_iter()
        .flatten()
        .map(|link| resolve_link(link, collections))
        .collect();

    json!({
        "website": page_json.get("website").cloned().unwrap_or(Value::Null),
        "active": false,
        "folderActive": false,
        "items": items,
    })
}

fn layout_entries(site_layout: &Value) -> &[Value] {
    site_layout
        .get("layout")
        .unwrap_or(site_layout)
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn resolve_link(link: &Value, collections: &Value) -> Value {
    let Some(id) = link.get("collectionId").and_then(Value::as_str) else {
        return link.clone();
    };
    match find_collection(collections, id) {
        Some(collection) => json!({
            "active": false,
            "folderActive": false,
            "collection": collection,
        }),
        None => {
            tracing::debug!(collection_id = id, "navigation link to unknown collection");
            link.clone()
        }
    }
}

/// Linear lookup of a collection by id.
///
/// The dictionary is an object keyed by id (optionally nested under
/// `collections`), or an array of objects carrying an `id`.
fn find_collection(collections: &Value, id: &str) -> Option<Value> {
    let dictionary = collections.get("collections").unwrap_or(collections);
    match dictionary {
        Value::Object(map) => find_in_map(map, id),
        Value::Array(list) => list
            .iter()
            .find(|c| c.get("id").and_then(Value::as_str) == Some(id))
            .cloned(),
        _ => None,
    }
}

fn find_in_map(map: &Map<String, Value>, id: &str) -> Option<Value> {
    map.iter().find(|(key, _)| key.as_str() == id).map(|(_, v)| v.clone())
}

/// Replaces navigation directives with their rendered templates.
pub struct NavigationInjector<'a> {
    engine: &'a Engine,
    blocks: &'a dyn BlockSource,
    max_include_depth: usize,
}

impl<'a> NavigationInjector<'a> {
    /// Creates an injector loading templates from `blocks`.
    pub const fn new(engine: &'a Engine, blocks: &'a dyn BlockSource, max_include_depth: usize) -> Self {
        Self {
            engine,
            blocks,
            max_include_depth,
        }
    }

    /// Substitutes every navigation directive in `text`.
    ///
    /// A missing template degrades to a diagnostic comment.
    ///
    /// # Errors
    ///
    /// Fails on a malformed directive or when a template fails to expand.
    pub fn inject(
        &self,
        text: &str,
        page_json: &Value,
        site_layout: &Value,
        collections: &Value,
    ) -> PagewrightResult<String> {
        let tags = find_tags(text, NAVIGATION_TAG)?;
        if tags.is_empty() {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for tag in &tags {
            out.push_str(&text[last..tag.range.start]);
            last = tag.range.end;

            let navigation_id = tag.require("navigationId")?;
            let template = tag.require("template")?;

            let Some(source) = self.blocks.block(template)? else {
                tracing::warn!(template, "navigation template not found");
                out.push_str(&diagnostic_comment(&format!(
                    "missing navigation template '{template}'"
                )));
                continue;
            };

            let source = blocks::expand(&source, self.blocks, self.max_include_depth)?;
            let context = navigation_context(navigation_id, page_json, site_layout, collections);
            out.push_str(&self.engine.render(&source, &context)?);
        }
        out.push_str(&text[last..]);

        tracing::debug!(count = tags.len(), "navigation injected");
        Ok(out)
    }
}
