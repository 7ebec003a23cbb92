//! Block-field rendering.
//!
//! `<site:block-field id="…" columns="12" locked-layout />` is replaced by a
//! grid built from the block field's JSON payload:
//!
//! ```json
//! {"columns": 12, "rows": [{"columns": [{"span": 6, "blocks": [{"type": "html", "value": {...}}]}]}]}
//! ```
//!
//! Payloads come from the disk cache (`block-<id>.json`) or the remote API.
//! Directives are processed one at a time so cache writes never race within
//! a request.

use serde::Deserialize;
use serde_json::Value;

use pagewright_core::{DiskCache, PagewrightError, PagewrightResult};
use pagewright_http::ContentApi;

use crate::block_kinds::BlockKind;
use crate::directive::{find_tags, BLOCK_FIELD_TAG};
use crate::fetch::persist;
use crate::html::escape_html;

/// Units in a full-width row.
pub const GRID_UNITS: u32 = 12;

/// A block field payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFieldDescriptor {
    /// The block field id.
    #[serde(default)]
    pub id: String,
    /// Layout columns the spans are measured in.
    #[serde(default)]
    pub columns: Option<u32>,
    /// Whether editors may change the layout.
    #[serde(default)]
    pub locked_layout: bool,
    /// Grid rows, top to bottom.
    #[serde(default)]
    pub rows: Vec<GridRow>,
}

/// One grid row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridRow {
    /// Columns, left to right.
    #[serde(default)]
    pub columns: Vec<GridColumn>,
}

/// One grid column.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridColumn {
    /// Width in layout columns. Defaults to an even share of the row.
    #[serde(default)]
    pub span: Option<u32>,
    /// Blocks, top to bottom, as declared.
    #[serde(default)]
    pub blocks: Vec<Value>,
}

/// Returns the 12-unit grid width of a column spanning `span` of `columns`.
///
/// # Examples
///
/// ```
/// use pagewright_template::block_field::column_units;
///
/// assert_eq!(column_units(4, 8), 6);
/// assert_eq!(column_units(1, 24), 1);
/// assert_eq!(column_units(30, 12), 12);
/// ```
pub fn column_units(span: u32, columns: u32) -> u32 {
    let columns = columns.max(1);
    (span.saturating_mul(GRID_UNITS) / columns).clamp(1, GRID_UNITS)
}

/// Renders one typed block wrapped in its container.
///
/// Returns `None` for unknown types and for blocks with nothing to show.
pub fn render_block(block: &Value) -> Option<String> {
    let declared = block.get("type").and_then(Value::as_str)?;
    let Some(kind) = BlockKind::from_type(declared) else {
        tracing::debug!(block_type = declared, "skipping unknown block type");
        return None;
    };

    let value = block.get("value").unwrap_or(block);
    let html = kind.render(value);
    if html.is_empty() {
        return None;
    }

    let json = serde_json::to_string(block).ok()?;
    Some(format!(
        "<div class=\"block block-{}\" data-block-json=\"{}\">{html}</div>",
        kind.name(),
        escape_html(&json)
    ))
}

/// Renders a block field grid.
pub fn render_grid(descriptor: &BlockFieldDescriptor, columns: u32, locked: bool) -> String {
    let mut out = format!(
        "<div class=\"block-field\" data-block-field-id=\"{}\" data-columns=\"{columns}\"{}>",
        escape_html(&descriptor.id),
        if locked { " data-locked-layout=\"true\"" } else { "" },
    );

    for row in &descriptor.rows {
        out.push_str("<div class=\"row\">");
        let even_share = columns / u32::try_from(row.columns.len().max(1)).unwrap_or(u32::MAX);
        for column in &row.columns {
            let units = column_units(column.span.unwrap_or(even_share), columns);
            out.push_str(&format!("<div class=\"col col-{units}\">"));
            for block in &column.blocks {
                if let Some(html) = render_block(block) {
                    out.push_str(&html);
                }
            }
            out.push_str("</div>");
        }
        out.push_str("</div>");
    }

    out.push_str("</div>");
    out
}

/// Replaces block-field directives with rendered grids.
pub struct BlockFieldRenderer<'a> {
    api: &'a dyn ContentApi,
    cache: &'a DiskCache,
    bypass_cache: bool,
}

impl<'a> BlockFieldRenderer<'a> {
    /// Creates a renderer. With `bypass_cache` set, payloads are always fetched.
    pub const fn new(api: &'a dyn ContentApi, cache: &'a DiskCache, bypass_cache: bool) -> Self {
        Self {
            api,
            cache,
            bypass_cache,
        }
    }

    /// Substitutes every block-field directive in `text`, one at a time.
    ///
    /// Text without directives is returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails on a malformed directive, a remote failure, or a payload that is
    /// not a block field.
    pub async fn render(&self, text: String) -> PagewrightResult<String> {
        let tags = find_tags(&text, BLOCK_FIELD_TAG)?;
        if tags.is_empty() {
            return Ok(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for tag in &tags {
            out.push_str(&text[last..tag.range.start]);
            last = tag.range.end;

            let id = tag.require("id")?;
            let columns = match tag.attrs.get("columns") {
                Some(n) => n.trim().parse::<u32>().map_err(|_| {
                    PagewrightError::malformed(
                        &tag.source,
                        format!("invalid columns `{n}`"),
                    )
                })?,
                None => 0,
            };

            let mut descriptor = match self.payload(id).await? {
                Some(payload) => serde_json::from_value::<BlockFieldDescriptor>(payload)?,
                None => BlockFieldDescriptor::default(),
            };
            if descriptor.id.is_empty() {
                descriptor.id = id.to_string();
            }

            let columns = if columns > 0 {
                columns
            } else {
                descriptor.columns.filter(|c| *c > 0).unwrap_or(GRID_UNITS)
            };
            let locked = tag.attrs.flag("locked-layout") || descriptor.locked_layout;
            out.push_str(&render_grid(&descriptor, columns, locked));
        }
        out.push_str(&text[last..]);

        tracing::debug!(count = tags.len(), "block fields rendered");
        Ok(out)
    }

    async fn payload(&self, id: &str) -> PagewrightResult<Option<Value>> {
        let slug = format!("block-{id}");
        if !self.bypass_cache {
            match self.cache.read_json(&slug).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => tracing::warn!(slug = %slug, error = %e, "unreadable cache entry, refetching"),
            }
        }

        let fetched = self.api.block_field(id).await?;
        match &fetched {
            Some(value) => persist(self.cache, &slug, value).await,
            None => tracing::debug!(id, "block field has no payload"),
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_http::{ApiCall, InMemoryContentApi};
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "columns": 12,
            "rows": [{"columns": [
                {"span": 8, "blocks": [
                    {"type": "html", "value": {"html": "<p>A</p>"}},
                    {"type": "gallery", "value": {"images": []}},
                    {"type": "html", "value": {"html": ""}}
                ]},
                {"span": 4, "blocks": [{"type": "quote", "value": {"quote": "Q"}}]}
            ]}]
        })
    }

    #[test]
    fn test_column_units() {
        assert_eq!(column_units(12, 12), 12);
        assert_eq!(column_units(6, 12), 6);
        assert_eq!(column_units(1, 3), 4);
        assert_eq!(column_units(0, 12), 1);
        assert_eq!(column_units(5, 0), 12);
    }

    #[test]
    fn test_render_block_escapes_json() {
        let html = render_block(&json!({"type": "html", "value": {"html": "<i>x</i>"}})).unwrap();
        assert_eq!(
            html,
            "<div class=\"block block-html\" data-block-json=\"{&quot;type&quot;:&quot;html&quot;,&quot;value&quot;:{&quot;html&quot;:&quot;&lt;i&gt;x&lt;/i&gt;&quot;}}\"><i>x</i></div>"
        );
        assert_eq!(render_block(&json!({"type": "nope"})), None);
        assert_eq!(render_block(&json!({"value": {}})), None);
    }

    #[test]
    fn test_render_grid() {
        let descriptor: BlockFieldDescriptor = serde_json::from_value(payload()).unwrap();
        let html = render_grid(&descriptor, 12, true);
        assert!(html.starts_with("<div class=\"block-field\" data-block-field-id=\"\" data-columns=\"12\" data-locked-layout=\"true\">"));
        assert!(html.contains("<div class=\"col col-8\"><div class=\"block block-html\""));
        assert!(html.contains("<div class=\"col col-4\"><div class=\"block block-quote\""));
        assert_eq!(html.matches("class=\"block ").count(), 2);
        assert!(!html.contains("gallery"));
    }

    #[test]
    fn test_even_share_without_span() {
        let descriptor: BlockFieldDescriptor = serde_json::from_value(json!({
            "rows": [{"columns": [{"blocks": []}, {"blocks": []}, {"blocks": []}]}]
        }))
        .unwrap();
        let html = render_grid(&descriptor, 12, false);
        assert_eq!(html.matches("col col-4").count(), 3);
    }

    #[tokio::test]
    async fn test_render_fetches_then_caches() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let api = InMemoryContentApi::new().with_block_field("b1", payload());
        let text = r#"<main><site:block-field id="b1" /></main>"#.to_string();

        let out = BlockFieldRenderer::new(&api, &cache, false)
            .render(text.clone())
            .await
            .unwrap();
        assert!(out.starts_with("<main><div class=\"block-field\" data-block-field-id=\"b1\""));
        assert!(out.ends_with("</div></main>"));
        assert!(cache.exists("block-b1", "json").await);

        BlockFieldRenderer::new(&api, &cache, false)
            .render(text)
            .await
            .unwrap();
        assert_eq!(api.calls(), vec![ApiCall::BlockField("b1".into())]);
    }

    #[tokio::test]
    async fn test_missing_payload_not_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let api = InMemoryContentApi::new();

        let out = BlockFieldRenderer::new(&api, &cache, false)
            .render(r#"<site:block-field id="empty" columns="6" />"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            out,
            "<div class=\"block-field\" data-block-field-id=\"empty\" data-columns=\"6\"></div>"
        );
        assert!(!cache.exists("block-empty", "json").await);
    }

    #[tokio::test]
    async fn test_no_directive_returns_text_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let api = InMemoryContentApi::new();
        let out = BlockFieldRenderer::new(&api, &cache, false)
            .render("<p>plain</p>".to_string())
            .await
            .unwrap();
        assert_eq!(out, "<p>plain</p>");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_processed_in_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(tmp.path());
        let api = InMemoryContentApi::new();
        BlockFieldRenderer::new(&api, &cache, false)
            .render(r#"<site:block-field id="z" /><site:block-field id="a" />"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            api.calls(),
            vec![ApiCall::BlockField("z".into()), ApiCall::BlockField("a".into())]
        );
    }
}
