//! Block kinds rendered inside block-field grids.
//!
//! Each block in a block field declares a `type`; [`BlockKind::from_type`]
//! maps it to one of a closed set of kinds with one rendering function each.
//! Unknown types have no kind and are skipped by the caller.

use serde_json::Value;

use crate::html::escape_html;

/// A renderable block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Raw HTML.
    Html,
    /// Plain text, split into paragraphs on blank lines.
    Text,
    /// An image with optional caption.
    Image,
    /// An embedded video with optional overlay and caption.
    Video,
    /// A quotation with optional source.
    Quote,
    /// A link styled as a button.
    Button,
    /// Vertical whitespace.
    Spacer,
    /// Preformatted code.
    Code,
    /// Third-party embed HTML.
    Embed,
}

impl BlockKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Html,
        Self::Text,
        Self::Image,
        Self::Video,
        Self::Quote,
        Self::Button,
        Self::Spacer,
        Self::Code,
        Self::Embed,
    ];

    /// Looks up a kind by its declared type string.
    pub fn from_type(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Returns the declared type string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Quote => "quote",
            Self::Button => "button",
            Self::Spacer => "spacer",
            Self::Code => "code",
            Self::Embed => "embed",
        }
    }

    /// Renders a block's `value` object. An empty string means "nothing to
    /// show".
    pub fn render(self, value: &Value) -> String {
        match self {
            Self::Html | Self::Embed => str_field(value, "html").to_string(),
            Self::Text => render_text(str_field(value, "text")),
            Self::Image => render_image(value),
            Self::Video => render_video(value),
            Self::Quote => render_quote(value),
            Self::Button => render_button(value),
            Self::Spacer => render_spacer(value),
            Self::Code => {
                let code = str_field(value, "code");
                if code.is_empty() {
                    String::new()
                } else {
                    format!("<pre><code>{}</code></pre>", escape_html(code))
                }
            }
        }
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn video_caption(value: &Value) -> String {
    match str_field(value, "caption") {
        "" => String::new(),
        text => format!("<div class=\"video-caption\">{}</div>", escape_html(text)),
    }
}

fn render_text(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect()
}

fn render_image(value: &Value) -> String {
    let url = str_field(value, "url");
    if url.is_empty() {
        return String::new();
    }
    let figcaption = match str_field(value, "caption") {
        "" => String::new(),
        text => format!(
            "<figcaption class=\"image-caption\">{}</figcaption>",
            escape_html(text)
        ),
    };
    format!(
        "<figure class=\"image-block\"><img src=\"{}\" alt=\"{}\">{figcaption}</figure>",
        escape_html(url),
        escape_html(str_field(value, "alt")),
    )
}

fn render_video(value: &Value) -> String {
    let url = str_field(value, "url");
    if url.is_empty() {
        return String::new();
    }

    let overlay = value.get("overlay").and_then(Value::as_bool) == Some(true);
    let overlay_html = match (overlay, str_field(value, "thumbnailUrl")) {
        (false, _) => String::new(),
        (true, "") => "<div class=\"video-overlay\"></div>".to_string(),
        (true, thumb) => format!(
            "<div class=\"video-overlay\" style=\"background-image: url('{}')\"></div>",
            escape_html(thumb)
        ),
    };

    format!(
        "<div class=\"video-block\"><div class=\"video-wrapper\">\
         <iframe src=\"{}\" frameborder=\"0\" allowfullscreen></iframe>{overlay_html}</div>{}</div>",
        escape_html(url),
        video_caption(value),
    )
}

fn render_quote(value: &Value) -> String {
    let quote = str_field(value, "quote");
    if quote.is_empty() {
        return String::new();
    }
    let source = match str_field(value, "source") {
        "" => String::new(),
        s => format!("<cite>{}</cite>", escape_html(s)),
    };
    format!("<blockquote><p>{}</p>{source}</blockquote>", escape_html(quote))
}

fn render_button(value: &Value) -> String {
    let label = str_field(value, "label");
    if label.is_empty() {
        return String::new();
    }
    let url = match str_field(value, "url") {
        "" => "#",
        u => u,
    };
    format!(
        "<a class=\"button\" href=\"{}\">{}</a>",
        escape_html(url),
        escape_html(label)
    )
}

fn render_spacer(value: &Value) -> String {
    let height = value.get("height").and_then(Value::as_u64).unwrap_or(24);
    format!("<div class=\"spacer-block\" style=\"height: {height}px\"></div>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_type() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_type(kind.name()), Some(kind));
        }
        assert_eq!(BlockKind::from_type("gallery"), None);
        assert_eq!(BlockKind::from_type("HTML"), None);
    }

    #[test]
    fn test_html_and_embed_are_raw() {
        let v = json!({"html": "<b>hi</b>"});
        assert_eq!(BlockKind::Html.render(&v), "<b>hi</b>");
        assert_eq!(BlockKind::Embed.render(&v), "<b>hi</b>");
        assert_eq!(BlockKind::Html.render(&json!({})), "");
    }

    #[test]
    fn test_text_paragraphs() {
        let v = json!({"text": "one <two>\n\n\n\nthree"});
        assert_eq!(
            BlockKind::Text.render(&v),
            "<p>one &lt;two&gt;</p><p>three</p>"
        );
    }

    #[test]
    fn test_image() {
        let v = json!({"url": "/i.png", "alt": "A", "caption": "Cap"});
        assert_eq!(
            BlockKind::Image.render(&v),
            "<figure class=\"image-block\"><img src=\"/i.png\" alt=\"A\"><figcaption class=\"image-caption\">Cap</figcaption></figure>"
        );
        assert_eq!(BlockKind::Image.render(&json!({"alt": "x"})), "");
    }

    #[test]
    fn test_video_plain() {
        let out = BlockKind::Video.render(&json!({"url": "https://v.example/1"}));
        assert!(out.contains("<iframe src=\"https://v.example/1\""));
        assert!(!out.contains("video-overlay"));
        assert!(!out.contains("video-caption"));
    }

    #[test]
    fn test_video_overlay_and_caption() {
        let out = BlockKind::Video.render(&json!({
            "url": "https://v.example/1",
            "overlay": true,
            "thumbnailUrl": "/t.jpg",
            "caption": "Watch"
        }));
        assert!(out.contains("<div class=\"video-overlay\" style=\"background-image: url('/t.jpg')\"></div>"));
        assert!(out.ends_with("<div class=\"video-caption\">Watch</div></div>"));
    }

    #[test]
    fn test_quote_button_spacer_code() {
        assert_eq!(
            BlockKind::Quote.render(&json!({"quote": "Q", "source": "S"})),
            "<blockquote><p>Q</p><cite>S</cite></blockquote>"
        );
        assert_eq!(
            BlockKind::Button.render(&json!({"label": "Go"})),
            "<a class=\"button\" href=\"#\">Go</a>"
        );
        assert_eq!(
            BlockKind::Spacer.render(&json!({"height": 10})),
            "<div class=\"spacer-block\" style=\"height: 10px\"></div>"
        );
        assert_eq!(
            BlockKind::Code.render(&json!({"code": "a < b"})),
            "<pre><code>a &lt; b</code></pre>"
        );
    }
}
