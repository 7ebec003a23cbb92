//! Page composition.
//!
//! The [`Composer`] assembles header, page body and footer fragments into one
//! document and substitutes the reserved placeholders:
//!
//! | Placeholder            | Replaced with                                   |
//! |------------------------|-------------------------------------------------|
//! | `{site.main-content}`  | the item/list fragment, or the page's own HTML  |
//! | `{site.page-classes}`  | `collection-type-<t> collection-<id> view-<v>`  |
//! | `{site.page-id}`       | `item-<id>` or `collection-<id>`                |
//! | `{site.post-entry}`    | always empty                                    |
//! | `{site-headers}`       | script/link/meta/style elements of the live head|
//! | `{site-footers}`       | script elements of the live body                |

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::html::diagnostic_comment;
use crate::loaders::{FragmentMap, FOOTER_KEY, HEADER_KEY};

/// Where the page body goes inside a region.
pub const MAIN_CONTENT: &str = "{site.main-content}";
/// Body classes describing the page.
pub const PAGE_CLASSES: &str = "{site.page-classes}";
/// Element id describing the page.
pub const PAGE_ID: &str = "{site.page-id}";
/// Reserved; always substituted with nothing.
pub const POST_ENTRY: &str = "{site.post-entry}";
/// Head elements of the live page.
pub const SITE_HEADERS: &str = "{site-headers}";
/// Trailing scripts of the live page.
pub const SITE_FOOTERS: &str = "{site-footers}";

static HEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<head\b[^>]*>(.*?)</head\s*>").unwrap_or_else(|e| unreachable!("{e}"))
});

static BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap_or_else(|e| unreachable!("{e}"))
});

static HEAD_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<link\b[^>]*>|<meta\b[^>]*>",
    )
    .unwrap_or_else(|e| unreachable!("{e}"))
});

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap_or_else(|e| unreachable!("{e}"))
});

/// What the page JSON describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A single collection item.
    Item,
    /// A collection listing.
    List,
    /// A plain page.
    Page,
}

impl PageKind {
    const fn view(self) -> &'static str {
        match self {
            Self::Item => "view-item",
            Self::List => "view-list",
            Self::Page => "view-page",
        }
    }
}

/// Facts about the page, read from its content JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Item, list or plain page.
    pub kind: PageKind,
    /// `collection.typeName`, e.g. `blog`.
    pub collection_type: String,
    /// `collection.id`.
    pub collection_id: String,
    /// `item.id` for item pages.
    pub item_id: Option<String>,
    /// `collection.regionName`, the layout the platform assigned.
    pub region_name: Option<String>,
}

impl PageInfo {
    /// Reads page facts from content JSON.
    ///
    /// An `item` object makes an item page; an `items` array makes a list.
    pub fn from_json(json: &Value) -> Self {
        let kind = if json.get("item").is_some_and(Value::is_object) {
            PageKind::Item
        } else if json.get("items").is_some_and(Value::is_array) {
            PageKind::List
        } else {
            PageKind::Page
        };

        let collection = json.get("collection");
        let field = |v: Option<&Value>, key: &str| -> Option<String> {
            v.and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            kind,
            collection_type: field(collection, "typeName").unwrap_or_else(|| "page".to_string()),
            collection_id: field(collection, "id").unwrap_or_default(),
            item_id: field(json.get("item"), "id"),
            region_name: field(collection, "regionName"),
        }
    }

    /// Returns the fragment key answering this page.
    pub fn template_key(&self, layout: &str) -> String {
        match self.kind {
            PageKind::Item => format!("{}.item", self.collection_type),
            PageKind::List => format!("{}.list", self.collection_type),
            PageKind::Page => format!("{layout}.region"),
        }
    }

    /// Returns the value of `{site.page-classes}`.
    pub fn page_classes(&self) -> String {
        format!(
            "collection-type-{} collection-{} {}",
            self.collection_type,
            self.collection_id,
            self.kind.view()
        )
    }

    /// Returns the value of `{site.page-id}`.
    pub fn page_id(&self) -> String {
        match (&self.kind, &self.item_id) {
            (PageKind::Item, Some(id)) => format!("item-{id}"),
            _ => format!("collection-{}", self.collection_id),
        }
    }
}

/// Head and trailing elements lifted from the live page HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageChrome {
    /// Value of `{site-headers}`.
    pub headers: String,
    /// Value of `{site-footers}`.
    pub footers: String,
}

impl PageChrome {
    /// Extracts head elements and body scripts from page HTML.
    pub fn from_html(html: &str) -> Self {
        let collect = |section: Option<&str>, re: &Regex| -> String {
            section
                .map(|s| {
                    re.find_iter(s)
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default()
        };

        let head = HEAD_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());
        let body = BODY_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        Self {
            headers: collect(head, &*HEAD_ELEMENT_RE),
            footers: collect(body, &*SCRIPT_RE),
        }
    }
}

/// Assembles one page from its fragments.
#[derive(Debug)]
pub struct Composer<'a> {
    info: &'a PageInfo,
    chrome: &'a PageChrome,
    main_content: &'a str,
}

impl<'a> Composer<'a> {
    /// Creates a composer. `main_content` is the page's own HTML, used for
    /// plain pages.
    pub const fn new(info: &'a PageInfo, chrome: &'a PageChrome, main_content: &'a str) -> Self {
        Self {
            info,
            chrome,
            main_content,
        }
    }

    /// Composes the document answering `key`.
    ///
    /// Item and list fragments are wrapped in the layout's region at its
    /// main-content placeholder; a region key is used as the body directly.
    /// Header and footer fragments are always prepended and appended. A
    /// missing fragment degrades to a diagnostic comment.
    pub fn compose(&self, key: &str, fragments: &FragmentMap) -> String {
        let body = if key.ends_with(".region") {
            fragment(fragments, key).replace(MAIN_CONTENT, self.main_content)
        } else {
            let region = fragment(fragments, &fragments.region_key());
            let inner = fragment(fragments, key);
            if region.contains(MAIN_CONTENT) {
                region.replacen(MAIN_CONTENT, &inner, 1)
            } else {
                tracing::warn!(
                    region = %fragments.region_key(),
                    "region has no {MAIN_CONTENT} placeholder"
                );
                region + &inner
            }
        };

        let mut doc = String::new();
        if let Some(header) = fragments.get(HEADER_KEY) {
            doc.push_str(header);
        }
        doc.push_str(&body);
        if let Some(footer) = fragments.get(FOOTER_KEY) {
            doc.push_str(footer);
        }

        doc.replace(PAGE_CLASSES, &self.info.page_classes())
            .replace(PAGE_ID, &self.info.page_id())
            .replace(POST_ENTRY, "")
            .replace(SITE_HEADERS, &self.chrome.headers)
            .replace(SITE_FOOTERS, &self.chrome.footers)
    }
}

fn fragment(fragments: &FragmentMap, key: &str) -> String {
    fragments.get(key).map_or_else(
        || {
            tracing::warn!(key, "template fragment not found");
            diagnostic_comment(&format!("missing fragment '{key}'"))
        },
        str::to_string,
    )
}
