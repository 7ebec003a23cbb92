//! Directive tokenizer.
//!
//! Recognizes the fixed set of tag-like directives the pipeline substitutes
//! before generic template expansion:
//!
//! | Directive     | Shape                                                    |
//! |---------------|----------------------------------------------------------|
//! | block include | `{@\|apply name.block}`                                  |
//! | query         | `<site:query collection="…" …>body</site:query>`         |
//! | navigation    | `<site:navigation navigationId="…" template="…" />`      |
//! | block field   | `<site:block-field id="…" columns="12" locked-layout />` |
//! | script        | `<script …>…</script>` (case-insensitive)                |
//!
//! Directives are found positionally with a small cursor rather than with
//! regexes, so directive-like text inside attribute values is never mistaken
//! for a tag. Attributes are `name="value"`, `name='value'` or a bare `name`.

use std::collections::BTreeMap;
use std::ops::Range;

use pagewright_core::{PagewrightError, PagewrightResult};

/// Tag name of the query directive.
pub const QUERY_TAG: &str = "site:query";
/// Tag name of the navigation directive.
pub const NAVIGATION_TAG: &str = "site:navigation";
/// Tag name of the block-field directive.
pub const BLOCK_FIELD_TAG: &str = "site:block-field";

const INCLUDE_OPEN: &str = "{@|apply";
const INCLUDE_SUFFIX: &str = ".block";
const SNIPPET_LIMIT: usize = 120;

/// Attributes of a directive tag.
///
/// A bare attribute (`featured`) is stored without a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<String, Option<String>>,
}

impl Attributes {
    /// Returns the value of an attribute. Bare attributes have no value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_deref())
    }

    /// Returns `true` if the attribute is present, with or without a value.
    pub fn flag(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the tag carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: &str, value: Option<&str>) {
        self.values
            .insert(name.to_string(), value.map(str::to_string));
    }
}

/// A block include: `{@|apply name.block}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Byte range of the whole directive.
    pub range: Range<usize>,
    /// The block name without the `.block` suffix.
    pub name: String,
}

/// A self-closing directive tag such as `<site:navigation … />`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Byte range of the whole tag.
    pub range: Range<usize>,
    /// The parsed attributes.
    pub attrs: Attributes,
    /// The tag as written, for error messages.
    pub source: String,
}

impl Tag {
    /// Returns a required attribute or a malformed-directive error.
    pub fn require(&self, name: &str) -> PagewrightResult<&str> {
        require(&self.attrs, &self.source, name)
    }
}

/// A query directive: open tag, body template and close tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDirective {
    /// Byte range from `<site:query` through `</site:query>`.
    pub range: Range<usize>,
    /// Byte range of the open tag.
    pub open_tag: Range<usize>,
    /// Byte range of the body template.
    pub body: Range<usize>,
    /// Byte range of the close tag.
    pub close_tag: Range<usize>,
    /// The parsed open-tag attributes.
    pub attrs: Attributes,
    /// The open tag as written, for error messages.
    pub source: String,
}

impl QueryDirective {
    /// Returns the body template text.
    pub fn body_template<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body.clone()]
    }

    /// Returns a required attribute or a malformed-directive error.
    pub fn require(&self, name: &str) -> PagewrightResult<&str> {
        require(&self.attrs, &self.source, name)
    }
}

fn require<'a>(attrs: &'a Attributes, source: &str, name: &str) -> PagewrightResult<&'a str> {
    attrs
        .get(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PagewrightError::malformed(source, format!("missing `{name}` attribute")))
}

/// Finds every block include in document order.
///
/// # Errors
///
/// Returns a malformed-directive error for an unterminated include or one
/// whose target is not `<name>.block`.
pub fn find_includes(text: &str) -> PagewrightResult<Vec<Include>> {
    let mut includes = Vec::new();
    let mut from = 0;

    while let Some(offset) = text[from..].find(INCLUDE_OPEN) {
        let start = from + offset;
        let after = start + INCLUDE_OPEN.len();
        let Some(close) = text[after..].find('}') else {
            return Err(PagewrightError::malformed(
                snippet(text, start),
                "unterminated block include",
            ));
        };
        let end = after + close + 1;
        let source = &text[start..end];

        if !text[after..].starts_with(char::is_whitespace) {
            return Err(PagewrightError::malformed(
                source,
                "expected whitespace after `apply`",
            ));
        }

        let target = text[after..end - 1].trim();
        let name = target
            .strip_suffix(INCLUDE_SUFFIX)
            .filter(|n| !n.is_empty() && !n.contains(char::is_whitespace))
            .ok_or_else(|| PagewrightError::malformed(source, "expected `<name>.block`"))?;

        includes.push(Include {
            range: start..end,
            name: name.to_string(),
        });
        from = end;
    }

    Ok(includes)
}

/// Finds every self-closing tag with the given name in document order.
///
/// A tag written `<name …>` is accepted too, and an immediately following
/// `</name>` is consumed with it.
pub fn find_tags(text: &str, name: &str) -> PagewrightResult<Vec<Tag>> {
    let mut tags = Vec::new();
    let mut from = 0;

    while let Some(start) = find_open(text, name, from) {
        let open = parse_open_tag(text, start, name)?;
        let mut end = open.end;
        if !open.self_closing {
            let close = format!("</{name}>");
            if text[end..].starts_with(&close) {
                end += close.len();
            }
        }
        tags.push(Tag {
            range: start..end,
            attrs: open.attrs,
            source: text[start..open.end].to_string(),
        });
        from = end;
    }

    Ok(tags)
}

/// Returns `true` if the text contains an open tag with the given name.
pub fn contains_tag(text: &str, name: &str) -> bool {
    find_open(text, name, 0).is_some()
}

/// Finds the first query directive starting at or after `from`.
///
/// Nested query directives inside the body are paired correctly: the close
/// tag returned is the one balancing this open tag.
///
/// # Errors
///
/// Returns a malformed-directive error for bad attribute syntax, a
/// self-closing query tag, or a missing close tag.
pub fn next_query(text: &str, from: usize) -> PagewrightResult<Option<QueryDirective>> {
    let Some(start) = find_open(text, QUERY_TAG, from) else {
        return Ok(None);
    };

    let open = parse_open_tag(text, start, QUERY_TAG)?;
    let source = text[start..open.end].to_string();
    if open.self_closing {
        return Err(PagewrightError::malformed(
            source,
            "a query needs a body and a closing tag",
        ));
    }

    let close_tag = format!("</{QUERY_TAG}>");
    let mut depth = 1usize;
    let mut pos = open.end;

    loop {
        let next_close = text[pos..].find(&close_tag).map(|i| pos + i);
        let next_open = find_open(text, QUERY_TAG, pos);

        match (next_open, next_close) {
            (_, None) => {
                return Err(PagewrightError::malformed(
                    source,
                    format!("missing `{close_tag}`"),
                ));
            }
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                pos = o + 1 + QUERY_TAG.len();
            }
            (_, Some(c)) => {
                depth -= 1;
                if depth == 0 {
                    let end = c + close_tag.len();
                    return Ok(Some(QueryDirective {
                        range: start..end,
                        open_tag: start..open.end,
                        body: open.end..c,
                        close_tag: c..end,
                        attrs: open.attrs,
                        source,
                    }));
                }
                pos = c + close_tag.len();
            }
        }
    }
}

/// Finds every literal `<script>…</script>` element in document order.
///
/// Matching is case-insensitive and non-greedy. An unterminated script is
/// left alone.
pub fn find_scripts(text: &str) -> Vec<Range<usize>> {
    // ASCII lowercasing keeps byte offsets intact.
    let lower = text.to_ascii_lowercase();
    let mut scripts = Vec::new();
    let mut from = 0;

    while let Some(start) = find_open(&lower, "script", from) {
        let Some(close) = lower[start..].find("</script").map(|i| start + i) else {
            break;
        };
        let Some(gt) = lower[close..].find('>').map(|i| close + i) else {
            break;
        };
        scripts.push(start..gt + 1);
        from = gt + 1;
    }

    scripts
}

/// Finds `<name` followed by whitespace, `/` or `>`.
fn find_open(text: &str, name: &str, from: usize) -> Option<usize> {
    let needle = format!("<{name}");
    let mut pos = from;
    while let Some(offset) = text.get(pos..)?.find(&needle) {
        let start = pos + offset;
        let after = start + needle.len();
        match text[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '/' || c == '>' => return Some(start),
            _ => pos = after,
        }
    }
    None
}

struct OpenTag {
    attrs: Attributes,
    end: usize,
    self_closing: bool,
}

fn parse_open_tag(text: &str, start: usize, name: &str) -> PagewrightResult<OpenTag> {
    let mut cur = Cursor {
        text,
        pos: start + 1 + name.len(),
    };
    let mut attrs = Attributes::default();
    let malformed = |reason: String| PagewrightError::malformed(snippet(text, start), reason);

    loop {
        cur.skip_whitespace();
        match cur.peek() {
            None => return Err(malformed("unterminated tag".to_string())),
            Some('>') => {
                cur.bump();
                return Ok(OpenTag {
                    attrs,
                    end: cur.pos,
                    self_closing: false,
                });
            }
            Some('/') => {
                cur.bump();
                if cur.peek() != Some('>') {
                    return Err(malformed("expected `>` after `/`".to_string()));
                }
                cur.bump();
                return Ok(OpenTag {
                    attrs,
                    end: cur.pos,
                    self_closing: true,
                });
            }
            Some(c) if is_name_char(c) => {
                let attr = cur.take_while(is_name_char);
                cur.skip_whitespace();
                if cur.peek() == Some('=') {
                    cur.bump();
                    cur.skip_whitespace();
                    let quote = match cur.bump() {
                        Some(q @ ('"' | '\'')) => q,
                        _ => {
                            return Err(malformed(format!(
                                "value of `{attr}` must be quoted"
                            )))
                        }
                    };
                    let value = cur
                        .take_until(quote)
                        .ok_or_else(|| malformed(format!("unterminated value of `{attr}`")))?;
                    attrs.insert(attr, Some(value));
                } else {
                    attrs.insert(attr, None);
                }
            }
            Some(c) => return Err(malformed(format!("unexpected character `{c}`"))),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    /// Consumes through `delim` and returns the text before it.
    fn take_until(&mut self, delim: char) -> Option<&'a str> {
        let start = self.pos;
        let offset = self.text[start..].find(delim)?;
        self.pos = start + offset + delim.len_utf8();
        Some(&self.text[start..start + offset])
    }
}

/// The directive text starting at `start`, through the next `>`.
fn snippet(text: &str, start: usize) -> String {
    let rest = &text[start..];
    let end = rest.find('>').map_or(rest.len(), |i| i + 1);
    rest[..end].chars().take(SNIPPET_LIMIT).collect()
}
