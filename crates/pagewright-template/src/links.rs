//! Share link rewriting.
//!
//! Relative share links (`href="/s/…"`) only resolve on the live site, so
//! they are prefixed with the site URL. Pure text substitution.

use std::sync::LazyLock;

use regex::Regex;

static SHARE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href\s*=\s*["'])(/s/)"#).unwrap_or_else(|e| unreachable!("{e}"))
});

/// Prefixes every relative share link with `site_url`.
///
/// # Examples
///
/// ```
/// use pagewright_template::links::rewrite;
///
/// let html = r#"<a href="/s/menu.pdf">Menu</a> <a href="/about">About</a>"#;
/// assert_eq!(
///     rewrite(html, "https://example.site/"),
///     r#"<a href="https://example.site/s/menu.pdf">Menu</a> <a href="/about">About</a>"#
/// );
/// ```
pub fn rewrite(text: &str, site_url: &str) -> String {
    let site_url = site_url.trim_end_matches('/');
    if site_url.is_empty() {
        return text.to_string();
    }
    SHARE_LINK_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("{}{site_url}{}", &caps[1], &caps[2])
        })
        .into_owned()
}
