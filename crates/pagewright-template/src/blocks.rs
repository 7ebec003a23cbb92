//! Block include expansion.
//!
//! `{@|apply name.block}` is replaced by the `name` block fragment, and the
//! fragment's own includes are expanded before it is spliced in, so the
//! result contains no include directives. Each include chain carries the set
//! of block names it has passed through; revisiting one, or nesting deeper
//! than the configured limit, is a [`PagewrightError::CyclicInclude`].

use std::collections::HashMap;

use pagewright_core::{PagewrightError, PagewrightResult};

use crate::directive::find_includes;
use crate::html::diagnostic_comment;

/// Looks up block fragments by name.
pub trait BlockSource {
    /// Returns the block fragment, or `None` if no such block exists.
    fn block(&self, name: &str) -> PagewrightResult<Option<String>>;
}

impl BlockSource for HashMap<String, String> {
    fn block(&self, name: &str) -> PagewrightResult<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

/// Expands every block include in `text`.
///
/// A missing block degrades to a diagnostic comment.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use pagewright_template::blocks::expand;
///
/// let mut blocks = HashMap::new();
/// blocks.insert("outer".to_string(), "[{@|apply inner.block}]".to_string());
/// blocks.insert("inner".to_string(), "x".to_string());
///
/// assert_eq!(expand("a{@|apply outer.block}b", &blocks, 8).unwrap(), "a[x]b");
/// ```
///
/// # Errors
///
/// Returns `CyclicInclude` for a self-referencing chain or one deeper than
/// `max_depth`, and `MalformedDirective` for a bad include.
pub fn expand(text: &str, source: &dyn BlockSource, max_depth: usize) -> PagewrightResult<String> {
    expand_chain(text, source, max_depth, &mut Vec::new())
}

fn expand_chain(
    text: &str,
    source: &dyn BlockSource,
    max_depth: usize,
    chain: &mut Vec<String>,
) -> PagewrightResult<String> {
    let includes = find_includes(text)?;
    if includes.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for include in includes {
        out.push_str(&text[last..include.range.start]);
        last = include.range.end;

        if chain.contains(&include.name) || chain.len() >= max_depth {
            let mut cycle = chain.clone();
            cycle.push(include.name);
            return Err(PagewrightError::CyclicInclude { chain: cycle });
        }

        let Some(fragment) = source.block(&include.name)? else {
            tracing::warn!(block = %include.name, "block fragment not found");
            out.push_str(&diagnostic_comment(&format!(
                "missing block '{}'",
                include.name
            )));
            continue;
        };

        chain.push(include.name);
        let expanded = expand_chain(&fragment, source, max_depth, chain)?;
        chain.pop();
        out.push_str(&expanded);
    }

    out.push_str(&text[last..]);
    Ok(out)
}
