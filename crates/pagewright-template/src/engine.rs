//! The generic template engine.
//!
//! [`Engine`] wraps [Tera](https://keats.github.io/tera/) with autoescaping
//! off and a few formatters and predicates registered:
//!
//! - filter `json_attr`: the value as JSON, escaped for an HTML attribute
//! - filter `squash`: collapses whitespace in an HTML string
//! - test `starred`: `true` for items whose `starred` flag is set
//!
//! Text is recognized as an expression by the `{{` delimiter alone.

use std::collections::HashMap;
use std::error::Error as _;

use serde_json::Value;
use tera::{Context, Tera};

use pagewright_core::cache::squash_html;
use pagewright_core::{PagewrightError, PagewrightResult};

use crate::html::escape_html;

const INLINE_NAME: &str = "__inline__";
const EXPRESSION_OPEN: &str = "{{";

/// Expands template text against JSON data.
///
/// # Examples
///
/// ```
/// use pagewright_template::Engine;
/// use serde_json::json;
///
/// let engine = Engine::new();
/// let out = engine.render("Hello {{ name }}!", &json!({"name": "<World>"})).unwrap();
/// assert_eq!(out, "Hello <World>!");
/// ```
#[derive(Clone)]
pub struct Engine {
    tera: Tera,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the pagewright formatters and predicates.
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.register_filter("json_attr", json_attr);
        tera.register_filter("squash", squash);
        tera.register_tester("starred", starred);
        Self { tera }
    }

    /// Returns `true` if the text contains an engine expression.
    pub fn is_expression(text: &str) -> bool {
        text.contains(EXPRESSION_OPEN)
    }

    /// Expands `source` against `data`.
    ///
    /// Object fields become top-level variables; any other value is exposed
    /// as `this`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntax` if `source` does not parse and
    /// `TemplateRender` if expansion fails.
    pub fn render(&self, source: &str, data: &Value) -> PagewrightResult<String> {
        let context = match data {
            Value::Object(_) => Context::from_value(data.clone())
                .map_err(|e| PagewrightError::TemplateRender(describe(&e)))?,
            other => {
                let mut context = Context::new();
                context.insert("this", other);
                context
            }
        };

        let mut tera = self.tera.clone();
        tera.add_raw_template(INLINE_NAME, source)
            .map_err(|e| PagewrightError::TemplateSyntax(describe(&e)))?;
        tera.render(INLINE_NAME, &context)
            .map_err(|e| PagewrightError::TemplateRender(describe(&e)))
    }
}

/// Flattens a Tera error and its causes into one message.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn json_attr(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let json = serde_json::to_string(value).map_err(tera::Error::msg)?;
    Ok(Value::String(escape_html(&json)))
}

fn squash(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    value
        .as_str()
        .map(|s| Value::String(squash_html(s)))
        .ok_or_else(|| tera::Error::msg("Filter `squash` expects a string"))
}

fn starred(value: Option<&Value>, _args: &[Value]) -> tera::Result<bool> {
    Ok(value
        .and_then(|v| v.get("starred"))
        .and_then(Value::as_bool)
        .unwrap_or(false))
}
