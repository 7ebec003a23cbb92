//! Small HTML helpers shared by the renderers.

/// Escapes HTML special characters in a string.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their HTML entity equivalents,
/// so the result is safe both as text and inside a quoted attribute.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// An HTML comment marking a degraded section of the page.
///
/// `--` is stripped from the message so the comment cannot close early.
pub fn diagnostic_comment(message: &str) -> String {
    let mut message = message.to_string();
    while message.contains("--") {
        message = message.replace("--", "-");
    }
    format!("<!-- pagewright: {message} -->")
}
