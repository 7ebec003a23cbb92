//! Render results and errors as HTTP responses.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::CONTENT_TYPE;
use http::StatusCode;

use pagewright_core::PagewrightError;
use pagewright_template::html::escape_html;
use pagewright_template::Rendered;

/// Converts a render result into a response.
pub fn rendered(result: Rendered) -> Response {
    let content_type = result.content_type();
    match result {
        Rendered::Html(html) => ([(CONTENT_TYPE, content_type)], html).into_response(),
        Rendered::Json(value) => Json(value).into_response(),
    }
}

/// Renders an error page carrying the error's status code.
///
/// The error message is included only in debug mode.
pub fn error_page(err: &PagewrightError, debug: bool) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let detail = if debug {
        format!("<pre>{}</pre>", escape_html(&err.to_string()))
    } else {
        String::new()
    };
    let body = format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
         <body><h1>{title}</h1>{detail}</body></html>"
    );

    (status, [(CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
}
