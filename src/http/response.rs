//! Response construction for the page pipeline.
//!
//! # Responsibilities
//! - Build the HTML error pages for denials, render failures and 404s
//! - Apply `*_headers` objects contributed by the after phase
//!
//! # Design Decisions
//! - Error pages carry the route, component and raw error text, HTML-escaped
//! - Invalid header names or values are dropped with a warning

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use minijinja::HtmlEscape;
use serde_json::Value;

use crate::middleware::ContextMap;

/// Suffix marking an after-phase entry as response headers.
pub const HEADERS_SUFFIX: &str = "_headers";

/// HTML-escape `text` with the template engine's escaper.
pub fn escape_html(text: &str) -> String {
    HtmlEscape(text).to_string()
}

/// A full HTML error page with labelled detail rows.
pub fn error_page(status: StatusCode, title: &str, details: &[(&str, &str)]) -> Response {
    let rows: String = details
        .iter()
        .map(|(label, value)| {
            format!(
                "<p><strong>{}:</strong> {}</p>\n",
                escape_html(label),
                escape_html(value)
            )
        })
        .collect();

    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{code} {title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; background: #0a0a0a; color: white; padding: 2rem; text-align: center; }}
        .error-container {{ max-width: 600px; margin: 0 auto; background: rgba(239, 68, 68, 0.1); padding: 2rem; border-radius: 15px; border: 1px solid rgba(239, 68, 68, 0.3); }}
    </style>
</head>
<body>
    <div class="error-container">
        <h1>{code} {title}</h1>
        {rows}
    </div>
</body>
</html>
"#,
        code = status.as_u16(),
        title = escape_html(title),
        rows = rows,
    );

    (status, Html(body)).into_response()
}

/// Page returned when a guard denies access.
pub fn denied_page(status: StatusCode, message: &str) -> Response {
    error_page(status, "Access Denied", &[("Reason", message)])
}

/// Page returned when rendering fails or times out.
pub fn render_error_page(status: StatusCode, route: &str, component: &str, error: &str) -> Response {
    error_page(
        status,
        "Route Error",
        &[("Route", route), ("Component", component), ("Error", error)],
    )
}

pub fn not_found_page(path: &str) -> Response {
    error_page(StatusCode::NOT_FOUND, "Not Found", &[("Path", path)])
}

/// Copy every `*_headers` object of string values onto `headers`.
pub fn apply_context_headers(headers: &mut HeaderMap, context: &ContextMap) {
    for (key, value) in context {
        if !key.ends_with(HEADERS_SUFFIX) {
            continue;
        }
        let Value::Object(entries) = value else {
            continue;
        };
        for (name, value) in entries {
            let Some(value) = value.as_str() else {
                continue;
            };
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(source = %key, header = %name, "Dropping invalid response header"),
            }
        }
    }
}
