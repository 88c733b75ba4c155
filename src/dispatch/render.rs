//! Error page rendering.
//!
//! JSON clients, and any error carrying a structured model, get
//! `{...model, "message", "detail"}`. Everyone else gets a minimal `<pre>` page.

use axum::http::{header, HeaderValue};
use serde_json::Value;

use crate::dispatch::content::Content;
use crate::dispatch::page::PageError;
use crate::http::error::SendError;
use crate::http::request::RequestAdapter;
use crate::http::response::ResponseAdapter;

/// Whether `error` should be rendered as JSON for this request.
pub fn wants_json(request: &RequestAdapter<'_>, error: &PageError) -> bool {
    request.accepts_json() || error.error_model().is_some()
}

/// Build the error content for `error`.
pub fn error_content(request: &RequestAdapter<'_>, error: &PageError) -> Result<Content, SendError> {
    if wants_json(request, error) {
        let mut body = error.error_model().cloned().unwrap_or_default();
        body.insert("message".into(), Value::String(error.message().to_string()));
        body.insert("detail".into(), Value::String(error.detail()));
        return Ok(Content::json(&body, error.status())?);
    }

    let html = format!(
        "<!DOCTYPE html>\n<html><body><pre>Server Error for {}\r\n{}</pre></body></html>",
        escape_html(request.url().as_str()),
        escape_html(&error.detail()),
    );
    Ok(Content::html(html, error.status()))
}

/// Render `error` onto a response whose head has not been written.
pub async fn render_error(
    request: &RequestAdapter<'_>,
    response: &mut ResponseAdapter<'_>,
    error: &PageError,
) -> Result<(), SendError> {
    let content = error_content(request, error)?;
    // Representation headers left by the failed page do not describe the error body.
    for name in [header::CONTENT_TYPE, header::CONTENT_ENCODING, header::CONTENT_RANGE, header::LOCATION] {
        response.remove_header(&name);
    }
    response.set_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    content.send(response).await
}

/// Escape text for inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::connection::ConnectionRequest;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_json_when_accepted() {
        let conn = ConnectionRequest::builder(Method::GET, "/")
            .header("accept", "application/json")
            .build();
        let request = RequestAdapter::new(&conn);

        let content = error_content(&request, &PageError::new("bad")).unwrap();
        assert_eq!(content.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(content.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_json_when_model_present() {
        let conn = ConnectionRequest::builder(Method::GET, "/")
            .header("accept", "text/html")
            .build();
        let request = RequestAdapter::new(&conn);
        let model = json!({"code": "X"}).as_object().cloned().unwrap();

        assert!(wants_json(&request, &PageError::new("bad").with_model(model)));
        assert!(!wants_json(&request, &PageError::new("bad")));
    }

    #[test]
    fn test_html_for_browsers() {
        let conn = ConnectionRequest::builder(Method::GET, "/a?b=<c>")
            .header("host", "example.com")
            .header("accept", "text/html")
            .build();
        let request = RequestAdapter::new(&conn);

        let content = error_content(&request, &PageError::new("<boom>")).unwrap();
        assert_eq!(content.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(content.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
