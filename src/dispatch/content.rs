//! Content results returned by pages.

use std::path::PathBuf;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::Serialize;

use crate::http::compression::Encoding;
use crate::http::error::SendError;
use crate::http::response::{Payload, ResponseAdapter, SendFileOptions};

#[derive(Debug, Clone)]
enum Body {
    Payload(Payload),
    File {
        path: PathBuf,
        options: SendFileOptions,
    },
    Redirect {
        location: String,
        permanent: bool,
    },
}

/// A deliverable response produced by a page.
#[derive(Debug, Clone)]
pub struct Content {
    status: Option<StatusCode>,
    headers: HeaderMap,
    compression: Option<Option<Encoding>>,
    body: Body,
}

impl Content {
    fn payload(payload: Payload, content_type: &'static str, status: StatusCode) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status: Some(status),
            headers,
            compression: None,
            body: Body::Payload(payload),
        }
    }

    pub fn html(html: impl Into<String>, status: StatusCode) -> Self {
        Self::payload(Payload::Text(html.into()), "text/html", status)
    }

    pub fn text(text: impl Into<String>, status: StatusCode) -> Self {
        Self::payload(Payload::Text(text.into()), "text/plain", status)
    }

    pub fn json<T: Serialize + ?Sized>(value: &T, status: StatusCode) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(Self::payload(Payload::Text(body), "application/json", status))
    }

    pub fn bytes(bytes: impl Into<Bytes>, content_type: &'static str, status: StatusCode) -> Self {
        Self::payload(Payload::Bytes(bytes.into()), content_type, status)
    }

    /// Stream a file; status is decided by range handling.
    pub fn file(path: impl Into<PathBuf>, options: SendFileOptions) -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            compression: None,
            body: Body::File {
                path: path.into(),
                options,
            },
        }
    }

    pub fn redirect(location: impl Into<String>, permanent: bool) -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            compression: None,
            body: Body::Redirect {
                location: location.into(),
                permanent,
            },
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the response compression; `None` disables it.
    pub fn with_compression(mut self, encoding: Option<Encoding>) -> Self {
        self.compression = Some(encoding);
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Deliver through `response`.
    pub async fn send(self, response: &mut ResponseAdapter<'_>) -> Result<(), SendError> {
        for (name, value) in &self.headers {
            response.set_header(name.clone(), value.clone());
        }
        if let Some(encoding) = self.compression {
            response.set_compress(encoding);
        }
        match self.body {
            Body::Payload(payload) => response.send(payload, self.status).await,
            Body::File { path, options } => response.send_file(&path, &options).await,
            Body::Redirect {
                location,
                permanent,
            } => response.send_redirect(&location, permanent).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::connection::channel;
    use crate::http::response::RequestHints;
    use serde_json::json;

    #[test]
    fn test_constructors_set_content_type() {
        let cases = [
            (Content::html("<b>", StatusCode::OK), "text/html"),
            (Content::text("hi", StatusCode::OK), "text/plain"),
            (Content::json(&json!({"a": 1}), StatusCode::OK).unwrap(), "application/json"),
            (Content::bytes(vec![0u8], "image/png", StatusCode::OK), "image/png"),
        ];
        for (content, expected) in cases {
            assert_eq!(content.headers()[header::CONTENT_TYPE], expected);
            assert_eq!(content.status(), Some(StatusCode::OK));
        }
        assert_eq!(Content::redirect("/", false).status(), None);
    }

    #[tokio::test]
    async fn test_send_json() {
        let (mut conn, handle) = channel();
        let content = Content::json(&json!({"ok": true}), StatusCode::CREATED)
            .unwrap()
            .with_header(
                HeaderName::from_static("x-page"),
                HeaderValue::from_static("demo"),
            );

        let sender = async {
            let mut response = ResponseAdapter::new(&mut conn, RequestHints::default());
            content.send(&mut response).await.unwrap();
        };
        let collect = async {
            let response = handle.response().await.unwrap();
            let (parts, body) = response.into_parts();
            (parts, axum::body::to_bytes(body, usize::MAX).await.unwrap())
        };
        let ((), (parts, body)) = tokio::join!(sender, collect);

        assert_eq!(parts.status, StatusCode::CREATED);
        assert_eq!(parts.headers["content-type"], "application/json; charset=utf-8");
        assert_eq!(parts.headers["x-page"], "demo");
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_compression_override() {
        let (mut conn, _handle) = channel();
        let mut response = ResponseAdapter::new(&mut conn, RequestHints::default());
        response.set_compress(Some(Encoding::Gzip));

        Content::text("x", StatusCode::OK)
            .with_compression(None)
            .send(&mut response)
            .await
            .unwrap();
        assert_eq!(response.compress(), None);
    }
}
