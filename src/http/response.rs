//! Response adapter.
//!
//! # Responsibilities
//! - Stage status and headers for one response, then write them exactly once
//! - Replace `set-cookie` entries by name instead of duplicating them
//! - Deliver text/bytes with optional negotiated compression
//! - Stream files with single byte-range support
//!
//! # Design Decisions
//! - Every terminal operation returns `Result<(), SendError>` and logs failures;
//!   the caller decides whether a failure is still renderable
//! - `content-length` always describes the bytes actually written
//! - Range requests bypass compression

use std::io::SeekFrom;
use std::path::Path;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::http::compression::{accepted_encodings, Encoding};
use crate::http::connection::ConnectionResponse;
use crate::http::cookie::{self, CookieOptions};
use crate::http::error::SendError;
use crate::http::range::RangeOutcome;
use crate::http::request::RequestAdapter;
use crate::observability::metrics;

/// Read size for streamed file delivery.
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// The parts of the request the response needs: range and encoding negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHints {
    pub range: Option<String>,
    pub accept_encoding: Vec<String>,
}

impl RequestHints {
    pub fn from_request(request: &RequestAdapter<'_>) -> Self {
        Self {
            range: request.header("range").map(str::to_string),
            accept_encoding: accepted_encodings(
                request
                    .headers()
                    .get_all(header::ACCEPT_ENCODING)
                    .iter()
                    .filter_map(|v| v.to_str().ok()),
            ),
        }
    }

    fn accepts(&self, encoding: Encoding) -> bool {
        self.accept_encoding.iter().any(|e| e == encoding.as_str())
    }
}

/// Body handed to [`ResponseAdapter::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Sent as UTF-8 with `charset=utf-8` added to the content type.
    Text(String),
    Bytes(Bytes),
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

/// Extra behaviour for [`ResponseAdapter::send_file`].
#[derive(Debug, Clone, Default)]
pub struct SendFileOptions {
    /// Headers applied before delivery.
    pub headers: HeaderMap,
    /// Emits `cache-control: public, max-age=N`.
    pub max_age: Option<u64>,
    /// Adds `immutable` to the `max_age` cache-control value.
    pub immutable: bool,
}

/// Higher-level view over one outbound response.
#[derive(Debug)]
pub struct ResponseAdapter<'c> {
    conn: &'c mut ConnectionResponse,
    status: StatusCode,
    headers: HeaderMap,
    compress: Option<Encoding>,
    hints: RequestHints,
}

impl<'c> ResponseAdapter<'c> {
    pub fn new(conn: &'c mut ConnectionResponse, hints: RequestHints) -> Self {
        Self {
            conn,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            compress: None,
            hints,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: &HeaderName) {
        self.headers.remove(name);
    }

    pub fn compress(&self) -> Option<Encoding> {
        self.compress
    }

    pub fn set_compress(&mut self, encoding: Option<Encoding>) {
        self.compress = encoding;
    }

    pub fn hints(&self) -> &RequestHints {
        &self.hints
    }

    pub fn is_head_sent(&self) -> bool {
        self.conn.is_head_sent()
    }

    /// Set a cookie, replacing any earlier `set-cookie` entry with the same name.
    pub fn cookie(
        &mut self,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), SendError> {
        let serialized = cookie::serialize(name, value, options);
        let entry = HeaderValue::from_str(&serialized)
            .map_err(|_| SendError::InvalidHeader(header::SET_COOKIE.to_string()))?;

        let kept: Vec<HeaderValue> = self
            .headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter(|v| !v.to_str().is_ok_and(|s| cookie::is_named(s, name)))
            .cloned()
            .collect();

        self.headers.remove(header::SET_COOKIE);
        for value in kept {
            self.headers.append(header::SET_COOKIE, value);
        }
        self.headers.append(header::SET_COOKIE, entry);
        Ok(())
    }

    /// Send a complete body and end the response.
    ///
    /// `status` replaces the current status when given; otherwise the last
    /// status set on this response is reused.
    pub async fn send(
        &mut self,
        payload: impl Into<Payload>,
        status: Option<StatusCode>,
    ) -> Result<(), SendError> {
        let result = self.send_payload(payload.into(), status).await;
        self.observe("send", &result);
        result
    }

    /// Redirect to `location`: 301 when `permanent`, 302 otherwise.
    pub async fn send_redirect(&mut self, location: &str, permanent: bool) -> Result<(), SendError> {
        let result = self.write_redirect(location, permanent);
        self.observe("redirect", &result);
        result
    }

    /// Stream a file, honouring a single `range: bytes=<start>-<end>` request.
    pub async fn send_file(
        &mut self,
        path: impl AsRef<Path>,
        options: &SendFileOptions,
    ) -> Result<(), SendError> {
        let result = self.stream_file(path.as_ref(), options).await;
        self.observe("file", &result);
        result
    }

    /// Write `text` by any means left, ignoring failures.
    ///
    /// Before the head is written this sends a `text/plain` 500; afterwards the
    /// text is appended to the body already in flight.
    pub async fn send_raw(&mut self, text: &str) {
        let chunk = Bytes::copy_from_slice(text.as_bytes());
        if !self.conn.is_head_sent() {
            self.status = StatusCode::INTERNAL_SERVER_ERROR;
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(chunk.len()));
            if self.conn.write_head(self.status, headers).is_err() {
                return;
            }
        }
        if let Err(e) = self.conn.write(chunk).await {
            tracing::debug!(error = %e, "Raw write failed");
        }
        self.conn.end();
    }

    async fn send_payload(
        &mut self,
        payload: Payload,
        status: Option<StatusCode>,
    ) -> Result<(), SendError> {
        if let Some(status) = status {
            self.status = status;
        }
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        }

        let mut body = match payload {
            Payload::Text(text) => {
                let content_type = self
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(';').next())
                    .unwrap_or("text/html")
                    .trim()
                    .to_string();
                let value = HeaderValue::from_str(&format!("{content_type}; charset=utf-8"))
                    .map_err(|_| SendError::InvalidHeader(header::CONTENT_TYPE.to_string()))?;
                self.headers.insert(header::CONTENT_TYPE, value);
                Bytes::from(text)
            }
            Payload::Bytes(bytes) => bytes,
        };

        if let Some(encoding) = self.compress.filter(|e| self.hints.accepts(*e)) {
            body = Bytes::from(encoding.encode(&body).map_err(SendError::Compression)?);
            self.headers.insert(
                header::CONTENT_ENCODING,
                HeaderValue::from_static(encoding.as_str()),
            );
            self.headers
                .append(header::VARY, HeaderValue::from_static("accept-encoding"));
        }
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        self.conn.write_head(self.status, self.headers.clone())?;
        if !body.is_empty() {
            self.conn.write(body).await?;
        }
        self.conn.end();
        Ok(())
    }

    fn write_redirect(&mut self, location: &str, permanent: bool) -> Result<(), SendError> {
        let location = HeaderValue::from_str(location)
            .map_err(|_| SendError::InvalidHeader(header::LOCATION.to_string()))?;
        self.status = if permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::FOUND
        };
        self.headers.insert(header::LOCATION, location);
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));

        self.conn.write_head(self.status, self.headers.clone())?;
        self.conn.end();
        Ok(())
    }

    async fn stream_file(&mut self, path: &Path, options: &SendFileOptions) -> Result<(), SendError> {
        let mut file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(SendError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }
        let size = metadata.len();

        for (name, value) in &options.headers {
            self.headers.insert(name.clone(), value.clone());
        }
        if let Some(max_age) = options.max_age {
            let directive = if options.immutable {
                format!("public, max-age={max_age}, immutable")
            } else {
                format!("public, max-age={max_age}")
            };
            let value = HeaderValue::from_str(&directive)
                .map_err(|_| SendError::InvalidHeader(header::CACHE_CONTROL.to_string()))?;
            self.headers.insert(header::CACHE_CONTROL, value);
        }
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let value = HeaderValue::from_str(mime.essence_str())
                .map_err(|_| SendError::InvalidHeader(header::CONTENT_TYPE.to_string()))?;
            self.headers.insert(header::CONTENT_TYPE, value);
        }
        self.headers
            .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        let outcome = RangeOutcome::resolve(self.hints.range.as_deref(), size);
        if let Some(content_range) = outcome.content_range(size) {
            let value = HeaderValue::from_str(&content_range)
                .map_err(|_| SendError::InvalidHeader(header::CONTENT_RANGE.to_string()))?;
            self.headers.insert(header::CONTENT_RANGE, value);
        }

        let (start, len) = match outcome {
            RangeOutcome::Full => {
                self.status = StatusCode::OK;
                (0, size)
            }
            RangeOutcome::Partial { start, end } => {
                self.status = StatusCode::PARTIAL_CONTENT;
                (start, end - start + 1)
            }
            RangeOutcome::Unsatisfiable => {
                tracing::debug!(
                    path = %path.display(),
                    range = ?self.hints.range,
                    size,
                    "Range not satisfiable"
                );
                self.status = StatusCode::RANGE_NOT_SATISFIABLE;
                self.headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
                self.conn.write_head(self.status, self.headers.clone())?;
                self.conn.end();
                return Ok(());
            }
        };

        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        self.conn.write_head(self.status, self.headers.clone())?;

        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        let mut reader = file.take(len);
        let mut written = 0u64;
        loop {
            let mut buf = BytesMut::with_capacity(FILE_CHUNK_SIZE);
            let read = reader.read_buf(&mut buf).await?;
            if read == 0 {
                break;
            }
            written += read as u64;
            self.conn.write(buf.freeze()).await?;
        }
        if written < len {
            return Err(SendError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{} shrank during delivery", path.display()),
            )));
        }

        self.conn.end();
        Ok(())
    }

    fn observe(&self, operation: &'static str, result: &Result<(), SendError>) {
        if let Err(e) = result {
            tracing::warn!(
                operation,
                status = self.status.as_u16(),
                head_sent = self.conn.is_head_sent(),
                error = %e,
                "Response delivery failed"
            );
            metrics::record_send_fault(operation);
        }
    }
}
