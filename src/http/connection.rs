//! Raw connection objects owned by the host.
//!
//! # Responsibilities
//! - Hold the inbound request exactly as received (method, target, headers, peer)
//! - Carry the explicit `processed` marker used by the dispatcher guard
//! - Hand the response head to the host and stream body chunks with backpressure
//!
//! # Design Decisions
//! - The body channel is bounded: a write suspends until the client drains
//! - A dropped client surfaces as `SendError::ConnectionClosed` on the next write
//! - The request body is collected by the host before dispatch

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{request, HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::{mpsc, oneshot};

use crate::http::error::SendError;

/// Number of body chunks buffered between the writer and the client.
const BODY_CHANNEL_CAPACITY: usize = 8;

type Chunk = Result<Bytes, std::io::Error>;

/// One inbound call, immutable apart from the `processed` marker.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    method: Method,
    target: String,
    headers: HeaderMap,
    authority: Option<String>,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
    processed: bool,
}

impl ConnectionRequest {
    /// Build from the parts of an inbound `http` request.
    pub fn from_parts(parts: request::Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Self {
            method: parts.method,
            target,
            headers: parts.headers,
            // HTTP/2 carries the authority as a pseudo-header, which ends up in the URI.
            authority: parts.uri.authority().map(|a| a.to_string()),
            remote_addr,
            body,
            processed: false,
        }
    }

    /// Start building a request by hand.
    pub fn builder(method: Method, target: impl Into<String>) -> ConnectionRequestBuilder {
        ConnectionRequestBuilder {
            inner: Self {
                method,
                target: target.into(),
                headers: HeaderMap::new(),
                authority: None,
                remote_addr: None,
                body: Bytes::new(),
                processed: false,
            },
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request target (path and query) as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Authority from the HTTP/2 pseudo-header, if any.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Flag the request as processed. Returns `true` if it already was.
    pub fn mark_processed(&mut self) -> bool {
        std::mem::replace(&mut self.processed, true)
    }
}

/// Builder for hand-made requests.
#[derive(Debug)]
pub struct ConnectionRequestBuilder {
    inner: ConnectionRequest,
}

impl ConnectionRequestBuilder {
    /// Append a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.inner.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid header"),
        }
        self
    }

    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.inner.authority = Some(authority.into());
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.inner.remote_addr = Some(addr);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> ConnectionRequest {
        self.inner
    }
}

/// The outbound half of a connection.
#[derive(Debug)]
pub struct ConnectionResponse {
    head: Option<oneshot::Sender<Response<Body>>>,
    body: Option<mpsc::Sender<Chunk>>,
    ended: bool,
}

/// Host side of a [`ConnectionResponse`].
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Response<Body>>,
}

/// Create a connected response/handle pair.
pub fn channel() -> (ConnectionResponse, ResponseHandle) {
    let (tx, rx) = oneshot::channel();
    (
        ConnectionResponse {
            head: Some(tx),
            body: None,
            ended: false,
        },
        ResponseHandle { rx },
    )
}

impl ConnectionResponse {
    /// Send the status line and headers. The body follows through [`write`](Self::write).
    pub fn write_head(&mut self, status: StatusCode, headers: HeaderMap) -> Result<(), SendError> {
        let head = self.head.take().ok_or(SendError::HeadersAlreadySent)?;

        let (tx, rx) = mpsc::channel::<Chunk>(BODY_CHANNEL_CAPACITY);
        let chunks = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });

        let mut response = Response::new(Body::from_stream(chunks));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        head.send(response).map_err(|_| SendError::ConnectionClosed)?;
        self.body = Some(tx);
        Ok(())
    }

    /// Write one body chunk, waiting for channel capacity.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), SendError> {
        let tx = match &self.body {
            Some(tx) => tx,
            None if self.ended => return Err(SendError::ConnectionClosed),
            None => return Err(SendError::HeadersNotSent),
        };
        tx.send(Ok(chunk))
            .await
            .map_err(|_| SendError::ConnectionClosed)
    }

    /// Finish the response body.
    pub fn end(&mut self) {
        self.body = None;
        self.ended = true;
    }

    pub fn is_head_sent(&self) -> bool {
        self.head.is_none()
    }
}

impl ResponseHandle {
    /// Wait for the response head.
    pub async fn response(self) -> Result<Response<Body>, SendError> {
        self.rx.await.map_err(|_| SendError::NoResponse)
    }
}
