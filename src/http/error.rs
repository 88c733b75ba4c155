//! Error types for the transport adapters.

use thiserror::Error;

/// Failures raised while reading from a wrapped request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A gated request member was read before its preparation call ran.
    #[error("`{member}` is not available; call `{requires}` before accessing this member")]
    PreconditionNotMet {
        member: &'static str,
        requires: &'static str,
    },

    /// The request body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl HttpError {
    pub(crate) fn precondition(member: &'static str, requires: &'static str) -> Self {
        Self::PreconditionNotMet { member, requires }
    }
}

/// Failures raised while delivering bytes to the client.
#[derive(Debug, Error)]
pub enum SendError {
    /// The client side of the connection went away mid-response.
    #[error("Connection closed before the response completed")]
    ConnectionClosed,

    /// A second response head was written on the same connection.
    #[error("Response headers were already sent")]
    HeadersAlreadySent,

    /// The pipeline finished without writing a response head.
    #[error("No response was written")]
    NoResponse,

    /// A body chunk was written before the response head.
    #[error("Response headers have not been sent")]
    HeadersNotSent,

    #[error("Compression failed: {0}")]
    Compression(std::io::Error),

    #[error("Invalid header value for `{0}`")]
    InvalidHeader(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
