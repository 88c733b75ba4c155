//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body collection)
//!     → connection.rs (ConnectionRequest + ConnectionResponse pair)
//!     → request.rs (derived and gated request members)
//!     → [dispatcher runs the page]
//!     → response.rs (cookies, send, redirect, ranged files)
//!     → connection.rs (head through oneshot, body through bounded channel)
//!     → Send to client
//! ```
//!
//! Supporting modules: `cache.rs` (once-per-request memoization),
//! `cookie.rs`, `range.rs`, `compression.rs`, `session.rs`, `error.rs`.

pub mod cache;
pub mod compression;
pub mod connection;
pub mod cookie;
pub mod error;
pub mod range;
pub mod request;
pub mod response;
pub mod server;
pub mod session;

pub use connection::{ConnectionRequest, ConnectionResponse, ResponseHandle};
pub use error::{HttpError, SendError};
pub use request::{FormData, Params, RequestAdapter, UploadedFile};
pub use response::{Payload, RequestHints, ResponseAdapter, SendFileOptions};
pub use server::{HttpServer, X_REQUEST_ID};
pub use session::{SessionResolver, SessionUser};
