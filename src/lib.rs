//! Server-side HTTP request pipeline.
//!
//! Wraps raw connection objects in request/response adapters, resolves a
//! page for each request, runs it inside a disposable scope and renders
//! failures as JSON or HTML.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pages;
pub mod routing;

pub use config::PagesConfig;
pub use dispatch::{Content, DispatchOutcome, Dispatcher, Page, PageContext, PageError, PageType};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
