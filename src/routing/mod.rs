//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (method, path segments, params, scope)
//!     → RouteResolver::resolve
//!     → router.rs (RouteTable lookup)
//!     → matcher.rs (segment and method conditions)
//!     → Return: page type + residual path, or no match
//! ```
//!
//! # Design Decisions
//! - The dispatcher only depends on the `RouteResolver` trait
//! - Routes are compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

use async_trait::async_trait;
use axum::http::Method;

use crate::dispatch::page::PageType;
use crate::dispatch::scope::Scope;
use crate::http::request::Params;

pub use router::{Route, RouteTable};

/// What a resolver sees of the request.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub scope: &'a Scope,
    pub method: &'a Method,
    /// Non-empty path segments, still percent-encoded.
    pub path: &'a [String],
    /// Query and body parameters gathered so far.
    pub params: &'a Params,
}

/// A page chosen for a request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub page: PageType,
    /// Path segments below the matched route.
    pub child_path: Vec<String>,
    /// Parameters captured from the route pattern.
    pub params: Params,
}

/// Maps a request to the page that handles it.
#[async_trait]
pub trait RouteResolver: Send + Sync {
    async fn resolve(&self, cx: &RouteContext<'_>) -> Option<ResolvedRoute>;
}
