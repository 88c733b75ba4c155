//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the page for a request path and method
//! - Return the matched page with its residual path, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan (acceptable for typical route counts)
//! - Higher priority first, then longer patterns, then registration order

use async_trait::async_trait;
use axum::http::Method;

use crate::dispatch::page::PageType;
use crate::routing::matcher::{MethodFilter, PathPattern};
use crate::routing::{ResolvedRoute, RouteContext, RouteResolver};

/// One entry of a [`RouteTable`].
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: PathPattern,
    method: MethodFilter,
    priority: u32,
    page: PageType,
}

impl Route {
    /// Route `pattern` (e.g. `/api/users/{id}`) to `page` for any method.
    pub fn new(name: impl Into<String>, pattern: &str, page: PageType) -> Self {
        Self {
            name: name.into(),
            pattern: PathPattern::parse(pattern),
            method: MethodFilter::any(),
            priority: 0,
            page,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = MethodFilter::only(method);
        self
    }

    /// Higher priority routes are checked first.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Prefix route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        // Stable sort keeps registration order among equals.
        self.routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.pattern.len().cmp(&a.pattern.len()))
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route matching `method` and `path`.
    pub fn lookup(&self, method: &Method, path: &[String]) -> Option<ResolvedRoute> {
        self.routes.iter().find_map(|route| {
            if !route.method.matches(method) {
                return None;
            }
            let params = route.pattern.match_prefix(path)?;
            tracing::trace!(route = %route.name, "Route matched");
            Some(ResolvedRoute {
                page: route.page.clone(),
                child_path: path[route.pattern.len()..].to_vec(),
                params,
            })
        })
    }
}

#[async_trait]
impl RouteResolver for RouteTable {
    async fn resolve(&self, cx: &RouteContext<'_>) -> Option<ResolvedRoute> {
        self.lookup(cx.method, cx.path)
    }
}
