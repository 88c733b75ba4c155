//! Request dispatcher.
//!
//! # Responsibilities
//! - Ignore connections that were already processed
//! - Open a scope per request and release it on every exit path
//! - Prepare the request (body, form bodies, optional session), merge parameters
//! - Resolve a page, run it, deliver its content
//! - Render failures as JSON or HTML while the response head is still unsent
//!
//! # Design Decisions
//! - "Sent" means the response head was written; after that, faults are logged only
//! - A failure while rendering an error falls back to raw text and is never retried
//! - Parameter precedence: route params < query < body

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue};
use serde_json::Value;
use tracing::Instrument;

use crate::dispatch::page::{PageContext, PageError, PageType};
use crate::dispatch::render;
use crate::dispatch::scope::{Scope, ServiceProvider};
use crate::http::compression::Encoding;
use crate::http::connection::{ConnectionRequest, ConnectionResponse};
use crate::http::error::{HttpError, SendError};
use crate::http::request::{Params, RequestAdapter};
use crate::http::response::{RequestHints, ResponseAdapter};
use crate::http::session::SessionResolver;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::pages::NotFoundPage;
use crate::routing::{ResolvedRoute, RouteContext, RouteResolver};

/// How one call to [`Dispatcher::process`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The connection was already processed; nothing was written.
    Ignored,
    Succeeded,
    /// A fault was rendered as an error response.
    ErrorReported,
    /// Rendering the error failed too; raw text was written instead.
    DoubleFault,
    /// A fault happened after the response head was sent and was only logged.
    SendFailed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::Succeeded => "succeeded",
            DispatchOutcome::ErrorReported => "error_reported",
            DispatchOutcome::DoubleFault => "double_fault",
            DispatchOutcome::SendFailed => "send_failed",
        }
    }
}

enum Fault {
    Page(PageError),
    Send(SendError),
}

impl From<PageError> for Fault {
    fn from(err: PageError) -> Self {
        Fault::Page(err)
    }
}

impl From<HttpError> for Fault {
    fn from(err: HttpError) -> Self {
        Fault::Page(err.into())
    }
}

impl From<SendError> for Fault {
    fn from(err: SendError) -> Self {
        Fault::Send(err)
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::Page(err) => write!(f, "{}", err.detail()),
            Fault::Send(err) => write!(f, "{err}"),
        }
    }
}

/// Runs requests end to end.
pub struct Dispatcher {
    resolver: Arc<dyn RouteResolver>,
    services: Arc<ServiceProvider>,
    fallback: PageType,
    sessions: Option<Arc<dyn SessionResolver>>,
    default_compression: Option<Encoding>,
}

impl Dispatcher {
    pub fn new(resolver: Arc<dyn RouteResolver>, services: Arc<ServiceProvider>) -> Self {
        Self {
            resolver,
            services,
            fallback: PageType::of::<NotFoundPage>("not_found"),
            sessions: None,
            default_compression: None,
        }
    }

    /// Page used when the resolver finds nothing.
    pub fn with_fallback(mut self, page: PageType) -> Self {
        self.fallback = page;
        self
    }

    /// Authorize every request with `resolver` before its page runs.
    pub fn with_session_resolver(mut self, resolver: Arc<dyn SessionResolver>) -> Self {
        self.sessions = Some(resolver);
        self
    }

    pub fn with_default_compression(mut self, encoding: Option<Encoding>) -> Self {
        self.default_compression = encoding;
        self
    }

    /// Handle one connection. Never fails: every fault ends in a response or a log line.
    pub async fn process(
        &self,
        request: &mut ConnectionRequest,
        response: &mut ConnectionResponse,
    ) -> DispatchOutcome {
        if request.mark_processed() {
            tracing::debug!(uri = request.target(), "Request already processed");
            return DispatchOutcome::Ignored;
        }
        let start = Instant::now();

        let conn: &ConnectionRequest = request;
        let mut request = RequestAdapter::new(conn);
        let mut response = ResponseAdapter::new(response, RequestHints::from_request(&request));
        response.set_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response.set_compress(self.default_compression);

        let scope = self.services.create_scope();
        let span = tracing::info_span!(
            "dispatch",
            method = %conn.method(),
            path = %request.path(),
            request_id = request.header(X_REQUEST_ID).unwrap_or("-"),
            scope = %scope.id(),
        );

        let outcome = self
            .dispatch(&mut request, &mut response, &scope)
            .instrument(span)
            .await;
        drop(scope);

        metrics::record_request(
            conn.method().as_str(),
            response.status().as_u16(),
            outcome.as_str(),
            start,
        );
        outcome
    }

    async fn dispatch<'c>(
        &self,
        request: &mut RequestAdapter<'c>,
        response: &mut ResponseAdapter<'c>,
        scope: &Scope,
    ) -> DispatchOutcome {
        let fault = match self.run(request, response, scope).await {
            Ok(()) => {
                tracing::debug!(status = response.status().as_u16(), "Request completed");
                return DispatchOutcome::Succeeded;
            }
            Err(fault) => fault,
        };

        if response.is_head_sent() {
            tracing::error!(error = %fault, "Request failed after the response started");
            return DispatchOutcome::SendFailed;
        }

        let error = match fault {
            Fault::Page(err) => err,
            Fault::Send(err) => PageError::from(err),
        };
        if error.status().is_server_error() {
            tracing::error!(status = error.status().as_u16(), error = %error.detail(), "Request failed");
        } else {
            tracing::warn!(status = error.status().as_u16(), error = %error, "Request rejected");
        }

        match render::render_error(request, response, &error).await {
            Ok(()) => DispatchOutcome::ErrorReported,
            Err(render_error) => {
                tracing::error!(
                    error = %render_error,
                    original = %error,
                    "Failed to render error response"
                );
                response.send_raw(&render_error.to_string()).await;
                DispatchOutcome::DoubleFault
            }
        }
    }

    async fn run<'c>(
        &self,
        request: &mut RequestAdapter<'c>,
        response: &mut ResponseAdapter<'c>,
        scope: &Scope,
    ) -> Result<(), Fault> {
        let body = request.ensure_body()?.clone();
        if request.has_form_body() {
            request.ensure_form().await?;
        }
        if let Some(sessions) = &self.sessions {
            request.authorize(sessions.as_ref()).await?;
        }

        let method = request.method().clone();
        let path: Vec<String> = request
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let query = request.query().clone();

        let mut params: Params = query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        if let Value::Object(fields) = &body {
            params.extend(fields.clone());
        }

        let resolved = self
            .resolver
            .resolve(&RouteContext {
                scope,
                method: &method,
                path: &path,
                params: &params,
            })
            .await;
        let ResolvedRoute {
            page: page_type,
            child_path,
            params: mut merged,
        } = match resolved {
            Some(route) => route,
            None => {
                tracing::debug!("No route matched, using fallback page");
                ResolvedRoute {
                    page: self.fallback.clone(),
                    child_path: path,
                    params: Params::new(),
                }
            }
        };
        merged.extend(params);
        let params = request.ensure_params(merged).clone();

        let mut page = scope.create(&page_type);
        tracing::debug!(page = page_type.name(), "Running page");
        let content = {
            let mut cx = PageContext {
                method,
                child_path,
                body,
                query,
                params,
                request: &*request,
                response: &mut *response,
                scope,
            };
            page.all(&mut cx).await?
        };

        let cache_control = HeaderValue::from_str(&page.cache_control())
            .map_err(|_| SendError::InvalidHeader(header::CACHE_CONTROL.to_string()))?;
        response.set_header(header::CACHE_CONTROL, cache_control);
        response.remove_header(&header::ETAG);

        content.send(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fallback", &self.fallback)
            .field("services", &self.services)
            .field("sessions", &self.sessions.is_some())
            .field("default_compression", &self.default_compression)
            .finish()
    }
}
