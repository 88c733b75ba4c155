//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all route into the dispatcher
//! - Wire up middleware (tracing, timeout, request ID)
//! - Collect request bodies under the configured limit
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::PagesConfig;
use crate::dispatch::Dispatcher;
use crate::http::connection::{self, ConnectionRequest};
use crate::lifecycle::shutdown;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 for requests arriving without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP server hosting the dispatcher.
pub struct HttpServer {
    router: Router,
    config: PagesConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: PagesConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher,
            max_body_bytes: config.http.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &PagesConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.http.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &PagesConfig {
        &self.config
    }
}

/// Catch-all handler.
/// Collects the body, then runs the dispatcher in its own task and returns
/// the response head as soon as it is written.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                limit = state.max_body_bytes,
                error = %e,
                "Failed to read request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut request = ConnectionRequest::from_parts(parts, body, remote_addr);
    let (mut response, handle) = connection::channel();
    let dispatcher = state.dispatcher.clone();
    let task = tokio::spawn(
        async move { dispatcher.process(&mut request, &mut response).await }.in_current_span(),
    );

    match handle.response().await {
        Ok(response) => response,
        Err(e) => {
            match task.await {
                Ok(outcome) => {
                    tracing::error!(error = %e, outcome = outcome.as_str(), "Dispatcher wrote no response")
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Dispatcher task failed")
                }
            }
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
