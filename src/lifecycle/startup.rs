//! Startup orchestration.
//!
//! # Responsibilities
//! - Assemble the route table and dispatcher from configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::PagesConfig;
use crate::dispatch::{Dispatcher, PageType, ServiceProvider};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::pages::{HealthPage, StaticFilesPage};
use crate::routing::{Route, RouteTable};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid address `{0}`")]
    InvalidAddress(String),

    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Built-in routes: `/health`, plus static files when a root is configured.
pub fn default_routes(config: &PagesConfig) -> RouteTable {
    let mut routes = RouteTable::new().route(
        Route::new("health", "/health", PageType::of::<HealthPage>("health")).method(Method::GET),
    );
    if let Some(root) = &config.files.root {
        routes = routes.route(
            Route::new(
                "static_files",
                &config.files.mount,
                StaticFilesPage::page_type(root.clone(), config.files.max_age_secs),
            )
            .method(Method::GET),
        );
    }
    routes
}

/// Dispatcher over the built-in routes, with the config registered as a singleton.
pub fn build_dispatcher(config: &PagesConfig) -> Dispatcher {
    let services = Arc::new(ServiceProvider::new().with_singleton(config.clone()));
    Dispatcher::new(Arc::new(default_routes(config)), services)
        .with_default_compression(config.http.default_compression)
}

/// Start every subsystem and serve until `shutdown` fires.
pub async fn start(config: PagesConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::InvalidAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let dispatcher = Arc::new(build_dispatcher(&config));
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        max_body_bytes = config.http.max_body_bytes,
        request_timeout_secs = config.http.request_timeout_secs,
        static_root = ?config.files.root,
        "Listening for connections"
    );

    let server = HttpServer::new(config, dispatcher);
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes_without_files() {
        assert_eq!(default_routes(&PagesConfig::default()).len(), 1);
    }

    #[test]
    fn test_default_routes_with_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PagesConfig::default();
        config.files.root = Some(dir.path().to_path_buf());

        let routes = default_routes(&config);
        assert_eq!(routes.len(), 2);
        let path = vec!["static".to_string(), "app.js".to_string()];
        let resolved = routes.lookup(&Method::GET, &path).unwrap();
        assert_eq!(resolved.page.name(), "static_files");
        assert_eq!(resolved.child_path, vec!["app.js"]);
    }
}
