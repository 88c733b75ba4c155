//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::response::Parts;
use bytes::Bytes;
use tokio::net::TcpListener;

use server_pages::config::PagesConfig;
use server_pages::http::connection::{channel, ConnectionRequest};
use server_pages::{DispatchOutcome, Dispatcher, HttpServer, Shutdown};

/// What the client saw of one dispatched request.
pub struct Exchange {
    pub outcome: DispatchOutcome,
    pub parts: Parts,
    pub body: Bytes,
}

impl Exchange {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("body is JSON")
    }
}

/// Run `request` through `dispatcher` while collecting the response like a host would.
pub async fn exchange(dispatcher: &Dispatcher, mut request: ConnectionRequest) -> Exchange {
    let (mut response, handle) = channel();
    let process = dispatcher.process(&mut request, &mut response);
    let collect = async {
        let response = handle.response().await.expect("a response head");
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("a complete body");
        (parts, body)
    };
    let (outcome, (parts, body)) = tokio::join!(process, collect);
    Exchange {
        outcome,
        parts,
        body,
    }
}

/// Write `len` patterned bytes to `dir/name`, returning the contents.
pub fn write_fixture(dir: &Path, name: &str, len: usize) -> Vec<u8> {
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(dir.join(name), &data).unwrap();
    data
}

/// Serve `dispatcher` on an ephemeral port until the returned `Shutdown` fires.
pub async fn start_server(config: PagesConfig, dispatcher: Dispatcher) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(dispatcher));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// A client that never pools or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
