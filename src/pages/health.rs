use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use crate::dispatch::{Content, Page, PageContext, PageError};

/// Liveness check answering `{"status":"ok"}`.
#[derive(Debug, Default)]
pub struct HealthPage;

#[async_trait]
impl Page for HealthPage {
    async fn all(&mut self, _cx: &mut PageContext<'_, '_>) -> Result<Content, PageError> {
        Ok(Content::json(&json!({ "status": "ok" }), StatusCode::OK)?)
    }

    fn cache_control(&self) -> String {
        "no-store".to_string()
    }
}
