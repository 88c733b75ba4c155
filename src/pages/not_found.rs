use async_trait::async_trait;
use axum::http::StatusCode;

use crate::dispatch::{Content, Page, PageContext, PageError};

/// Answers 404 for anything nobody else handles.
#[derive(Debug, Default)]
pub struct NotFoundPage;

#[async_trait]
impl Page for NotFoundPage {
    async fn all(&mut self, cx: &mut PageContext<'_, '_>) -> Result<Content, PageError> {
        tracing::debug!(path = %cx.request.path(), "No page for path");
        Ok(Content::text(
            format!("Cannot {} /{}", cx.method, cx.child_path.join("/")),
            StatusCode::NOT_FOUND,
        ))
    }
}
