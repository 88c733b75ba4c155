//! Static file page.
//!
//! Maps the residual path below its mount onto a root directory and streams
//! the file through `Content::file`, so range requests work unchanged.

use std::path::PathBuf;

use async_trait::async_trait;
use axum::http::StatusCode;
use percent_encoding::percent_decode_str;

use crate::dispatch::{Content, Page, PageContext, PageError, PageType};
use crate::http::response::SendFileOptions;

/// Serves files below `root`.
#[derive(Debug, Clone)]
pub struct StaticFilesPage {
    root: PathBuf,
    max_age: Option<u64>,
}

impl StaticFilesPage {
    pub fn new(root: impl Into<PathBuf>, max_age: Option<u64>) -> Self {
        Self {
            root: root.into(),
            max_age,
        }
    }

    /// Page type building a `StaticFilesPage` for every request.
    pub fn page_type(root: impl Into<PathBuf>, max_age: Option<u64>) -> PageType {
        let page = Self::new(root, max_age);
        PageType::new("static_files", move |_| Box::new(page.clone()) as Box<dyn Page>)
    }

    /// Resolve residual segments to a path below the root.
    ///
    /// Segments arrive percent-encoded and are decoded before checking.
    /// Rejects empty paths, non-UTF-8 names and any segment that could leave
    /// the root.
    fn resolve(&self, segments: &[String]) -> Option<PathBuf> {
        if segments.is_empty() {
            return None;
        }
        let mut path = self.root.clone();
        for segment in segments {
            let segment = percent_decode_str(segment).decode_utf8().ok()?;
            if segment.is_empty()
                || segment == ".."
                || segment == "."
                || segment.contains(['/', '\\', '\0'])
            {
                return None;
            }
            path.push(&*segment);
        }
        Some(path)
    }

    fn not_found() -> Content {
        Content::text("Not Found", StatusCode::NOT_FOUND)
    }
}

#[async_trait]
impl Page for StaticFilesPage {
    async fn all(&mut self, cx: &mut PageContext<'_, '_>) -> Result<Content, PageError> {
        let Some(path) = self.resolve(&cx.child_path) else {
            tracing::debug!(child_path = ?cx.child_path, "Rejected static path");
            return Ok(Self::not_found());
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Ok(Self::not_found()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::not_found()),
            Err(e) => {
                return Err(PageError::new(format!("cannot read {}", path.display())).with_source(e))
            }
        }

        let options = SendFileOptions {
            max_age: self.max_age,
            ..Default::default()
        };
        Ok(Content::file(path, options))
    }

    fn cache_control(&self) -> String {
        match self.max_age {
            Some(max_age) => format!("public, max-age={max_age}"),
            None => "no-cache".to_string(),
        }
    }
}
