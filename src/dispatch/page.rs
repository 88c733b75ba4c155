//! Handler contract.
//!
//! A [`Page`] is created inside the request scope, receives a [`PageContext`]
//! and returns [`Content`] or a [`PageError`].

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::dispatch::content::Content;
use crate::dispatch::scope::Scope;
use crate::http::error::{HttpError, SendError};
use crate::http::request::{Params, RequestAdapter};
use crate::http::response::ResponseAdapter;

/// Everything a page sees of its request.
pub struct PageContext<'a, 'c> {
    pub method: Method,
    /// Path segments below the matched route.
    pub child_path: Vec<String>,
    pub body: Value,
    pub query: HashMap<String, String>,
    /// Route parameters, then query, then body; later sources win.
    pub params: Params,
    pub request: &'a RequestAdapter<'c>,
    pub response: &'a mut ResponseAdapter<'c>,
    pub scope: &'a Scope,
}

/// A request handler.
#[async_trait]
pub trait Page: Send {
    async fn all(&mut self, cx: &mut PageContext<'_, '_>) -> Result<Content, PageError>;

    /// `cache-control` value copied onto the response after `all` returns.
    fn cache_control(&self) -> String {
        "no-cache".to_string()
    }
}

type PageFactory = Arc<dyn Fn(&Scope) -> Box<dyn Page> + Send + Sync>;

/// Identity of a page: a name for logs and a way to build it.
#[derive(Clone)]
pub struct PageType {
    name: &'static str,
    factory: PageFactory,
}

impl PageType {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&Scope) -> Box<dyn Page> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Arc::new(factory),
        }
    }

    /// A page built with `Default`.
    pub fn of<P: Page + Default + 'static>(name: &'static str) -> Self {
        Self::new(name, |_| Box::new(P::default()) as Box<dyn Page>)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn instantiate(&self, scope: &Scope) -> Box<dyn Page> {
        (self.factory)(scope)
    }
}

impl std::fmt::Debug for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageType").field("name", &self.name).finish()
    }
}

/// A failure raised by a page or by request preparation.
///
/// `error_model` is spread into JSON error bodies, which lets a page hand the
/// client a structured error code alongside the message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PageError {
    message: String,
    status: StatusCode,
    error_model: Option<Map<String, Value>>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl PageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error_model: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_model(mut self, model: Map<String, Value>) -> Self {
        self.error_model = Some(model);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error_model(&self) -> Option<&Map<String, Value>> {
        self.error_model.as_ref()
    }

    /// The message followed by its chain of causes.
    pub fn detail(&self) -> String {
        let mut detail = self.message.clone();
        let mut cause = self.source();
        while let Some(err) = cause {
            detail.push_str("\n  caused by: ");
            detail.push_str(&err.to_string());
            cause = err.source();
        }
        detail
    }
}

impl From<HttpError> for PageError {
    fn from(err: HttpError) -> Self {
        let status = match err {
            HttpError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        PageError::new(err.to_string())
            .with_status(status)
            .with_source(err)
    }
}

impl From<SendError> for PageError {
    fn from(err: SendError) -> Self {
        PageError::new(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for PageError {
    fn from(err: serde_json::Error) -> Self {
        PageError::new(err.to_string()).with_source(err)
    }
}
