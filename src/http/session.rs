//! Authentication hook point.
//!
//! The pipeline does not define authentication policy. A [`SessionResolver`]
//! supplied by the application decides who the caller is; the request adapter
//! only stores the answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::error::HttpError;
use crate::http::request::RequestAdapter;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SessionUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            roles: Vec::new(),
        }
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Resolves the caller of a request. `Ok(None)` means anonymous.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, request: &RequestAdapter<'_>) -> Result<Option<SessionUser>, HttpError>;
}
