//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionRequest + ConnectionResponse
//!     → dispatcher.rs (processed guard, scope, body preparation)
//!     → RouteResolver (page type + residual path)
//!     → scope.rs (page instantiated inside the request scope)
//!     → page.rs (Page::all → Content or PageError)
//!     → content.rs (delivery through the response adapter)
//!     → render.rs (JSON/HTML error page when delivery has not started)
//! ```
//!
//! # Design Decisions
//! - One scope per request, released by `Drop`
//! - Pages never see raw connection objects, only adapters
//! - The outcome of every request is reported as a value, never a panic

pub mod content;
pub mod dispatcher;
pub mod page;
pub mod render;
pub mod scope;

pub use content::Content;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use page::{Page, PageContext, PageError, PageType};
pub use scope::{Scope, ServiceProvider};
