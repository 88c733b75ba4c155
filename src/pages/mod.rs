//! Built-in pages.
//!
//! - `NotFoundPage`: fallback when no route matches
//! - `StaticFilesPage`: files below a root directory, with range support
//! - `HealthPage`: liveness check

mod health;
mod not_found;
mod static_files;

pub use health::HealthPage;
pub use not_found::NotFoundPage;
pub use static_files::StaticFilesPage;
