//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → routes + dispatcher → metrics → bind listener → serve
//!
//! Process (shutdown.rs):
//!     Ctrl-C or explicit trigger → stop accepting → drain in-flight requests → exit
//!
//! Request (dispose.rs):
//!     resources registered during dispatch → released newest-first on every exit path
//! ```
//!
//! # Design Decisions
//! - Both levels release through ownership: dropping the owner runs cleanup
//! - Shutdown is a broadcast so any number of tasks can observe it

pub mod dispose;
pub mod shutdown;
pub mod startup;

pub use dispose::{Disposable, Disposables};
pub use shutdown::Shutdown;
