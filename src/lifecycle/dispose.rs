//! Request-scoped cleanup.
//!
//! Everything registered on a [`Disposables`] list is released exactly once,
//! in reverse registration order, either by an explicit `dispose_all` or when
//! the owner is dropped. Dropping covers every exit path of a request.

use std::sync::{Mutex, PoisonError};

/// A resource released at the end of a request.
pub trait Disposable: Send {
    fn dispose(self: Box<Self>);
}

impl<F> Disposable for F
where
    F: FnOnce() + Send,
{
    fn dispose(self: Box<Self>) {
        (*self)()
    }
}

/// Ordered list of pending disposables.
#[derive(Default)]
pub struct Disposables {
    items: Mutex<Vec<Box<dyn Disposable>>>,
}

impl Disposables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a disposable. Registering after `dispose_all` is allowed; the
    /// item is released on the next `dispose_all` or on drop.
    pub fn push(&self, item: Box<dyn Disposable>) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release everything registered so far, newest first.
    pub fn dispose_all(&self) {
        let items = std::mem::take(
            &mut *self.items.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for item in items.into_iter().rev() {
            item.dispose();
        }
    }
}

impl Drop for Disposables {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl std::fmt::Debug for Disposables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposables")
            .field("pending", &self.len())
            .finish()
    }
}
