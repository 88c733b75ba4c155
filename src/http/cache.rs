//! Per-instance memoization of derived request properties.
//!
//! Each adapter owns one `Memo` per derived property; the value is computed on
//! first access and reused for the lifetime of the adapter. There is no
//! eviction: the cache is dropped together with the request.

use once_cell::sync::OnceCell;

/// A lazily computed, write-once field.
pub struct Memo<T> {
    cell: OnceCell<T>,
}

impl<T> Memo<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the stored value, computing and storing it on first access.
    pub fn value(&self, compute: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(compute)
    }

    /// Whether the value has been computed yet.
    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Memo").field(value).finish(),
            None => f.write_str("Memo(<pending>)"),
        }
    }
}
