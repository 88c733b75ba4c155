//! Service container with per-request scopes.
//!
//! # Responsibilities
//! - Hold application-wide singletons keyed by type
//! - Build scoped services at most once per scope from registered factories
//! - Instantiate pages inside a scope
//! - Release everything a scope owns when it is dropped
//!
//! # Design Decisions
//! - Lookup is by `TypeId`; a missing registration is `None`, not a panic
//! - Factories run without the scope lock held, so they may resolve other services
//! - Release happens in `Drop`, covering every exit path of a request

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::dispatch::page::{Page, PageType};
use crate::lifecycle::dispose::{Disposable, Disposables};

type Service = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Scope) -> Service + Send + Sync>;

/// Application-wide service registrations.
#[derive(Default)]
pub struct ServiceProvider {
    singletons: HashMap<TypeId, Service>,
    factories: HashMap<TypeId, Factory>,
}

impl ServiceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one shared instance of `T`.
    pub fn with_singleton<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.singletons.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Register a factory building one `T` per scope.
    pub fn with_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> T + Send + Sync + 'static,
    {
        self.factories.insert(
            TypeId::of::<T>(),
            Arc::new(move |scope: &Scope| Arc::new(factory(scope)) as Service),
        );
        self
    }

    /// Open a scope for one request.
    pub fn create_scope(self: &Arc<Self>) -> Scope {
        let scope = Scope {
            id: Uuid::new_v4(),
            provider: Arc::clone(self),
            instances: Mutex::new(HashMap::new()),
            disposables: Disposables::new(),
        };
        tracing::trace!(scope = %scope.id, "Scope opened");
        scope
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("singletons", &self.singletons.len())
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Services and cleanup owned by one request.
pub struct Scope {
    id: Uuid,
    provider: Arc<ServiceProvider>,
    instances: Mutex<HashMap<TypeId, Service>>,
    disposables: Disposables,
}

impl Scope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Resolve a singleton, or this scope's instance of a scoped service.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let key = TypeId::of::<T>();
        if let Some(service) = self.provider.singletons.get(&key) {
            return Arc::clone(service).downcast::<T>().ok();
        }

        let existing = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(service) = existing {
            return service.downcast::<T>().ok();
        }

        let factory = self.provider.factories.get(&key)?;
        let built = factory(self);
        let service = Arc::clone(
            self.instances
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(built),
        );
        service.downcast::<T>().ok()
    }

    /// Instantiate a page inside this scope.
    pub fn create(&self, page: &PageType) -> Box<dyn Page> {
        tracing::trace!(scope = %self.id, page = page.name(), "Creating page");
        page.instantiate(self)
    }

    /// Register cleanup to run when the scope closes.
    pub fn on_dispose(&self, item: impl Disposable + 'static) {
        self.disposables.push(Box::new(item));
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let pending = self.disposables.len();
        self.disposables.dispose_all();
        tracing::trace!(scope = %self.id, disposed = pending, "Scope closed");
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("disposables", &self.disposables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Config {
        name: &'static str,
    }

    struct Counter {
        serial: usize,
    }

    struct Greeter {
        greeting: String,
    }

    fn provider(built: Arc<AtomicUsize>) -> Arc<ServiceProvider> {
        Arc::new(
            ServiceProvider::new()
                .with_singleton(Config { name: "pages" })
                .with_scoped(move |_| Counter {
                    serial: built.fetch_add(1, Ordering::SeqCst),
                })
                .with_scoped(|scope: &Scope| Greeter {
                    greeting: format!(
                        "hello from {}",
                        scope.resolve::<Config>().map(|c| c.name).unwrap_or("nobody")
                    ),
                }),
        )
    }

    #[test]
    fn test_singleton_shared_across_scopes() {
        let provider = provider(Arc::new(AtomicUsize::new(0)));
        let a = provider.create_scope().resolve::<Config>().unwrap();
        let b = provider.create_scope().resolve::<Config>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_scoped_built_once_per_scope() {
        let built = Arc::new(AtomicUsize::new(0));
        let provider = provider(built.clone());

        let first = provider.create_scope();
        let a = first.resolve::<Counter>().unwrap();
        let b = first.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let second = provider.create_scope();
        let c = second.resolve::<Counter>().unwrap();
        assert_ne!(a.serial, c.serial);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_can_resolve_dependencies() {
        let scope = provider(Arc::new(AtomicUsize::new(0))).create_scope();
        assert_eq!(scope.resolve::<Greeter>().unwrap().greeting, "hello from pages");
    }

    #[test]
    fn test_unregistered_is_none() {
        let scope = provider(Arc::new(AtomicUsize::new(0))).create_scope();
        assert!(scope.resolve::<String>().is_none());
    }

    #[test]
    fn test_drop_disposes() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let scope = provider(Arc::new(AtomicUsize::new(0))).create_scope();
            let counter = released.clone();
            scope.on_dispose(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
