use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Service Container
// ============================================================================
//
// Key-based lookup of shared services (handlers, subscribers). Resolvers and
// the event bus only depend on the `Container` capability; ServiceContainer is
// the in-process implementation.
//
// Registration takes `&mut self`: containers are filled once at bootstrap and
// then shared read-only behind an `Arc`.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("no entry registered for service id '{id}'")]
pub struct EntryNotFound {
    pub id: String,
}

/// Lookup of services by string id
pub trait Container<S: ?Sized>: Send + Sync {
    fn get(&self, id: &str) -> Result<Arc<S>, EntryNotFound>;

    fn has(&self, id: &str) -> bool;
}

type Factory<S> = Box<dyn Fn() -> Arc<S> + Send + Sync>;

enum Entry<S: ?Sized> {
    Instance(Arc<S>),
    Lazy {
        factory: Factory<S>,
        instance: OnceLock<Arc<S>>,
    },
}

impl<S: ?Sized> Entry<S> {
    fn instance(&self) -> Arc<S> {
        match self {
            Entry::Instance(service) => Arc::clone(service),
            Entry::Lazy { factory, instance } => Arc::clone(instance.get_or_init(|| factory())),
        }
    }
}

pub struct ServiceContainer<S: ?Sized> {
    entries: HashMap<String, Entry<S>>,
}

impl<S: ?Sized> Default for ServiceContainer<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: ?Sized> ServiceContainer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready-made service, replacing any entry under `id`
    pub fn set(&mut self, id: impl Into<String>, service: Arc<S>) {
        self.entries.insert(id.into(), Entry::Instance(service));
    }

    /// Register a service built on first lookup and shared afterwards
    pub fn set_factory<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.entries.insert(
            id.into(),
            Entry::Lazy {
                factory: Box::new(factory),
                instance: OnceLock::new(),
            },
        );
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl<S: ?Sized + Send + Sync> Container<S> for ServiceContainer<S> {
    fn get(&self, id: &str) -> Result<Arc<S>, EntryNotFound> {
        self.entries
            .get(id)
            .map(Entry::instance)
            .ok_or_else(|| EntryNotFound { id: id.to_string() })
    }

    fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}
