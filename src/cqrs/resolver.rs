use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::container::Container;
use crate::event_sourcing::{EnvelopeKind, MessageName};

use super::command::{Command, CommandHandler};
use super::errors::{HandlerNotFound, InvalidRegistration};
use super::query::{Query, QueryHandler};

// ============================================================================
// Handler Resolution
// ============================================================================
//
// Handlers are keyed by the concrete runtime type of the message. Two styles:
// - InMemoryResolver: type → handler instance
// - ServiceMapResolver: type → service id, looked up in a container on
//   every resolution (ids may go stale)
//
// Registering the same message type again replaces the previous entry.
//
// ============================================================================

pub trait HandlerResolver<H: ?Sized>: Send + Sync {
    fn resolve(&self, message_type_id: TypeId, message_type: &str) -> Result<Arc<H>, HandlerNotFound>;

    /// True only if `resolve` would currently succeed
    fn has_handler(&self, message_type_id: TypeId) -> bool;
}

/// Which message kind a handler trait serves
pub trait HandlerKind {
    const KIND: EnvelopeKind;
}

impl HandlerKind for dyn CommandHandler {
    const KIND: EnvelopeKind = EnvelopeKind::Command;
}

impl HandlerKind for dyn QueryHandler {
    const KIND: EnvelopeKind = EnvelopeKind::Query;
}

// ============================================================================
// Message Catalog - names → types, for runtime registration
// ============================================================================

/// Known message types by name, so handler maps can be built from config
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    entries: HashMap<&'static str, (TypeId, EnvelopeKind)>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command<C: Command + MessageName>(mut self) -> Self {
        self.entries
            .insert(C::NAME, (TypeId::of::<C>(), EnvelopeKind::Command));
        self
    }

    pub fn query<Q: Query + MessageName>(mut self) -> Self {
        self.entries
            .insert(Q::NAME, (TypeId::of::<Q>(), EnvelopeKind::Query));
        self
    }

    /// Type registered under `name`, provided it is a message of `expected` kind
    pub fn lookup(&self, name: &str, expected: EnvelopeKind) -> Result<TypeId, InvalidRegistration> {
        match self.entries.get(name) {
            None => Err(InvalidRegistration::UnknownMessage {
                name: name.to_string(),
            }),
            Some((_, found)) if *found != expected => Err(InvalidRegistration::WrongKind {
                name: name.to_string(),
                expected,
                found: *found,
            }),
            Some((type_id, _)) => Ok(*type_id),
        }
    }
}

// ============================================================================
// In-Memory Resolver
// ============================================================================

pub struct InMemoryResolver<H: ?Sized> {
    handlers: HashMap<TypeId, Arc<H>>,
}

impl<H: ?Sized> Default for InMemoryResolver<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H: ?Sized + HandlerKind> InMemoryResolver<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register by message name, checked against `catalog`
    pub fn register_named(
        &mut self,
        catalog: &MessageCatalog,
        name: &str,
        handler: Arc<H>,
    ) -> Result<(), InvalidRegistration> {
        let type_id = catalog.lookup(name, H::KIND)?;
        self.handlers.insert(type_id, handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl InMemoryResolver<dyn CommandHandler> {
    pub fn register<C: Command>(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(TypeId::of::<C>(), handler);
    }
}

impl InMemoryResolver<dyn QueryHandler> {
    pub fn register<Q: Query>(&mut self, handler: Arc<dyn QueryHandler>) {
        self.handlers.insert(TypeId::of::<Q>(), handler);
    }
}

impl<H: ?Sized + Send + Sync> HandlerResolver<H> for InMemoryResolver<H> {
    fn resolve(&self, message_type_id: TypeId, message_type: &str) -> Result<Arc<H>, HandlerNotFound> {
        self.handlers
            .get(&message_type_id)
            .cloned()
            .ok_or_else(|| HandlerNotFound::new(message_type))
    }

    fn has_handler(&self, message_type_id: TypeId) -> bool {
        self.handlers.contains_key(&message_type_id)
    }
}

// ============================================================================
// Service-Map Resolver
// ============================================================================

/// Service ids per message name, e.g. loaded from a JSON file:
/// `{"commands": {"CreateTask": "task.commands"}, "queries": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMapConfig {
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

impl ServiceMapConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn section(&self, kind: EnvelopeKind) -> &BTreeMap<String, String> {
        match kind {
            EnvelopeKind::Command => &self.commands,
            EnvelopeKind::Query => &self.queries,
        }
    }
}

pub struct ServiceMapResolver<H: ?Sized> {
    services: HashMap<TypeId, String>,
    container: Arc<dyn Container<H>>,
}

impl<H: ?Sized + HandlerKind> ServiceMapResolver<H> {
    pub fn new(container: Arc<dyn Container<H>>) -> Self {
        Self {
            services: HashMap::new(),
            container,
        }
    }

    /// Build the map from the section of `config` matching this handler kind.
    ///
    /// # Errors
    ///
    /// `InvalidRegistration` for a name missing from `catalog` or naming a
    /// message of the other kind.
    pub fn from_config(
        config: &ServiceMapConfig,
        catalog: &MessageCatalog,
        container: Arc<dyn Container<H>>,
    ) -> Result<Self, InvalidRegistration> {
        let mut resolver = Self::new(container);
        for (name, service_id) in config.section(H::KIND) {
            resolver.map_named(catalog, name, service_id.clone())?;
        }
        Ok(resolver)
    }

    pub fn map_named(
        &mut self,
        catalog: &MessageCatalog,
        name: &str,
        service_id: impl Into<String>,
    ) -> Result<(), InvalidRegistration> {
        let type_id = catalog.lookup(name, H::KIND)?;
        self.services.insert(type_id, service_id.into());
        Ok(())
    }

    pub fn service_id(&self, message_type_id: TypeId) -> Option<&str> {
        self.services.get(&message_type_id).map(String::as_str)
    }
}

impl ServiceMapResolver<dyn CommandHandler> {
    pub fn map<C: Command>(&mut self, service_id: impl Into<String>) {
        self.services.insert(TypeId::of::<C>(), service_id.into());
    }
}

impl ServiceMapResolver<dyn QueryHandler> {
    pub fn map<Q: Query>(&mut self, service_id: impl Into<String>) {
        self.services.insert(TypeId::of::<Q>(), service_id.into());
    }
}

impl<H: ?Sized> HandlerResolver<H> for ServiceMapResolver<H> {
    fn resolve(&self, message_type_id: TypeId, message_type: &str) -> Result<Arc<H>, HandlerNotFound> {
        let service_id = self
            .services
            .get(&message_type_id)
            .ok_or_else(|| HandlerNotFound::new(message_type))?;

        self.container
            .get(service_id)
            .map_err(|source| HandlerNotFound::stale_service(message_type, source))
    }

    fn has_handler(&self, message_type_id: TypeId) -> bool {
        self.services
            .get(&message_type_id)
            .is_some_and(|service_id| self.container.has(service_id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
