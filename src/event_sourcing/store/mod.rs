// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// This module contains GENERIC persistence infrastructure for event sourcing.
// All components work with ANY aggregate/event type.
//
// - event_store: the load/append contract + optimistic concurrency
// - memory: reference implementation persisting the serialized stream shape
// - repository: load/save aggregates through a store
//
// ============================================================================

pub mod event_store;
pub mod memory;
pub mod repository;

pub use event_store::{EventStore, StoreError};
pub use memory::InMemoryEventStore;
pub use repository::AggregateRepository;
