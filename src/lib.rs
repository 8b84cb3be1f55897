// ============================================================================
// es_pipeline - Event-Sourced Aggregates + CQRS Message Pipeline
// ============================================================================
//
// - event_sourcing: envelopes, event streams, aggregate roots, event store
//   contract, event bus
// - cqrs: command/query pipelines, filters, handler resolution
// - container: key-based service lookup consumed by the resolvers
// - domain: example Task aggregate wired through every layer
//
// Everything runs synchronously on the calling thread.
//
// ============================================================================

pub mod container;
pub mod cqrs;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod utils;

// Re-export the types application code touches most
pub use container::{Container, EntryNotFound, ServiceContainer};
pub use cqrs::{
    Command, CommandFailed, CommandHandler, CommandMessage, CommandPipeline, Filter, Next, Query,
    QueryFailed, QueryHandler, QueryMessage, QueryPipeline, ViewData,
};
pub use event_sourcing::{
    AggregateRepository, AggregateRoot, DomainEvent, Envelope, EventBus, EventMessage,
    EventStore, EventStream, InMemoryEventStore, MessageId, MetaData, MetaValue, StoreError,
};
