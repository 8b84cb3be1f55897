// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// This module contains GENERIC, reusable event sourcing infrastructure
// that works with ANY domain aggregate.
//
// Key Principles:
// - No domain-specific code (no Task or any other aggregate)
// - Generic over aggregate and event types
// - Envelopes are immutable values shared by commands, queries and events
//
// ============================================================================

pub mod aggregate;
pub mod envelope;
pub mod event;
pub mod message;
pub mod metadata;
pub mod wire;

// Re-export core types for convenience
pub use aggregate::{
    AggregateError, AggregateRoot, ChildEntity, EntityRegistration, EventSourcingState,
    Identifier, IdentifierError, ObjectId, RaisedEvent, RegistrationViolation,
    INITIAL_CONCURRENCY_VERSION,
};
pub use envelope::Envelope;
pub use event::{DomainEvent, EventMessage, EventStream, StreamedEvent};
pub use message::{AsAny, Message, MessageId, MessageName};
pub use metadata::{MetaData, MetaDataError, MetaValue};
pub use wire::{EnvelopeKind, EventRecord, EventStreamRecord, WireError};
