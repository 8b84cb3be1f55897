use crate::container::EntryNotFound;
use crate::event_sourcing::{EnvelopeKind, EventBusError, StoreError};

use super::command::CommandMessage;
use super::query::QueryMessage;

// ============================================================================
// Pipeline Errors
// ============================================================================
//
// Every failure inside a pipeline (filter, resolution, handler) surfaces as
// CommandFailed / QueryFailed. The original error stays reachable through
// `source()`, so callers can still tell a concurrency conflict apart.
//
// ============================================================================

/// Resolution miss or a service id the container no longer knows
#[derive(Debug, thiserror::Error)]
#[error("no handler registered for {message_type}")]
pub struct HandlerNotFound {
    pub message_type: String,
    #[source]
    pub source: Option<EntryNotFound>,
}

impl HandlerNotFound {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            source: None,
        }
    }

    pub fn stale_service(message_type: impl Into<String>, source: EntryNotFound) -> Self {
        Self {
            message_type: message_type.into(),
            source: Some(source),
        }
    }
}

/// Rejected handler mapping, raised while wiring resolvers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRegistration {
    #[error("unknown message name '{name}'")]
    UnknownMessage { name: String },

    #[error("'{name}' is a {found:?} message, cannot map it as a {expected:?} handler")]
    WrongKind {
        name: String,
        expected: EnvelopeKind,
        found: EnvelopeKind,
    },
}

/// Failure of one command execution
#[derive(Debug, thiserror::Error)]
#[error("command {} ({}) failed", .message.payload_type(), .message.message_id())]
pub struct CommandFailed {
    pub message: CommandMessage,
    #[source]
    pub source: anyhow::Error,
}

impl CommandFailed {
    /// The command lost an optimistic concurrency race: reload and retry
    pub fn is_concurrency_conflict(&self) -> bool {
        chain_has_conflict(&self.source)
    }

    pub fn is_handler_not_found(&self) -> bool {
        self.source.downcast_ref::<HandlerNotFound>().is_some()
    }

    /// The command's events were committed but publishing them failed.
    /// Re-running the command would apply it twice; subscribers are lagging.
    pub fn is_publish_failure(&self) -> bool {
        self.source
            .chain()
            .any(|cause| cause.downcast_ref::<EventBusError>().is_some())
    }
}

/// Failure of one query execution
#[derive(Debug, thiserror::Error)]
#[error("query {} ({}) failed", .message.payload_type(), .message.message_id())]
pub struct QueryFailed {
    pub message: QueryMessage,
    #[source]
    pub source: anyhow::Error,
}

impl QueryFailed {
    pub fn is_handler_not_found(&self) -> bool {
        self.source.downcast_ref::<HandlerNotFound>().is_some()
    }
}

fn chain_has_conflict(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_concurrency_conflict)
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
