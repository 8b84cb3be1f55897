use crate::event_sourcing::core::{AggregateError, DomainEvent, EventStream, ObjectId, WireError};

// ============================================================================
// Event Store Contract
// ============================================================================
//
// Responsibilities of any implementation:
// 1. Load the full stream of one aggregate (type + identity)
// 2. Append a stream atomically, all-or-nothing
// 3. Enforce optimistic concurrency: the persisted version must still equal
//    the stream's committed version at write time
//
// A conflicting writer fails immediately with ConcurrencyConflict. The store
// never retries; callers reload, re-apply their change and try again.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no events stored for {aggregate_type} {aggregate_id}")]
    StreamNotFound {
        aggregate_type: String,
        aggregate_id: ObjectId,
    },

    /// Another writer committed first. Reload and retry with fresh state.
    #[error(
        "concurrency conflict on {aggregate_type} {aggregate_id}: expected version {expected:?}, but current is {actual:?}"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        aggregate_id: ObjectId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("stored stream could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("stored stream is invalid: {0}")]
    InvalidStream(#[from] WireError),

    #[error("stored stream cannot rebuild aggregate: {0}")]
    Reconstitute(#[from] AggregateError),
}

impl StoreError {
    /// Conflicts are the only store failures worth retrying with fresh state
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }

    pub fn is_stream_not_found(&self) -> bool {
        matches!(self, StoreError::StreamNotFound { .. })
    }
}

/// Event Store trait for persisting and retrieving aggregate streams
///
/// Implementations should ensure:
///
/// - **Atomicity**: appending a stream succeeds or fails as a unit
/// - **Ordering**: loaded streams replay in append order, sequences from 0
/// - **Concurrency**: a stale `committed_version` is rejected, never merged
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Load every persisted event of one aggregate.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound` if nothing was persisted for this identity/type pair
    fn load(&self, aggregate_id: &ObjectId, aggregate_type: &str) -> Result<EventStream<E>, StoreError>;

    /// Append the messages of `stream` after its committed version.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` if the persisted version no longer equals
    ///   `stream.committed_version()`; nothing is written in that case
    fn append(&self, stream: &EventStream<E>) -> Result<(), StoreError>;

    /// Current persisted version, or `None` for an unknown aggregate
    fn current_version(
        &self,
        aggregate_id: &ObjectId,
        aggregate_type: &str,
    ) -> Result<Option<u64>, StoreError>;

    fn exists(&self, aggregate_id: &ObjectId, aggregate_type: &str) -> Result<bool, StoreError> {
        Ok(self.current_version(aggregate_id, aggregate_type)?.is_some())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let conflict = StoreError::ConcurrencyConflict {
            aggregate_type: "Task".to_string(),
            aggregate_id: ObjectId::new("TaskId", "1"),
            expected: Some(5),
            actual: Some(6),
        };
        let missing = StoreError::StreamNotFound {
            aggregate_type: "Task".to_string(),
            aggregate_id: ObjectId::new("TaskId", "1"),
        };

        assert!(conflict.is_concurrency_conflict());
        assert!(!conflict.is_stream_not_found());
        assert!(missing.is_stream_not_found());
        assert!(!missing.is_concurrency_conflict());
    }

    #[test]
    fn test_conflict_message_names_both_versions() {
        let conflict = StoreError::ConcurrencyConflict {
            aggregate_type: "Task".to_string(),
            aggregate_id: ObjectId::new("TaskId", "1"),
            expected: Some(5),
            actual: Some(6),
        };

        assert_eq!(
            conflict.to_string(),
            "concurrency conflict on Task TaskId:1: expected version Some(5), but current is Some(6)"
        );
    }
}
