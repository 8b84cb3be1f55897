use std::sync::Arc;

use super::event_store::{EventStore, StoreError};
use crate::event_sourcing::core::{AggregateRoot, EventStream, Identifier};
use crate::metrics::PipelineMetrics;

// ============================================================================
// Aggregate Repository
// ============================================================================
//
// Orchestrates: Event Store → Stream → Aggregate (load)
//               Aggregate → Stream → Event Store (save)
//
// ============================================================================

pub struct AggregateRepository<A: AggregateRoot> {
    store: Arc<dyn EventStore<A::Event>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl<A: AggregateRoot> Clone for AggregateRepository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metrics: self.metrics.clone(),
        }
    }
}

impl<A: AggregateRoot> AggregateRepository<A> {
    pub fn new(store: Arc<dyn EventStore<A::Event>>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rebuild an aggregate from its persisted stream
    pub fn load(&self, id: &A::Id) -> Result<A, StoreError> {
        let stream = self.store.load(&id.object_id(), A::aggregate_type())?;
        Ok(A::reconstitute(stream)?)
    }

    pub fn exists(&self, id: &A::Id) -> Result<bool, StoreError> {
        self.store.exists(&id.object_id(), A::aggregate_type())
    }

    /// Extract the aggregate's recorded events and append them.
    ///
    /// Returns the appended stream (empty when nothing was recorded), ready to
    /// be published to subscribers.
    ///
    /// # Errors
    ///
    /// `StoreError::ConcurrencyConflict` when another writer committed since
    /// the aggregate was loaded. The recorded events are dropped with the
    /// failed stream; reload and re-apply the change to retry.
    pub fn save(&self, aggregate: &mut A) -> Result<EventStream<A::Event>, StoreError> {
        let stream = aggregate.extract_recorded_events();
        if stream.is_empty() {
            return Ok(stream);
        }

        match self.store.append(&stream) {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_events_appended(A::aggregate_type(), stream.len());
                }
                Ok(stream)
            }
            Err(err) => {
                if let (Some(metrics), true) = (&self.metrics, err.is_concurrency_conflict()) {
                    metrics.record_concurrency_conflict(A::aggregate_type());
                }
                Err(err)
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Task, TaskId};
    use crate::event_sourcing::store::InMemoryEventStore;

    fn repository() -> AggregateRepository<Task> {
        AggregateRepository::new(Arc::new(InMemoryEventStore::new()))
    }

    #[test]
    fn test_save_then_load_round_trips_state() {
        let repository = repository();
        let mut task = Task::create(TaskId::generate(), "Buy milk").unwrap();
        task.rename("Buy milk and eggs").unwrap();

        let committed = repository.save(&mut task).unwrap();
        let loaded = repository.load(task.id()).unwrap();

        assert_eq!(committed.len(), 2);
        assert_eq!(committed.version(), 2);
        assert_eq!(loaded.description(), "Buy milk and eggs");
        assert_eq!(loaded.concurrency_version(), 2);
        assert!(repository.exists(task.id()).unwrap());
    }

    #[test]
    fn test_save_without_changes_appends_nothing() {
        let repository = repository();
        let mut task = Task::create(TaskId::generate(), "Read").unwrap();
        repository.save(&mut task).unwrap();

        let mut loaded = repository.load(task.id()).unwrap();
        let committed = repository.save(&mut loaded).unwrap();

        assert!(committed.is_empty());
        assert_eq!(repository.load(task.id()).unwrap().concurrency_version(), 1);
    }

    #[test]
    fn test_same_instance_saves_twice() {
        let repository = repository();
        let mut task = Task::create(TaskId::generate(), "Buy milk").unwrap();
        repository.save(&mut task).unwrap();

        task.rename("Buy milk and eggs").unwrap();
        let second = repository.save(&mut task).unwrap();
        let loaded = repository.load(task.id()).unwrap();

        assert_eq!(second.committed_version(), Some(1));
        assert_eq!(second.version(), 2);
        assert_eq!(loaded.description(), "Buy milk and eggs");
        assert_eq!(loaded.concurrency_version(), 2);
        assert_eq!(task.concurrency_version(), 2);
    }

    #[test]
    fn test_second_writer_with_stale_state_conflicts() {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let repository = repository().with_metrics(Arc::clone(&metrics));
        let mut task = Task::create(TaskId::generate(), "Write report").unwrap();
        repository.save(&mut task).unwrap();

        let mut first = repository.load(task.id()).unwrap();
        let mut second = repository.load(task.id()).unwrap();

        first.rename("Write the report").unwrap();
        repository.save(&mut first).unwrap();

        second.rename("Write a report").unwrap();
        let result = repository.save(&mut second);

        assert!(result.unwrap_err().is_concurrency_conflict());
        assert_eq!(repository.load(task.id()).unwrap().description(), "Write the report");
        assert_eq!(metrics.concurrency_conflicts("Task"), 1);
        assert_eq!(metrics.events_appended("Task"), 2);
    }

    #[test]
    fn test_load_unknown_aggregate_is_stream_not_found() {
        let result = repository().load(&TaskId::generate());

        assert!(result.err().is_some_and(|e| e.is_stream_not_found()));
    }
}
