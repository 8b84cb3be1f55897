use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

use super::event_store::{EventStore, StoreError};
use crate::event_sourcing::core::{DomainEvent, EventRecord, EventStream, EventStreamRecord, ObjectId};

// ============================================================================
// In-Memory Event Store
// ============================================================================
//
// Reference implementation of the EventStore contract for tests and local
// development. Streams are kept in their serialized record shape, so every
// load exercises the same round-trip a real persistence adapter performs.
//
// The version check and the write happen inside one critical section:
// check-then-write is atomic per store. A loaded stream carries the full
// history, so its committed version is 0 and its version the event count.
//
// ============================================================================

type StreamKey = (String, ObjectId);

pub struct InMemoryEventStore<E: DomainEvent> {
    streams: Mutex<HashMap<StreamKey, EventStreamRecord<Value>>>,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }
}

impl<E: DomainEvent> InMemoryEventStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities of every stored aggregate of one type
    pub fn stream_ids(&self, aggregate_type: &str) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .streams
            .lock()
            .keys()
            .filter(|(stored_type, _)| stored_type == aggregate_type)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Serialized record of one stream, exactly as persisted
    pub fn record(&self, aggregate_id: &ObjectId, aggregate_type: &str) -> Option<Value> {
        let key = (aggregate_type.to_string(), aggregate_id.clone());
        self.streams
            .lock()
            .get(&key)
            .and_then(|record| serde_json::to_value(record).ok())
    }

    fn encode_messages(stream: &EventStream<E>) -> Result<Vec<EventRecord<Value>>, StoreError> {
        let record = EventStreamRecord::from(stream.clone());
        record
            .messages
            .into_iter()
            .map(|message| {
                Ok(EventRecord {
                    event_id: message.event_id,
                    date_time: message.date_time,
                    meta_data: message.meta_data,
                    event_data: serde_json::to_value(message.event_data)?,
                    sequence: message.sequence,
                })
            })
            .collect()
    }
}

impl<E: DomainEvent> EventStore<E> for InMemoryEventStore<E> {
    fn load(&self, aggregate_id: &ObjectId, aggregate_type: &str) -> Result<EventStream<E>, StoreError> {
        let key = (aggregate_type.to_string(), aggregate_id.clone());
        let record = self.streams.lock().get(&key).cloned();

        let Some(record) = record else {
            return Err(StoreError::StreamNotFound {
                aggregate_type: aggregate_type.to_string(),
                aggregate_id: aggregate_id.clone(),
            });
        };

        let stream: EventStream<E> = serde_json::from_value(serde_json::to_value(record)?)?;

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = aggregate_type,
            version = stream.version(),
            "Loaded event stream"
        );

        Ok(stream)
    }

    fn append(&self, stream: &EventStream<E>) -> Result<(), StoreError> {
        let encoded = Self::encode_messages(stream)?;
        let key = (stream.aggregate_type().to_string(), stream.aggregate_id().clone());

        let mut streams = self.streams.lock();

        // Check optimistic concurrency
        let current_version = streams.get(&key).map(|record| record.version);
        if current_version != stream.committed_version() {
            tracing::warn!(
                aggregate_id = %stream.aggregate_id(),
                aggregate_type = stream.aggregate_type(),
                expected = ?stream.committed_version(),
                actual = ?current_version,
                "Rejected append: concurrency conflict"
            );
            return Err(StoreError::ConcurrencyConflict {
                aggregate_type: stream.aggregate_type().to_string(),
                aggregate_id: stream.aggregate_id().clone(),
                expected: stream.committed_version(),
                actual: current_version,
            });
        }

        if encoded.is_empty() {
            tracing::debug!(aggregate_id = %stream.aggregate_id(), "Nothing to append");
            return Ok(());
        }

        let record = streams.entry(key).or_insert_with(|| EventStreamRecord {
            object_id: stream.aggregate_id().clone(),
            object_type: stream.aggregate_type().to_string(),
            committed: Some(0),
            version: 0,
            messages: Vec::new(),
        });

        let event_count = encoded.len();
        for mut message in encoded {
            message.sequence = record.messages.len() as u64;
            record.messages.push(message);
        }
        record.version += event_count as u64;

        tracing::info!(
            aggregate_id = %stream.aggregate_id(),
            aggregate_type = stream.aggregate_type(),
            new_version = record.version,
            event_count = event_count,
            "Appended events to event store"
        );

        Ok(())
    }

    fn current_version(
        &self,
        aggregate_id: &ObjectId,
        aggregate_type: &str,
    ) -> Result<Option<u64>, StoreError> {
        let key = (aggregate_type.to_string(), aggregate_id.clone());
        Ok(self.streams.lock().get(&key).map(|record| record.version))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
