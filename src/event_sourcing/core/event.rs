use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::aggregate::ObjectId;
use super::envelope::Envelope;
use super::wire::EventStreamRecord;

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Generic Domain Event trait
///
/// Implemented by an aggregate's event enum. The enum is expected to be
/// adjacently tagged (`#[serde(tag = "type", content = "data")]`) with
/// variant names equal to `event_type()`, which yields the
/// `event_data: {type, data}` shape of the stored stream record.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;
}

/// Event wrapped with id, timestamp and metadata
pub type EventMessage<E> = Envelope<E>;

impl<E: DomainEvent> Envelope<E> {
    /// Wrap a freshly recorded event: new id, current timestamp, no metadata.
    pub fn for_event(event: E) -> Self {
        let event_type = event.event_type();
        Envelope::new(event, event_type)
    }
}

// ============================================================================
// Event Stream - Ordered, Versioned Events of One Aggregate
// ============================================================================
//
// Invariants:
// - sequence numbers are 0, 1, 2, ... in append order
// - version = committed_version (None counts as 0) + number of messages
// - committed_version == None means the aggregate was never persisted
//
// A stream is a value: iterating it twice yields the same sequence.
//
// ============================================================================

/// An event message plus its position in the stream
#[derive(Debug, Clone)]
pub struct StreamedEvent<E> {
    sequence: u64,
    message: EventMessage<E>,
}

impl<E> StreamedEvent<E> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn message(&self) -> &EventMessage<E> {
        &self.message
    }

    pub fn event(&self) -> &E {
        self.message.payload()
    }

    pub fn into_message(self) -> EventMessage<E> {
        self.message
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    into = "EventStreamRecord<E>",
    try_from = "EventStreamRecord<E>",
    bound(serialize = "E: DomainEvent", deserialize = "E: DomainEvent")
)]
pub struct EventStream<E> {
    aggregate_id: ObjectId,
    aggregate_type: String,
    committed_version: Option<u64>,
    messages: Vec<StreamedEvent<E>>,
}

impl<E> EventStream<E> {
    pub fn new(
        aggregate_id: ObjectId,
        aggregate_type: impl Into<String>,
        committed_version: Option<u64>,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            committed_version,
            messages: Vec::new(),
        }
    }

    /// Append a message, assigning the next sequence number.
    pub fn append(&mut self, message: EventMessage<E>) -> u64 {
        let sequence = self
            .messages
            .last()
            .map_or(0, |last| last.sequence + 1);
        self.messages.push(StreamedEvent { sequence, message });
        sequence
    }

    pub fn aggregate_id(&self) -> &ObjectId {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn committed_version(&self) -> Option<u64> {
        self.committed_version
    }

    pub fn version(&self) -> u64 {
        self.committed_version.unwrap_or(0) + self.messages.len() as u64
    }

    /// True for a stream of an aggregate that was never persisted
    pub fn is_new(&self) -> bool {
        self.committed_version.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[StreamedEvent<E>] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StreamedEvent<E>> {
        self.messages.iter()
    }

    /// Event payloads in stream order
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.messages.iter().map(StreamedEvent::event)
    }
}

impl<'a, E> IntoIterator for &'a EventStream<E> {
    type Item = &'a StreamedEvent<E>;
    type IntoIter = std::slice::Iter<'a, StreamedEvent<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl<E> IntoIterator for EventStream<E> {
    type Item = StreamedEvent<E>;
    type IntoIter = std::vec::IntoIter<StreamedEvent<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    #[serde(tag = "type", content = "data")]
    enum TestEvent {
        Happened { data: String },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "Happened"
        }
    }

    fn happened(data: &str) -> EventMessage<TestEvent> {
        EventMessage::for_event(TestEvent::Happened {
            data: data.to_string(),
        })
    }

    fn stream(committed: Option<u64>) -> EventStream<TestEvent> {
        EventStream::new(ObjectId::new("TestId", "1"), "Test", committed)
    }

    #[test]
    fn test_event_envelope_creation() {
        let envelope = happened("test");

        assert_eq!(envelope.payload_type(), "Happened");
        assert!(envelope.metadata().is_empty());
    }

    #[test]
    fn test_sequence_numbers_start_at_zero() {
        let mut stream = stream(None);

        assert_eq!(stream.append(happened("a")), 0);
        assert_eq!(stream.append(happened("b")), 1);
        assert_eq!(stream.append(happened("c")), 2);

        let sequences: Vec<u64> = stream.iter().map(StreamedEvent::sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_version_counts_committed_plus_messages() {
        let mut fresh = stream(None);
        fresh.append(happened("a"));
        assert!(fresh.is_new());
        assert_eq!(fresh.version(), 1);

        let mut existing = stream(Some(5));
        existing.append(happened("a"));
        existing.append(happened("b"));
        assert_eq!(existing.committed_version(), Some(5));
        assert_eq!(existing.version(), 7);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut stream = stream(None);
        stream.append(happened("a"));
        stream.append(happened("b"));

        let first: Vec<TestEvent> = stream.events().cloned().collect();
        let second: Vec<TestEvent> = (&stream).into_iter().map(|e| e.event().clone()).collect();

        assert_eq!(first, second);
        assert_eq!(stream.len(), 2);
        assert!(!stream.is_empty());
    }
}
