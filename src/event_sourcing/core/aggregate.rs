use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{DomainEvent, EventMessage, EventStream};
use super::metadata::MetaData;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Every state change is recorded as an event and applied immediately
// 3. Replaying the recorded stream rebuilds identical state
// 4. The committed version is the optimistic-concurrency token
//
// Event-sourcing state (pending events + committed version) is a value
// embedded in each aggregate, not inherited behaviour.
//
// ============================================================================

/// Version reported by an aggregate that has never been persisted
pub const INITIAL_CONCURRENCY_VERSION: u64 = 1;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("invalid {id_type} identifier '{value}': {reason}")]
pub struct IdentifierError {
    pub id_type: &'static str,
    pub value: String,
    pub reason: String,
}

/// Errors raised while rebuilding an aggregate from a stream
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("stream belongs to aggregate type {found}, expected {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("stream identity has type {found}, expected {expected}")]
    IdTypeMismatch { expected: String, found: String },

    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
}

/// Serialized aggregate identity: `{type, identifier}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    #[serde(rename = "type")]
    id_type: String,
    identifier: String,
}

impl ObjectId {
    pub fn new(id_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            identifier: identifier.into(),
        }
    }

    pub fn id_type(&self) -> &str {
        &self.id_type
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id_type, self.identifier)
    }
}

/// Typed aggregate identifier
pub trait Identifier: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const ID_TYPE: &'static str;

    fn identifier(&self) -> String;

    fn parse(identifier: &str) -> Result<Self, IdentifierError>;

    fn object_id(&self) -> ObjectId {
        ObjectId::new(Self::ID_TYPE, self.identifier())
    }
}

// ============================================================================
// Event Sourcing State
// ============================================================================

/// Pending events + committed version, embedded in every aggregate root
#[derive(Debug, Clone)]
pub struct EventSourcingState<E> {
    committed_version: Option<u64>,
    recorded: Vec<EventMessage<E>>,
}

impl<E> Default for EventSourcingState<E> {
    fn default() -> Self {
        Self {
            committed_version: None,
            recorded: Vec::new(),
        }
    }
}

impl<E> EventSourcingState<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the committed version established by reconstitution.
    ///
    /// # Panics
    ///
    /// Panics when called a second time: overwriting the version would
    /// corrupt the optimistic-concurrency token.
    pub fn initialize_committed_version(&mut self, version: u64) {
        if let Some(existing) = self.committed_version {
            panic!(
                "concurrency version already initialized to {existing}, refusing to set {version}"
            );
        }
        self.committed_version = Some(version);
    }

    /// Advance the committed version past an extracted stream
    pub fn mark_committed(&mut self, version: u64) {
        self.committed_version = Some(version);
    }

    pub fn committed_version(&self) -> Option<u64> {
        self.committed_version
    }

    pub fn concurrency_version(&self) -> u64 {
        self.committed_version.unwrap_or(INITIAL_CONCURRENCY_VERSION)
    }

    pub fn record(&mut self, message: EventMessage<E>) {
        self.recorded.push(message);
    }

    pub fn pending(&self) -> &[EventMessage<E>] {
        &self.recorded
    }

    pub fn has_pending(&self) -> bool {
        !self.recorded.is_empty()
    }

    pub fn drain(&mut self) -> Vec<EventMessage<E>> {
        std::mem::take(&mut self.recorded)
    }
}

// ============================================================================
// Aggregate Registration (child entities)
// ============================================================================
//
// A child entity raises events through exactly one aggregate root. Wiring
// mistakes are programming errors: they panic and must not be retried.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistrationViolation {
    #[error("aggregate registration violation: entity already registered to {registered}, cannot register to {requested}")]
    AlreadyRegistered {
        registered: ObjectId,
        requested: ObjectId,
    },

    #[error("aggregate registration violation: entity has no aggregate root registered")]
    NotRegistered,

    #[error("aggregate registration violation: event raised for {raised_for} recorded on {recorded_on}")]
    ForeignRoot {
        raised_for: ObjectId,
        recorded_on: ObjectId,
    },
}

/// Which aggregate root a child entity belongs to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistration {
    root: Option<ObjectId>,
}

impl EntityRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if already registered to a different root.
    pub fn register_aggregate_root(&mut self, root: &ObjectId) {
        match &self.root {
            Some(registered) if registered != root => panic!(
                "{}",
                RegistrationViolation::AlreadyRegistered {
                    registered: registered.clone(),
                    requested: root.clone(),
                }
            ),
            Some(_) => {}
            None => self.root = Some(root.clone()),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.root.is_some()
    }

    /// # Panics
    ///
    /// Panics if no root has been registered.
    pub fn aggregate_root(&self) -> &ObjectId {
        match &self.root {
            Some(root) => root,
            None => panic!("{}", RegistrationViolation::NotRegistered),
        }
    }

    /// Stamp an event with the registered root so only that root records it.
    pub fn raise<E>(&self, event: E) -> RaisedEvent<E> {
        RaisedEvent {
            root: self.aggregate_root().clone(),
            event,
        }
    }
}

/// Event raised by a child entity, addressed to its aggregate root
#[derive(Debug, Clone)]
#[must_use = "a raised event has no effect until recorded on its aggregate root"]
pub struct RaisedEvent<E> {
    root: ObjectId,
    event: E,
}

impl<E> RaisedEvent<E> {
    pub fn root(&self) -> &ObjectId {
        &self.root
    }

    pub fn event(&self) -> &E {
        &self.event
    }
}

/// Entity inside an aggregate that raises events through its root
pub trait ChildEntity {
    fn registration(&self) -> &EntityRegistration;

    fn registration_mut(&mut self) -> &mut EntityRegistration;

    fn register_aggregate_root(&mut self, root: &ObjectId) {
        self.registration_mut().register_aggregate_root(root);
    }

    fn aggregate_root(&self) -> &ObjectId {
        self.registration().aggregate_root()
    }

    fn raise<E>(&self, event: E) -> RaisedEvent<E> {
        self.registration().raise(event)
    }
}

// ============================================================================
// Aggregate Root Trait
// ============================================================================

/// Generic event-sourced aggregate root
///
/// Implementors provide state transitions (`apply`, an exhaustive match over
/// their event enum) and access to the embedded `EventSourcingState`; the
/// recording, extraction and reconstitution algorithms are provided.
pub trait AggregateRoot: Sized {
    type Id: Identifier;
    type Event: DomainEvent;

    fn aggregate_type() -> &'static str;

    /// Empty instance that replay folds events into
    fn blank(id: Self::Id) -> Self;

    fn aggregate_id(&self) -> &Self::Id;

    /// Mutate in-memory state for one event
    fn apply(&mut self, event: &Self::Event);

    fn event_sourcing(&self) -> &EventSourcingState<Self::Event>;

    fn event_sourcing_mut(&mut self) -> &mut EventSourcingState<Self::Event>;

    fn object_id(&self) -> ObjectId {
        self.aggregate_id().object_id()
    }

    /// Record an event and apply it immediately.
    fn record_that(&mut self, event: Self::Event) {
        self.record_that_with_metadata(event, MetaData::new());
    }

    fn record_that_with_metadata(&mut self, event: Self::Event, metadata: MetaData) {
        let message = EventMessage::for_event(event).with_meta_data(metadata);
        self.apply(message.payload());
        self.event_sourcing_mut().record(message);
    }

    /// Record an event raised by a child entity registered to this root.
    ///
    /// # Panics
    ///
    /// Panics if the event was raised for a different root.
    fn record_raised(&mut self, raised: RaisedEvent<Self::Event>) {
        let own = self.object_id();
        if raised.root != own {
            panic!(
                "{}",
                RegistrationViolation::ForeignRoot {
                    raised_for: raised.root,
                    recorded_on: own,
                }
            );
        }
        self.record_that(raised.event);
    }

    /// Snapshot and clear everything recorded since the last extraction.
    ///
    /// A non-empty extraction moves the committed version to the stream's
    /// version, so the next extraction continues where this one ends.
    fn extract_recorded_events(&mut self) -> EventStream<Self::Event> {
        let mut stream = EventStream::new(
            self.object_id(),
            Self::aggregate_type(),
            self.event_sourcing().committed_version(),
        );
        for message in self.event_sourcing_mut().drain() {
            stream.append(message);
        }
        if !stream.is_empty() {
            self.event_sourcing_mut().mark_committed(stream.version());
        }
        stream
    }

    /// Rebuild an aggregate from its history without re-recording events.
    fn reconstitute(stream: EventStream<Self::Event>) -> Result<Self, AggregateError> {
        if stream.aggregate_type() != Self::aggregate_type() {
            return Err(AggregateError::TypeMismatch {
                expected: Self::aggregate_type().to_string(),
                found: stream.aggregate_type().to_string(),
            });
        }
        if stream.aggregate_id().id_type() != <Self::Id as Identifier>::ID_TYPE {
            return Err(AggregateError::IdTypeMismatch {
                expected: <Self::Id as Identifier>::ID_TYPE.to_string(),
                found: stream.aggregate_id().id_type().to_string(),
            });
        }

        let id = Self::Id::parse(stream.aggregate_id().identifier())?;
        let version = stream.version();

        let mut aggregate = Self::blank(id);
        for event in stream.events() {
            aggregate.apply(event);
        }
        aggregate
            .event_sourcing_mut()
            .initialize_committed_version(version);

        Ok(aggregate)
    }

    fn concurrency_version(&self) -> u64 {
        self.event_sourcing().concurrency_version()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::envelope::Envelope;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq)]
    struct CounterId(u32);

    impl Identifier for CounterId {
        const ID_TYPE: &'static str = "CounterId";

        fn identifier(&self) -> String {
            self.0.to_string()
        }

        fn parse(identifier: &str) -> Result<Self, IdentifierError> {
            identifier.parse().map(CounterId).map_err(|e: std::num::ParseIntError| {
                IdentifierError {
                    id_type: Self::ID_TYPE,
                    value: identifier.to_string(),
                    reason: e.to_string(),
                }
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum CounterEvent {
        Incremented { by: i64 },
        Reset,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "Incremented",
                CounterEvent::Reset => "Reset",
            }
        }
    }

    #[derive(Debug)]
    struct Counter {
        id: CounterId,
        value: i64,
        es: EventSourcingState<CounterEvent>,
    }

    impl Counter {
        fn increment(&mut self, by: i64) {
            self.record_that(CounterEvent::Incremented { by });
        }
    }

    impl AggregateRoot for Counter {
        type Id = CounterId;
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn blank(id: CounterId) -> Self {
            Self {
                id,
                value: 0,
                es: EventSourcingState::new(),
            }
        }

        fn aggregate_id(&self) -> &CounterId {
            &self.id
        }

        fn apply(&mut self, event: &CounterEvent) {
            match event {
                CounterEvent::Incremented { by } => self.value += by,
                CounterEvent::Reset => self.value = 0,
            }
        }

        fn event_sourcing(&self) -> &EventSourcingState<CounterEvent> {
            &self.es
        }

        fn event_sourcing_mut(&mut self) -> &mut EventSourcingState<CounterEvent> {
            &mut self.es
        }
    }

    #[test]
    fn test_record_that_applies_immediately_without_bumping_version() {
        let mut counter = Counter::blank(CounterId(1));

        counter.increment(2);
        counter.increment(3);

        assert_eq!(counter.value, 5);
        assert_eq!(counter.event_sourcing().pending().len(), 2);
        assert_eq!(counter.concurrency_version(), INITIAL_CONCURRENCY_VERSION);
        assert_eq!(counter.event_sourcing().committed_version(), None);
    }

    #[test]
    fn test_extract_drains_exactly_once() {
        let mut counter = Counter::blank(CounterId(1));
        counter.increment(1);
        counter.record_that(CounterEvent::Reset);
        counter.increment(4);

        let first = counter.extract_recorded_events();
        let second = counter.extract_recorded_events();

        assert_eq!(first.len(), 3);
        assert!(first.is_new());
        assert_eq!(first.aggregate_id(), &ObjectId::new("CounterId", "1"));
        assert_eq!(first.aggregate_type(), "Counter");
        assert!(second.is_empty());
        assert_eq!(second.committed_version(), Some(3));
    }

    #[test]
    fn test_extract_advances_committed_version() {
        let mut counter = Counter::blank(CounterId(2));
        counter.increment(1);
        let first = counter.extract_recorded_events();

        counter.increment(2);
        counter.increment(3);
        let second = counter.extract_recorded_events();

        assert_eq!(first.committed_version(), None);
        assert_eq!(second.committed_version(), Some(1));
        assert_eq!(second.version(), 3);
        assert_eq!(counter.concurrency_version(), 3);
    }

    #[test]
    fn test_mark_committed_may_repeat() {
        let mut state: EventSourcingState<CounterEvent> = EventSourcingState::new();
        state.initialize_committed_version(2);

        state.mark_committed(4);
        state.mark_committed(5);

        assert_eq!(state.committed_version(), Some(5));
    }

    #[test]
    fn test_reconstitute_replays_to_identical_state() {
        let mut live = Counter::blank(CounterId(7));
        live.increment(10);
        live.record_that(CounterEvent::Reset);
        live.increment(3);

        let stream = live.extract_recorded_events();
        let rebuilt = Counter::reconstitute(stream).unwrap();

        assert_eq!(rebuilt.value, live.value);
        assert_eq!(rebuilt.id, live.id);
        assert!(!rebuilt.event_sourcing().has_pending());
        assert_eq!(rebuilt.concurrency_version(), 3);
    }

    #[test]
    fn test_reconstitute_sets_version_from_committed_stream() {
        let mut stream = EventStream::new(ObjectId::new("CounterId", "1"), "Counter", Some(5));
        stream.append(Envelope::for_event(CounterEvent::Incremented { by: 1 }));

        let counter = Counter::reconstitute(stream).unwrap();

        assert_eq!(counter.concurrency_version(), 6);
        let next = {
            let mut counter = counter;
            counter.increment(1);
            counter.extract_recorded_events()
        };
        assert_eq!(next.committed_version(), Some(6));
        assert_eq!(next.version(), 7);
    }

    #[test]
    fn test_reconstitute_rejects_foreign_streams() {
        let wrong_type: EventStream<CounterEvent> =
            EventStream::new(ObjectId::new("CounterId", "1"), "Gauge", None);
        assert!(matches!(
            Counter::reconstitute(wrong_type),
            Err(AggregateError::TypeMismatch { .. })
        ));

        let bad_id: EventStream<CounterEvent> =
            EventStream::new(ObjectId::new("CounterId", "one"), "Counter", None);
        assert!(matches!(
            Counter::reconstitute(bad_id),
            Err(AggregateError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_metadata_is_attached_to_recorded_event() {
        let mut counter = Counter::blank(CounterId(1));
        counter.record_that_with_metadata(
            CounterEvent::Reset,
            MetaData::new().with("reason", "manual"),
        );

        let stream = counter.extract_recorded_events();
        let message = stream.messages()[0].message();
        assert_eq!(message.payload_type(), "Reset");
        assert!(message.metadata().contains_key("reason"));
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn test_initializing_version_twice_panics() {
        let mut state: EventSourcingState<CounterEvent> = EventSourcingState::new();
        state.initialize_committed_version(3);
        state.initialize_committed_version(4);
    }

    #[derive(Debug, Default)]
    struct Child {
        registration: EntityRegistration,
    }

    impl ChildEntity for Child {
        fn registration(&self) -> &EntityRegistration {
            &self.registration
        }

        fn registration_mut(&mut self) -> &mut EntityRegistration {
            &mut self.registration
        }
    }

    #[test]
    fn test_child_raises_through_registered_root() {
        let mut counter = Counter::blank(CounterId(1));
        let mut child = Child::default();
        child.register_aggregate_root(&counter.object_id());
        child.register_aggregate_root(&counter.object_id());

        counter.record_raised(child.raise(CounterEvent::Incremented { by: 9 }));

        assert_eq!(counter.value, 9);
        assert_eq!(child.aggregate_root(), &counter.object_id());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_child_cannot_join_second_root() {
        let mut child = Child::default();
        child.register_aggregate_root(&ObjectId::new("CounterId", "1"));
        child.register_aggregate_root(&ObjectId::new("CounterId", "2"));
    }

    #[test]
    #[should_panic(expected = "no aggregate root registered")]
    fn test_unregistered_child_cannot_raise() {
        let child = Child::default();
        let _ = child.raise(CounterEvent::Reset);
    }

    #[test]
    #[should_panic(expected = "recorded on")]
    fn test_raised_event_cannot_be_recorded_on_foreign_root() {
        let mut child = Child::default();
        child.register_aggregate_root(&ObjectId::new("CounterId", "1"));

        let mut other = Counter::blank(CounterId(2));
        other.record_raised(child.raise(CounterEvent::Reset));
    }
}
