use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::aggregate::ObjectId;
use super::envelope::Envelope;
use super::event::{DomainEvent, EventStream};
use super::message::{MessageId, MessageName};
use super::metadata::MetaData;

// ============================================================================
// Wire Formats
// ============================================================================
//
// Command/query envelope:
//   { message_id, timestamp, <kind>_type, <kind>_data, meta_data }
//
// Event stream (what persistence adapters must round-trip):
//   { object_id: {type, identifier}, object_type, committed, version,
//     messages: [ { event_id, date_time, meta_data,
//                   event_data: {type, data}, sequence } ] }
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("serialized envelope must be a JSON object")]
    NotAnObject,

    #[error("serialized envelope is missing field '{0}'")]
    MissingField(String),

    #[error("payload type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("inconsistent event stream: {0}")]
    InconsistentStream(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which field-name prefix an envelope uses on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Command,
    Query,
}

impl EnvelopeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EnvelopeKind::Command => "command",
            EnvelopeKind::Query => "query",
        }
    }

    fn type_field(&self) -> String {
        format!("{}_type", self.prefix())
    }

    fn data_field(&self) -> String {
        format!("{}_data", self.prefix())
    }
}

/// Serialize an envelope into its wire representation.
pub fn encode<T: Serialize>(kind: EnvelopeKind, envelope: &Envelope<T>) -> Result<Value, WireError> {
    let mut fields = Map::new();
    fields.insert("message_id".into(), serde_json::to_value(envelope.message_id())?);
    fields.insert("timestamp".into(), serde_json::to_value(envelope.timestamp())?);
    fields.insert(kind.type_field(), Value::String(envelope.payload_type().to_string()));
    fields.insert(kind.data_field(), serde_json::to_value(envelope.payload())?);
    fields.insert("meta_data".into(), serde_json::to_value(envelope.metadata())?);
    Ok(Value::Object(fields))
}

/// Rebuild an envelope from its wire representation.
///
/// The type tag must match the name of `T`.
pub fn decode<T>(kind: EnvelopeKind, value: Value) -> Result<Envelope<T>, WireError>
where
    T: MessageName + DeserializeOwned,
{
    let Value::Object(mut fields) = value else {
        return Err(WireError::NotAnObject);
    };

    let mut take = |name: String| {
        fields
            .remove(&name)
            .ok_or(WireError::MissingField(name))
    };

    let message_id: MessageId = serde_json::from_value(take("message_id".into())?)?;
    let timestamp: DateTime<Utc> = serde_json::from_value(take("timestamp".into())?)?;
    let payload_type: String = serde_json::from_value(take(kind.type_field())?)?;
    if payload_type != T::NAME {
        return Err(WireError::TypeMismatch {
            expected: T::NAME.to_string(),
            found: payload_type,
        });
    }
    let payload: T = serde_json::from_value(take(kind.data_field())?)?;
    let metadata: MetaData = serde_json::from_value(take("meta_data".into())?)?;

    Ok(Envelope::from_parts(message_id, timestamp, payload_type, payload, metadata))
}

/// Serialized form of one stream message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord<E> {
    pub event_id: MessageId,
    pub date_time: DateTime<Utc>,
    pub meta_data: MetaData,
    pub event_data: E,
    pub sequence: u64,
}

/// Serialized form of an event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStreamRecord<E> {
    pub object_id: ObjectId,
    pub object_type: String,
    pub committed: Option<u64>,
    pub version: u64,
    pub messages: Vec<EventRecord<E>>,
}

impl<E> From<EventStream<E>> for EventStreamRecord<E> {
    fn from(stream: EventStream<E>) -> Self {
        let object_id = stream.aggregate_id().clone();
        let object_type = stream.aggregate_type().to_string();
        let committed = stream.committed_version();
        let version = stream.version();

        let messages = stream
            .into_iter()
            .map(|streamed| {
                let sequence = streamed.sequence();
                let message = streamed.into_message();
                EventRecord {
                    event_id: message.message_id(),
                    date_time: message.timestamp(),
                    meta_data: message.metadata().clone(),
                    event_data: message.into_payload(),
                    sequence,
                }
            })
            .collect();

        Self {
            object_id,
            object_type,
            committed,
            version,
            messages,
        }
    }
}

impl<E: DomainEvent> TryFrom<EventStreamRecord<E>> for EventStream<E> {
    type Error = WireError;

    fn try_from(record: EventStreamRecord<E>) -> Result<Self, Self::Error> {
        let mut stream = EventStream::new(record.object_id, record.object_type, record.committed);

        for message in record.messages {
            let event_type = message.event_data.event_type();
            let envelope = Envelope::from_parts(
                message.event_id,
                message.date_time,
                event_type,
                message.event_data,
                message.meta_data,
            );
            let assigned = stream.append(envelope);
            if assigned != message.sequence {
                return Err(WireError::InconsistentStream(format!(
                    "expected sequence {assigned}, found {}",
                    message.sequence
                )));
            }
        }

        if stream.version() != record.version {
            return Err(WireError::InconsistentStream(format!(
                "version {} does not match committed {:?} + {} messages",
                record.version,
                record.committed,
                stream.len()
            )));
        }

        Ok(stream)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CreateTask {
        description: String,
    }

    impl MessageName for CreateTask {
        const NAME: &'static str = "CreateTask";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum NoteEvent {
        NoteWritten { text: String },
    }

    impl DomainEvent for NoteEvent {
        fn event_type(&self) -> &'static str {
            "NoteWritten"
        }
    }

    #[test]
    fn test_command_envelope_round_trip() {
        let original = Envelope::wrap(CreateTask {
            description: "test".to_string(),
        })
        .with_metadata("user", "alice")
        .with_metadata("tags", vec!["a", "b"]);

        let encoded = encode(EnvelopeKind::Command, &original).unwrap();
        assert_eq!(encoded["command_type"], json!("CreateTask"));
        assert_eq!(encoded["command_data"], json!({ "description": "test" }));
        assert_eq!(encoded["meta_data"], json!({ "tags": ["a", "b"], "user": "alice" }));

        let decoded: Envelope<CreateTask> = decode(EnvelopeKind::Command, encoded).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.timestamp(), original.timestamp());
        assert_eq!(decoded.payload(), original.payload());
        assert_eq!(decoded.metadata(), original.metadata());
    }

    #[test]
    fn test_query_prefix_is_used_for_query_envelopes() {
        let envelope = Envelope::wrap(CreateTask {
            description: "x".to_string(),
        });

        let encoded = encode(EnvelopeKind::Query, &envelope).unwrap();

        assert!(encoded.get("query_type").is_some());
        assert!(encoded.get("command_type").is_none());
        let decoded = decode::<CreateTask>(EnvelopeKind::Command, encoded);
        assert!(matches!(decoded, Err(WireError::MissingField(f)) if f == "command_type"));
    }

    #[test]
    fn test_decode_rejects_foreign_type_tag() {
        let envelope = Envelope::new(
            CreateTask {
                description: "x".to_string(),
            },
            "DeleteTask",
        );
        let encoded = encode(EnvelopeKind::Command, &envelope).unwrap();

        let decoded = decode::<CreateTask>(EnvelopeKind::Command, encoded);
        assert!(matches!(decoded, Err(WireError::TypeMismatch { .. })));
    }

    #[test]
    fn test_event_stream_record_shape() {
        let mut stream = EventStream::new(ObjectId::new("NoteId", "n-1"), "Note", Some(2));
        stream.append(Envelope::for_event(NoteEvent::NoteWritten {
            text: "hello".to_string(),
        }));

        let value = serde_json::to_value(&stream).unwrap();

        assert_eq!(value["object_id"], json!({ "type": "NoteId", "identifier": "n-1" }));
        assert_eq!(value["object_type"], json!("Note"));
        assert_eq!(value["committed"], json!(2));
        assert_eq!(value["version"], json!(3));
        assert_eq!(
            value["messages"][0]["event_data"],
            json!({ "type": "NoteWritten", "data": { "text": "hello" } })
        );
        assert_eq!(value["messages"][0]["sequence"], json!(0));

        let restored: EventStream<NoteEvent> = serde_json::from_value(value).unwrap();
        assert_eq!(restored.version(), 3);
        assert_eq!(restored.messages()[0].message(), stream.messages()[0].message());
        assert_eq!(restored.messages()[0].message().payload_type(), "NoteWritten");
    }

    #[test]
    fn test_inconsistent_records_are_rejected() {
        let mut stream = EventStream::new(ObjectId::new("NoteId", "n-1"), "Note", None);
        stream.append(Envelope::for_event(NoteEvent::NoteWritten {
            text: "hello".to_string(),
        }));

        let mut value = serde_json::to_value(&stream).unwrap();
        value["version"] = json!(9);
        assert!(serde_json::from_value::<EventStream<NoteEvent>>(value).is_err());

        let mut value = serde_json::to_value(&stream).unwrap();
        value["messages"][0]["sequence"] = json!(4);
        assert!(serde_json::from_value::<EventStream<NoteEvent>>(value).is_err());
    }
}
