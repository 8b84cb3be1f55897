use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::message::{Message, MessageId};
use super::metadata::{MetaData, MetaValue};

// ============================================================================
// Envelope - Immutable Message Wrapper
// ============================================================================
//
// Shared by commands, queries and events:
// - identity: generated once at creation, never changes
// - timestamp: creation time
// - payload type tag + payload
// - metadata: scalar-only key/value pairs
//
// "Mutators" return new envelopes that keep the same id and timestamp.
// Equality is identity (message id); ordering is (timestamp, id).
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    message_id: MessageId,
    timestamp: DateTime<Utc>,
    payload_type: String,
    payload: T,
    metadata: MetaData,
}

impl<T> Envelope<T> {
    /// Wrap a payload under an explicit type tag with a fresh id and timestamp.
    pub fn new(payload: T, payload_type: impl Into<String>) -> Self {
        Self {
            message_id: MessageId::generate(),
            timestamp: Utc::now(),
            payload_type: payload_type.into(),
            payload,
            metadata: MetaData::new(),
        }
    }

    /// Rebuild an envelope from stored parts (wire decoding, stream loading).
    pub fn from_parts(
        message_id: MessageId,
        timestamp: DateTime<Utc>,
        payload_type: impl Into<String>,
        payload: T,
        metadata: MetaData,
    ) -> Self {
        Self {
            message_id,
            timestamp,
            payload_type: payload_type.into(),
            payload,
            metadata,
        }
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload_type(&self) -> &str {
        &self.payload_type
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// Replace the payload while keeping identity, timestamp and metadata.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            message_id: self.message_id,
            timestamp: self.timestamp,
            payload_type: self.payload_type,
            payload: f(self.payload),
            metadata: self.metadata,
        }
    }
}

impl<T: Clone> Envelope<T> {
    /// New envelope with one extra metadata entry.
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        let mut copy = self.clone();
        copy.metadata.insert(key, value);
        copy
    }

    /// New envelope whose metadata is replaced by `metadata`.
    pub fn with_meta_data(&self, metadata: MetaData) -> Self {
        Self {
            metadata,
            ..self.clone()
        }
    }

    /// New envelope with `metadata` merged over the existing entries.
    pub fn merge_metadata(&self, metadata: &MetaData) -> Self {
        Self {
            metadata: self.metadata.merge(metadata),
            ..self.clone()
        }
    }
}

impl<T: Message> Envelope<T> {
    /// Wrap a message, tagging it with its message name.
    pub fn wrap(payload: T) -> Self {
        let payload_type = payload.message_type();
        Self::new(payload, payload_type)
    }
}

impl<T> PartialEq for Envelope<T> {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id
    }
}

impl<T> Eq for Envelope<T> {}

impl<T> PartialOrd for Envelope<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Envelope<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.message_id.cmp(&other.message_id))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
