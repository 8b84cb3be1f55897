use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Message Identity & Capability
// ============================================================================
//
// Every envelope (command, query, event) carries a MessageId generated once
// at creation. UUIDv7 keeps ids sortable by creation time.
//
// ============================================================================

/// Globally unique, time-ordered message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Upcast to `Any` so type-erased payloads can be downcast again.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stable name of a message type, used as the wire type tag and as the key
/// in service maps.
pub trait MessageName {
    const NAME: &'static str;
}

/// Object-safe message capability.
///
/// Implemented automatically for every `MessageName` type; commands and
/// queries refine it with the `Command` / `Query` marker traits.
pub trait Message: AsAny + fmt::Debug + Send + Sync {
    fn message_type(&self) -> &'static str;
}

impl<T> Message for T
where
    T: MessageName + Any + fmt::Debug + Send + Sync,
{
    fn message_type(&self) -> &'static str {
        T::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;

    impl MessageName for Ping {
        const NAME: &'static str = "Ping";
    }

    #[test]
    fn test_message_ids_are_unique() {
        let first = MessageId::generate();
        let second = MessageId::generate();

        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_message_type_through_trait_object() {
        let message: &dyn Message = &Ping;

        assert_eq!(message.message_type(), "Ping");
        assert!(message.as_any().downcast_ref::<Ping>().is_some());
    }

    #[test]
    fn test_message_id_serializes_as_plain_uuid() {
        let id = MessageId::generate();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
