use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::event_sourcing::{Identifier, IdentifierError};

// ============================================================================
// Task Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Identifier for TaskId {
    const ID_TYPE: &'static str = "TaskId";

    fn identifier(&self) -> String {
        self.0.to_string()
    }

    fn parse(identifier: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(identifier)
            .map(Self)
            .map_err(|e| IdentifierError {
                id_type: Self::ID_TYPE,
                value: identifier.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Position-based id of a checklist item within its task, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistItemId(u32);

impl ChecklistItemId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChecklistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    Completed,
}

// ============================================================================
// Unit Tests
// ============================================================================
