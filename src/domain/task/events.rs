use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{ChecklistItemId, TaskId};
use crate::event_sourcing::DomainEvent;

// ============================================================================
// Task Events - Domain Events for Task Aggregate
// ============================================================================

/// Task Event - Union type for all task events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    #[serde(rename = "TaskCreated")]
    Created(TaskCreated),
    #[serde(rename = "TaskRenamed")]
    Renamed(TaskRenamed),
    ChecklistItemAdded(ChecklistItemAdded),
    ChecklistItemChecked(ChecklistItemChecked),
    #[serde(rename = "TaskCompleted")]
    Completed(TaskCompleted),
}

impl DomainEvent for TaskEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::Created(_) => "TaskCreated",
            TaskEvent::Renamed(_) => "TaskRenamed",
            TaskEvent::ChecklistItemAdded(_) => "ChecklistItemAdded",
            TaskEvent::ChecklistItemChecked(_) => "ChecklistItemChecked",
            TaskEvent::Completed(_) => "TaskCompleted",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Task Created - Initial event in task lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskCreated {
    pub task_id: TaskId,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskRenamed {
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChecklistItemAdded {
    pub item_id: ChecklistItemId,
    pub label: String,
}

/// Raised by the checklist item itself, recorded through its task
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChecklistItemChecked {
    pub item_id: ChecklistItemId,
}

/// Task Completed - Task lifecycle ended
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaskCompleted {
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_are_adjacently_tagged_with_their_type() {
        let id = TaskId::generate();
        let event = TaskEvent::Created(TaskCreated {
            task_id: id,
            description: "test".to_string(),
        });

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({ "type": "TaskCreated", "data": { "task_id": id.to_string(), "description": "test" } })
        );
        assert_eq!(event.event_type(), "TaskCreated");
    }

    #[test]
    fn test_every_tag_matches_event_type() {
        let events = vec![
            TaskEvent::Renamed(TaskRenamed {
                description: "x".to_string(),
            }),
            TaskEvent::ChecklistItemAdded(ChecklistItemAdded {
                item_id: ChecklistItemId::new(1),
                label: "y".to_string(),
            }),
            TaskEvent::ChecklistItemChecked(ChecklistItemChecked {
                item_id: ChecklistItemId::new(1),
            }),
            TaskEvent::Completed(TaskCompleted {
                completed_at: Utc::now(),
            }),
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], json!(event.event_type()));
            let back: TaskEvent = serde_json::from_value(value).unwrap();
            assert_eq!(back, event);
        }
    }

    #[test]
    fn test_unknown_event_tag_fails_to_decode() {
        let result = serde_json::from_value::<TaskEvent>(json!({ "type": "TaskArchived", "data": {} }));

        assert!(result.is_err());
    }
}
