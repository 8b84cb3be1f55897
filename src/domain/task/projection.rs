use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::TaskEvent;
use super::value_objects::{ChecklistItemId, TaskId, TaskStatus};
use crate::event_sourcing::{EventMessage, EventSubscriber, Identifier, ObjectId};

// ============================================================================
// Task Board - Read Model Projection
// ============================================================================
//
// Subscribes to committed Task events and keeps one denormalized view per
// task. Queries are answered from here, never from the event store.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItemView {
    pub item_id: ChecklistItemId,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub checklist: Vec<ChecklistItemView>,
    /// Number of events folded into this view
    pub version: u64,
}

#[derive(Default)]
pub struct TaskBoard {
    views: RwLock<BTreeMap<TaskId, TaskView>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task_id: &TaskId) -> Option<TaskView> {
        self.views.read().get(task_id).cloned()
    }

    pub fn list(&self, include_completed: bool) -> Vec<TaskView> {
        self.views
            .read()
            .values()
            .filter(|view| include_completed || view.status == TaskStatus::Open)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }
}

impl EventSubscriber<TaskEvent> for TaskBoard {
    fn on_event(&self, aggregate_id: &ObjectId, message: &EventMessage<TaskEvent>) -> anyhow::Result<()> {
        let task_id = TaskId::parse(aggregate_id.identifier())?;
        let mut views = self.views.write();

        if let TaskEvent::Created(e) = message.payload() {
            views.insert(
                e.task_id,
                TaskView {
                    task_id: e.task_id,
                    description: e.description.clone(),
                    status: TaskStatus::Open,
                    checklist: Vec::new(),
                    version: 1,
                },
            );
            return Ok(());
        }

        let Some(view) = views.get_mut(&task_id) else {
            anyhow::bail!("task {task_id} has no view yet, {} arrived before TaskCreated", message.payload_type());
        };

        match message.payload() {
            TaskEvent::Created(_) => {}
            TaskEvent::Renamed(e) => view.description = e.description.clone(),
            TaskEvent::ChecklistItemAdded(e) => view.checklist.push(ChecklistItemView {
                item_id: e.item_id,
                label: e.label.clone(),
                checked: false,
            }),
            TaskEvent::ChecklistItemChecked(e) => {
                let Some(item) = view.checklist.iter_mut().find(|item| item.item_id == e.item_id) else {
                    anyhow::bail!("task {task_id} has no checklist item {} to check", e.item_id);
                };
                item.checked = true;
            }
            TaskEvent::Completed(_) => view.status = TaskStatus::Completed,
        }
        view.version += 1;

        tracing::debug!(
            task_id = %task_id,
            event_type = message.payload_type(),
            version = view.version,
            "Projected task event"
        );

        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::events::{ChecklistItemAdded, ChecklistItemChecked, TaskCreated, TaskRenamed};
    use crate::event_sourcing::Envelope;

    fn feed(board: &TaskBoard, task_id: TaskId, event: TaskEvent) -> anyhow::Result<()> {
        board.on_event(&task_id.object_id(), &Envelope::for_event(event))
    }

    #[test]
    fn test_projection_follows_task_lifecycle() {
        let board = TaskBoard::new();
        let id = TaskId::generate();

        feed(&board, id, TaskEvent::Created(TaskCreated { task_id: id, description: "Buy milk".into() })).unwrap();
        feed(&board, id, TaskEvent::Renamed(TaskRenamed { description: "Buy oat milk".into() })).unwrap();
        feed(
            &board,
            id,
            TaskEvent::ChecklistItemAdded(ChecklistItemAdded {
                item_id: ChecklistItemId::new(1),
                label: "check fridge".into(),
            }),
        )
        .unwrap();

        let view = board.get(&id).unwrap();
        assert_eq!(view.description, "Buy oat milk");
        assert_eq!(view.checklist.len(), 1);
        assert_eq!(view.version, 3);
        assert_eq!(board.list(false).len(), 1);
    }

    #[test]
    fn test_check_of_missing_item_fails_without_advancing() {
        let board = TaskBoard::new();
        let id = TaskId::generate();
        feed(&board, id, TaskEvent::Created(TaskCreated { task_id: id, description: "Pack".into() })).unwrap();

        let result = feed(
            &board,
            id,
            TaskEvent::ChecklistItemChecked(ChecklistItemChecked {
                item_id: ChecklistItemId::new(2),
            }),
        );

        assert!(result.is_err());
        assert_eq!(board.get(&id).unwrap().version, 1);
    }

    #[test]
    fn test_event_for_unknown_task_fails() {
        let board = TaskBoard::new();
        let id = TaskId::generate();

        let result = feed(&board, id, TaskEvent::Renamed(TaskRenamed { description: "x".into() }));

        assert!(result.is_err());
        assert!(board.is_empty());
    }
}
