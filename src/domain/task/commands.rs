use serde::{Deserialize, Serialize};

use super::value_objects::{ChecklistItemId, TaskId};
use crate::cqrs::Command;
use crate::event_sourcing::MessageName;

// ============================================================================
// Task Commands - Represent user intent
// ============================================================================

/// The handler generates the new task's id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameTask {
    pub task_id: TaskId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddChecklistItem {
    pub task_id: TaskId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckChecklistItem {
    pub task_id: TaskId,
    pub item_id: ChecklistItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteTask {
    pub task_id: TaskId,
}

impl MessageName for CreateTask {
    const NAME: &'static str = "CreateTask";
}

impl MessageName for RenameTask {
    const NAME: &'static str = "RenameTask";
}

impl MessageName for AddChecklistItem {
    const NAME: &'static str = "AddChecklistItem";
}

impl MessageName for CheckChecklistItem {
    const NAME: &'static str = "CheckChecklistItem";
}

impl MessageName for CompleteTask {
    const NAME: &'static str = "CompleteTask";
}

impl Command for CreateTask {}
impl Command for RenameTask {}
impl Command for AddChecklistItem {}
impl Command for CheckChecklistItem {}
impl Command for CompleteTask {}
