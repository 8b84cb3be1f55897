use super::value_objects::{ChecklistItemId, TaskId};

// ============================================================================
// Task Business Rule Errors
// ============================================================================

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Checklist item label cannot be empty")]
    EmptyLabel,

    #[error("Task is already completed")]
    AlreadyCompleted,

    #[error("Checklist item {0} does not exist")]
    ChecklistItemNotFound(ChecklistItemId),

    #[error("Checklist item {0} is already checked")]
    ChecklistItemAlreadyChecked(ChecklistItemId),

    #[error("Task still has {0} unchecked checklist item(s)")]
    UncheckedItems(usize),

    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),
}
