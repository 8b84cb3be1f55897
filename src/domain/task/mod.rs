// ============================================================================
// Task Domain - Business Logic for Task Aggregate
// ============================================================================
//
// This module contains ALL Task-specific code:
// - Value objects (TaskId, ChecklistItemId, TaskStatus)
// - Events (TaskCreated, TaskRenamed, ChecklistItemChecked, etc.)
// - Commands and queries
// - Errors (TaskError enum)
// - Aggregate (Task, with ChecklistItem child entities)
// - Command Handler (TaskCommandHandler)
// - Projection (TaskBoard) and Query Handler (TaskQueryHandler)
//
// This is completely separate from the generic event sourcing infrastructure.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod queries;
pub mod errors;
pub mod aggregate;
pub mod command_handler;
pub mod projection;
pub mod query_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use queries::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
pub use projection::*;
pub use query_handler::*;

use crate::cqrs::MessageCatalog;

/// Every Task command and query, for building handler maps from config
pub fn message_catalog() -> MessageCatalog {
    MessageCatalog::new()
        .command::<CreateTask>()
        .command::<RenameTask>()
        .command::<AddChecklistItem>()
        .command::<CheckChecklistItem>()
        .command::<CompleteTask>()
        .query::<GetTask>()
        .query::<ListTasks>()
}
