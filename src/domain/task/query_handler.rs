use std::sync::Arc;

use super::errors::TaskError;
use super::projection::TaskBoard;
use super::queries::{GetTask, ListTasks};
use crate::cqrs::{QueryHandler, QueryMessage, ViewData};

// ============================================================================
// Task Query Handler
// ============================================================================
//
// Answers GetTask / ListTasks from the TaskBoard projection.
//
// ============================================================================

pub struct TaskQueryHandler {
    board: Arc<TaskBoard>,
}

impl TaskQueryHandler {
    pub fn new(board: Arc<TaskBoard>) -> Self {
        Self { board }
    }
}

impl QueryHandler for TaskQueryHandler {
    fn handle(&self, message: &QueryMessage) -> anyhow::Result<ViewData> {
        if let Some(query) = message.downcast::<GetTask>() {
            let view = self
                .board
                .get(&query.task_id)
                .ok_or(TaskError::NotFound(query.task_id))?;
            return Ok(ViewData::new(&view)?);
        }

        if let Some(query) = message.downcast::<ListTasks>() {
            return Ok(ViewData::new(&self.board.list(query.include_completed))?);
        }

        Err(TaskError::UnsupportedMessage(message.payload_type().to_string()).into())
    }
}
