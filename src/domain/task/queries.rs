use serde::{Deserialize, Serialize};

use super::value_objects::TaskId;
use crate::cqrs::Query;
use crate::event_sourcing::MessageName;

// ============================================================================
// Task Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTask {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListTasks {
    #[serde(default)]
    pub include_completed: bool,
}

impl MessageName for GetTask {
    const NAME: &'static str = "GetTask";
}

impl MessageName for ListTasks {
    const NAME: &'static str = "ListTasks";
}

impl Query for GetTask {}
impl Query for ListTasks {}
