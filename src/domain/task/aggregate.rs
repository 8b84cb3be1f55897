use chrono::{DateTime, Utc};

use super::errors::TaskError;
use super::events::*;
use super::value_objects::{ChecklistItemId, TaskId, TaskStatus};
use crate::event_sourcing::{
    AggregateRoot, ChildEntity, EntityRegistration, EventSourcingState, ObjectId, RaisedEvent,
};

// ============================================================================
// Checklist Item - Child Entity of Task
// ============================================================================
//
// Items never record events themselves: they raise them through the task they
// are registered to, and the task records them.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistItem {
    id: ChecklistItemId,
    label: String,
    checked: bool,
    registration: EntityRegistration,
}

impl ChecklistItem {
    fn new(id: ChecklistItemId, label: String, root: &ObjectId) -> Self {
        let mut item = Self {
            id,
            label,
            checked: false,
            registration: EntityRegistration::new(),
        };
        item.register_aggregate_root(root);
        item
    }

    pub fn id(&self) -> ChecklistItemId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Raise the check event; the owning task must record it
    pub fn check(&self) -> Result<RaisedEvent<TaskEvent>, TaskError> {
        if self.checked {
            return Err(TaskError::ChecklistItemAlreadyChecked(self.id));
        }
        Ok(self.raise(TaskEvent::ChecklistItemChecked(ChecklistItemChecked {
            item_id: self.id,
        })))
    }
}

impl ChildEntity for ChecklistItem {
    fn registration(&self) -> &EntityRegistration {
        &self.registration
    }

    fn registration_mut(&mut self) -> &mut EntityRegistration {
        &mut self.registration
    }
}

// ============================================================================
// Task Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone)]
pub struct Task {
    // Identity
    id: TaskId,

    // Current State (derived from events)
    description: String,
    status: TaskStatus,
    checklist: Vec<ChecklistItem>,
    completed_at: Option<DateTime<Utc>>,

    es: EventSourcingState<TaskEvent>,
}

impl Task {
    /// Start a new task; records `TaskCreated`
    pub fn create(id: TaskId, description: impl Into<String>) -> Result<Self, TaskError> {
        let description = Self::validate_description(description.into())?;

        let mut task = Self::blank(id);
        task.record_that(TaskEvent::Created(TaskCreated {
            task_id: id,
            description,
        }));
        Ok(task)
    }

    /// Renaming to the current description records nothing
    pub fn rename(&mut self, description: impl Into<String>) -> Result<(), TaskError> {
        self.ensure_open()?;
        let description = Self::validate_description(description.into())?;
        if description == self.description {
            return Ok(());
        }

        self.record_that(TaskEvent::Renamed(TaskRenamed { description }));
        Ok(())
    }

    pub fn add_checklist_item(&mut self, label: impl Into<String>) -> Result<ChecklistItemId, TaskError> {
        self.ensure_open()?;
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(TaskError::EmptyLabel);
        }

        let item_id = ChecklistItemId::new(self.checklist.len() as u32 + 1);
        self.record_that(TaskEvent::ChecklistItemAdded(ChecklistItemAdded { item_id, label }));
        Ok(item_id)
    }

    pub fn check_checklist_item(&mut self, item_id: ChecklistItemId) -> Result<(), TaskError> {
        self.ensure_open()?;
        let raised = self
            .checklist
            .iter()
            .find(|item| item.id == item_id)
            .ok_or(TaskError::ChecklistItemNotFound(item_id))?
            .check()?;

        self.record_raised(raised);
        Ok(())
    }

    /// Completion requires every checklist item to be checked
    pub fn complete(&mut self) -> Result<(), TaskError> {
        self.ensure_open()?;
        let unchecked = self.checklist.iter().filter(|item| !item.checked).count();
        if unchecked > 0 {
            return Err(TaskError::UncheckedItems(unchecked));
        }

        self.record_that(TaskEvent::Completed(TaskCompleted {
            completed_at: Utc::now(),
        }));
        Ok(())
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    fn ensure_open(&self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Open => Ok(()),
            TaskStatus::Completed => Err(TaskError::AlreadyCompleted),
        }
    }

    fn validate_description(description: String) -> Result<String, TaskError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TaskError::EmptyDescription);
        }
        Ok(description.to_string())
    }
}

// ============================================================================
// AggregateRoot Implementation
// ============================================================================

impl AggregateRoot for Task {
    type Id = TaskId;
    type Event = TaskEvent;

    fn aggregate_type() -> &'static str {
        "Task"
    }

    fn blank(id: TaskId) -> Self {
        Self {
            id,
            description: String::new(),
            status: TaskStatus::Open,
            checklist: Vec::new(),
            completed_at: None,
            es: EventSourcingState::new(),
        }
    }

    fn aggregate_id(&self) -> &TaskId {
        &self.id
    }

    fn apply(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::Created(e) => {
                self.description = e.description.clone();
                self.status = TaskStatus::Open;
            }
            TaskEvent::Renamed(e) => {
                self.description = e.description.clone();
            }
            TaskEvent::ChecklistItemAdded(e) => {
                let root = self.object_id();
                self.checklist
                    .push(ChecklistItem::new(e.item_id, e.label.clone(), &root));
            }
            TaskEvent::ChecklistItemChecked(e) => {
                let Some(item) = self.checklist.iter_mut().find(|item| item.id == e.item_id) else {
                    panic!(
                        "corrupt history: checklist item {} checked on task {} but never added",
                        e.item_id, self.id
                    );
                };
                item.checked = true;
            }
            TaskEvent::Completed(e) => {
                self.status = TaskStatus::Completed;
                self.completed_at = Some(e.completed_at);
            }
        }
    }

    fn event_sourcing(&self) -> &EventSourcingState<TaskEvent> {
        &self.es
    }

    fn event_sourcing_mut(&mut self) -> &mut EventSourcingState<TaskEvent> {
        &mut self.es
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
