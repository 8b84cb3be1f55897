use std::sync::Arc;

use super::aggregate::Task;
use super::commands::*;
use super::errors::TaskError;
use super::events::TaskEvent;
use super::value_objects::TaskId;
use crate::cqrs::{CommandHandler, CommandMessage};
use crate::event_sourcing::{AggregateRepository, EventBus};

// ============================================================================
// Task Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store → Event Bus
//
// Store errors are returned as-is inside the anyhow chain, so the pipeline
// can still report a concurrency conflict as retryable.
//
// ============================================================================

pub struct TaskCommandHandler {
    repository: AggregateRepository<Task>,
    bus: Option<Arc<EventBus<TaskEvent>>>,
}

impl TaskCommandHandler {
    pub fn new(repository: AggregateRepository<Task>) -> Self {
        Self {
            repository,
            bus: None,
        }
    }

    /// Publish committed events to `bus` after every successful save
    pub fn with_event_bus(mut self, bus: Arc<EventBus<TaskEvent>>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn create(&self, command: &CreateTask, message: &CommandMessage) -> anyhow::Result<()> {
        let mut task = Task::create(TaskId::generate(), command.description.clone())?;
        self.commit(&mut task, message)
    }

    /// Load, change and save an existing task
    fn update<F>(&self, task_id: &TaskId, message: &CommandMessage, change: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskError>,
    {
        let mut task = self.repository.load(task_id)?;
        change(&mut task)?;
        self.commit(&mut task, message)
    }

    /// Save, then publish. A publish error is returned after the events are
    /// already committed; the pipeline reports it as a publish failure.
    fn commit(&self, task: &mut Task, message: &CommandMessage) -> anyhow::Result<()> {
        let committed = self.repository.save(task)?;

        tracing::info!(
            task_id = %task.id(),
            command = message.payload_type(),
            command_id = %message.message_id(),
            event_count = committed.len(),
            version = committed.version(),
            "Task command handled"
        );

        if let Some(bus) = &self.bus {
            if let Err(error) = bus.publish(&committed) {
                tracing::warn!(
                    task_id = %task.id(),
                    command_id = %message.message_id(),
                    version = committed.version(),
                    error = %error,
                    "Task events committed but not published"
                );
                return Err(error.into());
            }
        }
        Ok(())
    }
}

impl CommandHandler for TaskCommandHandler {
    fn handle(&self, message: &CommandMessage) -> anyhow::Result<()> {
        if let Some(command) = message.downcast::<CreateTask>() {
            return self.create(command, message);
        }
        if let Some(command) = message.downcast::<RenameTask>() {
            return self.update(&command.task_id, message, |task| {
                task.rename(command.description.clone())
            });
        }
        if let Some(command) = message.downcast::<AddChecklistItem>() {
            return self.update(&command.task_id, message, |task| {
                task.add_checklist_item(command.label.clone()).map(|_| ())
            });
        }
        if let Some(command) = message.downcast::<CheckChecklistItem>() {
            return self.update(&command.task_id, message, |task| {
                task.check_checklist_item(command.item_id)
            });
        }
        if let Some(command) = message.downcast::<CompleteTask>() {
            return self.update(&command.task_id, message, Task::complete);
        }

        Err(TaskError::UnsupportedMessage(message.payload_type().to_string()).into())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{AggregateRoot, EventStore, InMemoryEventStore, Identifier};

    fn handler() -> (TaskCommandHandler, Arc<InMemoryEventStore<TaskEvent>>) {
        let store = Arc::new(InMemoryEventStore::new());
        let repository = AggregateRepository::new(Arc::clone(&store) as Arc<dyn EventStore<TaskEvent>>);
        (TaskCommandHandler::new(repository), store)
    }

    fn only_task_id(store: &InMemoryEventStore<TaskEvent>) -> TaskId {
        let ids = store.stream_ids(Task::aggregate_type());
        assert_eq!(ids.len(), 1);
        TaskId::parse(ids[0].identifier()).unwrap()
    }

    #[test]
    fn test_create_task_persists_a_fresh_task() {
        let (handler, store) = handler();

        handler
            .handle(&CommandMessage::for_command(CreateTask {
                description: "test".into(),
            }))
            .unwrap();

        let task_id = only_task_id(&store);
        let stream = store.load(&task_id.object_id(), "Task").unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.messages()[0].message().payload_type(), "TaskCreated");
    }

    #[test]
    fn test_update_commands_change_stored_task() {
        let (handler, store) = handler();
        handler
            .handle(&CommandMessage::for_command(CreateTask {
                description: "Pack".into(),
            }))
            .unwrap();
        let task_id = only_task_id(&store);

        for message in [
            CommandMessage::for_command(AddChecklistItem {
                task_id,
                label: "socks".into(),
            }),
            CommandMessage::for_command(CheckChecklistItem {
                task_id,
                item_id: crate::domain::task::ChecklistItemId::new(1),
            }),
            CommandMessage::for_command(CompleteTask { task_id }),
        ] {
            handler.handle(&message).unwrap();
        }

        let task = Task::reconstitute(store.load(&task_id.object_id(), "Task").unwrap()).unwrap();
        assert!(task.is_completed());
        assert_eq!(task.concurrency_version(), 4);
    }

    #[test]
    fn test_business_rule_violation_is_returned() {
        let (handler, store) = handler();
        handler
            .handle(&CommandMessage::for_command(CreateTask {
                description: "Pack".into(),
            }))
            .unwrap();
        let task_id = only_task_id(&store);

        let err = handler
            .handle(&CommandMessage::for_command(RenameTask {
                task_id,
                description: " ".into(),
            }))
            .unwrap_err();

        assert_eq!(err.downcast_ref::<TaskError>(), Some(&TaskError::EmptyDescription));
    }

    #[test]
    fn test_failed_publish_leaves_events_committed() {
        let store = Arc::new(InMemoryEventStore::new());
        let repository = AggregateRepository::new(Arc::clone(&store) as Arc<dyn EventStore<TaskEvent>>);
        let mut bus = EventBus::new();
        bus.subscribe_service("TaskCreated", "task.board");
        let handler = TaskCommandHandler::new(repository).with_event_bus(Arc::new(bus));

        let err = handler
            .handle(&CommandMessage::for_command(CreateTask {
                description: "Call mum".into(),
            }))
            .unwrap_err();

        assert!(err.downcast_ref::<crate::event_sourcing::EventBusError>().is_some());
        let task_id = only_task_id(&store);
        assert_eq!(store.load(&task_id.object_id(), "Task").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_task_surfaces_stream_not_found() {
        let (handler, _) = handler();

        let err = handler
            .handle(&CommandMessage::for_command(CompleteTask {
                task_id: TaskId::generate(),
            }))
            .unwrap_err();

        assert!(err
            .downcast_ref::<crate::event_sourcing::StoreError>()
            .is_some_and(|e| e.is_stream_not_found()));
    }
}
