use std::sync::Arc;

use crate::container::{Container, EntryNotFound};
use crate::event_sourcing::core::{DomainEvent, EventMessage, EventStream, MessageId, ObjectId};

// ============================================================================
// Event Bus - Publish Committed Events to Subscribers
// ============================================================================
//
// Publication happens after a successful append, on the calling thread:
// - events in stream order
// - subscribers of one event in registration order
// - the first failing subscriber stops publication
//
// Subscribers are either shared instances or service ids resolved through a
// container at publish time.
//
// ============================================================================

/// Reacts to committed events (projections, process managers)
pub trait EventSubscriber<E>: Send + Sync {
    /// `aggregate_id` identifies the stream the event was committed to
    fn on_event(&self, aggregate_id: &ObjectId, message: &EventMessage<E>) -> anyhow::Result<()>;
}

impl<E, F> EventSubscriber<E> for F
where
    F: Fn(&ObjectId, &EventMessage<E>) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, aggregate_id: &ObjectId, message: &EventMessage<E>) -> anyhow::Result<()> {
        self(aggregate_id, message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("subscriber failed on {event_type} event {event_id}")]
    SubscriberFailed {
        event_type: String,
        event_id: MessageId,
        #[source]
        source: anyhow::Error,
    },

    #[error("subscriber service '{service_id}' could not be resolved")]
    SubscriberNotFound {
        service_id: String,
        #[source]
        source: EntryNotFound,
    },
}

enum Target<E> {
    Instance(Arc<dyn EventSubscriber<E>>),
    Service(String),
}

struct Subscription<E> {
    /// `None` subscribes to every event type
    event_type: Option<String>,
    target: Target<E>,
}

impl<E> Subscription<E> {
    fn matches(&self, event_type: &str) -> bool {
        self.event_type.as_deref().map_or(true, |wanted| wanted == event_type)
    }
}

pub struct EventBus<E: DomainEvent> {
    subscriptions: Vec<Subscription<E>>,
    container: Option<Arc<dyn Container<dyn EventSubscriber<E>>>>,
}

impl<E: DomainEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            container: None,
        }
    }
}

impl<E: DomainEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve service-id subscriptions through `container`
    pub fn with_container(mut self, container: Arc<dyn Container<dyn EventSubscriber<E>>>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn subscribe(&mut self, event_type: impl Into<String>, subscriber: Arc<dyn EventSubscriber<E>>) {
        self.subscriptions.push(Subscription {
            event_type: Some(event_type.into()),
            target: Target::Instance(subscriber),
        });
    }

    pub fn subscribe_all(&mut self, subscriber: Arc<dyn EventSubscriber<E>>) {
        self.subscriptions.push(Subscription {
            event_type: None,
            target: Target::Instance(subscriber),
        });
    }

    /// Subscribe a container service, looked up on every publication
    pub fn subscribe_service(&mut self, event_type: impl Into<String>, service_id: impl Into<String>) {
        self.subscriptions.push(Subscription {
            event_type: Some(event_type.into()),
            target: Target::Service(service_id.into()),
        });
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.matches(event_type))
            .count()
    }

    fn resolve(&self, target: &Target<E>) -> Result<Arc<dyn EventSubscriber<E>>, EventBusError> {
        match target {
            Target::Instance(subscriber) => Ok(Arc::clone(subscriber)),
            Target::Service(service_id) => {
                let lookup = match &self.container {
                    Some(container) => container.get(service_id),
                    None => Err(EntryNotFound {
                        id: service_id.clone(),
                    }),
                };
                lookup.map_err(|source| EventBusError::SubscriberNotFound {
                    service_id: service_id.clone(),
                    source,
                })
            }
        }
    }

    /// Deliver every event of a committed stream.
    pub fn publish(&self, stream: &EventStream<E>) -> Result<(), EventBusError> {
        for streamed in stream {
            let message = streamed.message();
            let event_type = message.payload_type();

            for subscription in self.subscriptions.iter().filter(|s| s.matches(event_type)) {
                let subscriber = self.resolve(&subscription.target)?;

                if let Err(source) = subscriber.on_event(stream.aggregate_id(), message) {
                    tracing::error!(
                        aggregate_id = %stream.aggregate_id(),
                        event_type = event_type,
                        event_id = %message.message_id(),
                        error = %source,
                        "Event subscriber failed"
                    );
                    return Err(EventBusError::SubscriberFailed {
                        event_type: event_type.to_string(),
                        event_id: message.message_id(),
                        source,
                    });
                }
            }
        }

        if !stream.is_empty() {
            tracing::debug!(
                aggregate_id = %stream.aggregate_id(),
                event_count = stream.len(),
                "Published events"
            );
        }

        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
