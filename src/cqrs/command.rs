use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::event_sourcing::{AsAny, Envelope, Message};

use super::errors::{CommandFailed, HandlerNotFound};
use super::pipeline::{Filter, FilterStack, FnFilter, Next};
use super::resolver::HandlerResolver;

// ============================================================================
// Commands
// ============================================================================
//
// A command is a fire-and-forget request to change state. It travels through
// the pipeline type-erased (`Arc<dyn Command>`) inside a CommandMessage and is
// downcast back to its concrete type by the handler.
//
// ============================================================================

/// Imperative message capability
pub trait Command: Message {}

pub type CommandMessage = Envelope<Arc<dyn Command>>;

impl Envelope<Arc<dyn Command>> {
    /// Wrap a command with a fresh id, the current time and no metadata
    pub fn for_command<C: Command>(command: C) -> Self {
        let payload_type = command.message_type();
        Envelope::new(Arc::new(command) as Arc<dyn Command>, payload_type)
    }

    /// Erase a typed envelope (e.g. one decoded from the wire), keeping its identity
    pub fn from_typed<C: Command>(envelope: Envelope<C>) -> Self {
        envelope.map_payload(|command| Arc::new(command) as Arc<dyn Command>)
    }

    pub fn command(&self) -> &dyn Command {
        &**self.payload()
    }

    /// Runtime type of the wrapped command, the key handlers are resolved by
    pub fn command_type_id(&self) -> TypeId {
        Any::type_id(self.command().as_any())
    }

    pub fn downcast<C: Command>(&self) -> Option<&C> {
        self.command().as_any().downcast_ref::<C>()
    }
}

/// Performs the state change for one or more command types
pub trait CommandHandler: Send + Sync {
    fn handle(&self, message: &CommandMessage) -> anyhow::Result<()>;
}

// ============================================================================
// Command Pipeline
// ============================================================================

/// Terminal stage: resolve the handler by runtime type and invoke it
struct DispatchCommand {
    resolver: Arc<dyn HandlerResolver<dyn CommandHandler>>,
}

impl Filter<CommandMessage, ()> for DispatchCommand {
    fn process(&self, message: CommandMessage, _next: Next<'_, CommandMessage, ()>) -> anyhow::Result<()> {
        let handler = self
            .resolver
            .resolve(message.command_type_id(), message.payload_type())?;
        handler.handle(&message)
    }
}

pub struct CommandPipeline {
    stack: FilterStack<CommandMessage, ()>,
}

impl CommandPipeline {
    pub fn new(resolver: Arc<dyn HandlerResolver<dyn CommandHandler>>) -> Self {
        Self {
            stack: FilterStack::new(Arc::new(DispatchCommand { resolver })),
        }
    }

    /// Register a filter. Filters run in reverse registration order, before
    /// handler dispatch.
    pub fn add_filter<F>(&mut self, filter: F)
    where
        F: Filter<CommandMessage, ()> + 'static,
    {
        self.stack.push(Arc::new(filter));
    }

    pub fn add_filter_fn<F>(&mut self, filter: F)
    where
        F: for<'a> Fn(CommandMessage, Next<'a, CommandMessage, ()>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.stack.push(Arc::new(FnFilter::new(filter)));
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Filter<CommandMessage, ()> + 'static,
    {
        self.add_filter(filter);
        self
    }

    pub fn filter_count(&self) -> usize {
        self.stack.len()
    }

    /// Wrap `command` in a fresh CommandMessage and run it through the chain
    pub fn execute<C: Command>(&self, command: C) -> Result<(), CommandFailed> {
        self.execute_message(CommandMessage::for_command(command))
    }

    /// Run a prepared message (e.g. carrying caller metadata) through the chain.
    ///
    /// # Errors
    ///
    /// `CommandFailed` wrapping whatever a filter, the resolver or the handler
    /// returned. Filters that already ran are not rolled back.
    pub fn execute_message(&self, message: CommandMessage) -> Result<(), CommandFailed> {
        self.stack
            .run(message.clone())
            .map_err(|source| CommandFailed { message, source })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cqrs::resolver::InMemoryResolver;
    use crate::event_sourcing::MessageName;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Ring {
        times: u32,
    }

    impl MessageName for Ring {
        const NAME: &'static str = "Ring";
    }

    impl Command for Ring {}

    #[derive(Debug)]
    struct Silence;

    impl MessageName for Silence {
        const NAME: &'static str = "Silence";
    }

    impl Command for Silence {}

    #[derive(Default)]
    struct Bell {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CommandHandler for Bell {
        fn handle(&self, message: &CommandMessage) -> anyhow::Result<()> {
            let ring = message
                .downcast::<Ring>()
                .ok_or_else(|| anyhow::anyhow!("bell only rings"))?;
            self.log.lock().push(format!("ring x{}", ring.times));
            Ok(())
        }
    }

    fn pipeline(log: &Arc<Mutex<Vec<String>>>) -> CommandPipeline {
        let mut resolver: InMemoryResolver<dyn CommandHandler> = InMemoryResolver::new();
        resolver.register::<Ring>(Arc::new(Bell { log: Arc::clone(log) }));
        CommandPipeline::new(Arc::new(resolver))
    }

    #[test]
    fn test_message_downcasts_to_concrete_command() {
        let message = CommandMessage::for_command(Ring { times: 2 });

        assert_eq!(message.payload_type(), "Ring");
        assert_eq!(message.command_type_id(), TypeId::of::<Ring>());
        assert_eq!(message.downcast::<Ring>(), Some(&Ring { times: 2 }));
        assert!(message.downcast::<Silence>().is_none());
        assert!(message.metadata().is_empty());
    }

    #[test]
    fn test_execute_without_filters_dispatches_to_handler() {
        let log = Arc::default();
        let pipeline = pipeline(&log);

        pipeline.execute(Ring { times: 3 }).unwrap();

        assert_eq!(*log.lock(), vec!["ring x3"]);
        assert_eq!(pipeline.filter_count(), 0);
    }

    #[test]
    fn test_filters_run_in_reverse_registration_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut pipeline = pipeline(&log);
        for name in ["F1", "F2"] {
            let log = Arc::clone(&log);
            pipeline.add_filter_fn(move |message, next| {
                log.lock().push(name.to_string());
                next.proceed(message)
            });
        }

        pipeline.execute(Ring { times: 1 }).unwrap();

        assert_eq!(*log.lock(), vec!["F2", "F1", "ring x1"]);
    }

    #[test]
    fn test_missing_handler_is_wrapped_with_original_message() {
        let log = Arc::default();
        let pipeline = pipeline(&log);
        let message = CommandMessage::for_command(Silence);

        let failed = pipeline.execute_message(message.clone()).unwrap_err();

        assert!(failed.is_handler_not_found());
        assert_eq!(failed.message, message);
    }

    #[test]
    fn test_guard_filter_short_circuits_handler() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut pipeline = pipeline(&log);
        pipeline.add_filter_fn(|message, next| {
            if message.metadata().contains_key("user") {
                next.proceed(message)
            } else {
                anyhow::bail!("anonymous commands are rejected")
            }
        });

        let failed = pipeline.execute(Ring { times: 1 }).unwrap_err();
        pipeline
            .execute_message(CommandMessage::for_command(Ring { times: 5 }).with_metadata("user", "ana"))
            .unwrap();

        assert_eq!(failed.source.to_string(), "anonymous commands are rejected");
        assert_eq!(*log.lock(), vec!["ring x5"]);
    }

    #[test]
    fn test_handler_error_keeps_filter_side_effects() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut resolver: InMemoryResolver<dyn CommandHandler> = InMemoryResolver::new();
        resolver.register::<Silence>(Arc::new(Bell { log: Arc::clone(&log) }));
        let mut pipeline = CommandPipeline::new(Arc::new(resolver));
        let audit = Arc::clone(&log);
        pipeline.add_filter_fn(move |message, next| {
            audit.lock().push("audited".to_string());
            next.proceed(message)
        });

        let failed = pipeline.execute(Silence).unwrap_err();

        assert_eq!(failed.source.to_string(), "bell only rings");
        assert_eq!(*log.lock(), vec!["audited"]);
    }
}
