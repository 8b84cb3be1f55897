// ============================================================================
// CQRS - Command & Query Pipelines
// ============================================================================
//
// - command / query: message capabilities, envelopes, handlers, pipelines
// - pipeline: the filter stack both pipelines are built on
// - resolver: message type → handler (in-memory or container-backed)
// - filters: logging, metrics and metadata filters
// - errors: stable failure types at the pipeline boundary
//
// ============================================================================

pub mod command;
pub mod errors;
pub mod filters;
pub mod pipeline;
pub mod query;
pub mod resolver;

pub use command::{Command, CommandHandler, CommandMessage, CommandPipeline};
pub use errors::{CommandFailed, HandlerNotFound, InvalidRegistration, QueryFailed};
pub use filters::{LoggingFilter, MetaDataFilter, MetricsFilter};
pub use pipeline::{Filter, FilterStack, FnFilter, Next};
pub use query::{Query, QueryHandler, QueryMessage, QueryPipeline, ViewData};
pub use resolver::{
    HandlerKind, HandlerResolver, InMemoryResolver, MessageCatalog, ServiceMapConfig,
    ServiceMapResolver,
};
