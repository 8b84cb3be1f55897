use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::event_sourcing::{AsAny, Envelope, Message};

use super::errors::QueryFailed;
use super::pipeline::{Filter, FilterStack, FnFilter, Next};
use super::resolver::HandlerResolver;

// ============================================================================
// Queries
// ============================================================================
//
// Same stack mechanics as commands, but the terminal stage answers with a
// ViewData that travels back up through every filter. Queries are read-only:
// filters may observe failures but must return them unchanged.
//
// ============================================================================

/// Read-only request capability
pub trait Query: Message {}

pub type QueryMessage = Envelope<Arc<dyn Query>>;

impl Envelope<Arc<dyn Query>> {
    pub fn for_query<Q: Query>(query: Q) -> Self {
        let payload_type = query.message_type();
        Envelope::new(Arc::new(query) as Arc<dyn Query>, payload_type)
    }

    pub fn from_typed<Q: Query>(envelope: Envelope<Q>) -> Self {
        envelope.map_payload(|query| Arc::new(query) as Arc<dyn Query>)
    }

    pub fn query(&self) -> &dyn Query {
        &**self.payload()
    }

    pub fn query_type_id(&self) -> TypeId {
        Any::type_id(self.query().as_any())
    }

    pub fn downcast<Q: Query>(&self) -> Option<&Q> {
        self.query().as_any().downcast_ref::<Q>()
    }
}

/// Answer of a query: a serialized read model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewData(Value);

impl ViewData {
    pub fn new<T: Serialize>(view: &T) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_value(view)?))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }
}

/// Answers one or more query types
pub trait QueryHandler: Send + Sync {
    fn handle(&self, message: &QueryMessage) -> anyhow::Result<ViewData>;
}

// ============================================================================
// Query Pipeline
// ============================================================================

struct DispatchQuery {
    resolver: Arc<dyn HandlerResolver<dyn QueryHandler>>,
}

impl Filter<QueryMessage, ViewData> for DispatchQuery {
    fn process(
        &self,
        message: QueryMessage,
        _next: Next<'_, QueryMessage, ViewData>,
    ) -> anyhow::Result<ViewData> {
        let handler = self
            .resolver
            .resolve(message.query_type_id(), message.payload_type())?;
        handler.handle(&message)
    }
}

pub struct QueryPipeline {
    stack: FilterStack<QueryMessage, ViewData>,
}

impl QueryPipeline {
    pub fn new(resolver: Arc<dyn HandlerResolver<dyn QueryHandler>>) -> Self {
        Self {
            stack: FilterStack::new(Arc::new(DispatchQuery { resolver })),
        }
    }

    pub fn add_filter<F>(&mut self, filter: F)
    where
        F: Filter<QueryMessage, ViewData> + 'static,
    {
        self.stack.push(Arc::new(filter));
    }

    pub fn add_filter_fn<F>(&mut self, filter: F)
    where
        F: for<'a> Fn(QueryMessage, Next<'a, QueryMessage, ViewData>) -> anyhow::Result<ViewData>
            + Send
            + Sync
            + 'static,
    {
        self.stack.push(Arc::new(FnFilter::new(filter)));
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Filter<QueryMessage, ViewData> + 'static,
    {
        self.add_filter(filter);
        self
    }

    pub fn filter_count(&self) -> usize {
        self.stack.len()
    }

    pub fn ask<Q: Query>(&self, query: Q) -> Result<ViewData, QueryFailed> {
        self.ask_message(QueryMessage::for_query(query))
    }

    pub fn ask_message(&self, message: QueryMessage) -> Result<ViewData, QueryFailed> {
        self.stack
            .run(message.clone())
            .map_err(|source| QueryFailed { message, source })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
