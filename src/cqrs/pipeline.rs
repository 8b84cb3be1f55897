use std::sync::Arc;

// ============================================================================
// Filter Stack - Continuation-Passing Dispatch
// ============================================================================
//
// Filters live in an ordered list whose first entry is the terminal stage
// (handler dispatch). Dispatch starts from the END of the list, so:
//
//   registered [A, B, C]  →  invoked C, B, A, terminal
//
// Each filter receives the message and a `Next` continuation over the
// filters below it. Calling `next.proceed(message)` runs the rest of the
// chain; not calling it short-circuits everything below.
//
// ============================================================================

/// Cross-cutting stage around handler dispatch
pub trait Filter<M, R>: Send + Sync {
    fn process(&self, message: M, next: Next<'_, M, R>) -> anyhow::Result<R>;
}

/// Filter built from a closure, see `add_filter_fn` on the pipelines
pub struct FnFilter<F>(F);

impl<F> FnFilter<F> {
    pub fn new<M, R>(f: F) -> Self
    where
        F: for<'a> Fn(M, Next<'a, M, R>) -> anyhow::Result<R> + Send + Sync,
    {
        Self(f)
    }
}

impl<M, R, F> Filter<M, R> for FnFilter<F>
where
    F: for<'a> Fn(M, Next<'a, M, R>) -> anyhow::Result<R> + Send + Sync,
{
    fn process(&self, message: M, next: Next<'_, M, R>) -> anyhow::Result<R> {
        (self.0)(message, next)
    }
}

/// Continuation over the filters that have not run yet
pub struct Next<'a, M, R> {
    remaining: &'a [Arc<dyn Filter<M, R>>],
}

impl<'a, M, R> Next<'a, M, R> {
    /// Run the next filter down the stack (the terminal stage runs last)
    pub fn proceed(self, message: M) -> anyhow::Result<R> {
        match self.remaining.split_last() {
            Some((filter, rest)) => filter.process(message, Next { remaining: rest }),
            None => anyhow::bail!("filter chain exhausted without reaching a terminal stage"),
        }
    }

    /// Number of filters still to run, the terminal stage included
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// Ordered filter list seeded with a terminal stage
pub struct FilterStack<M, R> {
    filters: Vec<Arc<dyn Filter<M, R>>>,
}

impl<M, R> FilterStack<M, R> {
    pub fn new(terminal: Arc<dyn Filter<M, R>>) -> Self {
        Self {
            filters: vec![terminal],
        }
    }

    /// Push a filter on top: it runs before every filter registered earlier
    pub fn push(&mut self, filter: Arc<dyn Filter<M, R>>) {
        self.filters.push(filter);
    }

    /// Registered filters, the terminal stage excluded
    pub fn len(&self) -> usize {
        self.filters.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn run(&self, message: M) -> anyhow::Result<R> {
        Next {
            remaining: &self.filters,
        }
        .proceed(message)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
