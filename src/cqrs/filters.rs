use std::sync::Arc;
use std::time::Instant;

use crate::event_sourcing::{Envelope, EnvelopeKind, MetaData};
use crate::metrics::PipelineMetrics;

use super::pipeline::{Filter, Next};

// ============================================================================
// Stock Filters
// ============================================================================
//
// Generic over the envelope payload, so each works on both pipelines:
//
//   commands.add_filter(LoggingFilter::new(EnvelopeKind::Command));
//   queries.add_filter(LoggingFilter::new(EnvelopeKind::Query));
//
// None of them swallows errors.
//
// ============================================================================

/// Logs every message around the rest of the chain, then rethrows failures
pub struct LoggingFilter {
    kind: EnvelopeKind,
}

impl LoggingFilter {
    pub fn new(kind: EnvelopeKind) -> Self {
        Self { kind }
    }
}

impl<T, R> Filter<Envelope<T>, R> for LoggingFilter
where
    T: Send + Sync,
{
    fn process(&self, message: Envelope<T>, next: Next<'_, Envelope<T>, R>) -> anyhow::Result<R> {
        let message_id = message.message_id();
        let message_type = message.payload_type().to_string();

        tracing::info!(
            kind = self.kind.prefix(),
            message_id = %message_id,
            message_type = %message_type,
            metadata = ?message.metadata(),
            "Dispatching message"
        );

        match next.proceed(message) {
            Ok(result) => {
                tracing::debug!(
                    kind = self.kind.prefix(),
                    message_id = %message_id,
                    message_type = %message_type,
                    "Message handled"
                );
                Ok(result)
            }
            Err(error) => {
                tracing::error!(
                    kind = self.kind.prefix(),
                    message_id = %message_id,
                    message_type = %message_type,
                    error = %error,
                    "Message failed"
                );
                Err(error)
            }
        }
    }
}

/// Counts outcomes and times dispatch per message type
pub struct MetricsFilter {
    metrics: Arc<PipelineMetrics>,
    kind: EnvelopeKind,
}

impl MetricsFilter {
    pub fn new(metrics: Arc<PipelineMetrics>, kind: EnvelopeKind) -> Self {
        Self { metrics, kind }
    }
}

impl<T, R> Filter<Envelope<T>, R> for MetricsFilter
where
    T: Send + Sync,
{
    fn process(&self, message: Envelope<T>, next: Next<'_, Envelope<T>, R>) -> anyhow::Result<R> {
        let message_type = message.payload_type().to_string();
        let started = Instant::now();

        let result = next.proceed(message);

        self.metrics.record_message(
            self.kind.prefix(),
            &message_type,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        result
    }
}

/// Merges fixed metadata into every envelope passed down the chain
pub struct MetaDataFilter {
    metadata: MetaData,
}

impl MetaDataFilter {
    pub fn new(metadata: MetaData) -> Self {
        Self { metadata }
    }
}

impl<T, R> Filter<Envelope<T>, R> for MetaDataFilter
where
    T: Clone + Send + Sync,
{
    fn process(&self, message: Envelope<T>, next: Next<'_, Envelope<T>, R>) -> anyhow::Result<R> {
        next.proceed(message.merge_metadata(&self.metadata))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
