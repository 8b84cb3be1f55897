use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the message pipeline
// ============================================================================
//
// Provides metrics for:
// - Commands and queries dispatched (outcome, latency)
// - Events appended to the event store
// - Optimistic concurrency conflicts
//
// Each PipelineMetrics owns its registry; exposition is text-format only.
// ============================================================================

/// Outcome label for a dispatched message
pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";

pub struct PipelineMetrics {
    registry: Registry,

    // Pipeline Metrics
    messages_total: IntCounterVec,
    message_duration: HistogramVec,

    // Event Store Metrics
    events_appended: IntCounterVec,
    concurrency_conflicts: IntCounterVec,
}

impl PipelineMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let messages_total = IntCounterVec::new(
            Opts::new("es_pipeline_messages_total", "Total messages dispatched through a pipeline"),
            &["kind", "message_type", "outcome"],
        )?;
        registry.register(Box::new(messages_total.clone()))?;

        let message_duration = HistogramVec::new(
            HistogramOpts::new("es_pipeline_message_duration_seconds", "Message dispatch duration")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["kind", "message_type"],
        )?;
        registry.register(Box::new(message_duration.clone()))?;

        let events_appended = IntCounterVec::new(
            Opts::new("es_pipeline_events_appended_total", "Total events appended to the event store"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let concurrency_conflicts = IntCounterVec::new(
            Opts::new(
                "es_pipeline_concurrency_conflicts_total",
                "Appends rejected by optimistic concurrency",
            ),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(concurrency_conflicts.clone()))?;

        Ok(Self {
            registry,
            messages_total,
            message_duration,
            events_appended,
            concurrency_conflicts,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> anyhow::Result<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }

    /// Helper to record one dispatched command or query
    pub fn record_message(&self, kind: &str, message_type: &str, success: bool, duration_secs: f64) {
        let outcome = if success { OUTCOME_SUCCESS } else { OUTCOME_FAILURE };
        self.messages_total
            .with_label_values(&[kind, message_type, outcome])
            .inc();
        self.message_duration
            .with_label_values(&[kind, message_type])
            .observe(duration_secs);
    }

    pub fn record_events_appended(&self, aggregate_type: &str, count: usize) {
        self.events_appended
            .with_label_values(&[aggregate_type])
            .inc_by(count as u64);
    }

    pub fn record_concurrency_conflict(&self, aggregate_type: &str) {
        self.concurrency_conflicts
            .with_label_values(&[aggregate_type])
            .inc();
    }

    pub fn messages(&self, kind: &str, message_type: &str, outcome: &str) -> u64 {
        self.messages_total
            .with_label_values(&[kind, message_type, outcome])
            .get()
    }

    pub fn events_appended(&self, aggregate_type: &str) -> u64 {
        self.events_appended.with_label_values(&[aggregate_type]).get()
    }

    pub fn concurrency_conflicts(&self, aggregate_type: &str) -> u64 {
        self.concurrency_conflicts
            .with_label_values(&[aggregate_type])
            .get()
    }
}
