use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Tracing Initialization
// ============================================================================

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; `default_directive` (e.g. `"es_pipeline=info"`)
/// applies when it is unset. Returns `false` if a subscriber was already
/// installed, which is harmless when several tests initialize logging.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()
        .is_ok()
}
