//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up alongside native `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("Worker starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a scheduled job run
///
/// # Arguments
///
/// * `job` - Job name
/// * `duration_ms` - Run time in milliseconds
/// * `outcome` - Short outcome description
pub fn log_job_run(job: &str, duration_ms: u64, outcome: &str) {
    if duration_ms > 5000 {
        tracing::warn!(
            job = job,
            duration_ms = duration_ms,
            outcome = outcome,
            "Slow scheduled job"
        );
    } else {
        tracing::info!(
            job = job,
            duration_ms = duration_ms,
            outcome = outcome,
            "Scheduled job finished"
        );
    }
}

/// Log a consumer loop exit with its counters
pub fn log_consumer_exit(topic: &str, received: u64, handled: u64, failed: u64) {
    tracing::info!(
        topic = topic,
        received = received,
        handled = handled,
        failed = failed,
        "Consumer stopped"
    );
}
