//! Prometheus metrics export for the tournament worker.
//!
//! The engine records its own counters through the `metrics` facade; this
//! module installs the exporter, describes those series and records the
//! worker-level ones.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::scheduler_job_total("open_daily_tournament", true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;
    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        "tournament_transitions_total",
        "Tournament status transitions by target status"
    );
    metrics::describe_counter!(
        "tournament_entry_requests_total",
        "Entry requests by outcome"
    );
    metrics::describe_counter!(
        "tournament_entries_committed_total",
        "Entries committed to a group"
    );
    metrics::describe_counter!(
        "tournament_entries_failed_total",
        "Entry commits rolled back"
    );
    metrics::describe_counter!("tournament_groups_created_total", "Groups opened");
    metrics::describe_counter!(
        "tournament_score_events_total",
        "Progress events by outcome"
    );
    metrics::describe_counter!(
        "bus_publish_failures_total",
        "Fire-and-forget publishes that failed"
    );
    metrics::describe_counter!("leaderboard_cache_hits_total", "Leaderboard cache hits");
    metrics::describe_counter!("leaderboard_cache_misses_total", "Leaderboard cache misses");
    metrics::describe_histogram!(
        "leaderboard_query_duration_ms",
        "Ranked store round-trip in milliseconds"
    );
    metrics::describe_counter!("tournament_rewards_created_total", "Reward rows created");
    metrics::describe_counter!("tournament_reward_claims_total", "Successful reward claims");
    metrics::describe_histogram!("tournament_reward_claim_coins", "Coins paid per claim");
    metrics::describe_counter!("scheduler_jobs_total", "Scheduled job runs by result");
    metrics::describe_counter!("config_reloads_total", "Dynamic configuration reloads");
}

// ============================================================================
// Worker Metrics
// ============================================================================

/// Record a scheduled job run.
pub fn scheduler_job_total(job: &'static str, success: bool) {
    metrics::counter!("scheduler_jobs_total",
        "job" => job,
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record a dynamic configuration reload attempt.
pub fn config_reloads_total(success: bool) {
    metrics::counter!("config_reloads_total",
        "success" => success.to_string()
    )
    .increment(1);
}
