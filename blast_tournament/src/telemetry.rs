//! Metric recording for the tournament engine.
//!
//! Values go through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder (the server installs Prometheus).

// ============================================================================
// Lifecycle
// ============================================================================

/// Tournament status transition
pub fn tournament_transition(status: &'static str) {
    metrics::counter!("tournament_transitions_total", "status" => status).increment(1);
}

// ============================================================================
// Entries
// ============================================================================

/// Phase-1 decision: `accepted` or the rejection reason
pub fn entry_requests_total(outcome: &'static str) {
    metrics::counter!("tournament_entry_requests_total", "outcome" => outcome).increment(1);
}

/// Committed entry
pub fn entries_committed_total() {
    metrics::counter!("tournament_entries_committed_total").increment(1);
}

/// Entry commit rolled back
pub fn entries_failed_total() {
    metrics::counter!("tournament_entries_failed_total").increment(1);
}

/// New group opened
pub fn groups_created_total() {
    metrics::counter!("tournament_groups_created_total").increment(1);
}

// ============================================================================
// Scores
// ============================================================================

/// Progress event outcome: `scored` or the drop reason
pub fn score_events_total(outcome: &'static str) {
    metrics::counter!("tournament_score_events_total", "outcome" => outcome).increment(1);
}

/// Fire-and-forget publish that failed after the primary effect committed
pub fn publish_failures_total(topic: &str) {
    metrics::counter!("bus_publish_failures_total", "topic" => topic.to_string()).increment(1);
}

// ============================================================================
// Leaderboard
// ============================================================================

pub fn leaderboard_cache_hit(scope: &'static str) {
    metrics::counter!("leaderboard_cache_hits_total", "scope" => scope).increment(1);
}

pub fn leaderboard_cache_miss(scope: &'static str) {
    metrics::counter!("leaderboard_cache_misses_total", "scope" => scope).increment(1);
}

/// Ranked store round-trip in milliseconds
pub fn leaderboard_query_duration_ms(operation: &'static str, duration_ms: f64) {
    metrics::histogram!("leaderboard_query_duration_ms", "operation" => operation)
        .record(duration_ms);
}

// ============================================================================
// Rewards
// ============================================================================

/// Reward rows written at close
pub fn rewards_created_total(count: usize) {
    metrics::counter!("tournament_rewards_created_total").increment(count as u64);
}

/// Coins paid out by a claim
pub fn reward_coins_claimed(coins: i64) {
    metrics::counter!("tournament_reward_claims_total").increment(1);
    metrics::histogram!("tournament_reward_claim_coins").record(coins as f64);
}
