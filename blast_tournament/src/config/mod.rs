//! Dynamic (remotely refreshable) game configuration.
//!
//! Readers take a cheap [`Arc`] snapshot from [`ConfigHandle`]; a reload swaps
//! the whole document at once, so a reader never observes a half-applied
//! update.

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod handle;
pub mod source;

pub use errors::{ConfigError, ConfigResult};
pub use handle::ConfigHandle;
pub use source::{ConfigSource, HttpConfigSource, StaticConfigSource};

/// Tunables shared by entry, scoring, progress and rewards.
///
/// Missing keys fall back to [`DynamicConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicConfig {
    /// UTC hour from which entries are refused
    pub tournament_cutoff_hour: u32,
    pub minimum_tournament_entry_level: i32,
    /// Entry fee
    pub tournament_entrance_coins: i64,
    pub reward1: i64,
    pub reward2: i64,
    pub reward3: i64,
    /// Shared amount for ranks 4 through 10
    #[serde(rename = "reward4to10")]
    pub reward4_to_10: i64,
    pub coin_per_level: i64,
    /// Session token lifetime in hours, consumed by the auth layer
    #[serde(rename = "tokenTTL")]
    pub token_ttl: i64,
    pub tournament_entry_topic: String,
    pub user_progress_update_topic: String,
    pub leaderboard_update_topic: String,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            tournament_cutoff_hour: 20,
            minimum_tournament_entry_level: 10,
            tournament_entrance_coins: 500,
            reward1: 5000,
            reward2: 3000,
            reward3: 2000,
            reward4_to_10: 1000,
            coin_per_level: 100,
            token_ttl: 24,
            tournament_entry_topic: "tournament-entry".to_string(),
            user_progress_update_topic: "user-progress-update".to_string(),
            leaderboard_update_topic: "leaderboard-update".to_string(),
        }
    }
}

impl DynamicConfig {
    /// Reject documents that would break entry or reward rules
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tournament_cutoff_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "tournamentCutoffHour must be at most 24, got {}",
                self.tournament_cutoff_hour
            )));
        }

        let amounts = [
            ("tournamentEntranceCoins", self.tournament_entrance_coins),
            ("reward1", self.reward1),
            ("reward2", self.reward2),
            ("reward3", self.reward3),
            ("reward4to10", self.reward4_to_10),
            ("coinPerLevel", self.coin_per_level),
        ];
        if let Some((name, value)) = amounts.iter().find(|(_, v)| *v < 0) {
            return Err(ConfigError::Invalid(format!(
                "{name} must not be negative, got {value}"
            )));
        }

        let topics = [
            ("tournamentEntryTopic", &self.tournament_entry_topic),
            ("userProgressUpdateTopic", &self.user_progress_update_topic),
            ("leaderboardUpdateTopic", &self.leaderboard_update_topic),
        ];
        if let Some((name, _)) = topics.iter().find(|(_, t)| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{name} must not be empty")));
        }

        Ok(())
    }
}
