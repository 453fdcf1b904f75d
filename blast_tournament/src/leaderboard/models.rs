//! Leaderboard scopes and rows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tournament::models::{TournamentId, UserId};

/// One independently ranked set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    Global,
    Country(String),
    Tournament(TournamentId),
}

impl LeaderboardScope {
    /// Ranked-set key
    pub fn key(&self) -> String {
        match self {
            LeaderboardScope::Global => "leaderboard:global".to_string(),
            LeaderboardScope::Country(country) => format!("leaderboard:country:{country}"),
            LeaderboardScope::Tournament(id) => format!("leaderboard:tournament:{id}"),
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            LeaderboardScope::Global => "global",
            LeaderboardScope::Country(_) => "country",
            LeaderboardScope::Tournament(_) => "tournament",
        }
    }
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Row of a leaderboard page; `rank` is the 1-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: UserId,
    pub score: i64,
}

/// A user's standing in the global set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRank {
    pub user_id: UserId,
    pub rank: u64,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(LeaderboardScope::Global.key(), "leaderboard:global");
        assert_eq!(
            LeaderboardScope::Country("US".into()).key(),
            "leaderboard:country:US"
        );
        assert_eq!(
            LeaderboardScope::Tournament(9).key(),
            "leaderboard:tournament:9"
        );
    }

    #[test]
    fn test_country_keys_never_alias_other_scopes() {
        assert_ne!(
            LeaderboardScope::Country("global".into()).key(),
            LeaderboardScope::Global.key()
        );
        assert_ne!(
            LeaderboardScope::Country("tournament:1".into()).key(),
            LeaderboardScope::Tournament(1).key()
        );
    }
}
