//! Tournament data models.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// User ID type
pub type UserId = i64;

/// Group ID type
pub type GroupId = i64;

/// Maximum number of entrants in one group
pub const GROUP_CAPACITY: i32 = 35;

/// Number of ranks that receive a reward
pub const REWARDED_RANKS: usize = 10;

/// Balance of a newly created user
pub const STARTING_COINS: i64 = 1000;

/// Level of a newly created user
pub const STARTING_LEVEL: i32 = 1;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Created, not yet accepting entries
    Planned,
    /// Accepting entries and scores
    Active,
    /// Terminal
    Closed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Planned => "planned",
            TournamentStatus::Active => "active",
            TournamentStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(TournamentStatus::Planned),
            "active" => Ok(TournamentStatus::Active),
            "closed" => Ok(TournamentStatus::Closed),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

/// Tournament model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: TournamentStatus,
}

impl Tournament {
    /// Whether `now` falls inside the tournament window (both bounds inclusive)
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Active status and `now` inside the window
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == TournamentStatus::Active && self.window_contains(now)
    }

    /// Closed, or the window is already behind us
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.status == TournamentStatus::Closed || now > self.end_date
    }
}

/// The UTC day containing `now`: `[00:00:00, 23:59:59]`
pub fn daily_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::seconds(1);
    (start, end)
}

/// Capacity-bounded bucket of entrants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub tournament_id: TournamentId,
    pub group_number: i32,
    pub current_size: i32,
}

impl Group {
    pub fn is_full(&self) -> bool {
        self.current_size >= GROUP_CAPACITY
    }
}

/// A user's participation in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentUser {
    pub id: i64,
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// Persisted reward for a ranked participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentReward {
    pub id: i64,
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub rank: i32,
    pub reward_coins: i64,
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
}

/// Reward row before insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReward {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub rank: i32,
    pub reward_coins: i64,
}

/// Fields of the user entity this service reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub coins: i64,
    pub level: i32,
    pub country: String,
}

/// Result of a committed tournament entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReceipt {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub group_number: i32,
    pub group_size: i32,
    pub remaining_coins: i64,
}

/// Result of a reward claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSummary {
    pub user_id: UserId,
    pub total_coins: i64,
    pub reward_ids: Vec<i64>,
    pub new_balance: i64,
}
