//! Daily tournaments: lifecycle, entry, scoring and rewards.

pub mod entry;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod rewards;
pub mod scoring;

pub use entry::EntryCoordinator;
pub use errors::{TournamentError, TournamentResult};
pub use lifecycle::TournamentLifecycle;
pub use models::{
    ClaimSummary, EntryReceipt, GROUP_CAPACITY, Group, GroupId, NewReward, REWARDED_RANKS,
    Tournament, TournamentId, TournamentReward, TournamentStatus, TournamentUser, User, UserId,
};
pub use rewards::{RewardDistributor, RewardTiers};
pub use scoring::{DropReason, ScoreOutcome, ScorePipeline};
