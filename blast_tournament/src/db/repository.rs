//! Repository trait definitions for testability and dependency injection.
//!
//! The PostgreSQL implementation lives in [`super::postgres`], the in-memory
//! one in [`super::memory`]. Components hold `Arc<dyn ...>` handles bundled in
//! [`Repositories`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::errors::StoreResult;
use crate::tournament::models::{
    Group, GroupId, NewReward, Tournament, TournamentId, TournamentReward, TournamentStatus,
    TournamentUser, User, UserId,
};

/// User rows (external entity; only coins, level and country are touched)
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Insert a user with the starting balance and level, or `None` if the
    /// username is taken
    async fn create_user(&self, username: &str, country: &str) -> StoreResult<Option<User>>;

    /// Add one level and `coins` in one statement, returning the updated row
    /// or `None` if the user does not exist
    async fn level_up(&self, user_id: UserId, coins: i64) -> StoreResult<Option<User>>;

    /// Add `amount` to the balance in one statement, returning the new
    /// balance or `None` if the user does not exist
    async fn credit_coins(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>>;
}

/// Tournament rows
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a tournament
    async fn create(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        status: TournamentStatus,
    ) -> StoreResult<Tournament>;

    /// Find tournament by ID
    async fn find_by_id(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Overwrite the status column
    async fn update_status(&self, id: TournamentId, status: TournamentStatus) -> StoreResult<()>;

    /// Active tournament whose window contains `now` (inclusive)
    async fn find_active(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>>;

    /// Most recent planned or active tournament starting at `start_date`
    async fn find_open_by_start(&self, start_date: DateTime<Utc>)
    -> StoreResult<Option<Tournament>>;

    /// Mark `id` active unless another tournament is active at `now`.
    ///
    /// Returns the other tournament instead of activating. Concurrent calls
    /// are serialised so at most one of them can succeed.
    async fn activate(&self, id: TournamentId, now: DateTime<Utc>)
    -> StoreResult<Option<Tournament>>;
}

/// Tournament participants and their groups
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Participation row for a user in a tournament
    async fn find(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<TournamentUser>>;

    /// Add one point, returning the new score
    async fn increment_score(&self, participant_id: i64) -> StoreResult<i64>;

    /// All participants of a tournament
    async fn list_by_tournament(&self, tournament_id: TournamentId)
    -> StoreResult<Vec<TournamentUser>>;

    /// Participants of one group, best score first
    async fn list_by_group(
        &self,
        tournament_id: TournamentId,
        group_id: GroupId,
    ) -> StoreResult<Vec<TournamentUser>>;

    /// Groups of a tournament ordered by group number
    async fn list_groups(&self, tournament_id: TournamentId) -> StoreResult<Vec<Group>>;
}

/// Tournament rewards
#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// Insert all rows in one batch
    async fn create_rewards(&self, rewards: &[NewReward]) -> StoreResult<()>;

    /// Unclaimed rewards across all tournaments, newest first
    async fn unclaimed_by_user(&self, user_id: UserId) -> StoreResult<Vec<TournamentReward>>;

    /// Flip the claimed flag of one reward
    async fn mark_claimed(&self, reward_id: i64) -> StoreResult<()>;

    /// Rewards of a tournament ordered by rank
    async fn list_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentReward>>;
}

/// Opens the transaction used by the entry commit
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn EntryTransaction>>;
}

/// One atomic entry commit. Dropping without [`EntryTransaction::commit`]
/// rolls everything back.
#[async_trait]
pub trait EntryTransaction: Send {
    /// Active tournament whose window contains `now`
    async fn find_active_tournament(
        &mut self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>>;

    /// Lock the user row exclusively
    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Overwrite the coin balance of a locked user
    async fn set_user_coins(&mut self, user_id: UserId, coins: i64) -> StoreResult<()>;

    /// Lock the highest-numbered group of the tournament
    async fn lock_last_group(&mut self, tournament_id: TournamentId) -> StoreResult<Option<Group>>;

    /// Insert an empty group
    async fn create_group(
        &mut self,
        tournament_id: TournamentId,
        group_number: i32,
    ) -> StoreResult<Group>;

    /// Persist a group's size
    async fn set_group_size(&mut self, group_id: GroupId, size: i32) -> StoreResult<()>;

    /// Insert the participation row
    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        group_id: GroupId,
    ) -> StoreResult<TournamentUser>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Repository handles shared by all components
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tournaments: Arc<dyn TournamentRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub rewards: Arc<dyn RewardRepository>,
    pub entries: Arc<dyn EntryStore>,
}

impl Repositories {
    /// Use one store for every repository
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + TournamentRepository
            + ParticipantRepository
            + RewardRepository
            + EntryStore
            + 'static,
    {
        Self {
            users: store.clone(),
            tournaments: store.clone(),
            participants: store.clone(),
            rewards: store.clone(),
            entries: store,
        }
    }
}
