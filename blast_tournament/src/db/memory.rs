//! In-memory store used by tests and local runs without PostgreSQL.
//!
//! All tables live behind one async mutex. An entry transaction holds the
//! owned guard for its whole lifetime and works on a copy of the tables, so
//! entries are serialised and an uncommitted transaction leaves no trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    errors::{StoreError, StoreResult},
    repository::{
        EntryStore, EntryTransaction, ParticipantRepository, RewardRepository,
        TournamentRepository, UserRepository,
    },
};
use crate::clock::{Clock, SystemClock};
use crate::tournament::models::{
    Group, GroupId, NewReward, STARTING_COINS, STARTING_LEVEL, Tournament, TournamentId,
    TournamentReward, TournamentStatus, TournamentUser, User, UserId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    groups: BTreeMap<GroupId, Group>,
    participants: BTreeMap<i64, TournamentUser>,
    rewards: BTreeMap<i64, TournamentReward>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_at(&self, now: DateTime<Utc>) -> Option<Tournament> {
        self.tournaments
            .values()
            .filter(|t| t.is_active_at(now))
            .max_by_key(|t| t.start_date)
            .cloned()
    }
}

#[derive(Debug, Default)]
struct Faults {
    participant_inserts: AtomicBool,
    reward_inserts: AtomicBool,
    claim_marks: AtomicBool,
    score_updates: AtomicBool,
}

fn check(flag: &AtomicBool, context: &'static str) -> StoreResult<()> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Injected { context })
    } else {
        Ok(())
    }
}

/// Store implementing every repository trait on in-process tables
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamp `created_at` columns from the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            faults: Arc::new(Faults::default()),
            clock,
        }
    }

    /// Insert a user row
    pub async fn insert_user(&self, username: &str, coins: i64, level: i32, country: &str) -> User {
        let mut tables = self.tables.lock().await;
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            coins,
            level,
            country: country.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        user
    }
}

/// Hooks for tests; only compiled with the `test-util` feature
#[cfg(any(test, feature = "test-util"))]
impl MemoryStore {
    /// Overwrite a participant's score
    pub async fn set_score(&self, participant_id: i64, score: i64) {
        if let Some(p) = self.tables.lock().await.participants.get_mut(&participant_id) {
            p.score = score;
        }
    }

    /// Fail every participant insert inside entry transactions
    pub fn fail_participant_inserts(&self, fail: bool) {
        self.faults.participant_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail reward batch inserts
    pub fn fail_reward_inserts(&self, fail: bool) {
        self.faults.reward_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail marking rewards as claimed
    pub fn fail_claim_marks(&self, fail: bool) {
        self.faults.claim_marks.store(fail, Ordering::SeqCst);
    }

    /// Fail score increments
    pub fn fail_score_updates(&self, fail: bool) {
        self.faults.score_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, username: &str, country: &str) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            coins: STARTING_COINS,
            level: STARTING_LEVEL,
            country: country.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn level_up(&self, user_id: UserId, coins: i64) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .get_mut(&user_id)
            .map(|user| {
                user.level += 1;
                user.coins += coins;
                user.clone()
            }))
    }

    async fn credit_coins(&self, user_id: UserId, amount: i64) -> StoreResult<Option<i64>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .get_mut(&user_id)
            .map(|user| {
                user.coins += amount;
                user.coins
            }))
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn create(
        &self,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        status: TournamentStatus,
    ) -> StoreResult<Tournament> {
        let mut tables = self.tables.lock().await;
        let tournament = Tournament {
            id: tables.next_id(),
            start_date,
            end_date,
            status,
        };
        tables.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn find_by_id(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.tables.lock().await.tournaments.get(&id).cloned())
    }

    async fn update_status(&self, id: TournamentId, status: TournamentStatus) -> StoreResult<()> {
        if let Some(t) = self.tables.lock().await.tournaments.get_mut(&id) {
            t.status = status;
        }
        Ok(())
    }

    async fn find_active(&self, now: DateTime<Utc>) -> StoreResult<Option<Tournament>> {
        Ok(self.tables.lock().await.active_at(now))
    }

    async fn find_open_by_start(
        &self,
        start_date: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self
            .tables
            .lock()
            .await
            .tournaments
            .values()
            .filter(|t| t.start_date == start_date && t.status != TournamentStatus::Closed)
            .max_by_key(|t| (t.status == TournamentStatus::Active, t.id))
            .cloned())
    }

    async fn activate(
        &self,
        id: TournamentId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        let mut tables = self.tables.lock().await;
        let other = tables
            .tournaments
            .values()
            .find(|t| t.id != id && t.is_active_at(now))
            .cloned();
        if other.is_some() {
            return Ok(other);
        }
        if let Some(t) = tables.tournaments.get_mut(&id) {
            t.status = TournamentStatus::Active;
        }
        Ok(None)
    }
}

#[async_trait]
impl ParticipantRepository for MemoryStore {
    async fn find(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> StoreResult<Option<TournamentUser>> {
        Ok(self
            .tables
            .lock()
            .await
            .participants
            .values()
            .find(|p| p.tournament_id == tournament_id && p.user_id == user_id)
            .cloned())
    }

    async fn increment_score(&self, participant_id: i64) -> StoreResult<i64> {
        check(
            &self.faults.score_updates,
            "failed to update tournament user score",
        )?;
        let mut tables = self.tables.lock().await;
        let participant = tables.participants.get_mut(&participant_id).ok_or(
            StoreError::Corrupt {
                context: "failed to update tournament user score",
                message: format!("participant {participant_id} does not exist"),
            },
        )?;
        participant.score += 1;
        Ok(participant.score)
    }

    async fn list_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentUser>> {
        Ok(self
            .tables
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn list_by_group(
        &self,
        tournament_id: TournamentId,
        group_id: GroupId,
    ) -> StoreResult<Vec<TournamentUser>> {
        let mut members: Vec<TournamentUser> = self
            .tables
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id && p.group_id == group_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn list_groups(&self, tournament_id: TournamentId) -> StoreResult<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .tables
            .lock()
            .await
            .groups
            .values()
            .filter(|g| g.tournament_id == tournament_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.group_number);
        Ok(groups)
    }
}

#[async_trait]
impl RewardRepository for MemoryStore {
    async fn create_rewards(&self, rewards: &[NewReward]) -> StoreResult<()> {
        check(
            &self.faults.reward_inserts,
            "failed to create tournament rewards",
        )?;
        let created_at = self.clock.now();
        let mut tables = self.tables.lock().await;
        for reward in rewards {
            let id = tables.next_id();
            tables.rewards.insert(
                id,
                TournamentReward {
                    id,
                    tournament_id: reward.tournament_id,
                    user_id: reward.user_id,
                    rank: reward.rank,
                    reward_coins: reward.reward_coins,
                    claimed: false,
                    created_at,
                },
            );
        }
        Ok(())
    }

    async fn unclaimed_by_user(&self, user_id: UserId) -> StoreResult<Vec<TournamentReward>> {
        let mut rewards: Vec<TournamentReward> = self
            .tables
            .lock()
            .await
            .rewards
            .values()
            .filter(|r| r.user_id == user_id && !r.claimed)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rewards)
    }

    async fn mark_claimed(&self, reward_id: i64) -> StoreResult<()> {
        check(&self.faults.claim_marks, "failed to claim reward")?;
        if let Some(r) = self.tables.lock().await.rewards.get_mut(&reward_id) {
            r.claimed = true;
        }
        Ok(())
    }

    async fn list_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<TournamentReward>> {
        let mut rewards: Vec<TournamentReward> = self
            .tables
            .lock()
            .await
            .rewards
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rewards.sort_by_key(|r| r.rank);
        Ok(rewards)
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn EntryTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryEntryTransaction {
            guard,
            working,
            faults: self.faults.clone(),
            clock: self.clock.clone(),
        }))
    }
}

/// Entry commit holding the table lock until commit or drop
pub struct MemoryEntryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Faults>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl EntryTransaction for MemoryEntryTransaction {
    async fn find_active_tournament(
        &mut self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self.working.active_at(now))
    }

    async fn lock_user(&mut self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn set_user_coins(&mut self, user_id: UserId, coins: i64) -> StoreResult<()> {
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.coins = coins;
        }
        Ok(())
    }

    async fn lock_last_group(&mut self, tournament_id: TournamentId) -> StoreResult<Option<Group>> {
        Ok(self
            .working
            .groups
            .values()
            .filter(|g| g.tournament_id == tournament_id)
            .max_by_key(|g| g.group_number)
            .cloned())
    }

    async fn create_group(
        &mut self,
        tournament_id: TournamentId,
        group_number: i32,
    ) -> StoreResult<Group> {
        let taken = self
            .working
            .groups
            .values()
            .any(|g| g.tournament_id == tournament_id && g.group_number == group_number);
        if taken {
            return Err(StoreError::Corrupt {
                context: "failed to create group",
                message: format!("group {group_number} already exists"),
            });
        }

        let group = Group {
            id: self.working.next_id(),
            tournament_id,
            group_number,
            current_size: 0,
        };
        self.working.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn set_group_size(&mut self, group_id: GroupId, size: i32) -> StoreResult<()> {
        if let Some(group) = self.working.groups.get_mut(&group_id) {
            group.current_size = size;
        }
        Ok(())
    }

    async fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        user_id: UserId,
        group_id: GroupId,
    ) -> StoreResult<TournamentUser> {
        check(
            &self.faults.participant_inserts,
            "failed to create tournament user",
        )?;
        let participant = TournamentUser {
            id: self.working.next_id(),
            tournament_id,
            user_id,
            group_id,
            score: 0,
            created_at: self.clock.now(),
        };
        self.working
            .participants
            .insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryEntryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
