//! Composition root wiring every component from injected collaborators.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::{
    bus::{BusResult, ChannelBus, ConsumerStats, MessageBus, run_consumer},
    clock::Clock,
    config::ConfigHandle,
    db::Repositories,
    leaderboard::{
        DEFAULT_CACHE_TTL, LeaderboardCache, LeaderboardEntry, LeaderboardResult,
        LeaderboardService, RankedStore, UserRank,
    },
    tournament::{
        ClaimSummary, EntryCoordinator, Group, GroupId, NewReward, RewardDistributor,
        ScorePipeline, Tournament, TournamentId, TournamentLifecycle, TournamentResult,
        TournamentReward, TournamentUser, User, UserId,
    },
    users::UserService,
};

/// Collaborators the engine is built from
pub struct EngineDeps {
    pub repositories: Repositories,
    pub ranked_store: Arc<dyn RankedStore>,
    pub bus: Arc<dyn MessageBus>,
    pub clock: Arc<dyn Clock>,
    pub config: ConfigHandle,
    pub cache_ttl: Duration,
}

impl EngineDeps {
    pub fn new(
        repositories: Repositories,
        ranked_store: Arc<dyn RankedStore>,
        bus: Arc<dyn MessageBus>,
        clock: Arc<dyn Clock>,
        config: ConfigHandle,
    ) -> Self {
        Self {
            repositories,
            ranked_store,
            bus,
            clock,
            config,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Tournament engine exposing the caller-facing operations
#[derive(Clone)]
pub struct Engine {
    config: ConfigHandle,
    lifecycle: TournamentLifecycle,
    rewards: RewardDistributor,
    entry: Arc<EntryCoordinator>,
    scoring: Arc<ScorePipeline>,
    leaderboard: Arc<LeaderboardService>,
    users: UserService,
}

impl Engine {
    pub fn new(deps: EngineDeps) -> Self {
        let EngineDeps {
            repositories: repos,
            ranked_store,
            bus,
            clock,
            config,
            cache_ttl,
        } = deps;

        let rewards = RewardDistributor::new(
            repos.users.clone(),
            repos.participants.clone(),
            repos.rewards.clone(),
            config.clone(),
        );
        let lifecycle = TournamentLifecycle::new(
            repos.tournaments.clone(),
            repos.participants.clone(),
            rewards.clone(),
            clock.clone(),
        );
        let entry = EntryCoordinator::new(
            repos.users.clone(),
            repos.entries.clone(),
            bus.clone(),
            config.clone(),
            clock.clone(),
        );
        let scoring = ScorePipeline::new(
            repos.tournaments.clone(),
            repos.participants.clone(),
            bus.clone(),
            config.clone(),
            clock,
        );
        let leaderboard = LeaderboardService::new(ranked_store, LeaderboardCache::new(cache_ttl));
        let users = UserService::new(repos.users.clone(), bus, config.clone());

        Self {
            config,
            lifecycle,
            rewards,
            entry: Arc::new(entry),
            scoring: Arc::new(scoring),
            leaderboard: Arc::new(leaderboard),
            users,
        }
    }

    /// Start the entry, progress and leaderboard consumer loops.
    ///
    /// Topic names come from the configuration snapshot at call time. The
    /// loops end when the bus is closed.
    pub fn spawn_consumers(&self, bus: &ChannelBus) -> BusResult<Vec<JoinHandle<ConsumerStats>>> {
        let config = self.config.snapshot();

        let entries = bus.subscribe(&config.tournament_entry_topic)?;
        let progress = bus.subscribe(&config.user_progress_update_topic)?;
        let scores = bus.subscribe(&config.leaderboard_update_topic)?;

        Ok(vec![
            tokio::spawn(run_consumer(
                config.tournament_entry_topic.clone(),
                entries,
                self.entry.clone(),
            )),
            tokio::spawn(run_consumer(
                config.user_progress_update_topic.clone(),
                progress,
                self.scoring.clone(),
            )),
            tokio::spawn(run_consumer(
                config.leaderboard_update_topic.clone(),
                scores,
                self.leaderboard.clone(),
            )),
        ])
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn lifecycle(&self) -> &TournamentLifecycle {
        &self.lifecycle
    }

    pub fn entry(&self) -> &EntryCoordinator {
        &self.entry
    }

    pub fn scoring(&self) -> &ScorePipeline {
        &self.scoring
    }

    pub fn leaderboard(&self) -> &LeaderboardService {
        &self.leaderboard
    }

    // ------------------------------------------------------------------
    // Tournaments
    // ------------------------------------------------------------------

    pub async fn create_tournament(&self) -> TournamentResult<Tournament> {
        self.lifecycle.create_daily().await
    }

    pub async fn start_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.lifecycle.start(id).await
    }

    pub async fn close_tournament(&self, id: TournamentId) -> TournamentResult<Vec<NewReward>> {
        self.lifecycle.close(id).await
    }

    pub async fn active_tournament(&self) -> TournamentResult<Option<Tournament>> {
        self.lifecycle.active().await
    }

    pub async fn tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.lifecycle.get(id).await
    }

    pub async fn enter_tournament(&self, user_id: UserId) -> TournamentResult<()> {
        self.entry.request_entry(user_id).await
    }

    pub async fn tournament_groups(&self, id: TournamentId) -> TournamentResult<Vec<Group>> {
        self.lifecycle.groups(id).await
    }

    pub async fn group_standings(
        &self,
        id: TournamentId,
        group_id: GroupId,
    ) -> TournamentResult<Vec<TournamentUser>> {
        self.lifecycle.group_standings(id, group_id).await
    }

    // ------------------------------------------------------------------
    // Users and rewards
    // ------------------------------------------------------------------

    pub async fn create_user(&self, username: &str, country: &str) -> TournamentResult<User> {
        self.users.create_user(username, country).await
    }

    pub async fn claim_rewards(&self, user_id: UserId) -> TournamentResult<ClaimSummary> {
        self.rewards.claim(user_id).await
    }

    pub async fn tournament_rewards(
        &self,
        id: TournamentId,
    ) -> TournamentResult<Vec<TournamentReward>> {
        self.rewards.rewards_for_tournament(id).await
    }

    pub async fn update_progress(&self, user_id: UserId) -> TournamentResult<User> {
        self.users.update_progress(user_id).await
    }

    // ------------------------------------------------------------------
    // Leaderboards
    // ------------------------------------------------------------------

    pub async fn global_leaderboard(
        &self,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.leaderboard.global_leaderboard(limit).await
    }

    pub async fn country_leaderboard(
        &self,
        country: &str,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.leaderboard.country_leaderboard(country, limit).await
    }

    pub async fn tournament_leaderboard(
        &self,
        id: TournamentId,
        limit: usize,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        self.leaderboard.tournament_leaderboard(id, limit).await
    }

    pub async fn user_rank(&self, user_id: UserId) -> LeaderboardResult<UserRank> {
        self.leaderboard.user_rank(user_id).await
    }
}
