//! Daily tournament lifecycle: planned, then active, then closed.

use std::sync::Arc;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{
        Group, GroupId, NewReward, Tournament, TournamentId, TournamentStatus, TournamentUser,
        daily_window,
    },
    rewards::RewardDistributor,
};
use crate::{
    clock::Clock,
    db::{ParticipantRepository, TournamentRepository},
    telemetry,
};

/// Creates, activates and closes tournaments
#[derive(Clone)]
pub struct TournamentLifecycle {
    tournaments: Arc<dyn TournamentRepository>,
    participants: Arc<dyn ParticipantRepository>,
    rewards: RewardDistributor,
    clock: Arc<dyn Clock>,
}

impl TournamentLifecycle {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        participants: Arc<dyn ParticipantRepository>,
        rewards: RewardDistributor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tournaments,
            participants,
            rewards,
            clock,
        }
    }

    /// Insert a planned tournament spanning the current UTC day
    pub async fn create_daily(&self) -> TournamentResult<Tournament> {
        let (start, end) = daily_window(self.clock.now());
        let tournament = self
            .tournaments
            .create(start, end, TournamentStatus::Planned)
            .await?;

        telemetry::tournament_transition(TournamentStatus::Planned.as_str());
        log::info!(
            "Created tournament {} for {} .. {}",
            tournament.id,
            tournament.start_date,
            tournament.end_date
        );
        Ok(tournament)
    }

    /// Activate a tournament that has not ended.
    ///
    /// Starting an active tournament is a no-op. Fails with a conflict when a
    /// different tournament is active now.
    pub async fn start(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let now = self.clock.now();
        let mut tournament = self.get(id).await?;
        if tournament.has_ended(now) {
            return Err(TournamentError::TournamentAlreadyEnded(id));
        }
        if tournament.status == TournamentStatus::Active {
            log::debug!("Tournament {} already active", id);
            return Ok(tournament);
        }

        if let Some(active) = self.tournaments.activate(id, now).await? {
            log::warn!("Refusing to start tournament {}: {} is active", id, active.id);
            return Err(TournamentError::AnotherTournamentActive {
                active: active.id,
                requested: id,
            });
        }
        tournament.status = TournamentStatus::Active;

        telemetry::tournament_transition(TournamentStatus::Active.as_str());
        log::info!("Started tournament {}", id);
        Ok(tournament)
    }

    /// Close a tournament and store its rewards
    pub async fn close(&self, id: TournamentId) -> TournamentResult<Vec<NewReward>> {
        let tournament = self.get(id).await?;
        if tournament.status == TournamentStatus::Closed {
            return Err(TournamentError::TournamentAlreadyEnded(id));
        }

        self.tournaments
            .update_status(id, TournamentStatus::Closed)
            .await?;
        telemetry::tournament_transition(TournamentStatus::Closed.as_str());
        log::info!("Closed tournament {}", id);

        self.rewards.store_rewards(id).await
    }

    /// Active tournament whose window contains now
    pub async fn active(&self) -> TournamentResult<Option<Tournament>> {
        Ok(self.tournaments.find_active(self.clock.now()).await?)
    }

    pub async fn get(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.tournaments
            .find_by_id(id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    /// Midnight job. Reuses today's tournament when a previous run already
    /// created or started it.
    pub async fn create_and_start_daily(&self) -> TournamentResult<Tournament> {
        let (start, _) = daily_window(self.clock.now());
        let tournament = match self.tournaments.find_open_by_start(start).await? {
            Some(existing) if existing.status == TournamentStatus::Active => {
                log::info!("Tournament {} already running for {}", existing.id, start);
                return Ok(existing);
            }
            Some(existing) => existing,
            None => self.create_daily().await?,
        };
        self.start(tournament.id).await
    }

    /// End-of-day job; `None` when nothing is active
    pub async fn close_active(&self) -> TournamentResult<Option<(TournamentId, Vec<NewReward>)>> {
        match self.active().await? {
            Some(tournament) => {
                let rewards = self.close(tournament.id).await?;
                Ok(Some((tournament.id, rewards)))
            }
            None => {
                log::info!("No active tournament to close");
                Ok(None)
            }
        }
    }

    /// Groups of a tournament ordered by group number
    pub async fn groups(&self, id: TournamentId) -> TournamentResult<Vec<Group>> {
        self.get(id).await?;
        Ok(self.participants.list_groups(id).await?)
    }

    /// Members of one group, best score first
    pub async fn group_standings(
        &self,
        id: TournamentId,
        group_id: GroupId,
    ) -> TournamentResult<Vec<TournamentUser>> {
        if !self.groups(id).await?.iter().any(|g| g.id == group_id) {
            return Err(TournamentError::GroupNotFound {
                tournament_id: id,
                group_id,
            });
        }
        Ok(self.participants.list_by_group(id, group_id).await?)
    }
}
