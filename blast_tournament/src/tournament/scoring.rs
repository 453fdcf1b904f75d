//! Progress events to tournament score.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::errors::{TournamentError, TournamentResult};
use crate::{
    bus::{EventHandler, LeaderboardScoreUpdated, MessageBus, ProgressUpdated, publish_event},
    clock::Clock,
    config::ConfigHandle,
    db::{ParticipantRepository, TournamentRepository},
    telemetry,
};

/// Why a progress event did not score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoActiveTournament,
    NotEntered,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoActiveTournament => "no_active_tournament",
            DropReason::NotEntered => "not_entered",
        }
    }
}

/// What happened to one progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreOutcome {
    Dropped(DropReason),
    Scored { score: i64 },
}

/// Adds one point per progress event to the active tournament
#[derive(Clone)]
pub struct ScorePipeline {
    tournaments: Arc<dyn TournamentRepository>,
    participants: Arc<dyn ParticipantRepository>,
    bus: Arc<dyn MessageBus>,
    config: ConfigHandle,
    clock: Arc<dyn Clock>,
}

impl ScorePipeline {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        participants: Arc<dyn ParticipantRepository>,
        bus: Arc<dyn MessageBus>,
        config: ConfigHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tournaments,
            participants,
            bus,
            config,
            clock,
        }
    }

    pub async fn handle_progress(&self, event: &ProgressUpdated) -> TournamentResult<ScoreOutcome> {
        let Some(tournament) = self.tournaments.find_active(self.clock.now()).await? else {
            return Ok(self.drop_event(event, DropReason::NoActiveTournament));
        };

        let Some(participant) = self.participants.find(tournament.id, event.user_id).await? else {
            return Ok(self.drop_event(event, DropReason::NotEntered));
        };

        let score = self.participants.increment_score(participant.id).await?;
        telemetry::score_events_total("scored");

        let topic = self.config.snapshot().leaderboard_update_topic.clone();
        let update = LeaderboardScoreUpdated {
            user_id: event.user_id,
            tournament_id: tournament.id,
            country: event.country.clone(),
            score,
        };
        if let Err(e) = publish_event(self.bus.as_ref(), &topic, &update) {
            telemetry::publish_failures_total(&topic);
            log::warn!(
                "Score {} for user {} saved but leaderboard update not published: {}",
                score,
                event.user_id,
                e
            );
        }

        Ok(ScoreOutcome::Scored { score })
    }

    fn drop_event(&self, event: &ProgressUpdated, reason: DropReason) -> ScoreOutcome {
        telemetry::score_events_total(reason.as_str());
        log::debug!(
            "Progress event for user {} dropped: {}",
            event.user_id,
            reason.as_str()
        );
        ScoreOutcome::Dropped(reason)
    }
}

#[async_trait]
impl EventHandler for ScorePipeline {
    type Event = ProgressUpdated;
    type Error = TournamentError;

    async fn handle(&self, event: ProgressUpdated) -> Result<(), TournamentError> {
        self.handle_progress(&event).await.map(|_| ())
    }
}
