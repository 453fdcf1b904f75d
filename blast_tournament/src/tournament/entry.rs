//! Two-phase tournament entry.
//!
//! Phase one validates eligibility and publishes an [`EntryRequested`] event.
//! Phase two runs in the entry consumer and performs the whole assignment in
//! one transaction: debit the fee, pick or open a group, insert the
//! participant. The tournament's last group row is the serialization point.

use async_trait::async_trait;
use chrono::Timelike;
use std::sync::Arc;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{EntryReceipt, UserId},
};
use crate::{
    bus::{EntryRequested, EventHandler, MessageBus, publish_event},
    clock::Clock,
    config::ConfigHandle,
    db::{EntryStore, UserRepository},
    telemetry,
};

/// Validates entry requests and commits group assignments
#[derive(Clone)]
pub struct EntryCoordinator {
    users: Arc<dyn UserRepository>,
    entries: Arc<dyn EntryStore>,
    bus: Arc<dyn MessageBus>,
    config: ConfigHandle,
    clock: Arc<dyn Clock>,
}

impl EntryCoordinator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        entries: Arc<dyn EntryStore>,
        bus: Arc<dyn MessageBus>,
        config: ConfigHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            entries,
            bus,
            config,
            clock,
        }
    }

    /// Phase one. `Ok` means accepted for processing, not entered.
    pub async fn request_entry(&self, user_id: UserId) -> TournamentResult<()> {
        let result = self.check_and_publish(user_id).await;
        telemetry::entry_requests_total(match &result {
            Ok(()) => "accepted",
            Err(TournamentError::RegistrationClosed { .. }) => "registration_closed",
            Err(TournamentError::UserNotFound(_)) => "user_not_found",
            Err(TournamentError::LevelTooLow { .. }) => "level_too_low",
            Err(TournamentError::InsufficientCoins { .. }) => "insufficient_coins",
            Err(_) => "error",
        });
        result
    }

    async fn check_and_publish(&self, user_id: UserId) -> TournamentResult<()> {
        let config = self.config.snapshot();

        let hour = self.clock.now().hour();
        if hour >= config.tournament_cutoff_hour {
            return Err(TournamentError::RegistrationClosed {
                hour,
                cutoff: config.tournament_cutoff_hour,
            });
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))?;

        if user.level < config.minimum_tournament_entry_level {
            return Err(TournamentError::LevelTooLow {
                level: user.level,
                required: config.minimum_tournament_entry_level,
            });
        }

        if user.coins < config.tournament_entrance_coins {
            return Err(TournamentError::InsufficientCoins {
                available: user.coins,
                required: config.tournament_entrance_coins,
            });
        }

        publish_event(
            self.bus.as_ref(),
            &config.tournament_entry_topic,
            &EntryRequested { user_id },
        )?;

        log::debug!("Entry request for user {} accepted", user_id);
        Ok(())
    }

    /// Phase two. Any failure rolls the whole entry back.
    pub async fn commit_entry(&self, user_id: UserId) -> TournamentResult<EntryReceipt> {
        match self.assign(user_id).await {
            Ok(receipt) => {
                telemetry::entries_committed_total();
                log::info!(
                    "User {} entered tournament {} in group {} ({} members)",
                    receipt.user_id,
                    receipt.tournament_id,
                    receipt.group_number,
                    receipt.group_size
                );
                Ok(receipt)
            }
            Err(e) => {
                telemetry::entries_failed_total();
                Err(e)
            }
        }
    }

    async fn assign(&self, user_id: UserId) -> TournamentResult<EntryReceipt> {
        let fee = self.config.snapshot().tournament_entrance_coins;
        let mut tx = self.entries.begin().await?;

        let tournament = tx
            .find_active_tournament(self.clock.now())
            .await?
            .ok_or(TournamentError::NoActiveTournament)?;

        let user = tx
            .lock_user(user_id)
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))?;

        // Eligibility was checked in phase one; the balance may have moved since.
        let remaining_coins = user.coins - fee;
        tx.set_user_coins(user_id, remaining_coins).await?;

        let group = match tx.lock_last_group(tournament.id).await? {
            None => {
                telemetry::groups_created_total();
                tx.create_group(tournament.id, 1).await?
            }
            Some(last) if last.is_full() => {
                telemetry::groups_created_total();
                tx.create_group(tournament.id, last.group_number + 1).await?
            }
            Some(last) => last,
        };

        let group_size = group.current_size + 1;
        tx.set_group_size(group.id, group_size).await?;
        tx.insert_participant(tournament.id, user_id, group.id).await?;
        tx.commit().await?;

        Ok(EntryReceipt {
            tournament_id: tournament.id,
            user_id,
            group_id: group.id,
            group_number: group.group_number,
            group_size,
            remaining_coins,
        })
    }
}

#[async_trait]
impl EventHandler for EntryCoordinator {
    type Event = EntryRequested;
    type Error = TournamentError;

    async fn handle(&self, event: EntryRequested) -> Result<(), TournamentError> {
        self.commit_entry(event.user_id).await.map(|_| ())
    }
}
