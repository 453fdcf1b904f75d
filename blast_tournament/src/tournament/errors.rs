//! Tournament error types.

use thiserror::Error;

use super::models::{GroupId, TournamentId, UserId};
use crate::{bus::BusError, db::StoreError, error::ErrorKind};

/// Errors of lifecycle, entry, scoring, progress and reward operations
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Tournament {0} has already ended")]
    TournamentAlreadyEnded(TournamentId),

    /// At most one tournament is active at any instant
    #[error("Cannot start tournament {requested}: tournament {active} is active")]
    AnotherTournamentActive {
        active: TournamentId,
        requested: TournamentId,
    },

    #[error("Group {group_id} not found in tournament {tournament_id}")]
    GroupNotFound {
        tournament_id: TournamentId,
        group_id: GroupId,
    },

    /// Entries are refused from the cutoff hour until midnight UTC
    #[error("Registration closed: hour {hour} is past cutoff {cutoff}")]
    RegistrationClosed { hour: u32, cutoff: u32 },

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Username already taken: {0}")]
    UserAlreadyExists(String),

    #[error("Level too low: {level}, required {required}")]
    LevelTooLow { level: i32, required: i32 },

    #[error("Insufficient coins: available {available}, required {required}")]
    InsufficientCoins { available: i64, required: i64 },

    #[error("No active tournament")]
    NoActiveTournament,

    #[error("No unclaimed reward for user {0}")]
    NoUnclaimedReward(UserId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::TournamentNotFound(_)
            | TournamentError::UserNotFound(_)
            | TournamentError::GroupNotFound { .. }
            | TournamentError::NoActiveTournament
            | TournamentError::NoUnclaimedReward(_) => ErrorKind::NotFound,
            TournamentError::TournamentAlreadyEnded(_)
            | TournamentError::AnotherTournamentActive { .. }
            | TournamentError::UserAlreadyExists(_)
            | TournamentError::RegistrationClosed { .. } => ErrorKind::Conflict,
            TournamentError::LevelTooLow { .. } | TournamentError::InsufficientCoins { .. } => {
                ErrorKind::Forbidden
            }
            TournamentError::Store(_)
            | TournamentError::Serialization(_)
            | TournamentError::Bus(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Store(_)
            | TournamentError::Serialization(_)
            | TournamentError::Bus(_) => "Internal server error".to_string(),
            TournamentError::UserNotFound(_) => "User not found".to_string(),
            TournamentError::NoUnclaimedReward(_) => "No unclaimed reward".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            TournamentError::TournamentNotFound(1).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TournamentError::RegistrationClosed { hour: 21, cutoff: 20 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            TournamentError::InsufficientCoins {
                available: 10,
                required: 500
            }
            .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            TournamentError::AnotherTournamentActive { active: 1, requested: 2 }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            TournamentError::UserAlreadyExists("alice".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            TournamentError::GroupNotFound { tournament_id: 1, group_id: 9 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TournamentError::Bus(BusError::QueueFull("entries".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = TournamentError::Store(StoreError::Injected {
            context: "failed to create tournament user",
        });
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(TournamentError::UserNotFound(42).client_message(), "User not found");
    }
}
