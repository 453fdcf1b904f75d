//! Leaderboard error types.

use thiserror::Error;

use crate::{db::StoreError, error::ErrorKind, tournament::models::UserId};

/// Leaderboard errors
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The user has no score in the queried set
    #[error("User {0} is not ranked")]
    UserNotRanked(UserId),

    #[error("Ranked store error: {0}")]
    Store(#[from] StoreError),
}

impl LeaderboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaderboardError::UserNotRanked(_) => ErrorKind::NotFound,
            LeaderboardError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            LeaderboardError::UserNotRanked(_) => "User not ranked".to_string(),
            LeaderboardError::Store(_) => "Internal server error".to_string(),
        }
    }
}

/// Result type for leaderboard operations
pub type LeaderboardResult<T> = Result<T, LeaderboardError>;
