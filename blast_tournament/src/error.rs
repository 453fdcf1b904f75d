//! Error classification shared by every public operation.
//!
//! Each module keeps its own `thiserror` enum; callers that only need to map
//! a failure onto a response class use [`ErrorKind`].

use serde::Serialize;
use std::fmt;

/// Coarse error class exposed to the request layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Entity missing (user, tournament, reward, ranking)
    NotFound,
    /// State forbids the operation (already ended, registration closed)
    Conflict,
    /// Caller is not eligible (level, coins)
    Forbidden,
    /// Persistence, serialization or bus failure
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}
