//! Event payloads carried on the bus, encoded as snake_case JSON.

use serde::{Deserialize, Serialize};

use crate::tournament::models::{TournamentId, UserId};

/// A user asked to enter the active tournament; the commit happens in the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequested {
    pub user_id: UserId,
}

/// A user completed a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdated {
    pub user_id: UserId,
    pub country: String,
}

/// Absolute tournament score after an increment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardScoreUpdated {
    pub user_id: UserId,
    pub tournament_id: TournamentId,
    pub country: String,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let event = LeaderboardScoreUpdated {
            user_id: 7,
            tournament_id: 3,
            country: "US".to_string(),
            score: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_id": 7, "tournament_id": 3, "country": "US", "score": 42})
        );
    }

    #[test]
    fn test_entry_requested_decodes_from_producer_payload() {
        let event: EntryRequested = serde_json::from_slice(br#"{"user_id":12}"#).unwrap();
        assert_eq!(event.user_id, 12);
    }
}
