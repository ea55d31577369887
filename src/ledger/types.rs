use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{GameEntry, PlayerId, PlayerStats};

/// Request body for registering a player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterPlayerRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSessionIdResponse {
    pub game_id: String,
}

/// A participant's stats before and after a committed session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StandingUpdate {
    pub player_id: PlayerId,
    pub name: String,
    pub previous: PlayerStats,
    pub current: PlayerStats,
}

/// Response for a committed session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionReceipt {
    pub game_id: String,
    pub round: i32,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<GameEntry>,
    pub standings: Vec<StandingUpdate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryParticipant {
    pub player_id: PlayerId,
    pub name: String,
    pub score: i64,
}

/// One recorded session as listed in the history view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionHistory {
    pub game_id: String,
    pub round: i32,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<HistoryParticipant>,
}
