use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = String;

/// Fixed amount every round owes to the table, so a session balances to `-100 * round`
pub const ROUND_OFFSET: i64 = 100;

/// Running totals for a player, overwritten on every committed session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub score: i64,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub countgames: i32,
    pub round: i32,
    /// Positive for a winning run, negative for a losing run, zero after a tie
    pub streak: i32,
}

impl PlayerStats {
    /// Share of games won, zero when no games were played
    pub fn win_rate(&self) -> f64 {
        win_rate(self.wins, self.wins + self.losses + self.ties)
    }
}

/// Database model for the players table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(flatten)]
    pub stats: PlayerStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    /// Creates a new player with a generated ID and zeroed stats
    pub fn new(name: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            name,
            stats: PlayerStats::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a single session from one player's point of view
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl Outcome {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s > 0 => Outcome::Win,
            s if s < 0 => Outcome::Loss,
            _ => Outcome::Tie,
        }
    }
}

/// One player's row of a recorded session. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub game_id: String,
    pub player_id: PlayerId,
    pub score: i64,
    pub round: i32,
    pub created_at: DateTime<Utc>,
}

impl GameEntry {
    pub fn outcome(&self) -> Outcome {
        Outcome::from_score(self.score)
    }

    pub fn score_per_round(&self) -> f64 {
        if self.round == 0 {
            return self.score as f64;
        }
        self.score as f64 / self.round as f64
    }
}

/// Row to insert for one participant of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameEntry {
    pub player_id: PlayerId,
    pub score: i64,
    pub round: i32,
}

/// Everything a session submission writes, applied all-or-nothing by the repository
#[derive(Debug, Clone)]
pub struct SessionCommit {
    pub game_id: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<NewGameEntry>,
    /// Next stats for each participant; empty when standings are recomputed on read
    pub stats: Vec<(PlayerId, PlayerStats)>,
}

impl SessionCommit {
    pub fn game_entries(&self) -> Vec<GameEntry> {
        self.entries
            .iter()
            .map(|entry| GameEntry {
                game_id: self.game_id.clone(),
                player_id: entry.player_id.clone(),
                score: entry.score,
                round: entry.round,
                created_at: self.created_at,
            })
            .collect()
    }
}

/// Players and entries read together so analytics never see a half-committed session
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub players: Vec<Player>,
    pub entries: Vec<GameEntry>,
}

/// Entries sharing a `game_id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub game_id: String,
    pub round: i32,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<GameEntry>,
}

/// A score as typed by the user, or a plain JSON number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScore {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub player_id: PlayerId,
    #[serde(default)]
    pub score: Option<RawScore>,
}

/// A proposed session, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSubmission {
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub round: Option<i32>,
    #[serde(default)]
    pub scores: Vec<ScoreInput>,
}

/// A submission that passed every validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    pub round: i32,
    pub scores: Vec<(PlayerId, i64)>,
}

pub fn win_rate(wins: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    wins as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_starts_with_zeroed_stats() {
        let player = Player::new("alice".to_string());

        assert!(!player.id.is_empty());
        assert_eq!(player.name, "alice");
        assert_eq!(player.stats, PlayerStats::default());
    }

    #[test]
    fn test_outcome_from_score_sign() {
        assert_eq!(Outcome::from_score(30), Outcome::Win);
        assert_eq!(Outcome::from_score(-1), Outcome::Loss);
        assert_eq!(Outcome::from_score(0), Outcome::Tie);
    }

    #[test]
    fn test_win_rate_with_no_games_is_zero() {
        assert_eq!(PlayerStats::default().win_rate(), 0.0);

        let stats = PlayerStats {
            wins: 3,
            losses: 1,
            ties: 0,
            countgames: 4,
            ..PlayerStats::default()
        };
        assert_eq!(stats.win_rate(), 0.75);
    }

    #[test]
    fn test_score_accepts_numbers_and_text() {
        let submission: SessionSubmission = serde_json::from_str(
            r#"{"round": 1, "scores": [{"player_id": "a", "score": -50}, {"player_id": "b", "score": "-50"}, {"player_id": "c"}]}"#,
        )
        .unwrap();

        assert_eq!(submission.scores[0].score, Some(RawScore::Number(-50)));
        assert_eq!(
            submission.scores[1].score,
            Some(RawScore::Text("-50".to_string()))
        );
        assert_eq!(submission.scores[2].score, None);
        assert_eq!(submission.game_id, None);
    }

    #[test]
    fn test_player_serializes_stats_inline() {
        let player = Player::new("bob".to_string());
        let json = serde_json::to_value(&player).unwrap();

        assert_eq!(json["name"], "bob");
        assert_eq!(json["countgames"], 0);
        assert_eq!(json["streak"], 0);
    }
}
