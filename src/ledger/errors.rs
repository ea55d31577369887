use thiserror::Error;

/// Rejections a player can fix by correcting their input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Round not selected")]
    RoundNotSelected,

    #[error("Round {round} exceeds the maximum of {max}")]
    RoundOutOfRange { round: i32, max: i32 },

    #[error("No players selected")]
    NoParticipants,

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Player {0} appears more than once in the session")]
    DuplicatePlayer(String),

    #[error("Player {player} has an invalid score, please enter a non-empty integer")]
    InvalidScore { player: String },

    #[error("Scores are unbalanced: total is {imbalance}")]
    Unbalanced { imbalance: i64 },

    #[error("Player {player} would leave the supported score range")]
    ScoreOverflow { player: String },

    #[error("Session {0} has already been recorded")]
    SessionAlreadyRecorded(String),

    #[error("Player name must not be blank")]
    EmptyPlayerName,

    #[error("Player name {0} already exists")]
    DuplicatePlayerName(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}
