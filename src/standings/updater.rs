use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ledger::models::{GameEntry, Outcome, PlayerStats};

/// Where standings come from at read time
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatsMode {
    /// Stats are written alongside every session and read back as stored
    #[default]
    Incremental,
    /// Stats are never written; they are folded from the full history on read
    Recompute,
}

/// Next stats for a player after one session with the given score delta.
/// `None` when a running total would leave its integer range.
pub fn apply(old: &PlayerStats, delta: i64, session_round: i32) -> Option<PlayerStats> {
    let mut next = PlayerStats {
        score: old.score.checked_add(delta)?,
        countgames: old.countgames.checked_add(1)?,
        round: old.round.checked_add(session_round)?,
        ..*old
    };

    match Outcome::from_score(delta) {
        Outcome::Win => {
            next.wins = old.wins.checked_add(1)?;
            next.streak = if old.streak >= 0 {
                old.streak.checked_add(1)?
            } else {
                1
            };
        }
        Outcome::Loss => {
            next.losses = old.losses.checked_add(1)?;
            next.streak = if old.streak > 0 {
                -1
            } else {
                old.streak.checked_sub(1)?
            };
        }
        Outcome::Tie => {
            next.ties = old.ties.checked_add(1)?;
            next.streak = 0;
        }
    }

    Some(next)
}

/// Stats for a player rebuilt from their entries, oldest first. An entry that
/// would overflow the running totals is skipped.
pub fn fold<'a>(entries: impl IntoIterator<Item = &'a GameEntry>) -> PlayerStats {
    let mut ordered: Vec<&GameEntry> = entries.into_iter().collect();
    ordered.sort_by_key(|entry| entry.created_at);

    ordered
        .into_iter()
        .fold(PlayerStats::default(), |stats, entry| {
            apply(&stats, entry.score, entry.round).unwrap_or_else(|| {
                warn!(
                    game_id = %entry.game_id,
                    player_id = %entry.player_id,
                    score = entry.score,
                    "Skipping entry that overflows running stats"
                );
                stats
            })
        })
}
