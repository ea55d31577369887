use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::streaks::PlayerStreaks;
use crate::ledger::models::{GameEntry, Player};

/// Default number of rows in every ranked board
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LeaderboardKind {
    Standings,
    BiggestLoss,
    BiggestWin,
    AverageLoss,
    AverageWin,
    LongestLosingStreak,
    LongestWinningStreak,
}

/// Display label for a win rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Favorable,
    Unfavorable,
}

impl Classification {
    pub fn from_win_rate(win_rate: f64) -> Self {
        if win_rate >= 0.5 {
            Classification::Favorable
        } else {
            Classification::Unfavorable
        }
    }
}

/// Stable sort then truncate, so equal keys keep their input order
fn top_by<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    limit: Option<usize>,
    mut compare: impl FnMut(&T, &T) -> Ordering,
) -> Vec<&'a T>
where
    T: 'a,
{
    let mut ranked: Vec<&T> = items.into_iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

/// Every player, highest running score first
pub fn standings(players: &[Player]) -> Vec<&Player> {
    top_by(players, None, |a, b| b.stats.score.cmp(&a.stats.score))
}

pub fn biggest_losses(entries: &[GameEntry], limit: usize) -> Vec<&GameEntry> {
    top_by(entries, Some(limit), |a, b| a.score.cmp(&b.score))
}

pub fn biggest_wins(entries: &[GameEntry], limit: usize) -> Vec<&GameEntry> {
    top_by(entries, Some(limit), |a, b| b.score.cmp(&a.score))
}

pub fn average_losses(entries: &[GameEntry], limit: usize) -> Vec<&GameEntry> {
    top_by(entries, Some(limit), |a, b| {
        a.score_per_round().total_cmp(&b.score_per_round())
    })
}

pub fn average_wins(entries: &[GameEntry], limit: usize) -> Vec<&GameEntry> {
    top_by(entries, Some(limit), |a, b| {
        b.score_per_round().total_cmp(&a.score_per_round())
    })
}

pub fn longest_losing_streaks(streaks: &[PlayerStreaks], limit: usize) -> Vec<&PlayerStreaks> {
    top_by(streaks, Some(limit), |a, b| {
        b.summary.max_lose_streak.cmp(&a.summary.max_lose_streak)
    })
}

pub fn longest_winning_streaks(streaks: &[PlayerStreaks], limit: usize) -> Vec<&PlayerStreaks> {
    top_by(streaks, Some(limit), |a, b| {
        b.summary.max_win_streak.cmp(&a.summary.max_win_streak)
    })
}
