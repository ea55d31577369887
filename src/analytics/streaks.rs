//! Longest winning and losing runs per player.
//!
//! A run is a sequence of consecutive entries with the same outcome; a tie breaks
//! both kinds of run and does not count toward either.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::models::{GameEntry, Outcome, Player, PlayerId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub max_win_streak: u32,
    pub max_win_streak_start: Option<DateTime<Utc>>,
    pub max_win_streak_end: Option<DateTime<Utc>>,
    pub max_lose_streak: u32,
    pub max_lose_streak_start: Option<DateTime<Utc>>,
    pub max_lose_streak_end: Option<DateTime<Utc>>,
    pub total_rounds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStreaks {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub summary: StreakSummary,
}

#[derive(Debug, Default)]
struct Run {
    length: u32,
    start: Option<DateTime<Utc>>,
}

impl Run {
    fn extend(&mut self, at: DateTime<Utc>) {
        if self.length == 0 {
            self.start = Some(at);
        }
        self.length += 1;
    }

    fn reset(&mut self) {
        *self = Run::default();
    }
}

#[derive(Debug, Default)]
struct Best {
    length: u32,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl Best {
    fn offer(&mut self, run: &Run, at: DateTime<Utc>) {
        if run.length > self.length {
            self.length = run.length;
            self.start = run.start;
            self.end = Some(at);
        }
    }
}

/// Single forward pass over one player's entries, which must be sorted oldest first
pub fn analyze_streaks(entries: &[GameEntry]) -> StreakSummary {
    let mut winning = Run::default();
    let mut losing = Run::default();
    let mut best_win = Best::default();
    let mut best_lose = Best::default();
    let mut total_rounds = 0i64;

    for entry in entries {
        let at = entry.created_at;
        total_rounds += i64::from(entry.round);

        match entry.outcome() {
            Outcome::Win => {
                winning.extend(at);
                best_win.offer(&winning, at);
                losing.reset();
            }
            Outcome::Loss => {
                losing.extend(at);
                best_lose.offer(&losing, at);
                winning.reset();
            }
            Outcome::Tie => {
                winning.reset();
                losing.reset();
            }
        }
    }

    StreakSummary {
        max_win_streak: best_win.length,
        max_win_streak_start: best_win.start,
        max_win_streak_end: best_win.end,
        max_lose_streak: best_lose.length,
        max_lose_streak_start: best_lose.start,
        max_lose_streak_end: best_lose.end,
        total_rounds,
    }
}

/// Summaries for every player, in the order of `players`. Entries of each player are
/// sorted by timestamp first; entries with equal timestamps keep their input order.
pub fn analyze_all(entries: &[GameEntry], players: &[Player]) -> Vec<PlayerStreaks> {
    let mut by_player: HashMap<&str, Vec<GameEntry>> = HashMap::new();
    for entry in entries {
        by_player
            .entry(entry.player_id.as_str())
            .or_default()
            .push(entry.clone());
    }

    players
        .iter()
        .map(|player| {
            let summary = match by_player.get_mut(player.id.as_str()) {
                Some(history) => {
                    history.sort_by_key(|entry| entry.created_at);
                    analyze_streaks(history)
                }
                None => StreakSummary::default(),
            };
            PlayerStreaks {
                player_id: player.id.clone(),
                summary,
            }
        })
        .collect()
}
