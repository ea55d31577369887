use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    head_to_head::{build_matrix, HeadToHeadMatrix, HeadToHeadRecord},
    integrity::{check_sessions, ConsistencyViolation},
    leaderboard::{self, Classification, LeaderboardKind, DEFAULT_LEADERBOARD_SIZE},
    streaks::{analyze_all, PlayerStreaks, StreakSummary},
};
use crate::{
    ledger::models::{GameEntry, LedgerSnapshot, Player, PlayerId, PlayerStats},
    standings::{self, StatsMode},
};

/// Number of entries shown in a player's recent history
pub const RECENT_GAMES: usize = 10;

pub const UNKNOWN_PLAYER: &str = "unknown player";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub stats_mode: StatsMode,
    pub leaderboard_size: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            stats_mode: StatsMode::default(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: String,
    #[serde(flatten)]
    pub stats: PlayerStats,
    pub win_rate: f64,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub player_name: String,
    pub game_id: String,
    pub score: i64,
    pub round: i32,
    pub score_per_round: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub player_name: String,
    pub length: u32,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LeaderboardRows {
    Standings(Vec<StandingRow>),
    Entries(Vec<EntryRow>),
    Streaks(Vec<StreakRow>),
}

impl LeaderboardRows {
    pub fn len(&self) -> usize {
        match self {
            LeaderboardRows::Standings(rows) => rows.len(),
            LeaderboardRows::Entries(rows) => rows.len(),
            LeaderboardRows::Streaks(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub rows: LeaderboardRows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboards {
    pub biggest_loss: Vec<EntryRow>,
    pub biggest_win: Vec<EntryRow>,
    pub average_loss: Vec<EntryRow>,
    pub average_win: Vec<EntryRow>,
    pub longest_losing_streak: Vec<StreakRow>,
    pub longest_winning_streak: Vec<StreakRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentRow {
    pub opponent_id: PlayerId,
    pub opponent_name: String,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub win_rate: f64,
    pub classification: Classification,
    pub best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDetail {
    pub player_id: PlayerId,
    pub name: String,
    pub stats: PlayerStats,
    pub win_rate: f64,
    pub classification: Classification,
    pub streaks: StreakSummary,
    pub opponents: Vec<OpponentRow>,
    pub best_opponent: Option<PlayerId>,
    pub recent_games: Vec<GameEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub standings: Vec<StandingRow>,
    pub head_to_head: Vec<HeadToHeadRecord>,
    pub streaks: Vec<PlayerStreaks>,
    pub leaderboards: Leaderboards,
    pub warnings: Vec<ConsistencyViolation>,
}

/// Every derived view of one ledger snapshot, computed once
pub struct Analysis {
    players: Vec<Player>,
    names: HashMap<PlayerId, String>,
    entries: Vec<GameEntry>,
    history: Vec<GameEntry>,
    matrix: HeadToHeadMatrix,
    streaks: Vec<PlayerStreaks>,
    warnings: Vec<ConsistencyViolation>,
    limit: usize,
}

fn newest_first(entries: &mut [GameEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl Analysis {
    pub fn new(snapshot: &LedgerSnapshot, options: &ReportOptions) -> Self {
        let integrity = check_sessions(&snapshot.entries);
        let mut entries = integrity.entries();
        newest_first(&mut entries);

        let mut players = snapshot.players.clone();
        if options.stats_mode == StatsMode::Recompute {
            for player in &mut players {
                player.stats =
                    standings::fold(entries.iter().filter(|e| e.player_id == player.id));
            }
        }
        let players: Vec<Player> = leaderboard::standings(&players)
            .into_iter()
            .cloned()
            .collect();

        let names = players
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        let matrix = build_matrix(&entries, &players);
        let streaks = analyze_all(&entries, &players);

        let mut history = snapshot.entries.clone();
        newest_first(&mut history);

        Self {
            players,
            names,
            entries,
            history,
            matrix,
            streaks,
            warnings: integrity.violations,
            limit: options.leaderboard_size,
        }
    }

    /// Players with their effective stats, highest score first
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn matrix(&self) -> &HeadToHeadMatrix {
        &self.matrix
    }

    pub fn warnings(&self) -> &[ConsistencyViolation] {
        &self.warnings
    }

    fn name_of(&self, player_id: &str) -> String {
        self.names
            .get(player_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
    }

    /// Every player ranked by score, with win rate and classification
    pub fn standings(&self) -> Vec<StandingRow> {
        self.players
            .iter()
            .enumerate()
            .map(|(i, player)| StandingRow {
                rank: i + 1,
                player_id: player.id.clone(),
                name: player.name.clone(),
                stats: player.stats,
                win_rate: player.stats.win_rate(),
                classification: Classification::from_win_rate(player.stats.win_rate()),
            })
            .collect()
    }

    fn entry_rows(&self, ranked: Vec<&GameEntry>) -> Vec<EntryRow> {
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, entry)| EntryRow {
                rank: i + 1,
                player_id: entry.player_id.clone(),
                player_name: self.name_of(&entry.player_id),
                game_id: entry.game_id.clone(),
                score: entry.score,
                round: entry.round,
                score_per_round: entry.score_per_round(),
                created_at: entry.created_at,
            })
            .collect()
    }

    fn streak_rows(&self, ranked: Vec<&PlayerStreaks>, losing: bool) -> Vec<StreakRow> {
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, streaks)| {
                let s = &streaks.summary;
                let (length, start, end) = if losing {
                    (s.max_lose_streak, s.max_lose_streak_start, s.max_lose_streak_end)
                } else {
                    (s.max_win_streak, s.max_win_streak_start, s.max_win_streak_end)
                };
                StreakRow {
                    rank: i + 1,
                    player_id: streaks.player_id.clone(),
                    player_name: self.name_of(&streaks.player_id),
                    length,
                    start,
                    end,
                }
            })
            .collect()
    }

    pub fn leaderboard(&self, kind: LeaderboardKind) -> Leaderboard {
        let limit = self.limit;
        let rows = match kind {
            LeaderboardKind::Standings => LeaderboardRows::Standings(self.standings()),
            LeaderboardKind::BiggestLoss => LeaderboardRows::Entries(
                self.entry_rows(leaderboard::biggest_losses(&self.entries, limit)),
            ),
            LeaderboardKind::BiggestWin => LeaderboardRows::Entries(
                self.entry_rows(leaderboard::biggest_wins(&self.entries, limit)),
            ),
            LeaderboardKind::AverageLoss => LeaderboardRows::Entries(
                self.entry_rows(leaderboard::average_losses(&self.entries, limit)),
            ),
            LeaderboardKind::AverageWin => LeaderboardRows::Entries(
                self.entry_rows(leaderboard::average_wins(&self.entries, limit)),
            ),
            LeaderboardKind::LongestLosingStreak => LeaderboardRows::Streaks(self.streak_rows(
                leaderboard::longest_losing_streaks(&self.streaks, limit),
                true,
            )),
            LeaderboardKind::LongestWinningStreak => LeaderboardRows::Streaks(self.streak_rows(
                leaderboard::longest_winning_streaks(&self.streaks, limit),
                false,
            )),
        };

        Leaderboard { kind, rows }
    }

    pub fn player_detail(&self, player_id: &str) -> Option<PlayerDetail> {
        let player = self.players.iter().find(|p| p.id == player_id)?;
        let streaks = self
            .streaks
            .iter()
            .find(|s| s.player_id == player_id)
            .map(|s| s.summary)
            .unwrap_or_default();
        let best_opponent = self
            .matrix
            .best_opponent(player_id)
            .map(|record| record.opponent_id.clone());

        let opponents = self
            .matrix
            .opponents(player_id)
            .map(|record| OpponentRow {
                opponent_id: record.opponent_id.clone(),
                opponent_name: self.name_of(&record.opponent_id),
                wins: record.wins,
                losses: record.losses,
                draws: record.draws,
                win_rate: record.win_rate,
                classification: Classification::from_win_rate(record.win_rate),
                best: best_opponent.as_deref() == Some(record.opponent_id.as_str()),
            })
            .collect();

        let recent_games = self
            .history
            .iter()
            .filter(|entry| entry.player_id == player_id)
            .take(RECENT_GAMES)
            .cloned()
            .collect();

        Some(PlayerDetail {
            player_id: player.id.clone(),
            name: player.name.clone(),
            stats: player.stats,
            win_rate: player.stats.win_rate(),
            classification: Classification::from_win_rate(player.stats.win_rate()),
            streaks,
            opponents,
            best_opponent,
            recent_games,
        })
    }

    pub fn report(&self) -> AnalyticsReport {
        let entries = |kind| match self.leaderboard(kind).rows {
            LeaderboardRows::Entries(rows) => rows,
            _ => Vec::new(),
        };
        let streaks = |kind| match self.leaderboard(kind).rows {
            LeaderboardRows::Streaks(rows) => rows,
            _ => Vec::new(),
        };

        AnalyticsReport {
            generated_at: Utc::now(),
            standings: self.standings(),
            head_to_head: self.matrix.records().cloned().collect(),
            streaks: self.streaks.clone(),
            leaderboards: Leaderboards {
                biggest_loss: entries(LeaderboardKind::BiggestLoss),
                biggest_win: entries(LeaderboardKind::BiggestWin),
                average_loss: entries(LeaderboardKind::AverageLoss),
                average_win: entries(LeaderboardKind::AverageWin),
                longest_losing_streak: streaks(LeaderboardKind::LongestLosingStreak),
                longest_winning_streak: streaks(LeaderboardKind::LongestWinningStreak),
            },
            warnings: self.warnings.clone(),
        }
    }
}
