use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::ledger::{
    models::{GameEntry, Session},
    validation::session_imbalance,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    MixedRounds { rounds: Vec<i32> },
    ZeroRound,
    RepeatedPlayer { player_id: String },
    Unbalanced { imbalance: i64 },
}

/// A stored session that breaks a ledger invariant and was left out of the analytics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyViolation {
    pub game_id: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub sessions: Vec<Session>,
    pub violations: Vec<ConsistencyViolation>,
}

impl IntegrityReport {
    /// Entries of every session that passed the checks
    pub fn entries(&self) -> Vec<GameEntry> {
        self.sessions
            .iter()
            .flat_map(|session| session.entries.iter().cloned())
            .collect()
    }
}

/// Groups entries by `game_id`, in first-seen order within a session
pub fn group_sessions(entries: &[GameEntry]) -> Vec<Session> {
    let mut grouped: BTreeMap<&str, Vec<&GameEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.game_id.as_str()).or_default().push(entry);
    }

    grouped
        .into_iter()
        .map(|(game_id, entries)| Session {
            game_id: game_id.to_string(),
            round: entries[0].round,
            created_at: entries
                .iter()
                .map(|entry| entry.created_at)
                .min()
                .unwrap_or(entries[0].created_at),
            entries: entries.into_iter().cloned().collect(),
        })
        .collect()
}

fn check(session: &Session) -> Option<ViolationKind> {
    let mut rounds: Vec<i32> = session.entries.iter().map(|entry| entry.round).collect();
    rounds.sort_unstable();
    rounds.dedup();
    if rounds.len() > 1 {
        return Some(ViolationKind::MixedRounds { rounds });
    }
    if session.round <= 0 {
        return Some(ViolationKind::ZeroRound);
    }

    let mut seen = HashSet::new();
    for entry in &session.entries {
        if !seen.insert(entry.player_id.as_str()) {
            return Some(ViolationKind::RepeatedPlayer {
                player_id: entry.player_id.clone(),
            });
        }
    }

    let imbalance = session_imbalance(session.entries.iter().map(|e| e.score), session.round);
    (imbalance != 0).then_some(ViolationKind::Unbalanced { imbalance })
}

/// Splits stored entries into consistent sessions and violations
pub fn check_sessions(entries: &[GameEntry]) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    for session in group_sessions(entries) {
        match check(&session) {
            None => report.sessions.push(session),
            Some(kind) => {
                warn!(game_id = %session.game_id, ?kind, "Skipping inconsistent session");
                report.violations.push(ConsistencyViolation {
                    game_id: session.game_id,
                    kind,
                });
            }
        }
    }

    report
}
