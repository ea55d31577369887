use std::collections::BTreeMap;

use serde::Serialize;

use super::integrity::group_sessions;
use crate::ledger::models::{win_rate, GameEntry, Outcome, Player, PlayerId};

/// Record of `player` against `opponent`, counted only from `player`'s own result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadRecord {
    pub player_id: PlayerId,
    pub opponent_id: PlayerId,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub win_rate: f64,
}

impl HeadToHeadRecord {
    fn empty(player_id: &str, opponent_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            opponent_id: opponent_id.to_string(),
            wins: 0,
            losses: 0,
            draws: 0,
            win_rate: 0.0,
        }
    }

    pub fn games(&self) -> i32 {
        self.wins + self.losses + self.draws
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.draws += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadToHeadMatrix {
    cells: BTreeMap<(PlayerId, PlayerId), HeadToHeadRecord>,
}

impl HeadToHeadMatrix {
    pub fn get(&self, player_id: &str, opponent_id: &str) -> Option<&HeadToHeadRecord> {
        self.cells
            .get(&(player_id.to_string(), opponent_id.to_string()))
    }

    pub fn records(&self) -> impl Iterator<Item = &HeadToHeadRecord> {
        self.cells.values()
    }

    /// Cells of `player_id` that saw at least one game
    pub fn opponents<'a, 'b>(
        &'a self,
        player_id: &'b str,
    ) -> impl Iterator<Item = &'a HeadToHeadRecord> + 'b
    where
        'a: 'b,
    {
        self.cells
            .values()
            .filter(move |record| record.player_id == player_id && record.games() > 0)
    }

    /// Opponent against whom `player_id` has the best win rate; the first one wins ties
    pub fn best_opponent(&self, player_id: &str) -> Option<&HeadToHeadRecord> {
        self.opponents(player_id).fold(None, |best, record| match best {
            Some(current) if current.win_rate >= record.win_rate => Some(current),
            _ => Some(record),
        })
    }
}

/// Builds the pairwise matrix for every ordered pair of players. Every participant
/// of a session is compared with every other one using only its own score sign.
pub fn build_matrix(entries: &[GameEntry], players: &[Player]) -> HeadToHeadMatrix {
    let mut cells = BTreeMap::new();
    for player in players {
        for other in players {
            if player.id != other.id {
                cells.insert(
                    (player.id.clone(), other.id.clone()),
                    HeadToHeadRecord::empty(&player.id, &other.id),
                );
            }
        }
    }

    for session in group_sessions(entries) {
        for center in &session.entries {
            let outcome = center.outcome();
            for opponent in &session.entries {
                if center.player_id == opponent.player_id {
                    continue;
                }
                cells
                    .entry((center.player_id.clone(), opponent.player_id.clone()))
                    .or_insert_with(|| {
                        HeadToHeadRecord::empty(&center.player_id, &opponent.player_id)
                    })
                    .record(outcome);
            }
        }
    }

    for record in cells.values_mut() {
        record.win_rate = win_rate(record.wins, record.games());
    }

    HeadToHeadMatrix { cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn player(id: &str) -> Player {
        let mut player = Player::new(id.to_string());
        player.id = id.to_string();
        player
    }

    fn entry(game_id: &str, player_id: &str, score: i64, round: i32) -> GameEntry {
        GameEntry {
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            score,
            round,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_player_cells_count_each_players_own_result() {
        let players = vec![player("a"), player("b")];
        let entries = vec![
            entry("g1", "a", 50, 1),
            entry("g1", "b", -150, 1),
            entry("g2", "a", -100, 1),
            entry("g2", "b", 0, 1),
            entry("g3", "a", -200, 2),
            entry("g3", "b", 0, 2),
        ];

        let matrix = build_matrix(&entries, &players);
        let ab = matrix.get("a", "b").unwrap();
        let ba = matrix.get("b", "a").unwrap();

        assert_eq!((ab.wins, ab.losses, ab.draws), (1, 2, 0));
        // A zero score is a draw for its owner even when the other player lost
        assert_eq!((ba.wins, ba.losses, ba.draws), (0, 1, 2));
        assert!((ab.win_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_two_player_wins_mirror_losses_without_draws() {
        let players = vec![player("a"), player("b")];
        let entries = vec![
            entry("g1", "a", 50, 1),
            entry("g1", "b", -150, 1),
            entry("g2", "a", -150, 1),
            entry("g2", "b", 50, 1),
            entry("g3", "a", 100, 1),
            entry("g3", "b", -200, 1),
        ];

        let matrix = build_matrix(&entries, &players);
        let ab = matrix.get("a", "b").unwrap();
        let ba = matrix.get("b", "a").unwrap();

        assert_eq!(ab.wins, ba.losses);
        assert_eq!(ab.losses, ba.wins);
        assert_eq!(ab.draws, ba.draws);
    }

    #[test]
    fn test_multi_player_session_uses_center_score_only() {
        let players = vec![player("a"), player("b"), player("c")];
        // b and c both lost; each still records a loss against the other
        let entries = vec![
            entry("g1", "a", 100, 1),
            entry("g1", "b", -50, 1),
            entry("g1", "c", -150, 1),
        ];

        let matrix = build_matrix(&entries, &players);

        assert_eq!(matrix.get("a", "b").unwrap().wins, 1);
        assert_eq!(matrix.get("a", "c").unwrap().wins, 1);
        assert_eq!(matrix.get("b", "a").unwrap().losses, 1);
        assert_eq!(matrix.get("b", "c").unwrap().losses, 1);
        assert_eq!(matrix.get("c", "b").unwrap().losses, 1);
        assert_eq!(matrix.get("b", "c").unwrap().wins, 0);
    }

    #[test]
    fn test_empty_cells_have_zero_win_rate() {
        let players = vec![player("a"), player("b"), player("c")];
        let matrix = build_matrix(&[], &players);

        assert_eq!(matrix.records().count(), 6);
        assert!(matrix.records().all(|r| r.games() == 0 && r.win_rate == 0.0));
        assert!(matrix.get("a", "a").is_none());
        assert!(matrix.best_opponent("a").is_none());
    }

    #[test]
    fn test_matrix_is_idempotent() {
        let players = vec![player("a"), player("b"), player("c")];
        let entries = vec![
            entry("g1", "a", 100, 1),
            entry("g1", "b", -50, 1),
            entry("g1", "c", -150, 1),
            entry("g2", "c", 0, 1),
            entry("g2", "a", -100, 1),
        ];

        assert_eq!(
            build_matrix(&entries, &players),
            build_matrix(&entries, &players)
        );
    }

    #[test]
    fn test_best_opponent_prefers_first_on_ties() {
        let players = vec![player("a"), player("b"), player("c")];
        let entries = vec![
            entry("g1", "a", 50, 1),
            entry("g1", "b", -150, 1),
            entry("g2", "a", 50, 1),
            entry("g2", "c", -150, 1),
        ];

        let matrix = build_matrix(&entries, &players);
        assert_eq!(matrix.opponents("a").count(), 2);
        assert_eq!(matrix.best_opponent("a").unwrap().opponent_id, "b");

        let only_c = build_matrix(&entries[2..], &players);
        assert_eq!(only_c.opponents("a").count(), 1);
        assert_eq!(only_c.best_opponent("a").unwrap().opponent_id, "c");
    }

    #[test]
    fn test_best_opponent_outlives_the_queried_id() {
        let players = vec![player("a"), player("b")];
        let entries = vec![entry("g1", "a", 50, 1), entry("g1", "b", -150, 1)];
        let matrix = build_matrix(&entries, &players);

        let best = {
            let id = String::from("a");
            matrix.best_opponent(&id)
        };

        assert_eq!(best.map(|r| r.opponent_id.as_str()), Some("b"));
    }
}
