//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::http::StatusCode;
use serde_json::Value;

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct ResponseAssertion {
    status: StatusCode,
    body: Value,
}

impl ResponseAssertion {
    pub fn new((status, body): (StatusCode, Value)) -> Self {
        Self { status, body }
    }

    pub fn has_status(self, expected: StatusCode) -> Self {
        assert_eq!(self.status, expected, "unexpected status, body: {}", self.body);
        self
    }

    pub fn has_error(self, expected: &str) -> Self {
        assert_eq!(self.body["error"], expected, "unexpected error body");
        self
    }

    pub fn error_mentions(self, fragment: &str) -> Self {
        let message = self.body["error"].as_str().unwrap_or_default();
        assert!(
            message.contains(fragment),
            "error {:?} should mention {:?}",
            message,
            fragment
        );
        self
    }

    pub fn body(self) -> Value {
        self.body
    }
}

/// Checks one player's row of the standings
pub struct StandingsAssertion {
    rows: Vec<Value>,
    current: Option<Value>,
}

impl StandingsAssertion {
    pub async fn fetch(setup: &TestSetup) -> Self {
        let (status, board) = setup.get("/analytics/leaderboards/standings").await;
        assert_eq!(status, StatusCode::OK);
        Self {
            rows: board["rows"].as_array().cloned().unwrap_or_default(),
            current: None,
        }
    }

    pub fn ranked(self, expected: &[&str]) -> Self {
        let names: Vec<&str> = self
            .rows
            .iter()
            .map(|row| row["name"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(names, expected, "standings order");
        self
    }

    pub fn player(mut self, name: &str) -> Self {
        self.current = self.rows.iter().find(|row| row["name"] == name).cloned();
        assert!(self.current.is_some(), "{} missing from standings", name);
        self
    }

    fn field(&self, field: &str) -> &Value {
        &self.current.as_ref().expect("select a player first")[field]
    }

    pub fn has_score(self, expected: i64) -> Self {
        assert_eq!(self.field("score"), expected, "score");
        self
    }

    pub fn has_record(self, wins: i64, losses: i64, ties: i64) -> Self {
        assert_eq!(self.field("wins"), wins, "wins");
        assert_eq!(self.field("losses"), losses, "losses");
        assert_eq!(self.field("ties"), ties, "ties");
        assert_eq!(self.field("countgames"), wins + losses + ties, "countgames");
        self
    }

    pub fn has_streak(self, expected: i64) -> Self {
        assert_eq!(self.field("streak"), expected, "streak");
        self
    }

    pub fn has_rounds(self, expected: i64) -> Self {
        assert_eq!(self.field("round"), expected, "round");
        self
    }
}
