// Library crate for the mahjong ledger service
// This file exposes the public API for the binary and integration tests

pub mod analytics;
pub mod config;
pub mod ledger;
pub mod shared;
pub mod standings;

use axum::{routing::get, Router};

// Re-export commonly used types for easier access in tests
pub use analytics::{AnalyticsReport, LeaderboardKind};
pub use config::LedgerConfig;
pub use ledger::{
    InMemoryLedgerRepository, LedgerError, LedgerOptions, LedgerRepository, LedgerService,
    PostgresLedgerRepository, ValidationError,
};
pub use shared::{AppError, AppState};

/// Every route of the service, without middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(ledger::health))
        .route(
            "/players",
            get(ledger::list_players).post(ledger::create_player),
        )
        .route("/sessions", axum::routing::post(ledger::submit_session))
        .route("/sessions/new-id", get(ledger::new_session_id))
        .route("/history", get(ledger::list_history))
        .route("/analytics", get(analytics::get_analytics))
        .route(
            "/analytics/players/:player_id",
            get(analytics::get_player_detail),
        )
        .route(
            "/analytics/leaderboards/:kind",
            get(analytics::get_leaderboard),
        )
        .with_state(state)
}
