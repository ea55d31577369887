use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    leaderboard::LeaderboardKind,
    report::{AnalyticsReport, Leaderboard, PlayerDetail},
};
use crate::shared::{AppError, AppState};

/// GET /analytics
/// Full report recomputed from the current ledger
#[instrument(name = "get_analytics", skip(state))]
pub async fn get_analytics(State(state): State<AppState>) -> Result<Json<AnalyticsReport>, AppError> {
    let report = state.ledger.analytics().await?;

    info!(
        players = report.standings.len(),
        warnings = report.warnings.len(),
        "Analytics computed"
    );
    Ok(Json(report))
}

/// GET /analytics/players/:player_id
#[instrument(name = "get_player_detail", skip(state))]
pub async fn get_player_detail(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerDetail>, AppError> {
    Ok(Json(state.ledger.player_detail(&player_id).await?))
}

/// GET /analytics/leaderboards/:kind
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Leaderboard>, AppError> {
    let kind: LeaderboardKind = kind.parse().map_err(|_| {
        warn!(kind = %kind, "Unknown leaderboard requested");
        AppError::NotFound(format!("Leaderboard {}", kind))
    })?;

    Ok(Json(state.ledger.leaderboard(kind).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::{GameEntry, Player, RawScore, ScoreInput, SessionSubmission};
    use crate::ledger::InMemoryLedgerRepository;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::Arc;
    use strum::IntoEnumIterator;
    use tower::ServiceExt; // for `oneshot`

    mod helpers {
        use super::*;

        pub fn app(state: AppState) -> Router {
            Router::new()
                .route("/analytics", get(get_analytics))
                .route("/analytics/players/:player_id", get(get_player_detail))
                .route("/analytics/leaderboards/:kind", get(get_leaderboard))
                .with_state(state)
        }

        pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.oneshot(request).await.unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice(&body).unwrap())
        }

        pub async fn seeded_state() -> (AppState, Player, Player) {
            let state = AppStateBuilder::new().build();
            let a = state.ledger.register_player("A").await.unwrap();
            let b = state.ledger.register_player("B").await.unwrap();

            for (sa, sb) in [(50, -150), (100, -200), (-250, 150)] {
                state
                    .ledger
                    .submit_session(SessionSubmission {
                        game_id: None,
                        round: Some(1),
                        scores: vec![
                            ScoreInput {
                                player_id: a.id.clone(),
                                score: Some(RawScore::Number(sa)),
                            },
                            ScoreInput {
                                player_id: b.id.clone(),
                                score: Some(RawScore::Number(sb)),
                            },
                        ],
                    })
                    .await
                    .unwrap();
            }

            (state, a, b)
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_get_analytics() {
        let (state, a, b) = seeded_state().await;

        let (status, report) = get_json(app(state), "/analytics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["standings"][0]["player_id"], a.id.as_str());
        assert_eq!(report["standings"][0]["score"], -100);
        assert_eq!(report["standings"][1]["player_id"], b.id.as_str());
        assert_eq!(report["head_to_head"].as_array().unwrap().len(), 2);
        assert_eq!(report["leaderboards"]["biggest_loss"][0]["score"], -250);
        assert_eq!(report["warnings"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_player_detail() {
        let (state, a, b) = seeded_state().await;

        let (status, detail) = get_json(app(state), &format!("/analytics/players/{}", a.id)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "A");
        assert_eq!(detail["streaks"]["max_win_streak"], 2);
        assert_eq!(detail["best_opponent"], b.id.as_str());
        assert_eq!(detail["opponents"][0]["wins"], 2);
        assert_eq!(detail["opponents"][0]["classification"], "favorable");
        assert_eq!(detail["recent_games"][0]["score"], -250);
    }

    #[tokio::test]
    async fn test_get_player_detail_not_found() {
        let (status, body) = get_json(
            app(AppStateBuilder::new().build()),
            "/analytics/players/nobody",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Player nobody");
    }

    #[tokio::test]
    async fn test_every_leaderboard_kind_is_routable() {
        let (state, _, _) = seeded_state().await;

        for kind in LeaderboardKind::iter() {
            let (status, board) =
                get_json(app(state.clone()), &format!("/analytics/leaderboards/{}", kind)).await;
            assert_eq!(status, StatusCode::OK, "leaderboard {}", kind);
            assert_eq!(board["kind"], kind.to_string());
        }
    }

    #[tokio::test]
    async fn test_average_win_leaderboard() {
        let (state, _, b) = seeded_state().await;

        let (_, board) = get_json(app(state), "/analytics/leaderboards/average-win").await;

        assert_eq!(board["rows"][0]["player_id"], b.id.as_str());
        assert_eq!(board["rows"][0]["score_per_round"], 150.0);
        assert_eq!(board["rows"][0]["rank"], 1);
    }

    #[tokio::test]
    async fn test_unknown_leaderboard() {
        let (status, _) = get_json(
            app(AppStateBuilder::new().build()),
            "/analytics/leaderboards/luckiest",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inconsistent_sessions_are_reported_not_fatal() {
        let mut player = Player::new("A".to_string());
        player.id = "a".to_string();
        let broken = GameEntry {
            game_id: "broken".to_string(),
            player_id: "a".to_string(),
            score: 40,
            round: 1,
            created_at: Utc::now(),
        };
        let repository = Arc::new(InMemoryLedgerRepository::with_data(vec![player], vec![broken]));
        let state = AppStateBuilder::new().with_repository(repository).build();

        let (status, report) = get_json(app(state), "/analytics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["warnings"][0]["game_id"], "broken");
        assert_eq!(report["warnings"][0]["kind"], "unbalanced");
        assert_eq!(report["warnings"][0]["imbalance"], 140);
        assert_eq!(
            report["leaderboards"]["biggest_win"].as_array().unwrap().len(),
            0
        );
    }
}
