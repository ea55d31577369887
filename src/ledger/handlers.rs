use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    models::{Player, SessionSubmission},
    types::{NewSessionIdResponse, RegisterPlayerRequest, SessionHistory, SessionReceipt},
};
use crate::shared::{AppError, AppState};

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// HTTP handler for registering a player
///
/// POST /players
#[instrument(name = "create_player", skip(state, request))]
pub async fn create_player(
    State(state): State<AppState>,
    Json(request): Json<RegisterPlayerRequest>,
) -> Result<Json<Player>, AppError> {
    let player = state.ledger.register_player(&request.name).await?;

    info!(player_id = %player.id, name = %player.name, "Player created");
    Ok(Json(player))
}

/// GET /players
/// Returns every player ordered by name
#[instrument(name = "list_players", skip(state))]
pub async fn list_players(State(state): State<AppState>) -> Result<Json<Vec<Player>>, AppError> {
    let players = state.ledger.list_players().await?;

    info!(player_count = players.len(), "Players listed");
    Ok(Json(players))
}

/// GET /sessions/new-id
#[instrument(name = "new_session_id", skip(state))]
pub async fn new_session_id(
    State(state): State<AppState>,
) -> Result<Json<NewSessionIdResponse>, AppError> {
    let game_id = state.ledger.new_session_id().await?;
    Ok(Json(NewSessionIdResponse { game_id }))
}

/// HTTP handler for recording a finished session
///
/// POST /sessions
/// Returns the stored entries and every participant's updated stats
#[instrument(name = "submit_session", skip(state, submission))]
pub async fn submit_session(
    State(state): State<AppState>,
    Json(submission): Json<SessionSubmission>,
) -> Result<Json<SessionReceipt>, AppError> {
    let receipt = state.ledger.submit_session(submission).await?;

    info!(game_id = %receipt.game_id, "Session submitted");
    Ok(Json(receipt))
}

/// GET /history
#[instrument(name = "list_history", skip(state))]
pub async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionHistory>>, AppError> {
    Ok(Json(state.ledger.history().await?))
}
