use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::ledger::{LedgerError, LedgerService, ValidationError};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self { ledger }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(err) => AppError::Validation(err),
            LedgerError::NotFound(msg) => AppError::NotFound(msg),
            LedgerError::Persistence(msg) => AppError::Unavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(err @ ValidationError::DuplicatePlayerName(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => {
                warn!(error = %msg, "Ledger store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Ledger store unavailable, please retry".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_message(error: AppError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json["error"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let (status, message) =
            status_and_message(LedgerError::from(ValidationError::Unbalanced { imbalance: 200 }).into())
                .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Scores are unbalanced: total is 200");
    }

    #[tokio::test]
    async fn test_reused_session_and_overflow_are_bad_requests() {
        for error in [
            ValidationError::SessionAlreadyRecorded("table-7".to_string()),
            ValidationError::ScoreOverflow {
                player: "Mei".to_string(),
            },
        ] {
            let expected = error.to_string();
            let (status, message) = status_and_message(LedgerError::from(error).into()).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, expected);
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_is_a_conflict() {
        let (status, _) = status_and_message(AppError::Validation(
            ValidationError::DuplicatePlayerName("Mei".to_string()),
        ))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_persistence_errors_hide_details() {
        let (status, message) = status_and_message(
            LedgerError::Persistence("connection refused at 10.0.0.3".to_string()).into(),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!message.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, message) =
            status_and_message(LedgerError::NotFound("Player p1".to_string()).into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Player p1");
    }
}
