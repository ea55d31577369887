use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request through the full router and decode the JSON body
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Submission body for the named players' scores
    pub fn session_body(&self, round: i32, scores: &[(&str, &str)]) -> Value {
        let scores: Vec<Value> = scores
            .iter()
            .map(|(name, score)| json!({ "player_id": self.player(name).id, "score": score }))
            .collect();
        json!({ "round": round, "scores": scores })
    }

    /// Submit a session by player name
    pub async fn submit(&self, round: i32, scores: &[(&str, &str)]) -> (StatusCode, Value) {
        self.post("/sessions", self.session_body(round, scores)).await
    }

    /// Submit a session that must be accepted, returning the receipt
    pub async fn record(&self, round: i32, scores: &[(&str, &str)]) -> Value {
        let (status, receipt) = self.submit(round, scores).await;
        assert_eq!(status, StatusCode::OK, "session rejected: {}", receipt);
        receipt
    }
}
