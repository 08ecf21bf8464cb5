//! Static `X-API-Key` check (spec §6.2): missing or wrong → 403. Adapted
//! from the teacher's JWT middleware shape, simplified to one constant-time
//! comparison against the configured key.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::AppState;

const HEADER_NAME: &str = "x-api-key";

pub async fn require_api_key(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let provided = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || !constant_time_eq(provided.as_bytes(), state.settings.api_key.as_bytes()) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "forbidden", "message": "missing or invalid API key"})),
        )
            .into_response();
    }

    next.run(request).await
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
