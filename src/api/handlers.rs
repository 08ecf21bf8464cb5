use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::analyzers::QualificationResult;
use crate::overrides::OverrideKey;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<Utc>,
    uptime_seconds: u64,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Deserialize)]
pub struct RacesQuery {
    race_date: Option<String>,
    source: Option<String>,
}

pub async fn get_races(State(state): State<AppState>, Query(q): Query<RacesQuery>) -> impl IntoResponse {
    let date = q.race_date.unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let source_filter: Option<Vec<String>> = q.source.map(|s| s.split(',').map(|p| p.trim().to_string()).collect());

    let response = state.engine.fetch_all_odds(&date, source_filter.as_deref()).await;
    Json(response).into_response()
}

#[derive(Deserialize)]
pub struct QualifiedQuery {
    race_date: Option<String>,
}

pub async fn get_qualified_races(
    State(state): State<AppState>,
    Path(analyzer_name): Path<String>,
    Query(q): Query<QualifiedQuery>,
) -> Response {
    let Some(analyzer) = state.analyzer(&analyzer_name) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "unknown_analyzer", "name": analyzer_name}))).into_response();
    };

    let date = q.race_date.unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let aggregated = state.engine.fetch_all_odds(&date, None).await;
    let result: QualificationResult = analyzer.qualify_races(&aggregated.races);
    Json(result).into_response()
}

pub async fn get_adapter_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.adapter_statuses())
}

#[derive(Deserialize)]
pub struct ManualOverrideSubmission {
    request_id: String,
    content: String,
    #[serde(default)]
    #[allow(dead_code)]
    content_type: Option<String>,
}

pub async fn submit_manual_override(
    State(state): State<AppState>,
    Json(body): Json<ManualOverrideSubmission>,
) -> Response {
    let parts: Vec<&str> = body.request_id.splitn(3, '|').collect();
    let [adapter_name, url, date] = parts[..] else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request_id", "message": "expected adapter|url|date"})),
        )
            .into_response();
    };

    let key = OverrideKey { adapter_name: adapter_name.to_string(), url: url.to_string(), date: date.to_string() };
    let accepted = state.engine.overrides().submit(&key, body.content);

    if accepted {
        Json(json!({"status": "accepted"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"status": "no_pending_request"}))).into_response()
    }
}
