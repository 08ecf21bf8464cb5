//! HTTP API surface (spec §6.2): health check plus the authenticated
//! races/analyzers/overrides routes, wired with per-route rate limiting.

mod auth;
mod handlers;
mod state;

pub use state::AppState;

use std::time::Duration;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::{RateLimitConfig, RateLimitLayer};

pub fn router(state: AppState) -> Router {
    let races_limiter = RateLimitLayer::new(RateLimitConfig {
        max_requests: 30,
        window: Duration::from_secs(60),
        burst: 5,
    });
    let qualified_limiter = RateLimitLayer::new(RateLimitConfig {
        max_requests: 120,
        window: Duration::from_secs(60),
        burst: 10,
    });
    let status_limiter = RateLimitLayer::new(RateLimitConfig {
        max_requests: 60,
        window: Duration::from_secs(60),
        burst: 10,
    });

    let races = Router::new()
        .route("/api/races", get(handlers::get_races))
        .layer(middleware::from_fn_with_state(
            races_limiter,
            crate::middleware::rate_limit::rate_limit_middleware,
        ));

    let qualified = Router::new()
        .route("/api/races/qualified/:analyzer_name", get(handlers::get_qualified_races))
        .layer(middleware::from_fn_with_state(
            qualified_limiter,
            crate::middleware::rate_limit::rate_limit_middleware,
        ));

    let status = Router::new()
        .route("/api/adapters/status", get(handlers::get_adapter_status))
        .route("/api/manual-overrides/submit", post(handlers::submit_manual_override))
        .layer(middleware::from_fn_with_state(
            status_limiter,
            crate::middleware::rate_limit::rate_limit_middleware,
        ));

    let authenticated = races
        .merge(qualified)
        .merge(status)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.allowed_origins.clone()))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(authenticated)
        .layer(middleware::from_fn(crate::middleware::logging::request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
