// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The health endpoint is public; every
// other endpoint requires a valid Bearer token checked via the `AuthBearer`
// extractor.
//
// CORS is configured permissively for development; tighten the allowed
// origins in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::engine::Engine;
use crate::feeds::SignalFeed;
use crate::learning::run_learner;
use crate::types::TradingMode;

/// Shared context handed to every handler.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
    pub feed: Arc<dyn SignalFeed>,
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>, feed: Arc<dyn SignalFeed>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ApiContext { state, feed };

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/positions", get(positions))
        .route("/api/v1/decisions", get(decisions))
        .route("/api/v1/weights", get(weights))
        .route("/api/v1/run-cycle", post(run_cycle))
        .route("/api/v1/learn", post(learn))
        .route("/api/v1/control/pause", post(control_pause))
        .route("/api/v1/control/resume", post(control_resume))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(context)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: ctx.state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Read endpoints (authenticated)
// =============================================================================

async fn full_state(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.build_snapshot())
}

async fn positions(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.position_book.open_positions())
}

async fn decisions(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.recent_decisions.read().clone())
}

async fn weights(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.weights.read().clone())
}

// =============================================================================
// Cycle & learning triggers (authenticated)
// =============================================================================

async fn run_cycle(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    info!("manual evaluation cycle requested");
    let report = Engine::run_cycle(&ctx.state, ctx.feed.as_ref()).await;
    Json(report)
}

async fn learn(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    info!("manual learning pass requested");

    let (weights_path, window_days) = {
        let config = ctx.state.runtime_config.read();
        (config.weights_file.clone(), config.learning_window_days)
    };

    let current = ctx.state.weights.read().clone();
    match run_learner(&ctx.state.trade_log, &current, &weights_path, window_days) {
        Ok(updated) => {
            *ctx.state.weights.write() = updated.clone();
            ctx.state.increment_version();
            Json(serde_json::json!({ "status": "ok", "weights": updated })).into_response()
        }
        Err(e) => {
            ctx.state.push_error(format!("learning pass failed: {e:#}"));
            Json(serde_json::json!({ "status": "error", "error": format!("{e:#}") }))
                .into_response()
        }
    }
}

// =============================================================================
// Controls (authenticated)
// =============================================================================

async fn control_pause(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    ctx.state.runtime_config.write().trading_mode = TradingMode::Paused;
    ctx.state.increment_version();
    info!("trading paused via API");
    Json(serde_json::json!({ "trading_mode": "Paused" }))
}

async fn control_resume(_auth: AuthBearer, State(ctx): State<ApiContext>) -> impl IntoResponse {
    ctx.state.runtime_config.write().trading_mode = TradingMode::Live;
    ctx.state.increment_version();
    info!("trading resumed via API");
    Json(serde_json::json!({ "trading_mode": "Live" }))
}
