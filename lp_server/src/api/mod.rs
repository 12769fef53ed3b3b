//! HTTP/WebSocket API for live tables.
//!
//! # Endpoints Overview
//!
//! ## Tables
//! - `POST /api/v1/tables/{id}/actions` - Dealer or player action (auth required)
//! - `GET /api/v1/tables/{id}` - Table state as the caller may see it (auth required)
//! - `GET /api/v1/tables/{id}/blinds` - Current blind level
//! - `GET /api/v1/tables/{id}/events?after_id=N` - Event log delta
//! - `POST /api/v1/tables/{id}/bot-turn` - Bot trigger (`x-scheduler-token`)
//!
//! ## Devices
//! - `POST /api/v1/devices/cards` - Signed scanner submission
//! - `POST /api/v1/devices/identify` - Device identity lookup by serial
//!
//! ## Webhooks
//! - `POST /api/v1/webhooks/video` - Conferencing room events
//!
//! ## WebSocket
//! - `GET /ws/tables/{id}` - "Table changed" signals
//! - `GET /ws/devices/{serial}` - Camera stream commands for one device
//!
//! ## Health Check
//! - `GET /health` - Store health
//!
//! # CORS
//!
//! CORS is permissive; player and dealer UIs are served from other origins.

pub mod devices;
pub mod middleware;
pub mod request_id;
pub mod tables;
pub mod webhooks;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use live_poker::{BroadcastNotifier, BroadcastSignaler, TableManager, TokenVerifier, VideoBridge};
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub table_manager: TableManager,
    pub tokens: TokenVerifier,
    /// Same notifier the table manager announces on; WebSocket sessions subscribe here.
    pub notifier: BroadcastNotifier,
    /// Camera command fan-out, fed by the video bridge.
    pub signaler: BroadcastSignaler,
    /// Absent when no conferencing secret is configured.
    pub video: Option<VideoBridge>,
    /// Absent disables the bot trigger.
    pub scheduler_token: Option<String>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use lp_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    // WebSocket routes are not versioned
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/tables/{table_id}", get(websocket::table_updates))
        .route("/ws/devices/{serial}", get(websocket::device_commands));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Devices, webhooks and the scheduler authenticate themselves in the handler
    let public_routes = Router::new()
        .route("/tables/{table_id}/blinds", get(tables::get_blinds))
        .route("/tables/{table_id}/events", get(tables::get_events))
        .route("/tables/{table_id}/bot-turn", post(tables::bot_turn))
        .route("/devices/cards", post(devices::submit_card))
        .route("/devices/identify", post(devices::identify))
        .route("/webhooks/video", post(webhooks::video_webhook));

    let protected_routes = Router::new()
        .route("/tables/{table_id}", get(tables::get_table))
        .route("/tables/{table_id}/actions", post(tables::take_action))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the table store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","store":true,"subscribers":2,"timestamp":"2026-03-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.table_manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "subscribers": state.notifier.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
