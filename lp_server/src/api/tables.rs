//! Table API handlers.
//!
//! Actions and table reads require a session token. Blinds and the event
//! delta are public so passive displays can follow a table.
//!
//! # Examples
//!
//! Deal a card as the dealer:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tables/1/actions \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"action": "deal_card", "card": "As"}'
//! ```
//!
//! Pull new events:
//! ```bash
//! curl "http://localhost:6969/api/v1/tables/1/events?after_id=42"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use live_poker::{
    TableAction, TableError, TableView,
    errors::ErrorKind,
    events::EventDelta,
    game::{
        blinds::BlindState,
        entities::{EventId, Identity, TableId},
    },
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use subtle::ConstantTimeEq;

use super::{AppState, request_id::RequestId};
use crate::{logging, metrics};

/// Header carrying the shared bot scheduler token.
pub const SCHEDULER_TOKEN_HEADER: &str = "x-scheduler-token";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub after_id: Option<EventId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BotTurnResponse {
    pub acted: bool,
    pub table: Option<TableView>,
}

/// HTTP status for an engine error class.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::InvalidTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A request body that did not parse as the expected JSON.
pub fn malformed(rejection: &JsonRejection) -> TableError {
    TableError::Validation(rejection.body_text())
}

pub fn api_error(err: &TableError) -> ApiError {
    let status = status_for(err.kind());
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Table operation failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
            code: err.device_code().to_string(),
        }),
    )
}

/// Apply a dealer or player action.
///
/// The body is the action tagged by name, e.g. `{"action":"raise","amount":40}`.
///
/// # Response
///
/// `200 OK` with the committed table state as the caller sees it.
///
/// # Errors
///
/// - `400 Bad Request`: malformed input
/// - `401 Unauthorized`: caller may not issue this action
/// - `409 Conflict`: wrong phase or turn, or a card already dealt
/// - `404 Not Found`: unknown table
pub async fn take_action(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Extension(identity): Extension<Identity>,
    request_id: RequestId,
    body: Result<Json<TableAction>, JsonRejection>,
) -> Result<Json<TableView>, ApiError> {
    let Json(action) = body.map_err(|e| api_error(&malformed(&e)))?;
    let started = Instant::now();
    let result = state
        .table_manager
        .perform_action(table_id, &identity, &action)
        .await;
    logging::log_performance(
        action.name(),
        started.elapsed().as_millis() as u64,
        Some(table_id),
    );
    metrics::table_actions_total(action.name(), result.is_ok());

    match result {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            tracing::info!(
                request_id = request_id.as_str(),
                table_id = table_id,
                subject = identity.as_str(),
                "{} rejected: {}",
                action.name(),
                e
            );
            if matches!(e.kind(), ErrorKind::Unauthorized) {
                logging::log_security_event(
                    "action_unauthorized",
                    Some(identity.as_str()),
                    action.name(),
                );
            }
            Err(api_error(&e))
        }
    }
}

/// Table state with hole cards filtered for the caller.
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TableView>, ApiError> {
    state
        .table_manager
        .table_view(table_id, Some(&identity))
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn get_blinds(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
) -> Result<Json<BlindState>, ApiError> {
    state
        .table_manager
        .blind_state(table_id)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Events strictly after `after_id`, oldest first. Omit `after_id` for the
/// full history.
pub async fn get_events(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventDelta>, ApiError> {
    let delta = state
        .table_manager
        .fetch_delta(table_id, query.after_id)
        .await
        .map_err(|e| api_error(&e))?;
    metrics::event_deltas_total(delta.events.len());
    Ok(Json(delta))
}

/// Play the assigned seat's turn if a bot holds it.
///
/// Called by an external scheduler presenting the shared token.
pub async fn bot_turn(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    headers: HeaderMap,
) -> Result<Json<BotTurnResponse>, ApiError> {
    let presented = headers
        .get(SCHEDULER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if !scheduler_token_matches(state.scheduler_token.as_deref(), presented) {
        logging::log_security_event("scheduler_rejected", None, "bad scheduler token");
        return Err(api_error(&TableError::Unauthorized(
            "Invalid scheduler token".to_string(),
        )));
    }

    let table = state
        .table_manager
        .run_bot_turn(table_id)
        .await
        .map_err(|e| api_error(&e))?;
    metrics::bot_turns_total(table.is_some());

    Ok(Json(BotTurnResponse {
        acted: table.is_some(),
        table,
    }))
}

fn scheduler_token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) => {
            bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::InvalidTransition), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_scheduler_token_requires_configuration() {
        assert!(!scheduler_token_matches(None, Some("anything")));
        assert!(!scheduler_token_matches(Some("secret-token-123"), None));
        assert!(!scheduler_token_matches(
            Some("secret-token-123"),
            Some("secret-token-124")
        ));
        assert!(scheduler_token_matches(
            Some("secret-token-123"),
            Some("secret-token-123")
        ));
    }

    #[test]
    fn test_api_error_hides_storage_details() {
        let (status, Json(body)) =
            api_error(&TableError::CorruptState("seat row 7".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.code, "internal");
    }
}
