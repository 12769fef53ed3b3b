//! Conferencing webhook receiver.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use live_poker::{StreamCommand, video::WebhookError};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    tables::{ErrorResponse, api_error},
};
use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub commands: Vec<StreamCommand>,
}

/// Verify a room event and switch the affected cameras.
///
/// The raw body is what the signature covers, so it is read as bytes.
///
/// # Errors
///
/// - `401 Unauthorized`: missing or bad token, or body digest mismatch
/// - `400 Bad Request`: body is not a recognizable event
/// - `404 Not Found`: video is not configured, or the room's table is unknown
pub async fn video_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(bridge) = state.video.as_ref() else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Video webhooks are not configured".to_string(),
                code: "not_found".to_string(),
            }),
        ));
    };

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match bridge.handle_webhook(authorization, &body).await {
        Ok(commands) => {
            metrics::camera_commands_total(commands.len());
            Ok(Json(WebhookResponse { commands }))
        }
        Err(WebhookError::Table(e)) => Err(api_error(&e)),
        Err(e) => {
            let status = match &e {
                WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
                _ => {
                    logging::log_security_event("webhook_rejected", None, &e.client_message());
                    StatusCode::UNAUTHORIZED
                }
            };
            Err((
                status,
                Json(ErrorResponse {
                    error: e.client_message(),
                    code: if status == StatusCode::BAD_REQUEST {
                        "invalid_request".to_string()
                    } else {
                        "unauthorized".to_string()
                    },
                }),
            ))
        }
    }
}
