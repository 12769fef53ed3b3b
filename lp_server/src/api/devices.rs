//! Device-facing endpoints.
//!
//! Scanners and cameras carry no session. Submissions authenticate by
//! Ed25519 signature; responses only ever expose a terse code.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use live_poker::{CardSubmission, DeviceIdentity, TableError, game::entities::Card};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    tables::{malformed, status_for},
};
use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub serial: String,
}

fn rejection(err: &TableError) -> (StatusCode, Json<DeviceResponse>) {
    (
        status_for(err.kind()),
        Json(DeviceResponse {
            ok: false,
            card: None,
            code: Some(err.device_code().to_string()),
        }),
    )
}

/// Accept a signed scan and deal the decoded card at the scanner's table.
///
/// # Response
///
/// `{"ok":true,"card":"As"}` on success, `{"ok":false,"code":"stale_timestamp"}`
/// (with a matching 4xx status) otherwise.
pub async fn submit_card(
    State(state): State<AppState>,
    body: Result<Json<CardSubmission>, JsonRejection>,
) -> (StatusCode, Json<DeviceResponse>) {
    let submission = match body {
        Ok(Json(submission)) => submission,
        Err(e) => {
            metrics::device_rejections_total("invalid_request");
            return rejection(&malformed(&e));
        }
    };
    match state.table_manager.submit_card(&submission).await {
        Ok(card) => {
            metrics::card_submissions_accepted();
            (
                StatusCode::OK,
                Json(DeviceResponse {
                    ok: true,
                    card: Some(card),
                    code: None,
                }),
            )
        }
        Err(e) => {
            let code = e.device_code();
            metrics::device_rejections_total(code);
            if matches!(e, TableError::Device(_)) {
                logging::log_security_event(
                    "device_rejected",
                    Some(submission.serial.as_str()),
                    code,
                );
            }
            rejection(&e)
        }
    }
}

/// Tell a device which table and seat it belongs to.
pub async fn identify(
    State(state): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<DeviceIdentity>, (StatusCode, Json<DeviceResponse>)> {
    let Json(request) = body.map_err(|e| rejection(&malformed(&e)))?;
    state
        .table_manager
        .identify_device(request.serial.trim())
        .await
        .map(Json)
        .map_err(|e| rejection(&e))
}
