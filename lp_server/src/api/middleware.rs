//! Session authentication for table routes.
//!
//! Validates the `Authorization: Bearer <token>` header and injects the
//! caller's [`Identity`] into request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use live_poker::game::entities::Identity;
//!
//! async fn protected_handler(Extension(identity): Extension<Identity>) -> String {
//!     format!("Authenticated as {identity}")
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::logging::log_security_event;

/// Rejects with `401 Unauthorized` when the header is missing, malformed,
/// expired, or names a bot identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.tokens.verify_header(header) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e) => {
            log_security_event("session_rejected", None, &e.client_message());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
