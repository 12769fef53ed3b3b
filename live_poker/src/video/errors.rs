//! Video webhook error types.

use thiserror::Error;

use crate::errors::TableError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing webhook authorization")]
    MissingAuthorization,

    /// Signature, expiry or structure of the authorization token
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Body does not match the signed digest
    #[error("Webhook body digest mismatch")]
    DigestMismatch,

    #[error("Malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl WebhookError {
    pub fn client_message(&self) -> String {
        match self {
            WebhookError::JwtError(_) | WebhookError::DigestMismatch => {
                "Authentication failed".to_string()
            }
            WebhookError::Table(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;
