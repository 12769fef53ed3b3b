//! Session verification error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request
    #[error("Missing session token")]
    MissingToken,

    /// JWT token error (signature, expiry, malformed)
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Token subject is blank
    #[error("Session token has no subject")]
    EmptySubject,

    /// Token subject names a synthetic seat occupant
    #[error("Bot identities cannot hold sessions")]
    BotSubject,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak token internals
    pub fn client_message(&self) -> String {
        match self {
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for session verification
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_details_are_sanitized() {
        let err = AuthError::JwtError(jsonwebtoken::errors::ErrorKind::InvalidSignature.into());
        assert_eq!(err.client_message(), "Authentication failed");
        assert_eq!(
            AuthError::BotSubject.client_message(),
            "Bot identities cannot hold sessions"
        );
    }
}
