//! HS256 access-token verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{
    errors::{AuthError, AuthResult},
    models::AccessTokenClaims,
};
use crate::{bot::BotRegistry, game::entities::Identity};

/// Lifetime of tokens minted by [`TokenVerifier::issue`].
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15 * 60;

#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
    bots: BotRegistry,
    token_ttl: Duration,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>, bots: BotRegistry) -> Self {
        Self {
            secret: secret.into(),
            bots,
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Verifies a bearer token and returns the caller's identity.
    pub fn verify(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.decode_claims(token)?;
        let subject = claims.sub.trim();
        if subject.is_empty() {
            return Err(AuthError::EmptySubject);
        }
        if self.bots.is_bot_subject(subject) {
            return Err(AuthError::BotSubject);
        }
        Ok(Identity::new(subject))
    }

    /// Accepts either a raw token or an `Authorization` header value.
    pub fn verify_header(&self, header: Option<&str>) -> AuthResult<Identity> {
        let header = header.map(str::trim).filter(|h| !h.is_empty());
        let token = header.ok_or(AuthError::MissingToken)?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        self.verify(token.trim())
    }

    /// Mints a token for `subject`. Production sessions come from the
    /// session service; this serves dev tooling, the viewer and tests.
    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            exp: (now + self.token_ttl).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn decode_claims(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(token_data.claims)
    }
}
