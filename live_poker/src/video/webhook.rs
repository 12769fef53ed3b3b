//! Conferencing webhook authentication and parsing.
//!
//! The `Authorization` header carries an HS256 JWT signed with the shared
//! API secret. Its `sha256` claim is the base64 SHA-256 digest of the raw
//! request body.

use base64::{Engine, engine::general_purpose::STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::errors::{WebhookError, WebhookResult};
use crate::game::entities::{Identity, TableId};

/// Accepted clock skew on the token's time claims.
pub const DEFAULT_WEBHOOK_LEEWAY_SECS: u64 = 60;

const ROOM_PREFIX: &str = "table-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookClaims {
    /// API key of the sender.
    #[serde(default)]
    pub iss: String,
    pub sha256: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

#[derive(Clone)]
pub struct VideoWebhookVerifier {
    secret: String,
    leeway_secs: u64,
}

impl VideoWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            leeway_secs: DEFAULT_WEBHOOK_LEEWAY_SECS,
        }
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Checks the authorization token against `body`.
    pub fn verify(&self, authorization: Option<&str>, body: &[u8]) -> WebhookResult<WebhookClaims> {
        let token = authorization
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(WebhookError::MissingAuthorization)?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let claims = decode::<WebhookClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?
        .claims;

        let digest = body_digest(body);
        if !bool::from(digest.as_bytes().ct_eq(claims.sha256.as_bytes())) {
            return Err(WebhookError::DigestMismatch);
        }
        Ok(claims)
    }

    /// Produces an authorization token for `body`, as the conferencing
    /// service does. Used by local tooling and tests.
    pub fn sign(&self, api_key: &str, body: &[u8], exp: i64) -> WebhookResult<String> {
        let claims = WebhookClaims {
            iss: api_key.to_string(),
            sha256: body_digest(body),
            exp,
            nbf: None,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

/// Base64 SHA-256 of the raw body.
#[must_use]
pub fn body_digest(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}

/// `table-{id}` to the table id.
#[must_use]
pub fn table_for_room(room: &str) -> Option<TableId> {
    room.strip_prefix(ROOM_PREFIX)?
        .parse()
        .ok()
        .filter(|id: &TableId| *id > 0)
}

#[must_use]
pub fn room_for_table(table_id: TableId) -> String {
    format!("{ROOM_PREFIX}{table_id}")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VideoEventKind {
    ParticipantJoined,
    ParticipantLeft,
    RoomFinished,
}

/// A webhook the table cares about.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VideoEvent {
    pub kind: VideoEventKind,
    pub table_id: TableId,
    pub participant: Option<Identity>,
}

#[derive(Deserialize)]
struct RawWebhook {
    event: String,
    room: Option<RawRoom>,
    participant: Option<RawParticipant>,
}

#[derive(Deserialize)]
struct RawRoom {
    name: String,
}

#[derive(Deserialize)]
struct RawParticipant {
    identity: String,
}

/// Parses a verified body. Events of other kinds, or for rooms that are
/// not table rooms, yield `None`.
pub fn parse_event(body: &[u8]) -> WebhookResult<Option<VideoEvent>> {
    let raw: RawWebhook = serde_json::from_slice(body)?;
    let kind = match raw.event.as_str() {
        "participant_joined" => VideoEventKind::ParticipantJoined,
        "participant_left" => VideoEventKind::ParticipantLeft,
        "room_finished" | "room_ended" => VideoEventKind::RoomFinished,
        _ => return Ok(None),
    };
    let Some(table_id) = raw.room.as_ref().and_then(|room| table_for_room(&room.name)) else {
        return Ok(None);
    };
    let participant = raw
        .participant
        .map(|p| p.identity)
        .filter(|identity| !identity.trim().is_empty())
        .map(Identity::new);

    Ok(Some(VideoEvent {
        kind,
        table_id,
        participant,
    }))
}
