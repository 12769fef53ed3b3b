//! Session token claims.

use serde::{Deserialize, Serialize};

/// JWT claims for an access token. Sessions are issued elsewhere; the
/// engine only reads `sub` as the caller's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}
