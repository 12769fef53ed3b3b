//! Session verification.
//!
//! Dealers and players authenticate with HS256 access tokens issued by an
//! external session service. The engine only verifies them and maps the
//! subject to an [`Identity`](crate::game::entities::Identity).
//!
//! ```
//! use chrono::Utc;
//! use live_poker::{auth::TokenVerifier, bot::BotRegistry};
//!
//! let verifier = TokenVerifier::new("jwt_secret", BotRegistry::default());
//! let token = verifier.issue("dealer", Utc::now()).unwrap();
//! assert_eq!(verifier.verify(&token).unwrap().as_str(), "dealer");
//! ```

pub mod errors;
pub mod models;
pub mod verifier;

pub use errors::{AuthError, AuthResult};
pub use models::AccessTokenClaims;
pub use verifier::{DEFAULT_TOKEN_TTL_SECS, TokenVerifier};
