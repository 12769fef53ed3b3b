//! Scanner submission authentication.
//!
//! Scanners sign `serial|barcode|timestamp` with Ed25519. The stored public
//! key and the signature are both standard base64.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use super::{
    decoder::decode_barcode,
    models::{CardSubmission, DeviceType, PhysicalDevice},
};
use crate::{
    errors::DeviceRejection,
    game::{constants::DEVICE_FRESHNESS_WINDOW_SECS, entities::Card},
};

/// The exact bytes a scanner signs.
#[must_use]
pub fn canonical_message(serial: &str, barcode: &str, timestamp: &str) -> String {
    format!("{serial}|{barcode}|{timestamp}")
}

/// Signs a submission the way scanner firmware does. Used by simulators
/// and tests.
#[must_use]
pub fn sign_submission(key: &SigningKey, serial: &str, barcode: &str, timestamp: &str) -> String {
    let message = canonical_message(serial, barcode, timestamp);
    STANDARD.encode(key.sign(message.as_bytes()).to_bytes())
}

#[must_use]
pub fn encode_public_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.to_bytes())
}

/// Stateless checks for the scanner pipeline.
#[derive(Clone, Debug)]
pub struct DeviceVerifier {
    freshness_window_secs: i64,
}

impl Default for DeviceVerifier {
    fn default() -> Self {
        Self::new(DEVICE_FRESHNESS_WINDOW_SECS)
    }
}

impl DeviceVerifier {
    pub fn new(freshness_window_secs: i64) -> Self {
        Self {
            freshness_window_secs: freshness_window_secs.max(0),
        }
    }

    /// Barcode then timestamp: the checks that need no stored state.
    pub fn precheck(
        &self,
        submission: &CardSubmission,
        now: DateTime<Utc>,
    ) -> Result<Card, DeviceRejection> {
        let card = decode_barcode(&submission.barcode)?;
        self.check_freshness(&submission.timestamp, now)?;
        Ok(card)
    }

    /// `|now - timestamp|` must be within the window.
    pub fn check_freshness(&self, timestamp: &str, now: DateTime<Utc>) -> Result<(), DeviceRejection> {
        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| DeviceRejection::BadTimestamp)?;
        let skew = now.timestamp().abs_diff(ts);
        if skew > self.freshness_window_secs.unsigned_abs() {
            return Err(DeviceRejection::StaleTimestamp);
        }
        Ok(())
    }

    /// Resolves the signing key of a registered scanner.
    pub fn scanner_key(&self, device: Option<&PhysicalDevice>) -> Result<VerifyingKey, DeviceRejection> {
        let device = device
            .filter(|device| device.device_type == DeviceType::Scanner)
            .ok_or(DeviceRejection::UnknownDevice)?;
        let encoded = device
            .public_key
            .as_deref()
            .ok_or(DeviceRejection::UnknownDevice)?;
        let bytes: [u8; 32] = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(DeviceRejection::UnknownDevice)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| DeviceRejection::UnknownDevice)
    }

    /// Verifies the submission's signature over its canonical message.
    pub fn verify_signature(
        &self,
        key: &VerifyingKey,
        submission: &CardSubmission,
    ) -> Result<(), DeviceRejection> {
        let bytes: [u8; 64] = STANDARD
            .decode(submission.signature.trim())
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(DeviceRejection::BadSignature)?;
        let signature = Signature::from_bytes(&bytes);
        let message = canonical_message(&submission.serial, &submission.barcode, &submission.timestamp);
        key.verify(message.as_bytes(), &signature)
            .map_err(|_| DeviceRejection::BadSignature)
    }
}
