//! Physical device registry types and the scanner ingestion pipeline.
//!
//! A scanner submission is checked in a fixed order, stopping at the first
//! failure: barcode, timestamp freshness, device lookup, signature. Only a
//! fully verified submission reaches the table as a deal.

pub mod decoder;
pub mod models;
pub mod verifier;

pub use decoder::{decode_barcode, encode_barcode};
pub use models::{CardSubmission, DeviceIdentity, DeviceType, PhysicalDevice};
pub use verifier::{DeviceVerifier, canonical_message, encode_public_key, sign_submission};
