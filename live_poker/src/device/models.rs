//! Physical devices paired to tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::game::entities::{SeatNumber, TableId};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Dealer camera/console.
    Dealer,
    /// Signing card scanner.
    Scanner,
    /// Per-seat camera.
    Card,
    Button,
}

impl DeviceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dealer => "dealer",
            Self::Scanner => "scanner",
            Self::Card => "card",
            Self::Button => "button",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dealer" => Ok(Self::Dealer),
            "scanner" => Ok(Self::Scanner),
            "card" => Ok(Self::Card),
            "button" => Ok(Self::Button),
            other => Err(format!("unknown device type {other}")),
        }
    }
}

/// A provisioned device. Business logic only ever touches `last_seen_at`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhysicalDevice {
    pub serial: String,
    pub device_type: DeviceType,
    pub table_id: TableId,
    /// Only for `card` devices.
    pub seat_number: Option<SeatNumber>,
    /// Base64 of the raw 32-byte Ed25519 verifying key; scanners only.
    pub public_key: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Signed scan as submitted by a scanner. All fields are the exact strings
/// the device signed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct CardSubmission {
    pub serial: String,
    pub barcode: String,
    pub timestamp: String,
    pub signature: String,
}

/// What an unauthenticated device learns about itself.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub table_id: TableId,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub seat_number: Option<SeatNumber>,
}

impl From<&PhysicalDevice> for DeviceIdentity {
    fn from(device: &PhysicalDevice) -> Self {
        Self {
            table_id: device.table_id,
            device_type: device.device_type,
            seat_number: device.seat_number,
        }
    }
}
