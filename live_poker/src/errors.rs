//! Error taxonomy shared by the table engine, device pipeline and stores.

use thiserror::Error;

use crate::game::entities::{Card, TableId};

/// Why a scanner submission was refused. Devices only ever see the code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceRejection {
    BadBarcode,
    BadTimestamp,
    StaleTimestamp,
    UnknownDevice,
    BadSignature,
}

impl DeviceRejection {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadBarcode => "bad_barcode",
            Self::BadTimestamp => "bad_timestamp",
            Self::StaleTimestamp => "stale_timestamp",
            Self::UnknownDevice => "unknown_device",
            Self::BadSignature => "bad_signature",
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    /// Malformed input, rejected before any state is read.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Wrong actor, bad signature, stale or unregistered device.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Action not legal in the current phase or turn.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Card already dealt in the current game.
    #[error("Card {0} has already been dealt in this game")]
    DuplicateCard(Card),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("{0} not found")]
    NotFound(String),

    /// Device submission refused at a specific pipeline stage.
    #[error("Device rejected: {}", .0.code())]
    Device(DeviceRejection),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored data is corrupt: {0}")]
    CorruptState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DeviceRejection> for TableError {
    fn from(rejection: DeviceRejection) -> Self {
        Self::Device(rejection)
    }
}

/// Coarse error class, used for transport status mapping.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    InvalidTransition,
    Conflict,
    NotFound,
    Internal,
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::DuplicateCard(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::TableNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Device(rejection) => match rejection {
                DeviceRejection::BadBarcode | DeviceRejection::BadTimestamp => {
                    ErrorKind::Validation
                }
                _ => ErrorKind::Unauthorized,
            },
            Self::Database(_) | Self::CorruptState(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Terse machine-readable code for device-facing responses.
    pub fn device_code(&self) -> &'static str {
        match self {
            Self::Device(rejection) => rejection.code(),
            Self::DuplicateCard(_) => "duplicate_card",
            Self::Validation(_) => "invalid_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Conflict(_) => "conflict",
            Self::TableNotFound(_) | Self::NotFound(_) => "not_found",
            Self::Database(_) | Self::CorruptState(_) | Self::Serialization(_) => "internal",
        }
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TableError::Database(_) | TableError::CorruptState(_) => {
                "Internal server error".to_string()
            }
            TableError::Serialization(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTransition(message.into())
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

/// Result type for table engine operations
pub type TableResult<T> = Result<T, TableError>;
