//! Table provisioning parameters.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{TableError, TableResult},
    game::{
        constants::{DEFAULT_BLIND_STEP_SECONDS, MAX_SEATS, MIN_PLAYERS},
        entities::Chips,
    },
};

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Session subject of the human dealer running the table
    pub dealer_id: String,

    /// Base small blind, before escalation
    pub small_blind: Chips,

    /// Base big blind, before escalation
    pub big_blind: Chips,

    /// Seconds per blind level
    pub blind_step_seconds: Option<i64>,

    /// Number of seats (2-8)
    pub seat_count: u8,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Live Table".to_string(),
            dealer_id: "dealer".to_string(),
            small_blind: 5,
            big_blind: 10,
            blind_step_seconds: Some(DEFAULT_BLIND_STEP_SECONDS),
            seat_count: MAX_SEATS,
        }
    }
}

impl TableConfig {
    /// Validate table configuration
    pub fn validate(&self) -> TableResult<()> {
        if self.name.trim().is_empty() {
            return Err(TableError::Validation("Table name cannot be empty".to_string()));
        }

        if self.dealer_id.trim().is_empty() {
            return Err(TableError::Validation("Dealer identity cannot be empty".to_string()));
        }

        if self.small_blind <= 0 {
            return Err(TableError::Validation("Small blind must be positive".to_string()));
        }

        if self.big_blind < self.small_blind {
            return Err(TableError::Validation(
                "Big blind must be at least the small blind".to_string(),
            ));
        }

        if matches!(self.blind_step_seconds, Some(step) if step <= 0) {
            return Err(TableError::Validation(
                "Blind step must be a positive number of seconds".to_string(),
            ));
        }

        if usize::from(self.seat_count) < MIN_PLAYERS || self.seat_count > MAX_SEATS {
            return Err(TableError::Validation(format!(
                "Seat count must be between {MIN_PLAYERS} and {MAX_SEATS}"
            )));
        }

        Ok(())
    }
}
