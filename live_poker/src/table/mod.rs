//! Table orchestration.
//!
//! [`TableManager`] is the single entry point for callers. Each operation
//! opens one store transaction, runs the pure state machine against the
//! loaded rows, appends the resulting events and, on success, announces a
//! change signal. Views returned to callers are filtered per viewer.

pub mod config;
pub mod manager;
pub mod messages;

pub use config::TableConfig;
pub use manager::TableManager;
pub use messages::{GameView, SeatView, TableView};
