//! # Live Poker
//!
//! Server-authoritative engine for live-dealer Texas Hold'em tables played
//! with a physical deck.
//!
//! The human dealer runs each hand, players act from their own devices, and
//! cards enter the system through signed barcode scanners. Every state
//! change is a single store transaction that appends to a per-table event
//! log; clients receive a small "table changed" signal and pull the delta.
//!
//! ## Core Modules
//!
//! - [`game`]: entities, the per-table state machine, blinds and hand evaluation
//! - [`table`]: the [`TableManager`] action handler and viewer projections
//! - [`device`]: scanner authentication and barcode decoding
//! - [`events`]: event log records and change notification
//! - [`db`]: the [`TableStore`] capability (PostgreSQL and in-memory)
//! - [`bot`]: synthetic seat occupants
//! - [`auth`]: session token verification
//! - [`video`]: conferencing webhooks to camera commands
//!
//! ## Example
//!
//! ```
//! use live_poker::{
//!     MemoryTableStore, NoopNotifier, TableAction, TableConfig, TableManager,
//!     game::entities::{Identity, Phase},
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), live_poker::TableError> {
//! let manager = TableManager::new(Arc::new(MemoryTableStore::new()), Arc::new(NoopNotifier));
//! let table = manager.create_table(&TableConfig::default()).await?;
//!
//! for (seat_number, name) in ["alice", "bob"].into_iter().enumerate() {
//!     let action = TableAction::JoinSeat { seat_number: seat_number as u8 };
//!     manager.perform_action(table.id, &Identity::from(name), &action).await?;
//! }
//! let view = manager
//!     .perform_action(table.id, &Identity::from("dealer"), &TableAction::StartGame)
//!     .await?;
//! assert_eq!(view.phase, Phase::DealHoleCards);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bot;
pub mod db;
pub mod device;
pub mod errors;
pub mod events;
pub mod game;
pub mod table;
pub mod video;

pub use auth::{AuthError, TokenVerifier};
pub use bot::BotRegistry;
pub use db::{MemoryTableStore, PgTableStore, TableStore};
pub use device::{CardSubmission, DeviceIdentity, DeviceVerifier, PhysicalDevice};
pub use errors::{DeviceRejection, ErrorKind, TableError, TableResult};
pub use events::{BroadcastNotifier, ChangeNotifier, ChangeSignal, EventDelta, GameEvent, NoopNotifier};
pub use game::{Actor, TableAction, TableSnapshot};
pub use table::{TableConfig, TableManager, TableView};
pub use video::{BroadcastSignaler, CameraSignaler, StreamCommand, VideoBridge, VideoWebhookVerifier};
