//! Append-only table event log and the push/pull sync protocol.
//!
//! Writers append one [`GameEvent`] per accepted action inside the table
//! transaction. Readers hold a cursor and pull [`EventDelta`]s; the only
//! thing pushed is a [`ChangeSignal`] telling them to pull.

pub mod models;
pub mod notifier;

pub use models::{
    BetKind, ChangeSignal, EventAction, EventDelta, EventPayload, GameEvent, PotAward, ShownHand,
};
pub use notifier::{BroadcastNotifier, ChangeNotifier, NoopNotifier};
