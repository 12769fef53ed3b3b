use super::entities::Chips;

/// Hard cap on seats per table. Seat numbers run `0..MAX_SEATS`.
pub const MAX_SEATS: u8 = 8;

/// Occupied seats required before the dealer may start a hand.
pub const MIN_PLAYERS: usize = 2;

/// Hole cards dealt to every active seat.
pub const HOLE_CARDS_PER_SEAT: usize = 2;

/// Blind level duration used when a table carries no valid step.
pub const DEFAULT_BLIND_STEP_SECONDS: i64 = 600;

/// Blinds stop doubling after this many levels (2^6 = 64).
pub const MAX_BLIND_LEVEL: u32 = 6;

pub const MAX_BLIND_MULTIPLIER: Chips = 1 << MAX_BLIND_LEVEL;

/// Largest round total a seat may raise to. A full table's pot at this
/// bound stays far inside `Chips`.
pub const MAX_BET: Chips = 1_000_000_000_000;

/// Allowed distance between a scanner's timestamp and server time.
pub const DEVICE_FRESHNESS_WINDOW_SECS: i64 = 30;
