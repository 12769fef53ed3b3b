//! Event log records and the sync protocol types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::{
    Card, Chips, EventId, GameId, Identity, Phase, QuickAction, SeatNumber, TableId,
};

/// Betting decision recorded in the log.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    Check,
    Call,
    Raise,
    Fold,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PotAward {
    pub seat_number: SeatNumber,
    pub amount: Chips,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShownHand {
    pub seat_number: SeatNumber,
    pub cards: Vec<Card>,
}

/// What happened. Hole-card deals deliberately carry no card.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventAction {
    TableReset,
    SeatJoined {
        seat_number: SeatNumber,
        identity: Identity,
    },
    SeatLeft {
        seat_number: SeatNumber,
        identity: Identity,
        kicked: bool,
    },
    BotSeated {
        seat_number: SeatNumber,
        identity: Identity,
    },
    GameStarted {
        button_seat: SeatNumber,
        small_blind_seat: SeatNumber,
        big_blind_seat: SeatNumber,
        small_blind: Chips,
        big_blind: Chips,
    },
    HoleCardDealt {
        seat_number: SeatNumber,
    },
    CommunityCardDealt {
        card: Card,
    },
    PlayerActed {
        seat_number: SeatNumber,
        bet: BetKind,
        /// Seat's round total after the action.
        amount: Chips,
        /// Executed from an armed quick action.
        automatic: bool,
    },
    HandShown {
        seat_number: SeatNumber,
        cards: Vec<Card>,
    },
    HandEnded {
        shown: Vec<ShownHand>,
    },
    QuickActionArmed {
        seat_number: SeatNumber,
        kind: QuickAction,
    },
    QuickActionCleared {
        seat_number: SeatNumber,
    },
}

/// One log entry's payload: the action plus where it left the hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventPayload {
    #[serde(flatten)]
    pub action: EventAction,
    pub phase: Phase,
    pub assigned_seat: Option<SeatNumber>,
    pub pot: Chips,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub awards: Vec<PotAward>,
}

/// A persisted log row. Never updated or deleted.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameEvent {
    pub id: EventId,
    pub table_id: TableId,
    pub game_id: Option<GameId>,
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
}

/// Result of a cursor read. `cursor` is what the client stores next.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EventDelta {
    pub table_id: TableId,
    pub events: Vec<GameEvent>,
    pub cursor: Option<EventId>,
}

impl EventDelta {
    /// Builds a delta, keeping `after_id` as the cursor when nothing is new.
    #[must_use]
    pub fn new(table_id: TableId, after_id: Option<EventId>, events: Vec<GameEvent>) -> Self {
        let cursor = events.iter().map(|e| e.id).max().or(after_id);
        Self {
            table_id,
            events,
            cursor,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// The only thing pushed in real time.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChangeSignal {
    pub table_id: TableId,
    pub timestamp: DateTime<Utc>,
}
