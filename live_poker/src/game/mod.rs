//! Table engine: entities, blinds, hand evaluation and the state machine.

pub mod blinds;
pub mod constants;
pub mod entities;
pub mod evaluator;
pub mod state_machine;

pub use blinds::{BlindState, compute_blind_state};
pub use entities::{
    Card, Chips, Game, Identity, Phase, QuickAction, Rank, Seat, SeatStatus, Suit, Table,
};
pub use evaluator::{HandCategory, HandEvaluator, HandStrength, StandardEvaluator};
pub use state_machine::{Actor, TableAction, TableSnapshot, TransitionContext, apply};
