//! Viewer-filtered table projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    bot::BotRegistry,
    game::{
        blinds::{BlindState, compute_blind_state},
        entities::{
            Card, Chips, GameId, Identity, Phase, QuickAction, Seat, SeatNumber, SeatStatus,
            TableId,
        },
        state_machine::TableSnapshot,
    },
};

/// One seat as a given viewer may see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_number: SeatNumber,
    pub occupant: Option<Identity>,
    pub is_bot: bool,
    /// Always visible, so everyone can follow the deal.
    pub card_count: usize,
    /// Hole cards, present only when the viewer may see them.
    pub cards: Option<Vec<Card>>,
    pub current_bet: Chips,
    pub is_active: bool,
    pub status: SeatStatus,
    pub win_amount: Chips,
    pub is_showing: bool,
    /// Only the occupant and the dealer see armed quick actions.
    pub quick_action: Option<QuickAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub id: Option<GameId>,
    pub phase: Phase,
    pub assigned_seat: Option<SeatNumber>,
    pub button_seat: Option<SeatNumber>,
    pub community_cards: Vec<Card>,
    pub bet_count: u32,
    pub required_bet_count: u32,
    pub pot: Chips,
    /// Highest round bet among active seats.
    pub max_bet: Chips,
    pub started_at: DateTime<Utc>,
}

/// Table state as returned to dealer and player UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub table_id: TableId,
    pub name: String,
    pub dealer_id: Identity,
    pub phase: Phase,
    pub is_joinable: bool,
    pub seat_count: u8,
    pub blinds: BlindState,
    pub game: Option<GameView>,
    pub seats: Vec<SeatView>,
    /// The viewer's own seat, if seated.
    pub viewer_seat: Option<SeatNumber>,
}

impl TableView {
    /// Projects `snapshot` for `viewer`. Hole cards are hidden unless the
    /// viewer occupies the seat, runs the table, or the seat is showing.
    pub fn for_viewer(
        snapshot: &TableSnapshot,
        viewer: Option<&Identity>,
        bots: &BotRegistry,
        now: DateTime<Utc>,
    ) -> Self {
        let is_dealer = viewer.is_some_and(|v| snapshot.table.is_dealer(v));
        let seats = snapshot
            .seats
            .iter()
            .map(|seat| {
                let is_own = viewer.is_some_and(|v| seat.is_occupied_by(v));
                seat_view(seat, is_own || is_dealer, bots)
            })
            .collect();

        let game = snapshot.game.as_ref().map(|game| GameView {
            id: game.id,
            phase: game.state,
            assigned_seat: snapshot.assigned_seat().map(|seat| seat.seat_number),
            button_seat: game
                .dealer_button_seat_id
                .and_then(|id| snapshot.seat_by_id(id))
                .map(|seat| seat.seat_number),
            community_cards: game.community_cards.clone(),
            bet_count: game.bet_count,
            required_bet_count: game.required_bet_count,
            pot: game.pot,
            max_bet: snapshot.max_bet(),
            started_at: game.created_at,
        });

        Self {
            table_id: snapshot.table.id,
            name: snapshot.table.name.clone(),
            dealer_id: snapshot.table.dealer_id.clone(),
            phase: snapshot.phase(),
            is_joinable: snapshot.table.is_joinable,
            seat_count: snapshot.table.seat_count,
            blinds: compute_blind_state(&snapshot.table, now),
            game,
            seats,
            viewer_seat: viewer
                .and_then(|v| snapshot.seat_of(v))
                .map(|seat| seat.seat_number),
        }
    }

    #[must_use]
    pub fn seat(&self, seat_number: SeatNumber) -> Option<&SeatView> {
        self.seats.iter().find(|seat| seat.seat_number == seat_number)
    }
}

fn seat_view(seat: &Seat, privileged: bool, bots: &BotRegistry) -> SeatView {
    let cards_visible = privileged || seat.is_showing;
    SeatView {
        seat_number: seat.seat_number,
        occupant: seat.occupant.clone(),
        is_bot: seat.occupant.as_ref().is_some_and(|id| bots.is_bot(id)),
        card_count: seat.cards.len(),
        cards: cards_visible.then(|| seat.cards.clone()),
        current_bet: seat.current_bet,
        is_active: seat.is_active,
        status: seat.status,
        win_amount: seat.win_amount,
        is_showing: seat.is_showing,
        quick_action: if privileged { seat.quick_action } else { None },
    }
}
