//! Per-table hand state machine.
//!
//! [`apply`] is a pure function over a [`TableSnapshot`]: it validates an
//! action, mutates the snapshot in place and returns one event payload per
//! state change it made. It never performs I/O; the caller owns the
//! transaction that loaded the snapshot and persists it afterwards.
//!
//! ```text
//! WAITING -> DEAL_HOLE_CARDS -> BETTING -> DEAL_FLOP -> BETTING
//!         -> DEAL_TURN -> BETTING -> DEAL_RIVER -> BETTING -> SHOWDOWN -> WAITING
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{
    blinds::compute_blind_state,
    constants::{HOLE_CARDS_PER_SEAT, MAX_BET, MIN_PLAYERS},
    entities::{
        Card, Chips, Game, Identity, Phase, QuickAction, Seat, SeatId, SeatNumber, SeatStatus,
        Table,
    },
    evaluator::{HandEvaluator, HandStrength},
};
use crate::{
    bot::BotRegistry,
    errors::{TableError, TableResult},
    events::{BetKind, EventAction, EventPayload, PotAward, ShownHand},
};

/// Who is issuing an action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Actor {
    /// Session-authenticated human, or a bot acting through the bot trigger.
    User(Identity),
    /// Signature-authenticated scanner, by serial.
    Device(String),
}

impl Actor {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::User(identity) => Some(identity),
            Self::Device(_) => None,
        }
    }
}

/// Everything a caller can ask a table to do.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableAction {
    StartGame,
    DealCard { card: Card },
    ResetTable,
    Raise { amount: Chips },
    Call,
    Check,
    Fold,
    VolunteerShow,
    EndHand,
    JoinSeat { seat_number: SeatNumber },
    LeaveSeat,
    KickSeat { seat_number: SeatNumber },
    SeatBot { seat_number: SeatNumber },
    ArmQuickAction { kind: QuickAction },
    ClearQuickAction,
}

impl TableAction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::DealCard { .. } => "deal_card",
            Self::ResetTable => "reset_table",
            Self::Raise { .. } => "raise",
            Self::Call => "call",
            Self::Check => "check",
            Self::Fold => "fold",
            Self::VolunteerShow => "volunteer_show",
            Self::EndHand => "end_hand",
            Self::JoinSeat { .. } => "join_seat",
            Self::LeaveSeat => "leave_seat",
            Self::KickSeat { .. } => "kick_seat",
            Self::SeatBot { .. } => "seat_bot",
            Self::ArmQuickAction { .. } => "arm_quick_action",
            Self::ClearQuickAction => "clear_quick_action",
        }
    }

    /// Actions only the table's dealer identity may issue. `DEAL_CARD` is
    /// handled separately since scanners may issue it too.
    #[must_use]
    pub const fn is_dealer_only(&self) -> bool {
        matches!(
            self,
            Self::StartGame
                | Self::ResetTable
                | Self::EndHand
                | Self::KickSeat { .. }
                | Self::SeatBot { .. }
        )
    }
}

/// The rows one table transaction operates on. Seats are ordered by seat
/// number.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSnapshot {
    pub table: Table,
    pub game: Option<Game>,
    pub seats: Vec<Seat>,
}

impl TableSnapshot {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.game.as_ref().map_or(Phase::Waiting, |game| game.state)
    }

    #[must_use]
    pub fn seat_by_id(&self, seat_id: SeatId) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.id == seat_id)
    }

    #[must_use]
    pub fn seat_by_number(&self, seat_number: SeatNumber) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.seat_number == seat_number)
    }

    #[must_use]
    pub fn seat_of(&self, identity: &Identity) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.is_occupied_by(identity))
    }

    #[must_use]
    pub fn assigned_seat(&self) -> Option<&Seat> {
        self.game
            .as_ref()
            .and_then(|game| game.assigned_seat_id)
            .and_then(|id| self.seat_by_id(id))
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_active).count()
    }

    /// Highest round bet among seats still in the hand.
    #[must_use]
    pub fn max_bet(&self) -> Chips {
        self.seats
            .iter()
            .filter(|seat| seat.is_active)
            .map(|seat| seat.current_bet)
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn can_check(&self, seat: &Seat) -> bool {
        seat.current_bet == self.max_bet()
    }

    /// Every card already in play for the current game.
    pub fn dealt_cards(&self) -> impl Iterator<Item = &Card> {
        self.seats
            .iter()
            .flat_map(|seat| seat.cards.iter())
            .chain(self.game.iter().flat_map(|game| game.community_cards.iter()))
    }

    fn index_of(&self, seat_id: SeatId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.id == seat_id)
    }

    fn assigned_index(&self) -> Option<usize> {
        self.game
            .as_ref()
            .and_then(|game| game.assigned_seat_id)
            .and_then(|id| self.index_of(id))
    }

    fn button_index(&self) -> Option<usize> {
        self.game
            .as_ref()
            .and_then(|game| game.dealer_button_seat_id)
            .and_then(|id| self.index_of(id))
    }

    /// First active seat strictly after `index` (wrapping, so `index`
    /// itself is considered last) that satisfies `pred`.
    fn next_active_after(&self, index: usize, mut pred: impl FnMut(&Seat) -> bool) -> Option<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (index + offset) % n)
            .find(|&i| self.seats[i].is_active && pred(&self.seats[i]))
    }

    fn active_bets_equal(&self) -> bool {
        let max_bet = self.max_bet();
        self.seats
            .iter()
            .filter(|seat| seat.is_active)
            .all(|seat| seat.current_bet == max_bet)
    }

    fn record(&self, action: EventAction) -> EventPayload {
        EventPayload {
            action,
            phase: self.phase(),
            assigned_seat: self.assigned_seat().map(|seat| seat.seat_number),
            pot: self.game.as_ref().map_or(0, |game| game.pot),
            awards: Vec::new(),
        }
    }
}

/// Collaborators a transition may consult.
pub struct TransitionContext<'a> {
    pub now: DateTime<Utc>,
    pub evaluator: &'a dyn HandEvaluator,
    pub bots: &'a BotRegistry,
}

#[derive(Clone, Copy, Debug)]
enum Bet {
    Check,
    Call,
    Raise(Chips),
    Fold,
}

/// Applies `action` to `snapshot`.
///
/// Returns one payload per state change: the action itself, followed by any
/// armed quick actions it triggered. On error the snapshot must be
/// discarded.
pub fn apply(
    snapshot: &mut TableSnapshot,
    actor: &Actor,
    action: &TableAction,
    ctx: &TransitionContext<'_>,
) -> TableResult<Vec<EventPayload>> {
    if action.is_dealer_only() {
        require_dealer(&snapshot.table, actor, action)?;
    }

    let event = match action {
        TableAction::StartGame => start_game(snapshot, ctx.now)?,
        TableAction::DealCard { card } => deal_card(snapshot, actor, *card)?,
        TableAction::ResetTable => reset_table(snapshot),
        TableAction::Raise { amount } => {
            let index = turn_index(snapshot, actor)?;
            place_bet(snapshot, index, Bet::Raise(*amount), false)?
        }
        TableAction::Call => {
            let index = turn_index(snapshot, actor)?;
            place_bet(snapshot, index, Bet::Call, false)?
        }
        TableAction::Check => {
            let index = turn_index(snapshot, actor)?;
            place_bet(snapshot, index, Bet::Check, false)?
        }
        TableAction::Fold => {
            let index = turn_index(snapshot, actor)?;
            place_bet(snapshot, index, Bet::Fold, false)?
        }
        TableAction::VolunteerShow => volunteer_show(snapshot, user(actor)?)?,
        TableAction::EndHand => end_hand(snapshot, ctx.evaluator)?,
        TableAction::JoinSeat { seat_number } => {
            join_seat(snapshot, user(actor)?, *seat_number, ctx.bots)?
        }
        TableAction::LeaveSeat => {
            let index = seated_index(snapshot, user(actor)?)?;
            remove_occupant(snapshot, index, false)?
        }
        TableAction::KickSeat { seat_number } => {
            let index = index_by_number(snapshot, *seat_number)?;
            remove_occupant(snapshot, index, true)?
        }
        TableAction::SeatBot { seat_number } => seat_bot(snapshot, *seat_number, ctx.bots)?,
        TableAction::ArmQuickAction { kind } => arm_quick_action(snapshot, user(actor)?, *kind)?,
        TableAction::ClearQuickAction => clear_quick_action(snapshot, user(actor)?)?,
    };

    let mut events = vec![event];
    run_quick_actions(snapshot, &mut events)?;
    Ok(events)
}

fn require_dealer(table: &Table, actor: &Actor, action: &TableAction) -> TableResult<()> {
    match actor {
        Actor::User(identity) if table.is_dealer(identity) => Ok(()),
        _ => Err(TableError::unauthorized(format!(
            "{} may only be issued by the dealer",
            action.name()
        ))),
    }
}

fn user(actor: &Actor) -> TableResult<&Identity> {
    match actor {
        Actor::User(identity) => Ok(identity),
        Actor::Device(_) => Err(TableError::unauthorized("devices may only deal cards")),
    }
}

fn no_hand() -> TableError {
    TableError::invalid("no hand in progress")
}

fn corrupt(snapshot: &TableSnapshot, what: &str) -> TableError {
    TableError::CorruptState(format!(
        "table {} in {}: {what}",
        snapshot.table.id,
        snapshot.phase()
    ))
}

fn index_by_number(snapshot: &TableSnapshot, seat_number: SeatNumber) -> TableResult<usize> {
    snapshot
        .seats
        .iter()
        .position(|seat| seat.seat_number == seat_number)
        .ok_or_else(|| TableError::Validation(format!("seat {seat_number} does not exist")))
}

fn seated_index(snapshot: &TableSnapshot, identity: &Identity) -> TableResult<usize> {
    snapshot
        .seats
        .iter()
        .position(|seat| seat.is_occupied_by(identity))
        .ok_or_else(|| TableError::invalid("you are not seated at this table"))
}

/// Seat index of the caller, who must own the current betting turn.
fn turn_index(snapshot: &TableSnapshot, actor: &Actor) -> TableResult<usize> {
    let identity = user(actor)?;
    if snapshot.phase() != Phase::Betting {
        return Err(TableError::invalid(format!(
            "betting is not open during {}",
            snapshot.phase()
        )));
    }
    let index = snapshot
        .assigned_index()
        .ok_or_else(|| corrupt(snapshot, "no assigned seat"))?;
    if !snapshot.seats[index].is_occupied_by(identity) {
        return Err(TableError::invalid("not your turn"));
    }
    Ok(index)
}

fn start_game(snapshot: &mut TableSnapshot, now: DateTime<Utc>) -> TableResult<EventPayload> {
    if snapshot.phase() != Phase::Waiting {
        return Err(TableError::invalid("a hand is already in progress"));
    }
    let occupied = snapshot.seats.iter().filter(|s| s.is_occupied()).count();
    if occupied < MIN_PLAYERS {
        return Err(TableError::invalid(format!(
            "need {MIN_PLAYERS}+ seated players, have {occupied}"
        )));
    }

    let previous_button = snapshot.button_index();
    for seat in &mut snapshot.seats {
        seat.reset_hand();
        if seat.is_occupied() {
            seat.is_active = true;
            seat.status = SeatStatus::Playing;
        }
    }

    let button = match previous_button {
        Some(index) => snapshot.next_active_after(index, |_| true),
        None => snapshot.seats.iter().position(|seat| seat.is_active),
    }
    .ok_or_else(|| corrupt(snapshot, "no active seat for the button"))?;
    let small = snapshot
        .next_active_after(button, |_| true)
        .ok_or_else(|| corrupt(snapshot, "no small blind seat"))?;
    let big = snapshot
        .next_active_after(small, |_| true)
        .ok_or_else(|| corrupt(snapshot, "no big blind seat"))?;

    if snapshot.table.blind_timer_started_at.is_none() {
        snapshot.table.blind_timer_started_at = Some(now);
    }
    let blinds = compute_blind_state(&snapshot.table, now);
    snapshot.seats[small].current_bet = blinds.small_blind;
    snapshot.seats[big].current_bet = blinds.big_blind;

    snapshot.game = Some(Game {
        id: None,
        table_id: snapshot.table.id,
        state: Phase::DealHoleCards,
        assigned_seat_id: Some(snapshot.seats[small].id),
        dealer_button_seat_id: Some(snapshot.seats[button].id),
        community_cards: Vec::with_capacity(5),
        bet_count: 0,
        required_bet_count: 0,
        pot: 0,
        pot_awarded: false,
        created_at: now,
    });
    snapshot.table.is_joinable = false;

    info!(
        "Table {} started a hand with {} players (blind level {})",
        snapshot.table.id, occupied, blinds.level
    );

    Ok(snapshot.record(EventAction::GameStarted {
        button_seat: snapshot.seats[button].seat_number,
        small_blind_seat: snapshot.seats[small].seat_number,
        big_blind_seat: snapshot.seats[big].seat_number,
        small_blind: blinds.small_blind,
        big_blind: blinds.big_blind,
    }))
}

fn deal_card(snapshot: &mut TableSnapshot, actor: &Actor, card: Card) -> TableResult<EventPayload> {
    match actor {
        Actor::Device(_) => {}
        Actor::User(identity) if snapshot.table.is_dealer(identity) => {}
        Actor::User(_) => {
            return Err(TableError::unauthorized(
                "deal_card may only be issued by the dealer or a scanner",
            ));
        }
    }

    // Before the phase check, so a repeated card within a hand is always a
    // conflict. A finished hand's board stays on the row for display only.
    if snapshot.phase().is_hand_in_progress()
        && snapshot.dealt_cards().any(|dealt| *dealt == card)
    {
        return Err(TableError::DuplicateCard(card));
    }

    match snapshot.phase() {
        Phase::DealHoleCards => {
            let index = snapshot
                .assigned_index()
                .ok_or_else(|| corrupt(snapshot, "no assigned seat"))?;
            let seat = &mut snapshot.seats[index];
            if !seat.is_active || seat.cards.len() >= HOLE_CARDS_PER_SEAT {
                return Err(corrupt(snapshot, "assigned seat cannot take a card"));
            }
            seat.cards.push(card);
            let seat_number = seat.seat_number;
            advance_hole_card_assignment(snapshot, index)?;
            Ok(snapshot.record(EventAction::HoleCardDealt { seat_number }))
        }
        phase @ (Phase::DealFlop | Phase::DealTurn | Phase::DealRiver) => {
            let target = phase.community_target().unwrap_or(5);
            let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
            game.community_cards.push(card);
            if game.community_cards.len() >= target {
                let button = snapshot
                    .button_index()
                    .ok_or_else(|| corrupt(snapshot, "no button seat"))?;
                let first = snapshot
                    .next_active_after(button, |_| true)
                    .ok_or_else(|| corrupt(snapshot, "no active seat"))?;
                start_betting_round(snapshot, first)?;
            }
            Ok(snapshot.record(EventAction::CommunityCardDealt { card }))
        }
        phase => Err(TableError::invalid(format!(
            "cannot deal a card during {phase}"
        ))),
    }
}

/// Moves the hole-card assignment on from `from`, opening the first betting
/// round once every active seat holds its cards.
fn advance_hole_card_assignment(snapshot: &mut TableSnapshot, from: usize) -> TableResult<()> {
    let next = snapshot.next_active_after(from, |seat| seat.cards.len() < HOLE_CARDS_PER_SEAT);
    match next {
        Some(index) => {
            let seat_id = snapshot.seats[index].id;
            let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
            game.assigned_seat_id = Some(seat_id);
            Ok(())
        }
        None => {
            let button = snapshot
                .button_index()
                .ok_or_else(|| corrupt(snapshot, "no button seat"))?;
            let first = snapshot
                .next_active_after(button, |_| true)
                .and_then(|small| snapshot.next_active_after(small, |_| true))
                .and_then(|big| snapshot.next_active_after(big, |_| true))
                .ok_or_else(|| corrupt(snapshot, "no active seat"))?;
            start_betting_round(snapshot, first)
        }
    }
}

fn start_betting_round(snapshot: &mut TableSnapshot, first: usize) -> TableResult<()> {
    let required = u32::try_from(snapshot.active_count()).unwrap_or(u32::MAX);
    let seat_id = snapshot.seats[first].id;
    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    game.state = Phase::Betting;
    game.assigned_seat_id = Some(seat_id);
    game.bet_count = 0;
    game.required_bet_count = required;
    Ok(())
}

fn place_bet(
    snapshot: &mut TableSnapshot,
    index: usize,
    bet: Bet,
    automatic: bool,
) -> TableResult<EventPayload> {
    let max_bet = snapshot.max_bet();
    let seat = &mut snapshot.seats[index];
    let kind = match bet {
        Bet::Check => {
            if seat.current_bet != max_bet {
                return Err(TableError::invalid(format!(
                    "cannot check facing a bet of {max_bet}"
                )));
            }
            BetKind::Check
        }
        Bet::Call => {
            if seat.current_bet >= max_bet {
                return Err(TableError::invalid("nothing to call"));
            }
            seat.current_bet = max_bet;
            BetKind::Call
        }
        Bet::Raise(amount) => {
            if amount > MAX_BET {
                return Err(TableError::Validation(format!(
                    "raise of {amount} exceeds the table limit of {MAX_BET}"
                )));
            }
            if amount <= max_bet {
                return Err(TableError::invalid(format!(
                    "raise must exceed the current bet of {max_bet}"
                )));
            }
            seat.current_bet = amount;
            BetKind::Raise
        }
        Bet::Fold => {
            seat.is_active = false;
            seat.status = SeatStatus::Folded;
            seat.quick_action = None;
            BetKind::Fold
        }
    };
    let seat_number = seat.seat_number;
    let amount = seat.current_bet;

    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    game.bet_count += 1;
    let awards = advance_after_bet(snapshot, index)?;

    debug!(
        "Table {} seat {} {:?} {} (automatic: {})",
        snapshot.table.id, seat_number, kind, amount, automatic
    );

    let mut event = snapshot.record(EventAction::PlayerActed {
        seat_number,
        bet: kind,
        amount,
        automatic,
    });
    event.awards = awards;
    Ok(event)
}

/// Closes the round, hands the turn on, or ends the hand after a bet from
/// the seat at `index`.
fn advance_after_bet(snapshot: &mut TableSnapshot, index: usize) -> TableResult<Vec<PotAward>> {
    if snapshot.active_count() == 1 {
        return fold_to_one(snapshot);
    }

    let round_complete = snapshot.game.as_ref().is_some_and(|game| {
        game.bet_count >= game.required_bet_count
    }) && snapshot.active_bets_equal();

    if round_complete {
        close_betting_round(snapshot)?;
    } else {
        let next = snapshot
            .next_active_after(index, |_| true)
            .ok_or_else(|| corrupt(snapshot, "no active seat to rotate to"))?;
        let seat_id = snapshot.seats[next].id;
        let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
        game.assigned_seat_id = Some(seat_id);
    }
    Ok(Vec::new())
}

/// Chip addition that refuses to wrap.
fn add_chips(total: Chips, amount: Chips) -> TableResult<Chips> {
    total
        .checked_add(amount)
        .ok_or_else(|| TableError::Validation("chip total out of range".to_string()))
}

/// Moves every seat's round bet into the pot.
fn collect_bets(snapshot: &mut TableSnapshot) -> TableResult<()> {
    let collected = snapshot
        .seats
        .iter_mut()
        .map(|seat| std::mem::take(&mut seat.current_bet))
        .try_fold(0, add_chips)?;
    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    game.pot = add_chips(game.pot, collected)?;
    Ok(())
}

fn close_betting_round(snapshot: &mut TableSnapshot) -> TableResult<()> {
    collect_bets(snapshot)?;
    let table_id = snapshot.table.id;
    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    let next = match game.community_cards.len() {
        0 => Phase::DealFlop,
        3 => Phase::DealTurn,
        4 => Phase::DealRiver,
        _ => Phase::Showdown,
    };
    game.state = next;
    game.assigned_seat_id = None;
    game.bet_count = 0;
    game.required_bet_count = 0;
    info!(
        "Table {} closed a betting round, pot {}, now {}",
        table_id, game.pot, next
    );
    Ok(())
}

/// Awards the whole pot to the last active seat and goes to showdown.
fn fold_to_one(snapshot: &mut TableSnapshot) -> TableResult<Vec<PotAward>> {
    collect_bets(snapshot)?;
    let winner = snapshot
        .seats
        .iter()
        .position(|seat| seat.is_active)
        .ok_or_else(|| corrupt(snapshot, "no seat left to award"))?;

    let table_id = snapshot.table.id;
    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    let amount = game.pot;
    game.state = Phase::Showdown;
    game.assigned_seat_id = None;
    game.bet_count = 0;
    game.required_bet_count = 0;
    game.pot_awarded = true;

    for seat in &mut snapshot.seats {
        seat.quick_action = None;
    }
    let seat = &mut snapshot.seats[winner];
    seat.win_amount = add_chips(seat.win_amount, amount)?;
    info!(
        "Table {} seat {} wins {} uncontested",
        table_id, seat.seat_number, amount
    );

    Ok(vec![PotAward {
        seat_number: seat.seat_number,
        amount,
    }])
}

fn reset_table(snapshot: &mut TableSnapshot) -> EventPayload {
    snapshot.game = None;
    for seat in &mut snapshot.seats {
        seat.reset_hand();
    }
    snapshot.table.blind_timer_started_at = None;
    snapshot.table.is_joinable = true;
    info!("Table {} reset", snapshot.table.id);
    snapshot.record(EventAction::TableReset)
}

fn volunteer_show(snapshot: &mut TableSnapshot, identity: &Identity) -> TableResult<EventPayload> {
    if snapshot.phase() != Phase::Showdown {
        return Err(TableError::invalid("hands can only be shown at showdown"));
    }
    let index = seated_index(snapshot, identity)?;
    let seat = &mut snapshot.seats[index];
    if seat.cards.is_empty() {
        return Err(TableError::invalid("no hand to show"));
    }
    if seat.is_showing {
        return Err(TableError::invalid("hand is already showing"));
    }
    seat.is_showing = true;
    let action = EventAction::HandShown {
        seat_number: seat.seat_number,
        cards: seat.cards.clone(),
    };
    Ok(snapshot.record(action))
}

fn end_hand(snapshot: &mut TableSnapshot, evaluator: &dyn HandEvaluator) -> TableResult<EventPayload> {
    if snapshot.phase() != Phase::Showdown {
        return Err(TableError::invalid("the hand can only end at showdown"));
    }

    let mut awards = Vec::new();
    let mut shown = Vec::new();
    let already_awarded = snapshot.game.as_ref().is_some_and(|game| game.pot_awarded);

    if !already_awarded {
        let button = snapshot
            .button_index()
            .ok_or_else(|| corrupt(snapshot, "no button seat"))?;
        let n = snapshot.seats.len();
        let board = snapshot
            .game
            .as_ref()
            .map(|game| game.community_cards.clone())
            .unwrap_or_default();

        // Clockwise from the seat after the button.
        let contenders: Vec<(usize, HandStrength)> = (1..=n)
            .map(|offset| (button + offset) % n)
            .filter(|&i| snapshot.seats[i].is_active)
            .map(|i| (i, evaluator.evaluate(&snapshot.seats[i].cards, &board)))
            .collect();
        let best = contenders
            .iter()
            .map(|(_, strength)| strength)
            .max()
            .cloned()
            .ok_or_else(|| corrupt(snapshot, "no contenders at showdown"))?;
        let winners: Vec<usize> = contenders
            .iter()
            .filter(|(_, strength)| *strength == best)
            .map(|(i, _)| *i)
            .collect();

        let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
        let pot = game.pot;
        game.pot_awarded = true;
        let count = Chips::try_from(winners.len()).unwrap_or(1).max(1);
        let share = pot / count;
        let remainder = pot % count;

        for (k, &i) in winners.iter().enumerate() {
            let amount = if k == 0 { share + remainder } else { share };
            let seat = &mut snapshot.seats[i];
            seat.win_amount = add_chips(seat.win_amount, amount)?;
            awards.push(PotAward {
                seat_number: seat.seat_number,
                amount,
            });
            if contenders.len() > 1 {
                seat.is_showing = true;
                shown.push(ShownHand {
                    seat_number: seat.seat_number,
                    cards: seat.cards.clone(),
                });
            }
        }
        info!(
            "Table {} showdown: {} wins with {}",
            snapshot.table.id,
            awards
                .iter()
                .map(|award| format!("seat {} ({})", award.seat_number, award.amount))
                .collect::<Vec<_>>()
                .join(", "),
            best.category
        );
    }

    let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
    game.state = Phase::Waiting;
    game.assigned_seat_id = None;
    game.bet_count = 0;
    game.required_bet_count = 0;
    for seat in &mut snapshot.seats {
        seat.reset_hand();
    }
    snapshot.table.is_joinable = true;

    let mut event = snapshot.record(EventAction::HandEnded { shown });
    event.awards = awards;
    Ok(event)
}

fn ensure_joinable(snapshot: &TableSnapshot) -> TableResult<()> {
    if !snapshot.table.is_joinable || snapshot.phase().is_hand_in_progress() {
        return Err(TableError::invalid("table is not joinable while a hand is in progress"));
    }
    Ok(())
}

fn join_seat(
    snapshot: &mut TableSnapshot,
    identity: &Identity,
    seat_number: SeatNumber,
    bots: &BotRegistry,
) -> TableResult<EventPayload> {
    if bots.is_bot(identity) {
        return Err(TableError::unauthorized("bot identities cannot join seats"));
    }
    ensure_joinable(snapshot)?;
    if seat_number >= snapshot.table.seat_count {
        return Err(TableError::Validation(format!(
            "seat {seat_number} does not exist"
        )));
    }
    if snapshot.seat_of(identity).is_some() {
        return Err(TableError::Conflict(format!("{identity} is already seated")));
    }
    let index = index_by_number(snapshot, seat_number)?;
    let seat = &mut snapshot.seats[index];
    if seat.is_occupied() {
        return Err(TableError::Conflict(format!("seat {seat_number} is taken")));
    }
    seat.occupant = Some(identity.clone());
    seat.reset_hand();

    info!("{} joined table {} at seat {}", identity, snapshot.table.id, seat_number);
    Ok(snapshot.record(EventAction::SeatJoined {
        seat_number,
        identity: identity.clone(),
    }))
}

fn seat_bot(
    snapshot: &mut TableSnapshot,
    seat_number: SeatNumber,
    bots: &BotRegistry,
) -> TableResult<EventPayload> {
    ensure_joinable(snapshot)?;
    let identity = bots
        .identity_for_seat(seat_number)
        .cloned()
        .ok_or_else(|| TableError::Validation(format!("no bot registered for seat {seat_number}")))?;
    if seat_number >= snapshot.table.seat_count {
        return Err(TableError::Validation(format!(
            "seat {seat_number} does not exist"
        )));
    }
    if snapshot.seat_of(&identity).is_some() {
        return Err(TableError::Conflict(format!("{identity} is already seated")));
    }
    let index = index_by_number(snapshot, seat_number)?;
    let seat = &mut snapshot.seats[index];
    if seat.is_occupied() {
        return Err(TableError::Conflict(format!("seat {seat_number} is taken")));
    }
    seat.occupant = Some(identity.clone());
    seat.reset_hand();

    info!("Seated {} at table {} seat {}", identity, snapshot.table.id, seat_number);
    Ok(snapshot.record(EventAction::BotSeated {
        seat_number,
        identity,
    }))
}

/// Clears the occupant of the seat at `index`, taking it out of any hand in
/// progress first.
fn remove_occupant(
    snapshot: &mut TableSnapshot,
    index: usize,
    kicked: bool,
) -> TableResult<EventPayload> {
    let seat_number = snapshot.seats[index].seat_number;
    let identity = snapshot.seats[index]
        .occupant
        .clone()
        .ok_or_else(|| TableError::invalid(format!("seat {seat_number} is empty")))?;

    let phase = snapshot.phase();
    let seat_id = snapshot.seats[index].id;
    let was_assigned = snapshot
        .game
        .as_ref()
        .is_some_and(|game| game.assigned_seat_id == Some(seat_id));
    let was_active = snapshot.seats[index].is_active;

    let seat = &mut snapshot.seats[index];
    let forfeited = std::mem::take(&mut seat.current_bet);
    seat.occupant = None;
    seat.reset_hand();
    if let Some(game) = snapshot.game.as_mut() {
        game.pot = add_chips(game.pot, forfeited)?;
    }

    let mut awards = Vec::new();
    if was_active && phase.is_hand_in_progress() {
        let pot_awarded = snapshot.game.as_ref().is_some_and(|game| game.pot_awarded);
        if snapshot.active_count() == 1 && !pot_awarded {
            awards = fold_to_one(snapshot)?;
        } else if phase == Phase::Betting && was_assigned {
            // Leaving on one's own turn counts as the fold for that turn.
            let game = snapshot.game.as_mut().ok_or_else(no_hand)?;
            game.bet_count += 1;
            awards = advance_after_bet(snapshot, index)?;
        } else if phase == Phase::DealHoleCards && was_assigned {
            advance_hole_card_assignment(snapshot, index)?;
        }
    }

    info!(
        "{} {} table {} seat {}",
        identity,
        if kicked { "was kicked from" } else { "left" },
        snapshot.table.id,
        seat_number
    );

    let mut event = snapshot.record(EventAction::SeatLeft {
        seat_number,
        identity,
        kicked,
    });
    event.awards = awards;
    Ok(event)
}

fn arm_quick_action(
    snapshot: &mut TableSnapshot,
    identity: &Identity,
    kind: QuickAction,
) -> TableResult<EventPayload> {
    let phase = snapshot.phase();
    if !phase.is_hand_in_progress() || phase == Phase::Showdown {
        return Err(no_hand());
    }
    let index = seated_index(snapshot, identity)?;
    let seat = &mut snapshot.seats[index];
    if !seat.is_active {
        return Err(TableError::invalid("you are not in this hand"));
    }
    seat.quick_action = Some(kind);
    let seat_number = seat.seat_number;
    Ok(snapshot.record(EventAction::QuickActionArmed { seat_number, kind }))
}

fn clear_quick_action(snapshot: &mut TableSnapshot, identity: &Identity) -> TableResult<EventPayload> {
    let index = seated_index(snapshot, identity)?;
    let seat = &mut snapshot.seats[index];
    if seat.quick_action.take().is_none() {
        return Err(TableError::invalid("no quick action armed"));
    }
    let seat_number = seat.seat_number;
    Ok(snapshot.record(EventAction::QuickActionCleared { seat_number }))
}

/// Executes armed quick actions for as long as the turn lands on a seat
/// that has one. Each armed action runs at most once.
fn run_quick_actions(snapshot: &mut TableSnapshot, events: &mut Vec<EventPayload>) -> TableResult<()> {
    while snapshot.phase() == Phase::Betting {
        let Some(index) = snapshot.assigned_index() else {
            break;
        };
        let Some(kind) = snapshot.seats[index].quick_action.take() else {
            break;
        };

        let checkable = snapshot.can_check(&snapshot.seats[index]);
        let bet = match kind {
            QuickAction::Fold => Some(Bet::Fold),
            QuickAction::Check => checkable.then_some(Bet::Check),
            QuickAction::CheckFold => Some(if checkable { Bet::Check } else { Bet::Fold }),
        };

        match bet {
            Some(bet) => events.push(place_bet(snapshot, index, bet, true)?),
            None => {
                let seat_number = snapshot.seats[index].seat_number;
                debug!(
                    "Table {} dropped quick check for seat {} facing a bet",
                    snapshot.table.id, seat_number
                );
                events.push(snapshot.record(EventAction::QuickActionCleared { seat_number }));
                break;
            }
        }
    }
    Ok(())
}
