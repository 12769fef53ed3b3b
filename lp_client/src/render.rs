//! Plain-text rendering of events and table views.

use std::fmt::Write;

use live_poker::{
    GameEvent, TableView,
    events::{BetKind, EventAction},
    game::entities::Card,
};

fn cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per log entry.
pub fn describe_event(event: &GameEvent) -> String {
    let payload = &event.payload;
    let what = match &payload.action {
        EventAction::TableReset => "Table reset".to_string(),
        EventAction::SeatJoined {
            seat_number,
            identity,
        } => format!("{identity} sat down in seat {seat_number}"),
        EventAction::SeatLeft {
            seat_number,
            identity,
            kicked,
        } => {
            if *kicked {
                format!("{identity} was removed from seat {seat_number}")
            } else {
                format!("{identity} left seat {seat_number}")
            }
        }
        EventAction::BotSeated {
            seat_number,
            identity,
        } => format!("Bot {identity} seated in seat {seat_number}"),
        EventAction::GameStarted {
            button_seat,
            small_blind_seat,
            big_blind_seat,
            small_blind,
            big_blind,
        } => format!(
            "New hand: button {button_seat}, blinds {small_blind}/{big_blind} \
             (seats {small_blind_seat}/{big_blind_seat})"
        ),
        EventAction::HoleCardDealt { seat_number } => {
            format!("Hole card dealt to seat {seat_number}")
        }
        EventAction::CommunityCardDealt { card } => format!("Board card {card}"),
        EventAction::PlayerActed {
            seat_number,
            bet,
            amount,
            automatic,
        } => {
            let verb = match bet {
                BetKind::Check => "checks".to_string(),
                BetKind::Call => format!("calls ({amount})"),
                BetKind::Raise => format!("raises to {amount}"),
                BetKind::Fold => "folds".to_string(),
            };
            let auto = if *automatic { " [quick action]" } else { "" };
            format!("Seat {seat_number} {verb}{auto}")
        }
        EventAction::HandShown { seat_number, cards: shown } => {
            format!("Seat {seat_number} shows {}", cards(shown))
        }
        EventAction::HandEnded { shown } => {
            let mut line = "Hand over".to_string();
            for hand in shown {
                let _ = write!(line, "; seat {} shows {}", hand.seat_number, cards(&hand.cards));
            }
            line
        }
        EventAction::QuickActionArmed { seat_number, kind } => {
            format!("Seat {seat_number} armed {}", kind.as_str())
        }
        EventAction::QuickActionCleared { seat_number } => {
            format!("Seat {seat_number} cleared its quick action")
        }
    };

    let mut line = format!("#{} [{}] {}", event.id, payload.phase, what);
    for award in &payload.awards {
        let _ = write!(line, "; seat {} wins {}", award.seat_number, award.amount);
    }
    line
}

/// Multi-line summary of a table as one viewer sees it.
pub fn render_view(view: &TableView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (table {}) - {} - blinds {}/{} (level {})",
        view.name,
        view.table_id,
        view.phase,
        view.blinds.small_blind,
        view.blinds.big_blind,
        view.blinds.level
    );

    if let Some(game) = &view.game {
        let _ = writeln!(
            out,
            "Board: {}  Pot: {}  To act: {}",
            if game.community_cards.is_empty() {
                "-".to_string()
            } else {
                cards(&game.community_cards)
            },
            game.pot,
            game.assigned_seat
                .map_or_else(|| "-".to_string(), |seat| format!("seat {seat}"))
        );
    }

    for seat in &view.seats {
        let Some(occupant) = &seat.occupant else {
            let _ = writeln!(out, "  {}. (empty)", seat.seat_number);
            continue;
        };

        let hole = match &seat.cards {
            Some(hole) if !hole.is_empty() => cards(hole),
            _ if seat.card_count == 0 => "-".to_string(),
            _ => vec!["??"; seat.card_count].join(" "),
        };
        let mut markers = Vec::new();
        if view.viewer_seat == Some(seat.seat_number) {
            markers.push("you");
        }
        if seat.is_bot {
            markers.push("bot");
        }
        if seat.is_showing {
            markers.push("showing");
        }
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!(" ({})", markers.join(", "))
        };

        let _ = writeln!(
            out,
            "  {}. {}{} - {} - bet {} - {}",
            seat.seat_number,
            occupant,
            markers,
            seat.status.as_str(),
            seat.current_bet,
            hole
        );
    }
    out
}
