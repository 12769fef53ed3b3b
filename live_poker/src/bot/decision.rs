//! What a bot does when the turn reaches it.

use crate::game::{
    entities::{Identity, Phase},
    state_machine::{TableAction, TableSnapshot},
};

use super::registry::BotRegistry;

/// The bot whose turn it is and the action it takes: check when legal,
/// otherwise fold. `None` when betting is closed or a human holds the turn.
#[must_use]
pub fn choose_action(snapshot: &TableSnapshot, bots: &BotRegistry) -> Option<(Identity, TableAction)> {
    if snapshot.phase() != Phase::Betting {
        return None;
    }
    let seat = snapshot.assigned_seat()?;
    let identity = seat.occupant.as_ref().filter(|id| bots.is_bot(id))?;

    let action = if snapshot.can_check(seat) {
        TableAction::Check
    } else {
        TableAction::Fold
    };
    Some((identity.clone(), action))
}
