//! Synthetic seat occupants.

use std::collections::HashSet;

use crate::game::{
    constants::MAX_SEATS,
    entities::{Identity, SeatNumber},
};

pub const DEFAULT_BOT_PREFIX: &str = "bot-";

/// One bot identity per seat index, `{prefix}{seat}`.
///
/// Built once at startup and shared; membership is a hash lookup.
#[derive(Clone, Debug)]
pub struct BotRegistry {
    identities: Vec<Identity>,
    members: HashSet<Identity>,
}

impl BotRegistry {
    pub fn new(prefix: &str, seat_count: u8) -> Self {
        let identities: Vec<Identity> = (0..seat_count)
            .map(|seat| Identity::new(format!("{prefix}{seat}")))
            .collect();
        let members = identities.iter().cloned().collect();
        Self {
            identities,
            members,
        }
    }

    #[must_use]
    pub fn is_bot(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    /// Same check for a raw session subject.
    #[must_use]
    pub fn is_bot_subject(&self, subject: &str) -> bool {
        self.members.contains(&Identity::from(subject))
    }

    #[must_use]
    pub fn identity_for_seat(&self, seat_number: SeatNumber) -> Option<&Identity> {
        self.identities.get(usize::from(seat_number))
    }

    #[must_use]
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }
}

impl Default for BotRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_PREFIX, MAX_SEATS)
    }
}
