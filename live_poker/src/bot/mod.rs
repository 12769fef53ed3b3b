//! Bot seat occupants.
//!
//! Bots are ordinary seat occupants whose identities come from an injected
//! [`BotRegistry`]. They never act on their own: an external trigger calls
//! the table manager's bot turn, which asks [`choose_action`] what the bot
//! holding the turn should do and runs it through the normal state machine.

pub mod decision;
pub mod registry;

pub use decision::choose_action;
pub use registry::{BotRegistry, DEFAULT_BOT_PREFIX};
