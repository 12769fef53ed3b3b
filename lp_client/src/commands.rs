use live_poker::{
    TableAction,
    game::entities::{Card, Chips, QuickAction, SeatNumber},
};
use std::fmt;

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Raise amount is not a positive whole number.
    InvalidRaiseAmount(String),
    /// Seat argument is not a seat number.
    InvalidSeat(String),
    /// Card argument is not a two-character code like `As`.
    InvalidCard(String),
    /// Quick action is not one of `fold`, `check`, `check_fold`.
    InvalidQuickAction(String),
    /// Command needs an argument that was not given.
    MissingArgument(&'static str),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRaiseAmount(value) => write!(
                f,
                "Invalid raise amount '{}'. Must be a positive number (e.g., 'raise 100')",
                value
            ),
            Self::InvalidSeat(value) => {
                write!(f, "Invalid seat '{}'. Seats are numbered from 0", value)
            }
            Self::InvalidCard(value) => {
                write!(f, "Invalid card '{}'. Use rank then suit (e.g., 'deal As')", value)
            }
            Self::InvalidQuickAction(value) => write!(
                f,
                "Invalid quick action '{}'. Use fold, check or check_fold",
                value
            ),
            Self::MissingArgument(usage) => write!(f, "Missing argument. Usage: {}", usage),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP_TEXT: &str = "\
Player:  join SEAT | leave | check | call | raise AMOUNT | fold | show
         arm fold|check|check_fold | clear
Dealer:  start | deal CARD | end | reset | kick SEAT | bot SEAT
Other:   view | help | quit";

/// Parse a command line into a table action.
///
/// # Examples
///
/// ```
/// use live_poker::TableAction;
/// use lp_client::commands::parse_command;
///
/// assert_eq!(parse_command("call"), Ok(TableAction::Call));
/// assert_eq!(parse_command("raise 100"), Ok(TableAction::Raise { amount: 100 }));
/// assert_eq!(parse_command("join 3"), Ok(TableAction::JoinSeat { seat_number: 3 }));
/// ```
pub fn parse_command(input: &str) -> Result<TableAction, ParseError> {
    let trimmed = input.trim();

    match trimmed {
        "call" => return Ok(TableAction::Call),
        "check" => return Ok(TableAction::Check),
        "fold" => return Ok(TableAction::Fold),
        "show" => return Ok(TableAction::VolunteerShow),
        "leave" => return Ok(TableAction::LeaveSeat),
        "clear" => return Ok(TableAction::ClearQuickAction),
        "start" => return Ok(TableAction::StartGame),
        "end" => return Ok(TableAction::EndHand),
        "reset" => return Ok(TableAction::ResetTable),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    let argument = parts.get(1).copied();
    match parts.first() {
        Some(&"raise") => {
            let value = argument.ok_or(ParseError::MissingArgument("raise AMOUNT"))?;
            let amount = value
                .parse::<Chips>()
                .ok()
                .filter(|amount| *amount > 0)
                .ok_or_else(|| ParseError::InvalidRaiseAmount(value.to_string()))?;
            Ok(TableAction::Raise { amount })
        }
        Some(&"join") => Ok(TableAction::JoinSeat {
            seat_number: parse_seat(argument, "join SEAT")?,
        }),
        Some(&"kick") => Ok(TableAction::KickSeat {
            seat_number: parse_seat(argument, "kick SEAT")?,
        }),
        Some(&"bot") => Ok(TableAction::SeatBot {
            seat_number: parse_seat(argument, "bot SEAT")?,
        }),
        Some(&"deal") => {
            let value = argument.ok_or(ParseError::MissingArgument("deal CARD"))?;
            let card = value
                .parse::<Card>()
                .map_err(|_| ParseError::InvalidCard(value.to_string()))?;
            Ok(TableAction::DealCard { card })
        }
        Some(&"arm") => {
            let value = argument.ok_or(ParseError::MissingArgument("arm fold|check|check_fold"))?;
            let kind = value
                .parse::<QuickAction>()
                .map_err(|_| ParseError::InvalidQuickAction(value.to_string()))?;
            Ok(TableAction::ArmQuickAction { kind })
        }
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

fn parse_seat(argument: Option<&str>, usage: &'static str) -> Result<SeatNumber, ParseError> {
    let value = argument.ok_or(ParseError::MissingArgument(usage))?;
    value
        .parse::<SeatNumber>()
        .map_err(|_| ParseError::InvalidSeat(value.to_string()))
}
