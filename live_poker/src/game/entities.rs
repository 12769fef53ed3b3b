use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub type TableId = i64;
pub type SeatId = i64;
pub type GameId = i64;
pub type EventId = i64;
pub type SeatNumber = u8;

/// Chip amounts. Signed so they map straight onto `BIGINT` columns.
pub type Chips = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spade,
    Heart,
    Club,
    Diamond,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Club, Suit::Diamond];

    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Spade => 's',
            Self::Heart => 'h',
            Self::Club => 'c',
            Self::Diamond => 'd',
        }
    }

    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            's' => Some(Self::Spade),
            'h' => Some(Self::Heart),
            'c' => Some(Self::Club),
            'd' => Some(Self::Diamond),
            _ => None,
        }
    }
}

/// Card rank, ordered deuce-low, ace-high.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Numeric value, 2 through 14.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8 + 2
    }

    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Two => '2',
            Self::Three => '3',
            Self::Four => '4',
            Self::Five => '5',
            Self::Six => '6',
            Self::Seven => '7',
            Self::Eight => '8',
            Self::Nine => '9',
            Self::Ten => 'T',
            Self::Jack => 'J',
            Self::Queen => 'Q',
            Self::King => 'K',
            Self::Ace => 'A',
        }
    }

    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|rank| rank.code() == code)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid card code {0:?}")]
pub struct CardParseError(pub String);

/// A physical card. Its canonical text form is the two-character card code,
/// rank then suit (`"As"`, `"Td"`, `"2c"`).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.code(), self.suit.code())
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(rank), Some(suit), None) => Rank::from_code(rank)
                .zip(Suit::from_code(suit))
                .map(|(rank, suit)| Card { rank, suit })
                .ok_or_else(|| CardParseError(s.to_string())),
            _ => Err(CardParseError(s.to_string())),
        }
    }
}

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque caller identity: the session subject for humans, a registry
/// entry for bots.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Phase of the current hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Waiting,
    DealHoleCards,
    Betting,
    DealFlop,
    DealTurn,
    DealRiver,
    Showdown,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::DealHoleCards => "DEAL_HOLE_CARDS",
            Self::Betting => "BETTING",
            Self::DealFlop => "DEAL_FLOP",
            Self::DealTurn => "DEAL_TURN",
            Self::DealRiver => "DEAL_RIVER",
            Self::Showdown => "SHOWDOWN",
        }
    }

    /// Community cards on the board once this dealing phase completes.
    #[must_use]
    pub const fn community_target(self) -> Option<usize> {
        match self {
            Self::DealFlop => Some(3),
            Self::DealTurn => Some(4),
            Self::DealRiver => Some(5),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_hand_in_progress(self) -> bool {
        !matches!(self, Self::Waiting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(Self::Waiting),
            "DEAL_HOLE_CARDS" => Ok(Self::DealHoleCards),
            "BETTING" => Ok(Self::Betting),
            "DEAL_FLOP" => Ok(Self::DealFlop),
            "DEAL_TURN" => Ok(Self::DealTurn),
            "DEAL_RIVER" => Ok(Self::DealRiver),
            "SHOWDOWN" => Ok(Self::Showdown),
            other => Err(format!("unknown phase {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Empty,
    Waiting,
    Playing,
    Folded,
}

impl SeatStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Folded => "folded",
        }
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "waiting" => Ok(Self::Waiting),
            "playing" => Ok(Self::Playing),
            "folded" => Ok(Self::Folded),
            other => Err(format!("unknown seat status {other}")),
        }
    }
}

/// Betting action a player may pre-arm for their next turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Fold,
    Check,
    CheckFold,
}

impl QuickAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fold => "fold",
            Self::Check => "check",
            Self::CheckFold => "check_fold",
        }
    }
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fold" => Ok(Self::Fold),
            "check" => Ok(Self::Check),
            "check_fold" => Ok(Self::CheckFold),
            other => Err(format!("unknown quick action {other}")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub dealer_id: Identity,
    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Raw configured step; sanitized by the blind calculator.
    pub blind_step_seconds: Option<i64>,
    pub blind_timer_started_at: Option<DateTime<Utc>>,
    pub is_joinable: bool,
    pub seat_count: u8,
}

impl Table {
    #[must_use]
    pub fn is_dealer(&self, identity: &Identity) -> bool {
        &self.dealer_id == identity
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Seat {
    pub id: SeatId,
    pub table_id: TableId,
    pub seat_number: SeatNumber,
    pub occupant: Option<Identity>,
    pub cards: Vec<Card>,
    pub current_bet: Chips,
    pub is_active: bool,
    pub status: SeatStatus,
    pub win_amount: Chips,
    pub is_showing: bool,
    pub quick_action: Option<QuickAction>,
}

impl Seat {
    #[must_use]
    pub fn empty(id: SeatId, table_id: TableId, seat_number: SeatNumber) -> Self {
        Self {
            id,
            table_id,
            seat_number,
            occupant: None,
            cards: Vec::with_capacity(2),
            current_bet: 0,
            is_active: false,
            status: SeatStatus::Empty,
            win_amount: 0,
            is_showing: false,
            quick_action: None,
        }
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    #[must_use]
    pub fn is_occupied_by(&self, identity: &Identity) -> bool {
        self.occupant.as_ref() == Some(identity)
    }

    /// Clears everything belonging to a single hand.
    pub fn reset_hand(&mut self) {
        self.cards.clear();
        self.current_bet = 0;
        self.is_active = false;
        self.win_amount = 0;
        self.is_showing = false;
        self.quick_action = None;
        self.status = if self.is_occupied() {
            SeatStatus::Waiting
        } else {
            SeatStatus::Empty
        };
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Game {
    /// `None` until the store has persisted a freshly started hand.
    pub id: Option<GameId>,
    pub table_id: TableId,
    pub state: Phase,
    pub assigned_seat_id: Option<SeatId>,
    pub dealer_button_seat_id: Option<SeatId>,
    pub community_cards: Vec<Card>,
    pub bet_count: u32,
    pub required_bet_count: u32,
    pub pot: Chips,
    /// Set once the pot has been handed out for this hand.
    pub pot_awarded: bool,
    pub created_at: DateTime<Utc>,
}
