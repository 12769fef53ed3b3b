//! Scanner barcode format.
//!
//! A barcode is four ASCII digits: one suit digit followed by a three-digit
//! rank code.
//!
//! | suit digit | suit | | rank code | rank |
//! |---|---|---|---|---|
//! | 1 | s | | 010 | A |
//! | 2 | h | | 020..090 | 2..9 |
//! | 3 | c | | 100 | T |
//! | 4 | d | | 110 / 120 / 130 | J / Q / K |

use crate::{
    errors::DeviceRejection,
    game::entities::{Card, Rank, Suit},
};

const BARCODE_LEN: usize = 4;

fn suit_from_digit(digit: u8) -> Option<Suit> {
    match digit {
        b'1' => Some(Suit::Spade),
        b'2' => Some(Suit::Heart),
        b'3' => Some(Suit::Club),
        b'4' => Some(Suit::Diamond),
        _ => None,
    }
}

const fn suit_digit(suit: Suit) -> char {
    match suit {
        Suit::Spade => '1',
        Suit::Heart => '2',
        Suit::Club => '3',
        Suit::Diamond => '4',
    }
}

fn rank_from_code(code: &[u8]) -> Option<Rank> {
    let rank = match code {
        b"010" => Rank::Ace,
        b"020" => Rank::Two,
        b"030" => Rank::Three,
        b"040" => Rank::Four,
        b"050" => Rank::Five,
        b"060" => Rank::Six,
        b"070" => Rank::Seven,
        b"080" => Rank::Eight,
        b"090" => Rank::Nine,
        b"100" => Rank::Ten,
        b"110" => Rank::Jack,
        b"120" => Rank::Queen,
        b"130" => Rank::King,
        _ => return None,
    };
    Some(rank)
}

const fn rank_code(rank: Rank) -> &'static str {
    match rank {
        Rank::Ace => "010",
        Rank::Two => "020",
        Rank::Three => "030",
        Rank::Four => "040",
        Rank::Five => "050",
        Rank::Six => "060",
        Rank::Seven => "070",
        Rank::Eight => "080",
        Rank::Nine => "090",
        Rank::Ten => "100",
        Rank::Jack => "110",
        Rank::Queen => "120",
        Rank::King => "130",
    }
}

/// Decodes a scanner barcode into a card.
pub fn decode_barcode(barcode: &str) -> Result<Card, DeviceRejection> {
    let bytes = barcode.as_bytes();
    if bytes.len() != BARCODE_LEN || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(DeviceRejection::BadBarcode);
    }
    let suit = suit_from_digit(bytes[0]).ok_or(DeviceRejection::BadBarcode)?;
    let rank = rank_from_code(&bytes[1..]).ok_or(DeviceRejection::BadBarcode)?;
    Ok(Card::new(rank, suit))
}

/// The barcode printed on `card`.
#[must_use]
pub fn encode_barcode(card: Card) -> String {
    format!("{}{}", suit_digit(card.suit), rank_code(card.rank))
}
