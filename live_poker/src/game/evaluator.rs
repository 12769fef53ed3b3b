//! Hand-strength capability used at showdown.
//!
//! The table engine only ever compares [`HandStrength`] values; how they are
//! produced belongs to whatever [`HandEvaluator`] the manager is built with.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::Card;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
        };
        write!(f, "{repr}")
    }
}

/// Totally ordered hand strength. Category dominates, then the kicker
/// values in significance order.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandStrength {
    pub category: HandCategory,
    pub values: Vec<u8>,
}

pub trait HandEvaluator: Send + Sync {
    /// Strength of the best hand `hole` can make with `board`.
    fn evaluate(&self, hole: &[Card], board: &[Card]) -> HandStrength;
}

/// Best-five-of-seven evaluator.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn evaluate(&self, hole: &[Card], board: &[Card]) -> HandStrength {
        let cards: Vec<Card> = hole.iter().chain(board).copied().collect();
        let k = cards.len().min(5);

        let mut best: Option<HandStrength> = None;
        for_each_combination(&cards, k, &mut |hand| {
            let strength = evaluate_five(hand);
            if best.as_ref().is_none_or(|b| strength > *b) {
                best = Some(strength);
            }
        });

        best.unwrap_or(HandStrength {
            category: HandCategory::HighCard,
            values: Vec::new(),
        })
    }
}

fn for_each_combination(cards: &[Card], k: usize, f: &mut dyn FnMut(&[Card])) {
    fn recurse(
        cards: &[Card],
        k: usize,
        start: usize,
        chosen: &mut Vec<Card>,
        f: &mut dyn FnMut(&[Card]),
    ) {
        if chosen.len() == k {
            f(chosen);
            return;
        }
        for i in start..cards.len() {
            if cards.len() - i < k - chosen.len() {
                break;
            }
            chosen.push(cards[i]);
            recurse(cards, k, i + 1, chosen, f);
            chosen.pop();
        }
    }

    let mut chosen = Vec::with_capacity(k);
    recurse(cards, k, 0, &mut chosen, f);
}

fn evaluate_five(hand: &[Card]) -> HandStrength {
    let mut values: Vec<u8> = hand.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    // (count, value), most significant group first.
    let mut groups: Vec<(usize, u8)> = Vec::with_capacity(5);
    for &value in &values {
        match groups.iter_mut().find(|(_, v)| *v == value) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, value)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));
    let Some(&(largest_group, _)) = groups.first() else {
        return HandStrength {
            category: HandCategory::HighCard,
            values,
        };
    };
    let grouped: Vec<u8> = groups
        .iter()
        .flat_map(|&(count, value)| std::iter::repeat_n(value, count))
        .collect();

    let is_flush = hand.len() == 5 && hand.iter().all(|c| c.suit == hand[0].suit);
    let straight_high = straight_high(&values);

    let (category, values) = match (straight_high, is_flush, largest_group, groups.get(1)) {
        (Some(high), true, _, _) => (HandCategory::StraightFlush, vec![high]),
        (_, _, 4, _) => (HandCategory::FourOfAKind, grouped),
        (_, _, 3, Some((2, _))) => (HandCategory::FullHouse, grouped),
        (_, true, _, _) => (HandCategory::Flush, values),
        (Some(high), false, _, _) => (HandCategory::Straight, vec![high]),
        (_, _, 3, _) => (HandCategory::ThreeOfAKind, grouped),
        (_, _, 2, Some((2, _))) => (HandCategory::TwoPair, grouped),
        (_, _, 2, _) => (HandCategory::OnePair, grouped),
        _ => (HandCategory::HighCard, values),
    };

    HandStrength { category, values }
}

/// High card of a five-card straight, treating A-2-3-4-5 as five-high.
fn straight_high(sorted_desc: &[u8]) -> Option<u8> {
    if sorted_desc.len() != 5 {
        return None;
    }
    let distinct = sorted_desc.windows(2).all(|w| w[0] != w[1]);
    if !distinct {
        return None;
    }
    if sorted_desc[0] - sorted_desc[4] == 4 {
        return Some(sorted_desc[0]);
    }
    if sorted_desc == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(codes: &str) -> Vec<Card> {
        codes.split_whitespace().map(|c| c.parse().unwrap()).collect()
    }

    fn strength(hole: &str, board: &str) -> HandStrength {
        StandardEvaluator.evaluate(&cards(hole), &cards(board))
    }

    #[test]
    fn test_categories() {
        let board = "2c 7d 9h Js Kd";
        assert_eq!(strength("3s 4h", board).category, HandCategory::HighCard);
        assert_eq!(strength("Kh 4h", board).category, HandCategory::OnePair);
        assert_eq!(strength("Kh Jh", board).category, HandCategory::TwoPair);
        assert_eq!(strength("Kh Ks", board).category, HandCategory::ThreeOfAKind);
        assert_eq!(strength("Th 8s", board).category, HandCategory::Straight);
        assert_eq!(
            strength("Ad 3d", "2d 7d 9h Js Kd").category,
            HandCategory::Flush
        );
        assert_eq!(
            strength("Kh Ks", "Kc 7d 7h Js 2d").category,
            HandCategory::FullHouse
        );
        assert_eq!(
            strength("7s 7c", "Kc 7d 7h Js 2d").category,
            HandCategory::FourOfAKind
        );
        assert_eq!(
            strength("8d Td", "2c 7d 9d Jd Kh").category,
            HandCategory::StraightFlush
        );
    }

    #[test]
    fn test_wheel_is_five_high() {
        let wheel = strength("As 2d", "3c 4h 5s Kd Qc");
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.values, vec![5]);

        let six_high = strength("6s 2d", "3c 4h 5s Kd Qc");
        assert!(six_high > wheel);
    }

    #[test]
    fn test_kickers_break_ties() {
        let board = "Ah Ad 7c 5s 2h";
        let king_kicker = strength("Ks 3c", board);
        let queen_kicker = strength("Qs 3c", board);
        assert_eq!(king_kicker.category, HandCategory::OnePair);
        assert!(king_kicker > queen_kicker);
    }

    #[test]
    fn test_board_plays_for_both() {
        let board = "Ts Js Qs Ks As";
        assert_eq!(strength("2c 3d", board), strength("4c 5d", board));
    }
}
