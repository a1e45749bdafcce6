//! Cards and the dealing deck.

use core::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub type Rank = u8; // 2..14 (A=14)

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs = 0,
    Diamonds = 1,
    Hearts = 2,
    Spades = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_char(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }

    pub fn from_char(value: char) -> Option<Self> {
        match value {
            'c' => Some(Suit::Clubs),
            'd' => Some(Suit::Diamonds),
            'h' => Some(Suit::Hearts),
            's' => Some(Suit::Spades),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank, // 2..14
    pub suit: Suit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid card notation: {0}")]
pub struct ParseCardError(String);

fn rank_char(rank: Rank) -> char {
    match rank {
        2..=9 => (b'0' + rank) as char,
        10 => 'T',
        11 => 'J',
        12 => 'Q',
        13 => 'K',
        14 => 'A',
        _ => '?',
    }
}

fn rank_from_char(value: char) -> Option<Rank> {
    match value {
        '2'..='9' => Some(value as u8 - b'0'),
        'T' => Some(10),
        'J' => Some(11),
        'Q' => Some(12),
        'K' => Some(13),
        'A' => Some(14),
        _ => None,
    }
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        debug_assert!((2..=14).contains(&rank));
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", rank_char(self.rank), self.suit.as_char())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(r), Some(c), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ParseCardError(s.to_string()));
        };
        let rank = rank_from_char(r).ok_or_else(|| ParseCardError(s.to_string()))?;
        let suit = Suit::from_char(c).ok_or_else(|| ParseCardError(s.to_string()))?;
        Ok(Card { rank, suit })
    }
}

// Wire and persisted form is the two-character notation ("Ah", "Td").
impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Deterministic sort-by-rank-desc, then suit-desc.
pub fn sort_desc(cards: &mut [Card]) {
    cards.sort_by(|a, b| match b.rank.cmp(&a.rank) {
        Ordering::Equal => b.suit.cmp(&a.suit),
        o => o,
    });
}

/// An ordered 52-card deck, consumed from the top.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A fresh unshuffled deck in canonical suit-major order.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 2..=14 {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut deck = Self::new();
        deck.cards.shuffle(rng);
        deck
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Take the top card, if any remain.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Take `n` cards from the top, or nothing if the deck is short.
    pub fn draw_many(&mut self, n: usize) -> Option<Vec<Card>> {
        if self.cards.len() < n {
            return None;
        }
        let at = self.cards.len() - n;
        let mut drawn = self.cards.split_off(at);
        drawn.reverse();
        Some(drawn)
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = Deck::new();
        let unique: HashSet<_> = (0..52)
            .scan(deck, |d, _| d.draw())
            .map(|c| (c.rank, c.suit))
            .collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn shuffled_deck_still_has_every_card() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::shuffled(&mut rng);
        let mut seen = HashSet::new();
        while let Some(card) = deck.draw() {
            assert!(seen.insert(card.to_string()));
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn draw_many_preserves_top_order() {
        let mut a = Deck::new();
        let mut b = a.clone();
        let many = a.draw_many(3).unwrap();
        let singles = [b.draw().unwrap(), b.draw().unwrap(), b.draw().unwrap()];
        assert_eq!(many, singles);
    }

    #[test]
    fn display_round_trips() {
        for s in ["Ah", "Td", "2c", "Ks", "9s"] {
            let card: Card = s.parse().unwrap();
            assert_eq!(card.to_string(), s);
        }
        assert!("1h".parse::<Card>().is_err());
        assert!("Ax".parse::<Card>().is_err());
        assert!("Ahh".parse::<Card>().is_err());
    }
}
