//! Card identity
//!
//! A card is identified by its suit and rank. The textual form
//! `"{suit}-{value}"` (e.g. `hearts-A`, `spades-10`) is what the
//! persisted `cards` map uses as keys, so it must never change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing card identities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardIdError {
    #[error("Unknown suit: '{0}' (expected hearts, diamonds, clubs or spades)")]
    UnknownSuit(String),

    #[error("Unknown card value: '{0}' (expected A, 2-10, J, Q or K)")]
    UnknownRank(String),

    #[error("Invalid card id '{0}': expected '<suit>-<value>', e.g. 'hearts-A'")]
    Malformed(String),
}

/// One of the four suits, in deck order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn as_str(&self) -> &'static str {
        match self {
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
            Suit::Clubs => "clubs",
            Suit::Spades => "spades",
        }
    }

    /// Unicode pip for this suit
    pub fn symbol(&self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }

    pub fn is_red(&self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }

    /// Capitalized name for display ("Hearts")
    pub fn title(&self) -> &'static str {
        match self {
            Suit::Hearts => "Hearts",
            Suit::Diamonds => "Diamonds",
            Suit::Clubs => "Clubs",
            Suit::Spades => "Spades",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// The following suit, wrapping from spades back to hearts
    pub fn next(&self) -> Suit {
        Suit::ALL[(self.index() + 1) % Suit::ALL.len()]
    }

    /// The preceding suit, wrapping from hearts back to spades
    pub fn prev(&self) -> Suit {
        Suit::ALL[(self.index() + Suit::ALL.len() - 1) % Suit::ALL.len()]
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suit {
    type Err = CardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suit::ALL
            .into_iter()
            .find(|suit| suit.as_str() == s)
            .ok_or_else(|| CardIdError::UnknownSuit(s.to_string()))
    }
}

/// Card value, ace low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Ace,
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
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
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
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = CardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::ALL
            .into_iter()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| CardIdError::UnknownRank(s.to_string()))
    }
}

/// Composite key for one of the 52 cards
///
/// Ordering is suit-major (hearts, diamonds, clubs, spades) and then by
/// rank from ace to king, which matches the printed per-suit listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId {
    pub suit: Suit,
    pub rank: Rank,
}

impl CardId {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// All 52 card ids in deck order
    pub fn all() -> impl Iterator<Item = CardId> {
        Suit::ALL
            .into_iter()
            .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| CardId::new(suit, rank)))
    }

    /// Archive entry stem, e.g. `A_of_hearts`
    pub fn export_name(&self) -> String {
        format!("{}_of_{}", self.rank, self.suit)
    }

    /// Download name for a single exported card, e.g. `My Deck_A_of_hearts`
    pub fn export_filename(&self, deck_name: &str) -> String {
        format!("{}_{}", deck_name, self.export_name())
    }

    /// Human-readable label, e.g. `A of hearts`
    pub fn label(&self) -> String {
        format!("{} of {}", self.rank, self.suit)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.suit, self.rank)
    }
}

impl FromStr for CardId {
    type Err = CardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (suit, rank) = s
            .split_once('-')
            .ok_or_else(|| CardIdError::Malformed(s.to_string()))?;
        Ok(CardId::new(suit.parse()?, rank.parse()?))
    }
}

impl Serialize for CardId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
