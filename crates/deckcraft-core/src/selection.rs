//! Active card selection

use crate::card_id::{CardId, Rank, Suit};

/// Which card the editor is working on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    current: CardId,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            current: CardId::new(Suit::Hearts, Rank::Ace),
        }
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> CardId {
        self.current
    }

    pub fn select(&mut self, id: CardId) {
        self.current = id;
    }

    /// Change suit, keeping the rank
    pub fn select_suit(&mut self, suit: Suit) {
        self.current.suit = suit;
    }

    /// Change rank, keeping the suit
    pub fn select_rank(&mut self, rank: Rank) {
        self.current.rank = rank;
    }

    pub fn next_suit(&mut self) -> Suit {
        self.current.suit = self.current.suit.next();
        self.current.suit
    }

    pub fn prev_suit(&mut self) -> Suit {
        self.current.suit = self.current.suit.prev();
        self.current.suit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_ace_of_hearts() {
        assert_eq!(Selection::new().current().to_string(), "hearts-A");
    }

    #[test]
    fn test_partial_selection_keeps_other_half() {
        let mut selection = Selection::new();
        selection.select_rank(Rank::Queen);
        selection.select_suit(Suit::Clubs);
        assert_eq!(selection.current().to_string(), "clubs-Q");

        assert_eq!(selection.next_suit(), Suit::Spades);
        assert_eq!(selection.next_suit(), Suit::Hearts);
        assert_eq!(selection.prev_suit(), Suit::Spades);
        assert_eq!(selection.current().rank, Rank::Queen);
    }
}
