//! Batch image assignment
//!
//! Images picked in bulk are dealt onto cards in deck order: the first 13
//! go to hearts A..K, the next 13 to diamonds, and so on. A 53rd image
//! wraps back to hearts-A.

use serde_json::Value;

use crate::card_id::{CardId, Rank, Suit};
use crate::document::{fields, CardDocument};

/// An image reference and the card it was dealt to
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAssignment {
    pub card: CardId,
    /// Reference stored in the card's `image` field
    pub image: String,
    /// Display name (usually the file name) stored in `name`
    pub name: String,
}

impl ImageAssignment {
    /// Patch writing this image into a card document
    pub fn patch(&self) -> CardDocument {
        CardDocument::from_pairs([
            (fields::IMAGE, Value::from(self.image.clone())),
            (fields::NAME, Value::from(self.name.clone())),
        ])
    }
}

/// Card receiving the image at position `index`
pub fn card_for_index(index: usize) -> CardId {
    let ranks = Rank::ALL.len();
    let suit = Suit::ALL[(index / ranks) % Suit::ALL.len()];
    let rank = Rank::ALL[index % ranks];
    CardId::new(suit, rank)
}

/// Deal `(image, name)` pairs onto cards in order
pub fn assign<I, S, N>(images: I) -> Vec<ImageAssignment>
where
    I: IntoIterator<Item = (S, N)>,
    S: Into<String>,
    N: Into<String>,
{
    images
        .into_iter()
        .enumerate()
        .map(|(index, (image, name))| ImageAssignment {
            card: card_for_index(index),
            image: image.into(),
            name: name.into(),
        })
        .collect()
}
