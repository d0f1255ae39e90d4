//! Card documents
//!
//! A card document is an open-schema JSON object holding the style and
//! content of one card (colors, sizes, fonts, title text, image reference,
//! text offsets). Nothing is required: renderers apply their own defaults,
//! so an absent field and an unset field mean the same thing.
//!
//! Field names are the camelCase keys other collaborators (grid view,
//! print view) read from the persisted `cards` map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card_id::{CardId, Suit};

/// Field names used in card documents
pub mod fields {
    pub const BG_COLOR: &str = "bgColor";
    pub const BORDER_COLOR: &str = "borderColor";
    pub const BORDER_WIDTH: &str = "borderWidth";
    pub const BORDER_RADIUS: &str = "borderRadius";
    pub const TEXT_COLOR: &str = "textColor";
    pub const TEXT_SHADOW: &str = "textShadow";
    pub const FONT_FAMILY: &str = "fontFamily";
    pub const FONT_SIZE: &str = "fontSize";
    pub const SYMBOL_SIZE: &str = "symbolSize";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const TEXT_ALIGN: &str = "textAlign";
    pub const VERTICAL_ALIGN: &str = "verticalAlign";
    pub const ACCENT_COLOR: &str = "accentColor";

    pub const IMAGE: &str = "image";
    pub const NAME: &str = "name";
    pub const IMAGE_SCALE: &str = "imageScale";
    pub const OPACITY: &str = "opacity";
    pub const TITLE: &str = "title";
    pub const SUBTITLE: &str = "subtitle";
    pub const TITLE_POSITION: &str = "titlePosition";
    pub const SUBTITLE_POSITION: &str = "subtitlePosition";
}

/// 2-D offset of a draggable text block, relative to its default anchor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextPosition {
    pub x: f64,
    pub y: f64,
}

/// Style/content record for a single card or the shared card back
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardDocument(Map<String, Value>);

/// All stored card documents, keyed by card identity
pub type DeckDocumentMap = BTreeMap<CardId, CardDocument>;

impl CardDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from `(field, value)` pairs
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The default shared card back
    pub fn default_card_back() -> Self {
        Self::from_pairs([
            (fields::BG_COLOR, Value::from("#2D2A4A")),
            (fields::BORDER_COLOR, Value::from("#FF7E67")),
            (fields::BORDER_WIDTH, Value::from(4)),
            (fields::BORDER_RADIUS, Value::from(12)),
        ])
    }

    /// Patch restoring the default palette of a card
    pub fn default_colors() -> Self {
        Self::from_pairs([
            (fields::BG_COLOR, Value::from("#2D2A4A")),
            (fields::BORDER_COLOR, Value::from("#FF7E67")),
            (fields::ACCENT_COLOR, Value::from("#89DAFF")),
            (fields::TEXT_COLOR, Value::from("#ffffff")),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Overlay every field of `patch` onto this document
    ///
    /// Shallow and last-write-wins: nested values such as positions are
    /// replaced whole, and fields absent from the patch are untouched.
    pub fn merge(&mut self, patch: &CardDocument) {
        for (field, value) in &patch.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Return a copy of this document with `patch` merged on top
    pub fn merged(&self, patch: &CardDocument) -> Self {
        let mut doc = self.clone();
        doc.merge(patch);
        doc
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn number_field(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn position_field(&self, field: &str) -> Option<TextPosition> {
        self.0
            .get(field)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn image(&self) -> Option<&str> {
        self.str_field(fields::IMAGE)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field(fields::TITLE)
    }
}

impl From<Map<String, Value>> for CardDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Documents belonging to one suit, sorted A, 2..10, J, Q, K
pub fn suit_listing(cards: &DeckDocumentMap, suit: Suit) -> Vec<(CardId, &CardDocument)> {
    // BTreeMap order is already suit-major and rank ascending
    cards
        .iter()
        .filter(|(id, _)| id.suit == suit)
        .map(|(id, doc)| (*id, doc))
        .collect()
}
