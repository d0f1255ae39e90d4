//! "Apply to all" style broadcast
//!
//! Copies a fixed allow-list of style fields from one card to every other
//! card present in the map. Content that identifies a card (image, title,
//! subtitle, text positions) is never in the list, so it survives a
//! broadcast untouched. New style fields are only broadcast once they are
//! added to [`BROADCAST_FIELDS`].

use crate::card_id::CardId;
use crate::document::{fields, CardDocument, DeckDocumentMap};

/// Style fields copied by [`apply_to_all`]
pub const BROADCAST_FIELDS: [&str; 14] = [
    fields::BG_COLOR,
    fields::BORDER_COLOR,
    fields::BORDER_WIDTH,
    fields::BORDER_RADIUS,
    fields::TEXT_COLOR,
    fields::TEXT_SHADOW,
    fields::FONT_FAMILY,
    fields::FONT_SIZE,
    fields::SYMBOL_SIZE,
    fields::BOLD,
    fields::ITALIC,
    fields::TEXT_ALIGN,
    fields::VERTICAL_ALIGN,
    fields::ACCENT_COLOR,
];

/// Produce a new map where every card except `source` carries the source's
/// broadcast fields
///
/// A field the source does not set is removed from the targets, so after
/// the call targets and source agree on all fourteen fields. A missing
/// source card behaves like an empty document. Only cards already present
/// in the map are touched.
pub fn apply_to_all(source: CardId, cards: &DeckDocumentMap) -> DeckDocumentMap {
    let empty = CardDocument::new();
    let source_doc = cards.get(&source).unwrap_or(&empty);

    cards
        .iter()
        .map(|(id, doc)| {
            if *id == source {
                (*id, doc.clone())
            } else {
                (*id, with_style_of(doc, source_doc))
            }
        })
        .collect()
}

fn with_style_of(target: &CardDocument, source: &CardDocument) -> CardDocument {
    let mut doc = target.clone();
    for field in BROADCAST_FIELDS {
        match source.get(field) {
            Some(value) => doc.set(field, value.clone()),
            None => {
                doc.remove(field);
            }
        }
    }
    doc
}
