//! Card command handlers

use anyhow::{bail, Context, Result};
use serde_json::Value;

use deckcraft_core::{CardDocument, CardId, Deck};

use crate::output::Output;

/// Show one card's document
pub fn show(deck: &Deck, id: CardId, output: &Output) -> Result<()> {
    output.print_card(id, deck.card(id));
    Ok(())
}

/// Merge `field=value` assignments into a card
pub fn set(deck: &mut Deck, id: CardId, assignments: &[String], output: &Output) -> Result<()> {
    let patch = parse_patch(assignments)?;
    deck.update_card(id, &patch);

    output.success(&format!("Updated {} ({} field(s))", id.label(), patch.len()));
    Ok(())
}

/// Remove a card's customization
pub fn clear(deck: &mut Deck, id: CardId, output: &Output) -> Result<()> {
    if !deck.clear_card(id) {
        bail!("{} is not customized", id.label());
    }
    output.success(&format!("Cleared {}", id.label()));
    Ok(())
}

/// Restore the default palette on a card
pub fn reset_colors(deck: &mut Deck, id: CardId, output: &Output) -> Result<()> {
    deck.reset_colors(id);
    output.success(&format!("Reset colors of {}", id.label()));
    Ok(())
}

/// Parse `field=value` pairs into a patch
///
/// Values that parse as JSON (numbers, booleans, objects) keep their type;
/// anything else is stored as a string, so `bgColor=#fff` works unquoted.
pub fn parse_patch(assignments: &[String]) -> Result<CardDocument> {
    if assignments.is_empty() {
        bail!("Nothing to set. Use field=value, e.g. bgColor=#1a1a1a");
    }

    let mut patch = CardDocument::new();
    for assignment in assignments {
        let (field, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Expected field=value, got '{}'", assignment))?;
        let field = field.trim();
        if field.is_empty() {
            bail!("Missing field name in '{}'", assignment);
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        patch.set(field, value);
    }
    Ok(patch)
}
