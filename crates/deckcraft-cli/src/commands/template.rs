//! Template command handlers

use anyhow::Result;

use deckcraft_core::template::{self, TEMPLATES};
use deckcraft_core::{CardId, Deck};

use crate::output::Output;

/// List built-in templates
pub fn list(output: &Output) -> Result<()> {
    output.print_templates(&TEMPLATES);
    Ok(())
}

/// Apply a template to a card
pub fn apply(deck: &mut Deck, template_id: &str, card: CardId, output: &Output) -> Result<()> {
    let template = template::find(template_id).ok_or_else(|| {
        let known: Vec<&str> = TEMPLATES.iter().map(|t| t.id).collect();
        anyhow::anyhow!(
            "Unknown template '{}'. Available: {}",
            template_id,
            known.join(", ")
        )
    })?;

    deck.apply_template(card, template);
    output.success(&format!("Applied '{}' to {}", template.name, card.label()));
    Ok(())
}
