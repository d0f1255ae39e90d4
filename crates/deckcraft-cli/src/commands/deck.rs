//! Deck-level command handlers

use std::path::Path;

use anyhow::Result;

use deckcraft_core::deck::CARDS_KEY;
use deckcraft_core::{CardId, Config, Deck, FileStore, Suit};

use crate::output::{Output, OutputFormat};

use super::card::parse_patch;

/// Show deck status
pub fn status(deck: &Deck, config: &Config, output: &Output) -> Result<()> {
    let counts = deck.count_by_suit();
    let total = deck.cards().len();
    let stored_size = FileStore::new(&config.data_dir).size_of(CARDS_KEY);

    match output.format {
        OutputFormat::Json => {
            let by_suit: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(suit, n)| (suit.to_string(), serde_json::json!(n)))
                .collect();
            output.json(&serde_json::json!({
                "name": deck.name(),
                "cards": total,
                "by_suit": by_suit,
                "card_back": deck.card_back(),
                "data_dir": config.data_dir,
                "export_dir": config.export_dir(),
                "stored_bytes": stored_size,
            }));
        }
        OutputFormat::Quiet => {
            println!("{}", deck.name());
        }
        OutputFormat::Human => {
            println!("Deck: {}", deck.name());
            println!();
            println!("Cards: {} of 52 customized", total);
            for (suit, n) in counts {
                println!("  {} {:<9} {:>2}", suit.symbol(), suit.title(), n);
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            if let Some(bytes) = stored_size {
                println!("  Size:     {} bytes", bytes);
            }
            println!("  Exports:  {}", config.export_dir().display());
        }
    }

    Ok(())
}

/// Show or change the deck name
pub fn name(deck: &mut Deck, new_name: Option<String>, output: &Output) -> Result<()> {
    match new_name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                anyhow::bail!("Deck name cannot be empty");
            }
            deck.set_name(name);
            output.success(&format!("Renamed deck to '{}'", deck.name()));
        }
        None => match output.format {
            OutputFormat::Json => output.json(&serde_json::json!({"name": deck.name()})),
            _ => println!("{}", deck.name()),
        },
    }
    Ok(())
}

/// Print listing of one suit
pub fn list(deck: &Deck, suit: Suit, output: &Output) -> Result<()> {
    output.print_listing(suit, &deck.cards_for_suit(suit));
    Ok(())
}

/// Show which cards are customized
pub fn grid(deck: &Deck, output: &Output) -> Result<()> {
    output.print_grid(&deck.grid());
    Ok(())
}

/// Copy one card's style to every other card
pub fn apply_all(deck: &mut Deck, source: CardId, output: &Output) -> Result<()> {
    if deck.card(source).is_none() {
        output.warn(&format!(
            "{} is not customized; other cards lose their style fields",
            source.label()
        ));
    }
    deck.apply_to_all(source);

    let others = deck.cards().len().saturating_sub(1);
    output.success(&format!(
        "Applied style of {} to {} other card(s)",
        source.label(),
        others
    ));
    Ok(())
}

/// Deal image files onto cards in deck order
pub fn images(deck: &mut Deck, refs: Vec<String>, output: &Output) -> Result<()> {
    let pairs: Vec<(String, String)> = refs
        .into_iter()
        .map(|r| {
            let name = Path::new(&r)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| r.clone());
            (r, name)
        })
        .collect();

    if pairs.len() > 52 {
        output.warn("More than 52 images; extra images wrap around to hearts");
    }

    let assignments = deck.assign_images(pairs);
    match output.format {
        OutputFormat::Json => {
            let list: Vec<_> = assignments
                .iter()
                .map(|a| serde_json::json!({"card": a.card, "image": a.image, "name": a.name}))
                .collect();
            output.json(&list);
        }
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            for a in &assignments {
                println!("{:<12} <- {}", a.card.to_string(), a.name);
            }
            output.success(&format!("Assigned {} image(s)", assignments.len()));
        }
    }
    Ok(())
}

/// Show the shared card back
pub fn back_show(deck: &Deck, output: &Output) -> Result<()> {
    output.print_card_back(deck.card_back());
    Ok(())
}

/// Merge `field=value` assignments into the card back
pub fn back_set(deck: &mut Deck, assignments: &[String], output: &Output) -> Result<()> {
    let patch = parse_patch(assignments)?;
    deck.update_card_back(&patch);
    output.success("Updated card back");
    Ok(())
}
