//! Interactive editing session
//!
//! Reads one command per line from stdin while the history debounce runs
//! in the background: the loop waits on whichever comes first, the next
//! line or the pending edit's deadline. This is the only mode in which undo
//! and redo are available, since history lives in memory.

use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use deckcraft_core::{CardId, Config, Deck, ExportPipeline, Rank, Suit};

use crate::output::{Output, OutputFormat};

use super::{card, deck as deck_cmd, export, template};

/// One line of session input
#[derive(Parser, Debug)]
#[command(multicall = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Select a card (hearts-A), a suit (spades) or a value (K)
    Select { target: String },
    /// Move to the next suit
    Next,
    /// Move to the previous suit
    Prev,
    /// Show the selected card
    Show,
    /// Merge field=value pairs into the selected card
    Set {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Remove the selected card's customization
    Clear,
    /// Restore the default palette on the selected card
    ResetColors,
    /// Apply a built-in template to the selected card
    Template { id: String },
    /// List built-in templates
    Templates,
    /// Copy the selected card's style to every other card
    ApplyAll,
    /// Deal image files onto cards in deck order
    Images {
        #[arg(required = true)]
        refs: Vec<String>,
    },
    /// Show or change the deck name
    Name { name: Vec<String> },
    /// Show the card back, or merge field=value pairs into it
    Back { fields: Vec<String> },
    /// Print listing of a suit (defaults to the selected suit)
    List { suit: Option<Suit> },
    /// Show which cards are customized
    Grid,
    /// Undo the last change
    Undo,
    /// Redo the last undone change
    Redo,
    /// Show history position
    History,
    /// Export the selected card or the whole deck
    Export {
        #[arg(value_enum, default_value_t = ExportTarget::Card)]
        target: ExportTarget,
    },
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportTarget {
    Card,
    Deck,
}

enum Flow {
    Continue,
    Quit,
}

/// Run the session until `quit` or end of input
pub async fn run(deck: &mut Deck, config: &Config, output: &Output) -> Result<()> {
    let pipeline = export::pipeline(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if output.is_human() {
        println!(
            "Editing '{}'. Type 'help' for commands, 'quit' to leave.",
            deck.name()
        );
    }
    prompt(deck, output);

    loop {
        let deadline = deck.next_deadline();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match handle_line(deck, &pipeline, config, output, &line) {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("Error: {:#}", e),
                }
                prompt(deck, output);
            }
            _ = wait_until(deadline) => {
                if deck.tick() {
                    debug!("History now has {} entries", deck.history().len());
                }
            }
        }
    }

    // Nothing is lost on exit, but keep the log consistent for callers
    deck.flush_history();
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

fn prompt(deck: &Deck, output: &Output) {
    if output.is_human() {
        print!("{}> ", deck.selected());
        let _ = std::io::stdout().flush();
    }
}

fn handle_line(
    deck: &mut Deck,
    pipeline: &ExportPipeline,
    config: &Config,
    output: &Output,
    line: &str,
) -> Result<Flow> {
    let words = split_words(line)?;
    if words.is_empty() {
        return Ok(Flow::Continue);
    }

    let parsed = match SessionLine::try_parse_from(&words) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Help and usage errors are rendered by clap itself
            let _ = e.print();
            return Ok(Flow::Continue);
        }
    };

    let selected = deck.selected();
    match parsed.command {
        SessionCommand::Select { target } => select(deck, &target)?,
        SessionCommand::Next => {
            deck.selection_mut().next_suit();
        }
        SessionCommand::Prev => {
            deck.selection_mut().prev_suit();
        }
        SessionCommand::Show => card::show(deck, selected, output)?,
        SessionCommand::Set { fields } => card::set(deck, selected, &fields, output)?,
        SessionCommand::Clear => card::clear(deck, selected, output)?,
        SessionCommand::ResetColors => card::reset_colors(deck, selected, output)?,
        SessionCommand::Template { id } => template::apply(deck, &id, selected, output)?,
        SessionCommand::Templates => template::list(output)?,
        SessionCommand::ApplyAll => deck_cmd::apply_all(deck, selected, output)?,
        SessionCommand::Images { refs } => deck_cmd::images(deck, refs, output)?,
        SessionCommand::Name { name } => {
            let name = if name.is_empty() {
                None
            } else {
                Some(name.join(" "))
            };
            deck_cmd::name(deck, name, output)?
        }
        SessionCommand::Back { fields } => {
            if fields.is_empty() {
                deck_cmd::back_show(deck, output)?
            } else {
                deck_cmd::back_set(deck, &fields, output)?
            }
        }
        SessionCommand::List { suit } => {
            deck_cmd::list(deck, suit.unwrap_or(selected.suit), output)?
        }
        SessionCommand::Grid => deck_cmd::grid(deck, output)?,
        SessionCommand::Undo => {
            if deck.undo() {
                output.success("Undone");
            } else {
                output.message("Nothing to undo");
            }
        }
        SessionCommand::Redo => {
            if deck.redo() {
                output.success("Redone");
            } else {
                output.message("Nothing to redo");
            }
        }
        SessionCommand::History => print_history(deck, output),
        SessionCommand::Export { target } => match target {
            ExportTarget::Card => export::card(pipeline, deck, config, selected, output)?,
            ExportTarget::Deck => export::deck(pipeline, deck, config, output)?,
        },
        SessionCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

/// Select a full card id, or change only the suit or the value
fn select(deck: &mut Deck, target: &str) -> Result<()> {
    if let Ok(id) = target.parse::<CardId>() {
        deck.selection_mut().select(id);
    } else if let Ok(suit) = target.parse::<Suit>() {
        deck.selection_mut().select_suit(suit);
    } else {
        let rank: Rank = target
            .parse()
            .with_context(|| format!("'{}' is not a card, suit or value", target))?;
        deck.selection_mut().select_rank(rank);
    }
    Ok(())
}

fn print_history(deck: &Deck, output: &Output) {
    let history = deck.history();
    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "entries": history.len(),
            "cursor": history.cursor(),
            "pending": history.has_pending(),
            "can_undo": deck.can_undo(),
            "can_redo": deck.can_redo(),
        })),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            if history.is_empty() {
                println!("No history yet");
                return;
            }
            println!(
                "Entry {} of {}{}",
                history.cursor() + 1,
                history.len(),
                if history.has_pending() {
                    " (edit pending)"
                } else {
                    ""
                }
            );
            println!(
                "undo: {}  redo: {}",
                if deck.can_undo() { "yes" } else { "no" },
                if deck.can_redo() { "yes" } else { "no" }
            );
        }
    }
}

/// Split a line into words, keeping double-quoted runs together
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }

    if in_quotes {
        anyhow::bail!("Unterminated quote");
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}
