//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use deckcraft_core::card_id::{CardId, Rank, Suit};
use deckcraft_core::deck::PresenceGrid;
use deckcraft_core::document::fields;
use deckcraft_core::template::Template;
use deckcraft_core::CardDocument;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn is_human(&self) -> bool {
        matches!(self.format, OutputFormat::Human)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error: failed to serialize output: {}", e),
        }
    }

    /// Print a single card document
    pub fn print_card(&self, id: CardId, doc: Option<&CardDocument>) {
        match self.format {
            OutputFormat::Human => {
                println!("{} ({})", id.label(), id);
                match doc {
                    Some(doc) if !doc.is_empty() => print_fields(doc),
                    _ => println!("  (not customized)"),
                }
            }
            OutputFormat::Json => {
                self.json(&serde_json::json!({
                    "id": id,
                    "document": doc,
                }));
            }
            OutputFormat::Quiet => {
                println!("{}", id);
            }
        }
    }

    /// Print the card back document
    pub fn print_card_back(&self, doc: &CardDocument) {
        match self.format {
            OutputFormat::Human => {
                println!("Card back");
                print_fields(doc);
            }
            OutputFormat::Json => self.json(doc),
            OutputFormat::Quiet => {}
        }
    }

    /// Print the cards of one suit in print order
    pub fn print_listing(&self, suit: Suit, cards: &[(CardId, &CardDocument)]) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", suit.symbol(), suit.title());
                if cards.is_empty() {
                    println!("No cards customized in this suit.");
                    return;
                }
                for (id, doc) in cards {
                    println!(
                        "{:>3} | {} | {}",
                        id.rank.as_str(),
                        truncate(doc.title().unwrap_or("-"), 30),
                        doc.str_field(fields::NAME).unwrap_or("")
                    );
                }
                println!("\n{} card(s)", cards.len());
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, Value> = cards
                    .iter()
                    .map(|(id, doc)| {
                        (
                            id.to_string(),
                            serde_json::to_value(doc).unwrap_or(Value::Null),
                        )
                    })
                    .collect();
                self.json(&map);
            }
            OutputFormat::Quiet => {
                for (id, _) in cards {
                    println!("{}", id);
                }
            }
        }
    }

    /// Print the 4 x 13 presence grid
    pub fn print_grid(&self, grid: &PresenceGrid) {
        match self.format {
            OutputFormat::Human => {
                let header: Vec<String> = Rank::ALL.iter().map(|r| format!("{:>3}", r.as_str())).collect();
                println!("   {}", header.join(""));
                for (suit, row) in Suit::ALL.iter().zip(grid.iter()) {
                    let cells: String = row
                        .iter()
                        .map(|present| if *present { "  ■" } else { "  ·" })
                        .collect();
                    println!(" {} {}", suit.symbol(), cells);
                }
            }
            OutputFormat::Json => {
                let rows: serde_json::Map<String, Value> = Suit::ALL
                    .iter()
                    .zip(grid.iter())
                    .map(|(suit, row)| (suit.to_string(), serde_json::json!(row)))
                    .collect();
                self.json(&rows);
            }
            OutputFormat::Quiet => {
                for (suit, row) in Suit::ALL.iter().zip(grid.iter()) {
                    for (rank, present) in Rank::ALL.iter().zip(row.iter()) {
                        if *present {
                            println!("{}", CardId::new(*suit, *rank));
                        }
                    }
                }
            }
        }
    }

    /// Print the built-in templates
    pub fn print_templates(&self, templates: &[Template]) {
        match self.format {
            OutputFormat::Human => {
                for t in templates {
                    println!(
                        "{:<11} {:<12} bg {}  border {} {}px  text {}",
                        t.id, t.name, t.bg_color, t.border_color, t.border_width, t.text_color
                    );
                }
            }
            OutputFormat::Json => {
                let list: Vec<Value> = templates
                    .iter()
                    .map(|t| serde_json::json!({"id": t.id, "name": t.name, "style": t.patch()}))
                    .collect();
                self.json(&list);
            }
            OutputFormat::Quiet => {
                for t in templates {
                    println!("{}", t.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (never in quiet mode)
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("Warning: {}", msg);
        }
    }
}

fn print_fields(doc: &CardDocument) {
    let width = doc.fields().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in doc.fields() {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("  {:<width$}  {}", key, shown, width = width);
    }
}

/// Truncate a string to max chars, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
