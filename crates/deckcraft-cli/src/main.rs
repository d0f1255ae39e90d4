//! Deckcraft CLI
//!
//! Command-line interface for deckcraft - design custom playing card decks.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deckcraft_core::{CardId, Config, Deck, Suit};

mod commands;
mod output;
mod render;
mod sink;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "deckcraft")]
#[command(about = "Deckcraft - design, preview and export custom playing card decks")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show deck name, card counts and storage location
    Status,
    /// Show or change the deck name
    Name {
        /// New deck name
        name: Option<String>,
    },
    /// Inspect or edit a single card
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Copy one card's style to every other card
    ApplyAll {
        /// Source card, e.g. hearts-A
        card: CardId,
    },
    /// Built-in style templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Assign image files to cards in deck order (hearts A..K, diamonds, ...)
    Images {
        /// Image paths or URLs
        #[arg(required = true)]
        refs: Vec<String>,
    },
    /// Show or edit the shared card back
    Back {
        #[command(subcommand)]
        command: Option<BackCommands>,
    },
    /// Print listing of one suit, A to K
    #[command(alias = "ls")]
    List {
        /// Suit to list
        #[arg(short, long, default_value = "hearts")]
        suit: Suit,
    },
    /// Show which of the 52 cards are customized
    Grid,
    /// Export cards as PNG images
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Interactive editing session with undo/redo
    Session,
}

#[derive(Subcommand)]
enum CardCommands {
    /// Show a card's fields
    Show {
        /// Card id, e.g. hearts-A
        card: CardId,
    },
    /// Merge field=value pairs into a card
    Set {
        /// Card id, e.g. hearts-A
        card: CardId,
        /// Assignments such as bgColor=#1a1a1a borderWidth=6
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Remove a card's customization
    #[command(alias = "rm")]
    Clear {
        /// Card id, e.g. hearts-A
        card: CardId,
    },
    /// Restore the default palette on a card
    ResetColors {
        /// Card id, e.g. hearts-A
        card: CardId,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List built-in templates
    #[command(alias = "ls")]
    List,
    /// Apply a template to a card
    Apply {
        /// Template id (classic, modern, neon, vintage, minimalist, dark)
        template: String,
        /// Card id, e.g. hearts-A
        card: CardId,
    },
}

#[derive(Subcommand)]
enum BackCommands {
    /// Show the card back
    Show,
    /// Merge field=value pairs into the card back
    Set {
        #[arg(required = true)]
        fields: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export one card as {deck}_{value}_of_{suit}.png
    Card {
        /// Card id, e.g. hearts-A
        card: CardId,
    },
    /// Export every customized card into {deck}.zip
    Deck,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, export_dir, history_debounce_ms, ...)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_deref();

    // Config commands work on the file itself
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    if let Commands::Template {
        command: TemplateCommands::List,
    } = &cli.command
    {
        return commands::template::list(&output);
    }

    let mut deck = Deck::open_with_config(&config).context("Failed to open deck")?;
    deck.load();

    match cli.command {
        Commands::Status => commands::deck::status(&deck, &config, &output),
        Commands::Name { name } => commands::deck::name(&mut deck, name, &output),
        Commands::Card { command } => handle_card_command(command, &mut deck, &output),
        Commands::ApplyAll { card } => commands::deck::apply_all(&mut deck, card, &output),
        Commands::Template { command } => match command {
            TemplateCommands::List => commands::template::list(&output),
            TemplateCommands::Apply { template, card } => {
                commands::template::apply(&mut deck, &template, card, &output)
            }
        },
        Commands::Images { refs } => commands::deck::images(&mut deck, refs, &output),
        Commands::Back { command } => match command {
            Some(BackCommands::Show) | None => commands::deck::back_show(&deck, &output),
            Some(BackCommands::Set { fields }) => {
                commands::deck::back_set(&mut deck, &fields, &output)
            }
        },
        Commands::List { suit } => commands::deck::list(&deck, suit, &output),
        Commands::Grid => commands::deck::grid(&deck, &output),
        Commands::Export { command } => {
            let pipeline = commands::export::pipeline(&config);
            match command {
                ExportCommands::Card { card } => {
                    commands::export::card(&pipeline, &deck, &config, card, &output)
                }
                ExportCommands::Deck => commands::export::deck(&pipeline, &deck, &config, &output),
            }
        }
        Commands::Config { .. } => Ok(()), // Handled above
        Commands::Session => commands::session::run(&mut deck, &config, &output).await,
    }
}

fn handle_card_command(command: CardCommands, deck: &mut Deck, output: &Output) -> Result<()> {
    match command {
        CardCommands::Show { card } => commands::card::show(deck, card, output),
        CardCommands::Set { card, fields } => commands::card::set(deck, card, &fields, output),
        CardCommands::Clear { card } => commands::card::clear(deck, card, output),
        CardCommands::ResetColors { card } => commands::card::reset_colors(deck, card, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&Path>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// RUST_LOG wins when set. Otherwise the level comes from `-v` or the
/// `log_level` config key (default warn). Logs go to `log_file` when
/// configured, stderr otherwise.
fn init_logging(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.log_level.clone().unwrap_or_else(|| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("deckcraft_core={},deckcraft_cli={}", level, level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore errors if a subscriber is already installed
    match &config.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
