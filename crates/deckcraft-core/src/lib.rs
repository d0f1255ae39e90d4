//! Deckcraft Core Library
//!
//! This crate provides the core functionality for deckcraft, an editor for
//! custom 52-card playing card decks: per-card style documents, persistence,
//! undo/redo history and raster export.
//!
//! # Architecture
//!
//! - **PersistentState**: typed values written through to a durable
//!   key-value store (`deckName`, `cards`, `cardBack`)
//! - **HistoryEngine**: snapshot log of the card map with debounced commits
//! - **ExportPipeline**: captures rendered cards and bundles them into a zip
//!
//! # Quick Start
//!
//! ```text
//! let mut deck = Deck::open()?;
//! deck.load();
//!
//! deck.update_card("hearts-A".parse()?, &patch);
//! deck.apply_to_all("hearts-A".parse()?);
//! deck.undo();
//! ```
//!
//! # Modules
//!
//! - `deck`: Editing session over one deck (main entry point)
//! - `card_id`: Suits, ranks and the `"{suit}-{value}"` card id
//! - `document`: Open-ended card style documents
//! - `storage`: Durable key-value backends
//! - `persistent`: Typed values persisted under a key
//! - `history`: Undo/redo snapshot log
//! - `broadcast`: "Apply to all" style copying
//! - `template`, `batch`, `selection`: editing helpers
//! - `export`: Image capture and archive export
//! - `config`: Application configuration

pub mod batch;
pub mod broadcast;
pub mod card_id;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod deck;
pub mod document;
pub mod export;
pub mod history;
pub mod persistent;
pub mod selection;
pub mod storage;
pub mod template;

pub use card_id::{CardId, CardIdError, Rank, Suit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use deck::Deck;
pub use document::{CardDocument, DeckDocumentMap, TextPosition};
pub use export::{
    CaptureOptions, CaptureSurface, ExportError, ExportItem, ExportOptions, ExportOutcome,
    ExportPipeline, ExportReport, ExportSink, Notice, ZipArchiver,
};
pub use history::{HistoryEngine, HistoryMode};
pub use persistent::PersistentState;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
