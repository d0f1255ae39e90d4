//! Deck session
//!
//! The `Deck` owns everything an editing session works on and wires it
//! together:
//! - the persisted deck name, card map and shared card back
//! - the undo/redo history watching the card map
//! - the current card selection
//!
//! ## Data flow
//!
//! Every card mutation is written through [`PersistentState`] first and the
//! resulting map is then shown to the [`HistoryEngine`]. Undo and redo
//! write the returned snapshot back the same way, so storage always holds
//! what is on screen.
//!
//! ## Usage
//!
//! ```text
//! let mut deck = Deck::open()?;
//! deck.load();
//!
//! deck.update_selected(&patch);
//! deck.tick();            // from the event loop
//! deck.undo();
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::batch::{self, ImageAssignment};
use crate::broadcast;
use crate::card_id::{CardId, Rank, Suit};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::document::{suit_listing, CardDocument, DeckDocumentMap};
use crate::history::HistoryEngine;
use crate::persistent::PersistentState;
use crate::selection::Selection;
use crate::storage::{FileStore, KeyValueStore};
use crate::template::Template;

/// Storage key of the deck name
pub const DECK_NAME_KEY: &str = "deckName";

/// Storage key of the card map
pub const CARDS_KEY: &str = "cards";

/// Storage key of the shared card back
pub const CARD_BACK_KEY: &str = "cardBack";

/// Name given to a deck that was never renamed
pub const DEFAULT_DECK_NAME: &str = "My Custom Deck";

/// Presence of each card, indexed by `Suit::ALL` then `Rank::ALL`
pub type PresenceGrid = [[bool; 13]; 4];

/// An editing session over one persisted deck
pub struct Deck {
    name: PersistentState<String>,
    cards: PersistentState<DeckDocumentMap>,
    card_back: PersistentState<CardDocument>,
    history: HistoryEngine,
    selection: Selection,
    clock: Arc<dyn Clock>,
}

impl Deck {
    /// Open the deck stored in the configured data directory
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the deck described by a specific configuration
    ///
    /// The deck is not rehydrated yet; call [`load`](Self::load).
    pub fn open_with_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;

        let storage = Arc::new(FileStore::new(&config.data_dir));
        Ok(Self::with_storage(
            storage,
            config.history_debounce(),
            Arc::new(SystemClock),
        ))
    }

    /// Build a deck on an arbitrary store and clock
    pub fn with_storage(
        storage: Arc<dyn KeyValueStore>,
        debounce: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: PersistentState::new(
                DECK_NAME_KEY,
                DEFAULT_DECK_NAME.to_string(),
                Arc::clone(&storage),
            ),
            cards: PersistentState::new(CARDS_KEY, DeckDocumentMap::new(), Arc::clone(&storage)),
            card_back: PersistentState::new(
                CARD_BACK_KEY,
                CardDocument::default_card_back(),
                storage,
            ),
            history: HistoryEngine::new(debounce),
            selection: Selection::new(),
            clock,
        }
    }

    /// Rehydrate all persisted values
    ///
    /// The loaded card map is handed to the history engine so a previously
    /// saved deck becomes the first undo entry.
    pub fn load(&mut self) {
        self.name.load();
        self.card_back.load();
        if self.cards.load() {
            info!(
                "Loaded deck '{}' with {} card(s)",
                self.name.get(),
                self.cards.get().len()
            );
        }
        self.observe();
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn observe(&mut self) {
        let now = self.now();
        let observation = self.history.observe(self.cards.get(), now);
        debug!("History observation: {:?}", observation);
    }

    // ==================== Deck name ====================

    pub fn name(&self) -> &str {
        self.name.get()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    // ==================== Cards ====================

    pub fn cards(&self) -> &DeckDocumentMap {
        self.cards.get()
    }

    pub fn card(&self, id: CardId) -> Option<&CardDocument> {
        self.cards.get().get(&id)
    }

    /// Merge `patch` into a card, creating the card if needed
    pub fn update_card(&mut self, id: CardId, patch: &CardDocument) {
        self.cards.modify(|cards| {
            cards.entry(id).or_default().merge(patch);
        });
        self.observe();
    }

    /// Merge `patch` into the currently selected card
    pub fn update_selected(&mut self, patch: &CardDocument) {
        let id = self.selection.current();
        self.update_card(id, patch);
    }

    /// Remove a card's document entirely
    ///
    /// Returns `false` when the card did not exist.
    pub fn clear_card(&mut self, id: CardId) -> bool {
        if !self.cards.get().contains_key(&id) {
            return false;
        }
        self.cards.modify(|cards| {
            cards.remove(&id);
        });
        self.observe();
        true
    }

    /// Copy the style of `source` onto every other stored card
    pub fn apply_to_all(&mut self, source: CardId) {
        self.cards
            .update(|cards| broadcast::apply_to_all(source, cards));
        self.observe();
    }

    pub fn apply_template(&mut self, id: CardId, template: &Template) {
        self.update_card(id, &template.patch());
    }

    /// Restore the default palette of a card
    pub fn reset_colors(&mut self, id: CardId) {
        self.update_card(id, &CardDocument::default_colors());
    }

    /// Deal `(image, name)` pairs onto cards in deck order
    ///
    /// All assignments land as a single change.
    pub fn assign_images<I, S, N>(&mut self, images: I) -> Vec<ImageAssignment>
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        let assignments = batch::assign(images);
        if assignments.is_empty() {
            return assignments;
        }

        self.cards.modify(|cards| {
            for assignment in &assignments {
                cards
                    .entry(assignment.card)
                    .or_default()
                    .merge(&assignment.patch());
            }
        });
        self.observe();
        assignments
    }

    // ==================== Card back ====================

    pub fn card_back(&self) -> &CardDocument {
        self.card_back.get()
    }

    /// Merge `patch` into the shared card back (not part of undo history)
    pub fn update_card_back(&mut self, patch: &CardDocument) {
        self.card_back.modify(|back| back.merge(patch));
    }

    // ==================== Selection ====================

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn selected(&self) -> CardId {
        self.selection.current()
    }

    // ==================== History ====================

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step the card map back one history entry
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.cards.set(snapshot);
                self.observe();
                true
            }
            None => false,
        }
    }

    /// Step the card map forward one history entry
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.cards.set(snapshot);
                self.observe();
                true
            }
            None => false,
        }
    }

    /// Commit a pending edit whose quiet period has elapsed
    pub fn tick(&mut self) -> bool {
        let now = self.now();
        self.history.tick(now)
    }

    /// Commit a pending edit immediately
    pub fn flush_history(&mut self) -> bool {
        self.history.flush()
    }

    /// When [`tick`](Self::tick) next has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.history.next_deadline()
    }

    // ==================== Queries ====================

    /// Cards of one suit in print order (A, 2..10, J, Q, K)
    pub fn cards_for_suit(&self, suit: Suit) -> Vec<(CardId, &CardDocument)> {
        suit_listing(self.cards.get(), suit)
    }

    /// Which of the 52 cards have a document
    pub fn grid(&self) -> PresenceGrid {
        let mut grid = [[false; 13]; 4];
        for (s, suit) in Suit::ALL.iter().enumerate() {
            for (r, rank) in Rank::ALL.iter().enumerate() {
                grid[s][r] = self.cards.get().contains_key(&CardId::new(*suit, *rank));
            }
        }
        grid
    }

    /// Number of stored cards per suit, in suit order
    pub fn count_by_suit(&self) -> [(Suit, usize); 4] {
        Suit::ALL.map(|suit| {
            let count = self.cards.get().keys().filter(|id| id.suit == suit).count();
            (suit, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::document::fields;
    use crate::storage::MemoryStore;
    use crate::template;
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        deck: Deck,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        harness_on(Arc::new(MemoryStore::new()))
    }

    fn harness_on(store: Arc<MemoryStore>) -> Harness {
        let clock = Arc::new(ManualClock::new());
        let mut deck = Deck::with_storage(
            store.clone(),
            Duration::from_millis(500),
            clock.clone(),
        );
        deck.load();
        Harness { deck, store, clock }
    }

    fn id(s: &str) -> CardId {
        s.parse().unwrap()
    }

    fn title(t: &str) -> CardDocument {
        CardDocument::from_pairs([(fields::TITLE, json!(t))])
    }

    fn stored_cards(store: &MemoryStore) -> DeckDocumentMap {
        let raw = store.load(CARDS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_defaults_on_empty_store() {
        let h = harness();
        assert_eq!(h.deck.name(), DEFAULT_DECK_NAME);
        assert!(h.deck.cards().is_empty());
        assert_eq!(h.deck.card_back(), &CardDocument::default_card_back());
        assert_eq!(h.deck.selected(), id("hearts-A"));
        assert!(!h.deck.can_undo());
        assert!(!h.deck.can_redo());
    }

    #[test]
    fn test_mutations_write_through() {
        let mut h = harness();
        h.deck.set_name("Tarot-ish");
        h.deck.update_card(id("spades-Q"), &title("Queen"));

        assert_eq!(
            h.store.load(DECK_NAME_KEY).unwrap().as_deref(),
            Some("\"Tarot-ish\"")
        );
        let cards = stored_cards(&h.store);
        assert_eq!(cards[&id("spades-Q")].title(), Some("Queen"));

        // Wire format of the card map
        let raw = h.store.load(CARDS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"spades-Q\""));
    }

    #[test]
    fn test_reopen_restores_everything() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            ..Config::default()
        };

        {
            let mut deck = Deck::open_with_config(&config).unwrap();
            deck.load();
            deck.set_name("Night Deck");
            deck.update_card(id("clubs-10"), &title("Ten"));
            deck.update_card_back(&CardDocument::from_pairs([(fields::BG_COLOR, json!("#000"))]));
        }

        let mut deck = Deck::open_with_config(&config).unwrap();
        deck.load();
        assert_eq!(deck.name(), "Night Deck");
        assert_eq!(deck.card(id("clubs-10")).unwrap().title(), Some("Ten"));
        assert_eq!(deck.card_back().str_field(fields::BG_COLOR), Some("#000"));
        // Untouched card back fields survive the merge
        assert_eq!(deck.card_back().number_field(fields::BORDER_WIDTH), Some(4.0));
        // The loaded deck is the first history entry
        assert_eq!(deck.history().len(), 1);
    }

    #[test]
    fn test_edit_burst_is_one_undo_step() {
        let mut h = harness();
        h.deck.update_card(id("hearts-A"), &title("A"));
        assert_eq!(h.deck.history().len(), 1);

        for t in ["Ac", "Ace", "Ace!"] {
            h.clock.advance_ms(100);
            h.deck.update_card(id("hearts-A"), &title(t));
            assert!(!h.deck.tick());
        }
        h.clock.advance_ms(500);
        assert!(h.deck.tick());
        assert_eq!(h.deck.history().len(), 2);

        assert!(h.deck.undo());
        assert_eq!(h.deck.card(id("hearts-A")).unwrap().title(), Some("A"));
        assert_eq!(stored_cards(&h.store)[&id("hearts-A")].title(), Some("A"));

        assert!(h.deck.redo());
        assert_eq!(h.deck.card(id("hearts-A")).unwrap().title(), Some("Ace!"));
        // Replays are not recorded
        h.clock.advance_ms(1000);
        assert!(!h.deck.tick());
        assert_eq!(h.deck.history().len(), 2);
    }

    #[test]
    fn test_undo_commits_pending_edit_first() {
        let mut h = harness();
        h.deck.update_card(id("hearts-A"), &title("one"));
        h.deck.update_card(id("hearts-A"), &title("two"));
        assert!(h.deck.can_undo());

        assert!(h.deck.undo());
        assert_eq!(h.deck.card(id("hearts-A")).unwrap().title(), Some("one"));
        assert!(h.deck.can_redo());
    }

    #[test]
    fn test_new_edit_after_undo_drops_redo() {
        let mut h = harness();
        h.deck.update_card(id("hearts-A"), &title("one"));
        h.deck.update_card(id("hearts-A"), &title("two"));
        h.deck.flush_history();
        h.deck.undo();

        h.deck.update_card(id("hearts-2"), &title("other"));
        h.deck.flush_history();
        assert!(!h.deck.can_redo());
        assert_eq!(h.deck.history().len(), 2);
    }

    #[test]
    fn test_update_selected_and_clear() {
        let mut h = harness();
        h.deck.selection_mut().select(id("diamonds-7"));
        h.deck.update_selected(&title("Seven"));
        assert!(h.deck.card(id("diamonds-7")).is_some());

        assert!(h.deck.clear_card(id("diamonds-7")));
        assert!(!h.deck.clear_card(id("diamonds-7")));
        assert!(h.deck.cards().is_empty());
    }

    #[test]
    fn test_apply_to_all_through_deck() {
        let mut h = harness();
        h.deck.update_card(
            id("hearts-A"),
            &CardDocument::from_pairs([
                (fields::BG_COLOR, json!("#111111")),
                (fields::TITLE, json!("Ace")),
            ]),
        );
        h.deck.update_card(id("spades-K"), &title("King"));

        h.deck.apply_to_all(id("hearts-A"));

        let king = h.deck.card(id("spades-K")).unwrap();
        assert_eq!(king.str_field(fields::BG_COLOR), Some("#111111"));
        assert_eq!(king.title(), Some("King"));
        assert_eq!(h.deck.cards().len(), 2);
    }

    #[test]
    fn test_template_and_reset_colors() {
        let mut h = harness();
        let neon = template::find("neon").unwrap();
        h.deck.update_card(id("clubs-3"), &title("Three"));
        h.deck.apply_template(id("clubs-3"), neon);

        let card = h.deck.card(id("clubs-3")).unwrap();
        assert_eq!(card.str_field(fields::BG_COLOR), Some(neon.bg_color));
        assert_eq!(card.title(), Some("Three"));

        h.deck.reset_colors(id("clubs-3"));
        let card = h.deck.card(id("clubs-3")).unwrap();
        assert_eq!(card.str_field(fields::BG_COLOR), Some("#2D2A4A"));
        assert_eq!(card.str_field(fields::ACCENT_COLOR), Some("#89DAFF"));
        assert_eq!(card.str_field(fields::FONT_FAMILY), Some(neon.font_family));
    }

    #[test]
    fn test_assign_images_is_single_change() {
        let mut h = harness();
        h.deck.update_card(id("hearts-2"), &title("Two"));

        let images: Vec<(String, String)> = (0..14)
            .map(|i| (format!("/img/{i}.png"), format!("{i}.png")))
            .collect();
        let assignments = h.deck.assign_images(images);

        assert_eq!(assignments.len(), 14);
        assert_eq!(h.deck.card(id("diamonds-A")).unwrap().image(), Some("/img/13.png"));
        // Existing fields survive
        assert_eq!(h.deck.card(id("hearts-2")).unwrap().title(), Some("Two"));

        h.deck.flush_history();
        assert_eq!(h.deck.history().len(), 2);
        h.deck.undo();
        assert_eq!(h.deck.cards().len(), 1);
    }

    #[test]
    fn test_listing_grid_and_counts() {
        let mut h = harness();
        for card in ["hearts-K", "hearts-A", "hearts-10", "spades-2"] {
            h.deck.update_card(id(card), &title(card));
        }

        let listing: Vec<String> = h
            .deck
            .cards_for_suit(Suit::Hearts)
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(listing, vec!["hearts-A", "hearts-10", "hearts-K"]);

        let grid = h.deck.grid();
        assert!(grid[0][0]);
        assert!(grid[0][12]);
        assert!(!grid[0][1]);
        assert!(grid[3][1]);

        assert_eq!(
            h.deck.count_by_suit(),
            [
                (Suit::Hearts, 3),
                (Suit::Diamonds, 0),
                (Suit::Clubs, 0),
                (Suit::Spades, 1)
            ]
        );
    }

    #[test]
    fn test_storage_outage_keeps_session_working() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness_on(store.clone());
        store.set_unavailable(true);

        h.deck.update_card(id("hearts-A"), &title("offline"));
        assert_eq!(h.deck.card(id("hearts-A")).unwrap().title(), Some("offline"));

        store.set_unavailable(false);
        h.deck.update_card(id("hearts-A"), &title("online"));
        assert_eq!(stored_cards(&store)[&id("hearts-A")].title(), Some("online"));
    }
}
