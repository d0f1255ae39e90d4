//! Undo/redo history
//!
//! The history engine keeps a linear log of full [`DeckDocumentMap`]
//! snapshots and a cursor into it. It watches the card map from the outside:
//! the owner calls [`HistoryEngine::observe`] after every change and
//! [`HistoryEngine::tick`] from its event loop.
//!
//! ## Lifecycle
//!
//! - `Uninitialized` until the first non-empty map is observed; that map
//!   becomes entry 0 immediately.
//! - Afterwards, observed maps go through a trailing debounce so a burst of
//!   edits (typing, dragging a slider) yields a single entry holding the
//!   final state.
//! - Committing after an undo discards every entry past the cursor.
//!
//! Undo and redo hand a snapshot back to the owner, who writes it into the
//! store. That write is observed like any other change, so the engine
//! switches to [`HistoryMode::ApplyingHistory`] and ignores exactly one
//! observation.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::debounce::Debouncer;
use crate::document::DeckDocumentMap;

/// Default quiet period before an edit is committed to history
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Whether the next observed change is user intent or a history replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Idle,
    ApplyingHistory,
}

/// What [`HistoryEngine::observe`] did with a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Still uninitialized and the map is empty
    Ignored,
    /// First non-empty map, recorded as entry 0
    Initialized,
    /// Change caused by undo/redo, not recorded
    Suppressed,
    /// Pending commit (re)scheduled
    Scheduled,
}

/// Linear, branch-discarding undo/redo log with debounced commits
#[derive(Debug, Clone)]
pub struct HistoryEngine {
    log: Vec<DeckDocumentMap>,
    cursor: usize,
    mode: HistoryMode,
    debouncer: Debouncer<DeckDocumentMap>,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl HistoryEngine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            log: Vec::new(),
            cursor: 0,
            mode: HistoryMode::Idle,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// True once the first non-empty map has been recorded
    pub fn is_ready(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// Number of snapshots in the log
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Index of the snapshot matching the current state
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn snapshots(&self) -> &[DeckDocumentMap] {
        &self.log
    }

    pub fn current(&self) -> Option<&DeckDocumentMap> {
        self.log.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.is_ready() && (self.cursor > 0 || self.debouncer.is_pending())
    }

    pub fn can_redo(&self) -> bool {
        self.is_ready() && !self.debouncer.is_pending() && self.cursor + 1 < self.log.len()
    }

    /// Whether an edit is waiting for its quiet period
    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the pending edit will be committed, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Observe the card map after a change
    pub fn observe(&mut self, cards: &DeckDocumentMap, now: Instant) -> Observation {
        if self.mode == HistoryMode::ApplyingHistory {
            self.mode = HistoryMode::Idle;
            return Observation::Suppressed;
        }

        if !self.is_ready() {
            if cards.is_empty() {
                return Observation::Ignored;
            }
            self.log.push(cards.clone());
            self.cursor = 0;
            debug!("History initialized with {} card(s)", cards.len());
            return Observation::Initialized;
        }

        self.debouncer.schedule(cards.clone(), now);
        Observation::Scheduled
    }

    /// Commit the pending edit if its quiet period has elapsed
    ///
    /// Returns `true` when a snapshot was appended.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(cards) => {
                self.commit(cards);
                true
            }
            None => false,
        }
    }

    /// Commit the pending edit now, without waiting
    pub fn flush(&mut self) -> bool {
        match self.debouncer.flush() {
            Some(cards) => {
                self.commit(cards);
                true
            }
            None => false,
        }
    }

    /// Step back one snapshot
    ///
    /// A pending edit is committed first so it is the one being undone.
    /// Returns the snapshot the owner must write back into the store, or
    /// `None` when already at the oldest entry.
    pub fn undo(&mut self) -> Option<DeckDocumentMap> {
        self.flush();
        if self.cursor == 0 || !self.is_ready() {
            return None;
        }
        self.cursor -= 1;
        self.mode = HistoryMode::ApplyingHistory;
        debug!("Undo to history entry {} of {}", self.cursor + 1, self.log.len());
        self.log.get(self.cursor).cloned()
    }

    /// Step forward one snapshot
    ///
    /// Returns the snapshot to write back, or `None` when already at the
    /// newest entry.
    pub fn redo(&mut self) -> Option<DeckDocumentMap> {
        self.flush();
        if self.cursor + 1 >= self.log.len() {
            return None;
        }
        self.cursor += 1;
        self.mode = HistoryMode::ApplyingHistory;
        debug!("Redo to history entry {} of {}", self.cursor + 1, self.log.len());
        self.log.get(self.cursor).cloned()
    }

    fn commit(&mut self, cards: DeckDocumentMap) {
        self.log.truncate(self.cursor + 1);
        self.log.push(cards);
        self.cursor = self.log.len() - 1;
        debug!("History entry {} committed", self.log.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_id::CardId;
    use crate::clock::{Clock, ManualClock};
    use crate::document::CardDocument;
    use serde_json::json;

    fn cards_with(entries: &[(&str, &str)]) -> DeckDocumentMap {
        entries
            .iter()
            .map(|(id, title)| {
                (
                    id.parse::<CardId>().unwrap(),
                    CardDocument::from_pairs([("title", json!(title))]),
                )
            })
            .collect()
    }

    /// Observe a change at the current clock time
    fn apply(history: &mut HistoryEngine, cards: &DeckDocumentMap, clock: &ManualClock) {
        history.observe(cards, clock.now());
    }

    fn ready_engine(clock: &ManualClock) -> (HistoryEngine, DeckDocumentMap) {
        let mut history = HistoryEngine::default();
        let initial = cards_with(&[("hearts-A", "start")]);
        assert_eq!(
            history.observe(&initial, clock.now()),
            Observation::Initialized
        );
        (history, initial)
    }

    #[test]
    fn test_empty_map_does_not_initialize() {
        let clock = ManualClock::new();
        let mut history = HistoryEngine::default();

        assert_eq!(
            history.observe(&DeckDocumentMap::new(), clock.now()),
            Observation::Ignored
        );
        clock.advance_ms(1000);
        assert!(!history.tick(clock.now()));
        assert!(!history.is_ready());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_first_non_empty_map_is_entry_zero() {
        let clock = ManualClock::new();
        let (history, initial) = ready_engine(&clock);

        assert!(history.is_ready());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.current(), Some(&initial));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_spaced_edits_each_get_an_entry() {
        let clock = ManualClock::new();
        let (mut history, _) = ready_engine(&clock);

        let edits = 5;
        for i in 0..edits {
            let cards = cards_with(&[("hearts-A", &format!("edit {}", i))]);
            apply(&mut history, &cards, &clock);
            clock.advance_ms(501);
            history.tick(clock.now());
        }

        assert_eq!(history.len(), edits + 1);
        assert_eq!(history.cursor(), edits);
    }

    #[test]
    fn test_burst_collapses_to_final_state() {
        let clock = ManualClock::new();
        let (mut history, _) = ready_engine(&clock);

        for i in 0..10 {
            let cards = cards_with(&[("hearts-A", &format!("typing {}", i))]);
            apply(&mut history, &cards, &clock);
            clock.advance_ms(100);
            assert!(!history.tick(clock.now()));
        }

        clock.advance_ms(500);
        assert!(history.tick(clock.now()));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some(&cards_with(&[("hearts-A", "typing 9")])));
    }

    #[test]
    fn test_undo_then_redo_restores_exact_state() {
        let clock = ManualClock::new();
        let (mut history, _) = ready_engine(&clock);

        let middle = cards_with(&[("hearts-A", "middle"), ("clubs-K", "x")]);
        let last = cards_with(&[("hearts-A", "last")]);
        for cards in [&middle, &last] {
            apply(&mut history, cards, &clock);
            clock.advance_ms(600);
            history.tick(clock.now());
        }
        assert_eq!(history.len(), 3);

        // Step back to the middle entry
        let restored = history.undo().unwrap();
        assert_eq!(restored, middle);
        assert_eq!(history.mode(), HistoryMode::ApplyingHistory);
        assert_eq!(
            history.observe(&restored, clock.now()),
            Observation::Suppressed
        );
        assert_eq!(history.mode(), HistoryMode::Idle);

        // From a cursor strictly inside the log, undo then redo is identity
        let before = history.current().cloned().unwrap();
        let undone = history.undo().unwrap();
        history.observe(&undone, clock.now());
        let redone = history.redo().unwrap();
        history.observe(&redone, clock.now());
        assert_eq!(redone, before);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_replayed_change_is_not_recorded() {
        let clock = ManualClock::new();
        let (mut history, initial) = ready_engine(&clock);

        apply(&mut history, &cards_with(&[("hearts-A", "edited")]), &clock);
        clock.advance_ms(500);
        history.tick(clock.now());

        let restored = history.undo().unwrap();
        assert_eq!(restored, initial);
        history.observe(&restored, clock.now());
        clock.advance_ms(1000);
        assert!(!history.tick(clock.now()));
        assert_eq!(history.len(), 2);
        assert!(history.can_redo());
    }

    #[test]
    fn test_commit_after_undo_discards_redo_branch() {
        let clock = ManualClock::new();
        let (mut history, _) = ready_engine(&clock);

        for title in ["b", "c"] {
            apply(&mut history, &cards_with(&[("hearts-A", title)]), &clock);
            clock.advance_ms(500);
            history.tick(clock.now());
        }
        let restored = history.undo().unwrap();
        history.observe(&restored, clock.now());
        assert!(history.can_redo());

        let branch = cards_with(&[("hearts-A", "branch")]);
        apply(&mut history, &branch, &clock);
        clock.advance_ms(500);
        assert!(history.tick(clock.now()));

        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some(&branch));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_at_start_and_redo_at_end_are_no_ops() {
        let clock = ManualClock::new();
        let (mut history, _) = ready_engine(&clock);

        assert!(history.undo().is_none());
        assert_eq!(history.mode(), HistoryMode::Idle);
        assert!(history.redo().is_none());
        assert_eq!(history.mode(), HistoryMode::Idle);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_undo_commits_pending_edit_first() {
        let clock = ManualClock::new();
        let (mut history, initial) = ready_engine(&clock);

        apply(&mut history, &cards_with(&[("hearts-A", "quick")]), &clock);
        clock.advance_ms(100);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let restored = history.undo().unwrap();
        assert_eq!(restored, initial);
        assert_eq!(history.len(), 2);
        assert!(!history.has_pending());
    }

    #[test]
    fn test_next_deadline_follows_debounce() {
        let clock = ManualClock::new();
        let mut history = HistoryEngine::new(Duration::from_millis(250));
        history.observe(&cards_with(&[("spades-2", "x")]), clock.now());
        assert!(history.next_deadline().is_none());

        let at = clock.now();
        history.observe(&cards_with(&[("spades-2", "y")]), at);
        assert_eq!(history.next_deadline(), Some(at + Duration::from_millis(250)));
    }
}
