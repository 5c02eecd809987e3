//! # Snapshot History
//!
//! Linear undo/redo over full-document snapshots.
//!
//! ## Design
//!
//! - Every capture clones the whole root container
//! - Capturing while the cursor is not at the end truncates the redo tail
//! - A capture identical to the entry under the cursor is dropped
//! - Captures are suppressed while a restore is running, and while a bulk
//!   external edit is being applied (except the single pre-image capture)
//! - The log is capped; the oldest entries are dropped first
//!
//! History only moves the cursor and hands out snapshots. Patching the live
//! tree back to a snapshot is the session's job.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(100);
//! history.capture(&body, CaptureMode::Normal);
//! // ... mutate body ...
//! history.capture(&body, CaptureMode::Normal);
//!
//! if let Some(snapshot) = history.step_back() {
//!     reconcile(&mut body, &snapshot.body, focused);
//! }
//! ```

use chrono::{DateTime, Utc};
use folio_dom::Element;
use tracing::debug;

/// Default maximum number of snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Immutable copy of the root container at a point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub body: Element,
    /// Serialized `body`, used for duplicate detection
    pub html: String,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn of(body: &Element) -> Self {
        Self {
            body: body.clone(),
            html: body.outer_html(),
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Normal,
    /// Taken right before a bulk external edit; ignores the bulk-edit flag
    PreImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A restore or bulk edit is in progress
    Suppressed,
    /// Identical to the entry under the cursor
    Duplicate,
    Recorded { index: usize },
}

impl CaptureOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, CaptureOutcome::Recorded { .. })
    }
}

/// Snapshot log with a cursor
#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    cursor: usize,
    restoring: bool,
    bulk_edit: bool,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            restoring: false,
            bulk_edit: false,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current entry, once anything was captured
    pub fn cursor(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.cursor)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn begin_restore(&mut self) {
        self.restoring = true;
    }

    pub fn end_restore(&mut self) {
        self.restoring = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn begin_bulk_edit(&mut self) {
        self.bulk_edit = true;
    }

    pub fn end_bulk_edit(&mut self) {
        self.bulk_edit = false;
    }

    pub fn is_bulk_edit(&self) -> bool {
        self.bulk_edit
    }

    pub fn capture(&mut self, body: &Element, mode: CaptureMode) -> CaptureOutcome {
        if self.restoring || (self.bulk_edit && mode != CaptureMode::PreImage) {
            debug!(restoring = self.restoring, bulk_edit = self.bulk_edit, "Capture suppressed");
            return CaptureOutcome::Suppressed;
        }

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }

        let snapshot = Snapshot::of(body);
        if self
            .entries
            .last()
            .is_some_and(|last| last.html == snapshot.html)
        {
            return CaptureOutcome::Duplicate;
        }

        self.entries.push(snapshot);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        debug!(index = self.cursor, len = self.entries.len(), "History captured");
        CaptureOutcome::Recorded { index: self.cursor }
    }

    /// Move the cursor back one entry and return the snapshot to restore
    pub fn step_back(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Move the cursor forward one entry and return the snapshot to restore
    pub fn step_forward(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(text: &str) -> Element {
        Element::new("body").with_child(Element::new("p").with_text(text))
    }

    #[test]
    fn test_capture_advances_cursor() {
        let mut history = History::default();
        assert_eq!(history.cursor(), None);
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(history.capture(&body(text), CaptureMode::Normal), CaptureOutcome::Recorded { index: i });
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_duplicate_capture_is_dropped() {
        let mut history = History::default();
        history.capture(&body("a"), CaptureMode::Normal);
        assert_eq!(history.capture(&body("a"), CaptureMode::Normal), CaptureOutcome::Duplicate);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_capture_after_undo_truncates_redo() {
        let mut history = History::default();
        history.capture(&body("a"), CaptureMode::Normal);
        history.capture(&body("b"), CaptureMode::Normal);
        history.capture(&body("c"), CaptureMode::Normal);
        history.step_back();
        history.step_back();

        assert!(history.capture(&body("d"), CaptureMode::Normal).is_recorded());
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert!(history.step_forward().is_none());
    }

    #[test]
    fn test_capture_equal_to_cursor_after_undo_still_truncates() {
        let mut history = History::default();
        history.capture(&body("a"), CaptureMode::Normal);
        history.capture(&body("b"), CaptureMode::Normal);
        history.step_back();

        assert_eq!(history.capture(&body("a"), CaptureMode::Normal), CaptureOutcome::Duplicate);
        assert_eq!(history.len(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_suppressed_while_restoring_or_bulk_editing() {
        let mut history = History::default();
        history.begin_restore();
        assert_eq!(history.capture(&body("a"), CaptureMode::Normal), CaptureOutcome::Suppressed);
        assert_eq!(history.capture(&body("a"), CaptureMode::PreImage), CaptureOutcome::Suppressed);
        history.end_restore();

        history.begin_bulk_edit();
        assert_eq!(history.capture(&body("a"), CaptureMode::Normal), CaptureOutcome::Suppressed);
        assert!(history.capture(&body("a"), CaptureMode::PreImage).is_recorded());
        history.end_bulk_edit();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for text in ["a", "b", "c", "d", "e"] {
            history.capture(&body(text), CaptureMode::Normal);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.entries()[0].body.text_content(), "c");
    }

    #[test]
    fn test_step_back_and_forward_bounds() {
        let mut history = History::default();
        assert!(history.step_back().is_none());
        history.capture(&body("a"), CaptureMode::Normal);
        history.capture(&body("b"), CaptureMode::Normal);

        assert_eq!(history.step_back().unwrap().body.text_content(), "a");
        assert!(history.step_back().is_none());
        assert_eq!(history.step_forward().unwrap().body.text_content(), "b");
        assert!(history.step_forward().is_none());
    }
}
