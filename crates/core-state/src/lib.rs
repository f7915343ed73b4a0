//! Editor state: the row buffer, selection, cursor set, undo journal,
//! search index, bracket matcher, and clipboard, plus the editing
//! operations tying them together.
//!
//! The state is a single instance with a defined lifecycle: created at
//! startup (optionally from a file), mutated by the event loop one key at a
//! time, torn down on exit. Nothing else mutates it; callers pass it by
//! reference instead of reaching for ambient globals.

use anyhow::Result;
use core_text::Position;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

pub mod brackets;
pub mod buffer;
pub mod clipboard;
pub mod cursors;
mod edit;
mod motion;
mod paragraph;
pub mod rebase;
pub mod search;
pub mod selection;
pub mod undo;

pub use brackets::BracketMatch;
pub use buffer::Buffer;
pub use clipboard::Clipboard;
pub use cursors::CursorSet;
pub use motion::Motion;
pub use search::SearchIndex;
pub use selection::{Selection, SelectionMode};
pub use undo::{EditKind, UndoJournal};

/// Status line messages fade after this long.
const STATUS_FADE: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct StatusMessage {
    text: String,
    since: Instant,
}

pub struct EditorState {
    pub buffer: Buffer,
    pub cursors: CursorSet,
    pub selection: Selection,
    pub undo: UndoJournal,
    pub search: SearchIndex,
    /// Recomputed every refresh; cleared when no pair encloses the cursor.
    pub bracket: Option<BracketMatch>,
    pub clipboard: Clipboard,
    status: Option<StatusMessage>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Buffer::new())
    }
}

impl EditorState {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            cursors: CursorSet::new(),
            selection: Selection::default(),
            undo: UndoJournal::new(),
            search: SearchIndex::new(),
            bracket: None,
            clipboard: Clipboard::new(),
            status: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Buffer::from_file(path)?))
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            since: Instant::now(),
        });
    }

    /// Current status text, unless it has faded.
    pub fn status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|m| m.since.elapsed() < STATUS_FADE)
            .map(|m| m.text.as_str())
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Refresh the bracket-match state for the current cursor.
    pub fn refresh_bracket_match(&mut self) {
        self.bracket = brackets::find_match(&self.buffer, self.buffer.cursor);
    }

    /// Add a secondary cursor one row above (or below) the current spread.
    pub fn add_cursor_vertical(&mut self, below: bool) {
        let all = self.cursors.positions_with(self.buffer.cursor);
        let target = if below {
            let max = all.iter().map(|p| p.row).max().unwrap_or(0);
            if max + 1 >= self.buffer.row_count() {
                return;
            }
            max + 1
        } else {
            let min = all.iter().map(|p| p.row).min().unwrap_or(0);
            let Some(row) = min.checked_sub(1) else {
                return;
            };
            row
        };
        let col = self.buffer.cursor.col.min(self.buffer.row_len(target));
        if self.cursors.add(Position::new(target, col)) {
            info!(target: "state.cursors", count = self.cursors.len() + 1, "cursor_added");
            self.set_status(format!("{} cursors", self.cursors.len() + 1));
        }
    }

    /// Add a secondary at the next occurrence of the word under the primary
    /// cursor, scanning forward with wrap-around.
    pub fn add_cursor_at_next_match(&mut self) {
        let cursor = self.buffer.cursor;
        let Some(row) = self.buffer.row(cursor.row) else {
            return;
        };
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let mut start = cursor.col.min(row.len());
        let mut end = start;
        while start > 0 && row.char_at(start - 1).is_some_and(is_word) {
            start -= 1;
        }
        while end < row.len() && row.char_at(end).is_some_and(is_word) {
            end += 1;
        }
        if start == end {
            return;
        }
        let word = row.text_range(start, end);
        let occupied: Vec<Position> = self
            .cursors
            .positions_with(cursor)
            .iter()
            .map(|p| Position::new(p.row, p.col))
            .collect();

        let total = self.buffer.row_count();
        let mut y = cursor.row;
        let mut from = end;
        for _ in 0..=total {
            if let Some(r) = self.buffer.row(y) {
                let text = r.text();
                let cells: Vec<char> = text.chars().collect();
                let needle: Vec<char> = word.chars().collect();
                let mut x = from;
                while x + needle.len() <= cells.len() {
                    let bounded = (x == 0 || !is_word(cells[x - 1]))
                        && (x + needle.len() == cells.len() || !is_word(cells[x + needle.len()]));
                    if bounded && cells[x..x + needle.len()] == needle[..] {
                        let pos = Position::new(y, x);
                        let at_word_start = Position::new(cursor.row, start);
                        if pos != at_word_start && !occupied.contains(&pos) {
                            self.cursors.add(pos);
                            self.set_status(format!("{} cursors", self.cursors.len() + 1));
                            return;
                        }
                    }
                    x += 1;
                }
            }
            y = (y + 1) % total.max(1);
            from = 0;
        }
    }

    /// Drop all secondaries (the Escape path).
    pub fn clear_secondary_cursors(&mut self) {
        if !self.cursors.is_empty() {
            self.cursors.clear();
            self.set_status("1 cursor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(lines: &[&str]) -> EditorState {
        let mut b = Buffer::new();
        for (i, l) in lines.iter().enumerate() {
            b.insert_row(i, l);
        }
        EditorState::new(b)
    }

    #[test]
    fn status_message_fades_logically() {
        let mut s = state(&["x"]);
        assert!(s.status().is_none());
        s.set_status("saved");
        assert_eq!(s.status(), Some("saved"));
        s.clear_status();
        assert!(s.status().is_none());
    }

    #[test]
    fn add_cursor_below_clamps_column() {
        let mut s = state(&["long line here", "ab", "more text"]);
        s.buffer.cursor = Position::new(0, 10);
        s.add_cursor_vertical(true);
        assert_eq!(s.cursors.iter().collect::<Vec<_>>(), vec![Position::new(1, 2)]);
        // The spread extends from its far edge.
        s.add_cursor_vertical(true);
        assert_eq!(s.cursors.len(), 2);
        assert!(s.cursors.iter().any(|p| p == Position::new(2, 9)));
    }

    #[test]
    fn add_cursor_above_stops_at_top() {
        let mut s = state(&["a", "b"]);
        s.buffer.cursor = Position::new(0, 0);
        s.add_cursor_vertical(false);
        assert!(s.cursors.is_empty());
    }

    #[test]
    fn next_match_cursor_lands_on_whole_word() {
        let mut s = state(&["foo bar", "xfoo foo"]);
        s.buffer.cursor = Position::new(0, 1);
        s.add_cursor_at_next_match();
        // "xfoo" is not a whole-word match; (1,5) is.
        assert_eq!(s.cursors.iter().collect::<Vec<_>>(), vec![Position::new(1, 5)]);
    }

    #[test]
    fn escape_clears_secondaries() {
        let mut s = state(&["a", "b"]);
        s.add_cursor_vertical(true);
        assert!(!s.cursors.is_empty());
        s.clear_secondary_cursors();
        assert!(s.cursors.is_empty());
    }
}
