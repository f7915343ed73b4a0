//! Anchor/cursor selection with click-count detection.

use crate::buffer::Buffer;
use core_text::Position;
use std::time::{Duration, Instant};

/// Previous-click window for multi-click detection.
const CLICK_WINDOW: Duration = Duration::from_millis(400);
/// Maximum column drift between clicks of a multi-click.
const CLICK_SLOP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Char,
    Word,
    Line,
}

#[derive(Debug, Default)]
pub struct Selection {
    pub active: bool,
    pub anchor: Position,
    pub cursor: Position,
    pub mode: SelectionMode,
    pub click_count: u8,
    last_click_time: Option<Instant>,
    last_click_pos: Position,
}

impl Selection {
    /// Anchor a fresh character selection at `pos`.
    pub fn start(&mut self, pos: Position) {
        self.active = true;
        self.anchor = pos;
        self.cursor = pos;
        self.mode = SelectionMode::Char;
    }

    /// Move the cursor end, promoting to active first when needed.
    pub fn extend(&mut self, pos: Position) {
        if !self.active {
            self.start(pos);
        }
        self.cursor = pos;
    }

    /// Deactivate without touching click state.
    pub fn clear(&mut self) {
        self.active = false;
    }

    pub fn is_empty(&self) -> bool {
        !self.active || self.anchor == self.cursor
    }

    /// Endpoints in document order.
    pub fn normalized(&self) -> (Position, Position) {
        if self.anchor <= self.cursor {
            (self.anchor, self.cursor)
        } else {
            (self.cursor, self.anchor)
        }
    }

    /// Containment is half-open: `start <= pos < end`.
    pub fn contains(&self, pos: Position) -> bool {
        if self.is_empty() {
            return false;
        }
        let (start, end) = self.normalized();
        start <= pos && pos < end
    }

    /// Register a click and return the cycled click count (1..=3).
    pub fn register_click(&mut self, pos: Position, now: Instant) -> u8 {
        let chained = self.last_click_time.is_some_and(|t| {
            now.duration_since(t) <= CLICK_WINDOW
                && pos.row == self.last_click_pos.row
                && pos.col.abs_diff(self.last_click_pos.col) <= CLICK_SLOP
        });
        self.click_count = if chained {
            match self.click_count {
                1 => 2,
                2 => 3,
                _ => 1,
            }
        } else {
            1
        };
        self.last_click_time = Some(now);
        self.last_click_pos = pos;
        self.click_count
    }

    /// Expand around `pos` while cells are neither whitespace nor
    /// punctuation.
    pub fn select_word(&mut self, buffer: &Buffer, pos: Position) {
        let Some(row) = buffer.row(pos.row) else {
            return;
        };
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let mut start = pos.col.min(row.len());
        let mut end = start;
        while start > 0 && row.char_at(start - 1).is_some_and(is_word) {
            start -= 1;
        }
        while end < row.len() && row.char_at(end).is_some_and(is_word) {
            end += 1;
        }
        self.active = true;
        self.mode = SelectionMode::Word;
        self.anchor = Position::new(pos.row, start);
        self.cursor = Position::new(pos.row, end);
    }

    /// Span column 0 through the row length.
    pub fn select_line(&mut self, buffer: &Buffer, row: usize) {
        self.active = true;
        self.mode = SelectionMode::Line;
        self.anchor = Position::new(row, 0);
        self.cursor = Position::new(row, buffer.row_len(row));
    }

    pub fn select_all(&mut self, buffer: &Buffer) {
        self.active = true;
        self.mode = SelectionMode::Char;
        self.anchor = Position::origin();
        let last = buffer.row_count().saturating_sub(1);
        self.cursor = Position::new(last, buffer.row_len(last));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(lines: &[&str]) -> Buffer {
        let mut b = Buffer::new();
        for (i, l) in lines.iter().enumerate() {
            b.insert_row(i, l);
        }
        b
    }

    #[test]
    fn empty_selection_contains_nothing() {
        let mut sel = Selection::default();
        sel.start(Position::new(0, 3));
        assert!(sel.is_empty());
        assert!(!sel.contains(Position::new(0, 3)));
    }

    #[test]
    fn containment_is_half_open() {
        let mut sel = Selection::default();
        sel.start(Position::new(0, 2));
        sel.extend(Position::new(1, 1));
        assert!(sel.contains(Position::new(0, 2)));
        assert!(sel.contains(Position::new(0, 99)));
        assert!(sel.contains(Position::new(1, 0)));
        assert!(!sel.contains(Position::new(1, 1)));
    }

    #[test]
    fn normalized_orders_reversed_endpoints() {
        let mut sel = Selection::default();
        sel.start(Position::new(2, 5));
        sel.extend(Position::new(1, 0));
        let (start, end) = sel.normalized();
        assert_eq!(start, Position::new(1, 0));
        assert_eq!(end, Position::new(2, 5));
    }

    #[test]
    fn click_count_cycles_and_resets() {
        let mut sel = Selection::default();
        let t0 = Instant::now();
        let pos = Position::new(0, 4);
        assert_eq!(sel.register_click(pos, t0), 1);
        assert_eq!(sel.register_click(pos, t0 + Duration::from_millis(100)), 2);
        assert_eq!(sel.register_click(pos, t0 + Duration::from_millis(200)), 3);
        // A fourth rapid click starts over.
        assert_eq!(sel.register_click(pos, t0 + Duration::from_millis(300)), 1);
        // Too slow resets.
        assert_eq!(sel.register_click(pos, t0 + Duration::from_secs(2)), 1);
        // Too far away resets.
        sel.register_click(pos, t0 + Duration::from_secs(3));
        assert_eq!(
            sel.register_click(Position::new(0, 9), t0 + Duration::from_secs(3)),
            1
        );
    }

    #[test]
    fn word_selection_stops_at_punctuation() {
        let b = buf(&["foo(bar_baz, qux)"]);
        let mut sel = Selection::default();
        sel.select_word(&b, Position::new(0, 6));
        assert_eq!(sel.anchor, Position::new(0, 4));
        assert_eq!(sel.cursor, Position::new(0, 11));
        assert_eq!(sel.mode, SelectionMode::Word);
    }

    #[test]
    fn select_all_covers_buffer() {
        let b = buf(&["one", "two"]);
        let mut sel = Selection::default();
        sel.select_all(&b);
        assert_eq!(sel.normalized(), (Position::origin(), Position::new(1, 3)));
    }
}
