//! Cursor movement, including visual-row vertical motion under soft wrap.

use crate::EditorState;
use crate::edit::is_word_char;
use core_text::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    WordLeft,
    WordRight,
    LineStart,
    LineEnd,
    /// Page movement carries the screen height in visual rows.
    PageUp(usize),
    PageDown(usize),
    BufferStart,
    BufferEnd,
}

impl EditorState {
    /// Move the primary cursor; secondaries follow when the set is
    /// configured to, and colliding cursors collapse.
    pub fn move_cursor(&mut self, motion: Motion) {
        self.buffer.cursor = self.apply_motion(self.buffer.cursor, motion);
        if self.cursors.follow_primary && !self.cursors.is_empty() {
            let moved: Vec<Position> = self
                .cursors
                .iter()
                .map(|p| self.apply_motion(p, motion))
                .collect();
            self.cursors.set_secondaries(&moved);
        }
        self.buffer.clamp_cursor();
        self.cursors.dedup(self.buffer.cursor);
    }

    /// The position `motion` carries `pos` to; cursor columns clamp on every
    /// row transition.
    pub fn apply_motion(&self, pos: Position, motion: Motion) -> Position {
        let count = self.buffer.row_count();
        let row_len = |r: usize| self.buffer.row_len(r);
        match motion {
            Motion::Left => {
                if pos.col > 0 {
                    Position::new(pos.row, pos.col - 1)
                } else if pos.row > 0 {
                    Position::new(pos.row - 1, row_len(pos.row - 1))
                } else {
                    pos
                }
            }
            Motion::Right => {
                if pos.col < row_len(pos.row) {
                    Position::new(pos.row, pos.col + 1)
                } else if pos.row < count {
                    Position::new(pos.row + 1, 0)
                } else {
                    pos
                }
            }
            Motion::Up => self.vertical(pos, false),
            Motion::Down => self.vertical(pos, true),
            Motion::WordLeft => self.word_left(pos),
            Motion::WordRight => self.word_right(pos),
            Motion::LineStart => Position::new(pos.row, 0),
            Motion::LineEnd => Position::new(pos.row, row_len(pos.row)),
            Motion::PageUp(rows) => {
                let mut p = pos;
                for _ in 0..rows.max(1) {
                    p = self.vertical(p, false);
                }
                p
            }
            Motion::PageDown(rows) => {
                let mut p = pos;
                for _ in 0..rows.max(1) {
                    p = self.vertical(p, true);
                }
                p
            }
            Motion::BufferStart => Position::origin(),
            Motion::BufferEnd => {
                let last = count.saturating_sub(1);
                Position::new(last, row_len(last))
            }
        }
    }

    /// One visual row up or down. With soft wrap off this is plain logical
    /// movement with a column clamp; with it on, the render column within
    /// the wrap segment is preserved across segments and rows.
    fn vertical(&self, pos: Position, down: bool) -> Position {
        let count = self.buffer.row_count();
        if self.buffer.wrap_width() == 0 {
            return if down {
                if pos.row < count {
                    let r = pos.row + 1;
                    Position::new(r, pos.col.min(self.buffer.row_len(r)))
                } else {
                    pos
                }
            } else if pos.row > 0 {
                let r = pos.row - 1;
                Position::new(r, pos.col.min(self.buffer.row_len(r)))
            } else {
                pos
            };
        }

        let Some(row) = self.buffer.row(pos.row) else {
            // One past the end: only upward movement makes sense.
            if !down && count > 0 {
                return Position::new(count - 1, 0);
            }
            return pos;
        };
        let rx = row.cx_to_rx(pos.col);
        let (seg, seg_col) = row.segment_of_rx(rx);

        if down {
            if seg + 1 < row.wrap_row_count() {
                let (start, end) = row.segment_bounds(seg + 1);
                let target = (start + seg_col).min(end.saturating_sub(1).max(start));
                Position::new(pos.row, row.rx_to_cx(target))
            } else if pos.row + 1 < count {
                let next = self.buffer.row(pos.row + 1).expect("row in bounds");
                let (start, end) = next.segment_bounds(0);
                let target = (start + seg_col).min(end);
                Position::new(pos.row + 1, next.rx_to_cx(target))
            } else if pos.row + 1 == count {
                Position::new(count, 0)
            } else {
                pos
            }
        } else if seg > 0 {
            let (start, _) = row.segment_bounds(seg - 1);
            Position::new(pos.row, row.rx_to_cx(start + seg_col))
        } else if pos.row > 0 {
            let prev = self.buffer.row(pos.row - 1).expect("row in bounds");
            let last = prev.wrap_row_count() - 1;
            let (start, end) = prev.segment_bounds(last);
            let target = (start + seg_col).min(end);
            Position::new(pos.row - 1, prev.rx_to_cx(target))
        } else {
            pos
        }
    }

    fn word_left(&self, pos: Position) -> Position {
        let mut p = pos;
        if p.col == 0 {
            if p.row == 0 {
                return p;
            }
            p = Position::new(p.row - 1, self.buffer.row_len(p.row - 1));
        }
        let Some(row) = self.buffer.row(p.row) else {
            return p;
        };
        let cells = row.cells();
        let mut c = p.col.min(cells.len());
        while c > 0 && !is_word_char(cells[c - 1]) {
            c -= 1;
        }
        while c > 0 && is_word_char(cells[c - 1]) {
            c -= 1;
        }
        Position::new(p.row, c)
    }

    fn word_right(&self, pos: Position) -> Position {
        let len = self.buffer.row_len(pos.row);
        if pos.col >= len {
            if pos.row < self.buffer.row_count() {
                return Position::new(pos.row + 1, 0);
            }
            return pos;
        }
        let Some(row) = self.buffer.row(pos.row) else {
            return pos;
        };
        let cells = row.cells();
        let mut c = pos.col;
        while c < len && is_word_char(cells[c]) {
            c += 1;
        }
        while c < len && !is_word_char(cells[c]) {
            c += 1;
        }
        Position::new(pos.row, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Buffer;

    fn state(lines: &[&str]) -> EditorState {
        let mut b = Buffer::new();
        for (i, l) in lines.iter().enumerate() {
            b.insert_row(i, l);
        }
        EditorState::new(b)
    }

    #[test]
    fn horizontal_movement_crosses_rows() {
        let mut s = state(&["ab", "cd"]);
        s.buffer.cursor = Position::new(0, 2);
        s.move_cursor(Motion::Right);
        assert_eq!(s.buffer.cursor, Position::new(1, 0));
        s.move_cursor(Motion::Left);
        assert_eq!(s.buffer.cursor, Position::new(0, 2));
    }

    #[test]
    fn vertical_clamps_column_without_wrap() {
        let mut s = state(&["long line", "ab"]);
        s.buffer.cursor = Position::new(0, 9);
        s.move_cursor(Motion::Down);
        assert_eq!(s.buffer.cursor, Position::new(1, 2));
    }

    #[test]
    fn wrapped_vertical_stays_in_render_column() {
        let long: String = "x".repeat(200);
        let mut s = state(&[&long]);
        s.buffer.set_wrap_width(80);
        // Render position 85 sits in segment 1 at offset 5.
        s.buffer.cursor = Position::new(0, 85);
        s.move_cursor(Motion::Up);
        assert_eq!(s.buffer.cursor, Position::new(0, 5));
        s.move_cursor(Motion::Down);
        assert_eq!(s.buffer.cursor, Position::new(0, 85));
    }

    #[test]
    fn word_motion_skips_runs() {
        let mut s = state(&["foo  bar_baz(qux)"]);
        s.buffer.cursor = Position::new(0, 0);
        s.move_cursor(Motion::WordRight);
        assert_eq!(s.buffer.cursor, Position::new(0, 5));
        s.move_cursor(Motion::WordRight);
        assert_eq!(s.buffer.cursor, Position::new(0, 13));
        s.move_cursor(Motion::WordLeft);
        assert_eq!(s.buffer.cursor, Position::new(0, 5));
    }

    #[test]
    fn secondaries_follow_when_configured() {
        let mut s = state(&["aaa", "bbb", "ccc"]);
        s.cursors.follow_primary = true;
        s.buffer.cursor = Position::new(0, 1);
        s.cursors.add(Position::new(1, 1));
        s.move_cursor(Motion::Right);
        assert_eq!(s.buffer.cursor, Position::new(0, 2));
        assert_eq!(s.cursors.iter().collect::<Vec<_>>(), vec![Position::new(1, 2)]);
    }

    #[test]
    fn secondaries_stay_put_otherwise() {
        let mut s = state(&["aaa", "bbb"]);
        s.buffer.cursor = Position::new(0, 0);
        s.cursors.add(Position::new(1, 1));
        s.move_cursor(Motion::Right);
        assert_eq!(s.cursors.iter().collect::<Vec<_>>(), vec![Position::new(1, 1)]);
    }
}
