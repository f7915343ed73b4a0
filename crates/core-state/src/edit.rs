//! Editing operations at every cursor, with positional rebasing and
//! journaling.
//!
//! Batch discipline: snapshot all cursor positions (primary first), apply
//! the per-cursor edits in reverse document order so each edit's locus is
//! still valid when it runs, and rebase every live position through the
//! primitive delta of each mutation as it happens. Compound operations and
//! multi-cursor batches run inside one undo batch so they peel atomically.
//!
//! The primitive layer below the operations is the only place that touches
//! the buffer, the journal, and the live positions together; everything
//! above it composes primitives.

use crate::EditorState;
use crate::rebase::{self, Delta};
use crate::undo::{EditKind, UndoEntry};
use core_text::Position;
use tracing::trace;

/// Spaces per indent step.
pub const INDENT_WIDTH: usize = 4;

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn desc_order(positions: &[Position]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|a, b| positions[*b].cmp(&positions[*a]));
    order
}

fn adjust(positions: &mut [Position], delta: &Delta) {
    for p in positions.iter_mut() {
        *p = rebase::transform(*p, delta);
    }
}

impl EditorState {
    // ---------------------------------------------------------------------
    // Batch plumbing
    // ---------------------------------------------------------------------

    fn begin_edit(&mut self, atomic: bool) -> Vec<Position> {
        let positions = self.cursors.positions_with(self.buffer.cursor);
        if atomic || positions.len() > 1 {
            self.undo.begin_batch();
        }
        positions
    }

    pub(crate) fn finish_edit(&mut self, mut positions: Vec<Position>) {
        self.undo.end_batch();
        self.clamp_positions(&mut positions);
        self.buffer.cursor = positions[0];
        self.cursors.set_secondaries(&positions[1..]);
        self.buffer.clamp_cursor();
        self.cursors.dedup(self.buffer.cursor);
    }

    fn clamp_secondaries(&mut self) {
        let mut positions: Vec<Position> = self.cursors.iter().collect();
        self.clamp_positions(&mut positions);
        self.cursors.set_secondaries(&positions);
    }

    fn clamp_positions(&self, positions: &mut [Position]) {
        let count = self.buffer.row_count();
        for p in positions.iter_mut() {
            if p.row > count {
                p.row = count;
            }
            let max = if p.row == count {
                0
            } else {
                self.buffer.row_len(p.row)
            };
            if p.col > max {
                p.col = max;
            }
        }
    }

    /// An active selection is consumed by the next edit: deleted outright
    /// for a single cursor, dropped when secondaries are involved.
    fn take_selection_for_edit(&mut self) {
        if !self.selection.active {
            return;
        }
        if self.selection.is_empty() || !self.cursors.is_empty() {
            self.selection.clear();
            return;
        }
        self.delete_selection();
    }

    // ---------------------------------------------------------------------
    // Primitive layer: buffer mutation + journal entry + position rebasing
    // ---------------------------------------------------------------------

    fn ins_char(&mut self, at: Position, c: char, cb: Position, positions: &mut [Position]) {
        if at.row == self.buffer.row_count() {
            // Inserting one past the last row conjures an empty row first.
            // Appending at the end moves nothing, so there is no delta.
            self.undo.push(
                EditKind::InsertRow,
                cb,
                Position::new(at.row, 0),
                '\0',
                String::new(),
                at,
            );
            self.buffer.insert_row(at.row, "");
        }
        self.undo.push(EditKind::InsertChar, cb, at, c, String::new(), at);
        self.buffer.insert_char(at.row, at.col, c);
        adjust(
            positions,
            &Delta::InsertCols {
                row: at.row,
                col: at.col,
                n: 1,
            },
        );
    }

    /// Remove the cell at `at`, journaling it as backspace or forward
    /// deletion.
    fn del_cell(&mut self, at: Position, kind: EditKind, cb: Position, positions: &mut [Position]) {
        let Some(c) = self.buffer.row(at.row).and_then(|r| r.char_at(at.col)) else {
            return;
        };
        self.undo.push(kind, cb, at, c, String::new(), at);
        self.buffer.delete_char(at.row, at.col);
        adjust(
            positions,
            &Delta::DeleteCols {
                row: at.row,
                col: at.col,
                n: 1,
            },
        );
    }

    /// Merge `row` into its predecessor, journaling the merged-away payload
    /// and the join column.
    fn merge_up(&mut self, row: usize, cb: Position, positions: &mut [Position]) {
        if row == 0 || row >= self.buffer.row_count() {
            return;
        }
        let payload = self.buffer.row(row).map(|r| r.text()).unwrap_or_default();
        let join_col = self.buffer.row_len(row - 1);
        self.undo.push(
            EditKind::DeleteRow,
            cb,
            Position::new(row - 1, join_col),
            '\0',
            payload,
            Position::new(row - 1, join_col),
        );
        self.buffer.merge_row_up(row);
        adjust(positions, &Delta::MergeRow { row, join_col });
    }

    /// Split at `at`; indent cells are journaled separately by the caller so
    /// the split's inverse stays a plain concatenation.
    fn split(&mut self, at: Position, cb: Position, positions: &mut [Position]) {
        self.undo
            .push(EditKind::SplitRow, cb, at, '\0', String::new(), at);
        self.buffer.split_row(at.row, at.col);
        adjust(
            positions,
            &Delta::SplitRow {
                row: at.row,
                col: at.col,
                indent: 0,
            },
        );
    }

    fn insert_row_prim(&mut self, row: usize, text: &str, cb: Position, positions: &mut [Position]) {
        self.undo.push(
            EditKind::InsertRow,
            cb,
            Position::new(row, 0),
            '\0',
            text.to_string(),
            Position::new(row, 0),
        );
        self.buffer.insert_row(row, text);
        adjust(positions, &Delta::InsertRows { row, n: 1 });
    }

    /// Delete `[start, end)` as one journaled selection-delete.
    pub(crate) fn delete_range_prim(
        &mut self,
        start: Position,
        end: Position,
        cb: Position,
        positions: &mut [Position],
    ) -> String {
        let start = self.clamp_to_rows(start);
        let end = self.clamp_to_rows(end);
        if start >= end {
            return String::new();
        }
        let payload = self.buffer.text_in_range(start, end);
        self.undo
            .push(EditKind::DeleteSelection, cb, start, '\0', payload.clone(), end);
        self.delete_range_raw(start, end);
        adjust(positions, &Delta::DeleteRange { start, end });
        payload
    }

    /// Insert multi-line `text` at `at` as one journaled paste.
    pub(crate) fn insert_text_prim(
        &mut self,
        at: Position,
        text: &str,
        cb: Position,
        positions: &mut [Position],
    ) -> Position {
        if at.row == self.buffer.row_count() {
            self.undo.push(
                EditKind::InsertRow,
                cb,
                Position::new(at.row, 0),
                '\0',
                String::new(),
                at,
            );
            self.buffer.insert_row(at.row, "");
        }
        let end = self.insert_text_raw(at, text);
        self.undo
            .push(EditKind::Paste, cb, at, '\0', text.to_string(), end);
        adjust(positions, &Delta::InsertText { start: at, end });
        end
    }

    fn clamp_to_rows(&self, pos: Position) -> Position {
        let count = self.buffer.row_count();
        if count == 0 {
            return Position::origin();
        }
        let row = pos.row.min(count - 1);
        Position::new(row, pos.col.min(self.buffer.row_len(row)))
    }

    fn delete_range_raw(&mut self, start: Position, end: Position) {
        if start.row == end.row {
            self.buffer.remove_in_row(start.row, start.col, end.col);
            return;
        }
        let end_tail = self
            .buffer
            .row(end.row)
            .map(|r| r.text_range(end.col, r.len()))
            .unwrap_or_default();
        self.buffer.truncate_row(start.row, start.col);
        for r in (start.row + 1..=end.row).rev() {
            self.buffer.delete_row(r);
        }
        self.buffer.append_to_row(start.row, &end_tail);
    }

    fn insert_text_raw(&mut self, at: Position, text: &str) -> Position {
        let lines: Vec<&str> = text.split('\n').collect();
        if lines.len() == 1 {
            self.buffer.insert_str_in_row(at.row, at.col, lines[0]);
            return Position::new(at.row, at.col + lines[0].chars().count());
        }
        self.buffer.split_row(at.row, at.col);
        self.buffer.insert_str_in_row(at.row, at.col, lines[0]);
        for (i, line) in lines[1..lines.len() - 1].iter().enumerate() {
            self.buffer.insert_row(at.row + 1 + i, line);
        }
        let last_row = at.row + lines.len() - 1;
        let last = lines[lines.len() - 1];
        self.buffer.insert_str_in_row(last_row, 0, last);
        Position::new(last_row, last.chars().count())
    }

    // ---------------------------------------------------------------------
    // Character edits
    // ---------------------------------------------------------------------

    pub fn insert_char(&mut self, c: char) {
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(false);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            self.ins_char(at, c, cb, &mut positions);
            if c == '}' {
                let after = positions[idx];
                self.auto_unindent(after, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    /// After typing `}` as the line's first non-whitespace cell, pull the
    /// line back by one indent step.
    fn auto_unindent(&mut self, after: Position, cb: Position, positions: &mut [Position]) {
        let row = after.row;
        let Some(r) = self.buffer.row(row) else {
            return;
        };
        let fnw = r.first_non_ws();
        if r.char_at(fnw) != Some('}') || after.col != fnw + 1 {
            return;
        }
        let mut n = 0;
        while n < INDENT_WIDTH && n < fnw && r.char_at(n) == Some(' ') {
            n += 1;
        }
        for _ in 0..n {
            self.del_cell(Position::new(row, 0), EditKind::DeleteChar, cb, positions);
        }
    }

    pub fn insert_newline(&mut self) {
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            if at.row >= self.buffer.row_count() || at.col == 0 {
                // A fresh empty row above; the content row slides down.
                self.insert_row_prim(at.row, "", cb, &mut positions);
                continue;
            }
            let Some(row) = self.buffer.row(at.row) else {
                continue;
            };
            let mut indent = row.leading_whitespace();
            let brace = row.cells()[..at.col.min(row.len())]
                .iter()
                .rev()
                .find(|c| !c.is_whitespace())
                .copied();
            if brace == Some('{') {
                indent.push_str(&" ".repeat(INDENT_WIDTH));
            }
            self.split(at, cb, &mut positions);
            let new_row = at.row + 1;
            for (k, ch) in indent.chars().enumerate() {
                self.ins_char(Position::new(new_row, k), ch, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    pub fn backspace(&mut self) {
        if self.selection.active && !self.selection.is_empty() && self.cursors.is_empty() {
            self.delete_selection();
            return;
        }
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(false);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            if at.col == 0 {
                if at.row > 0 && at.row < self.buffer.row_count() {
                    self.merge_up(at.row, cb, &mut positions);
                }
                // (0,0) and one-past-the-end are silent no-ops.
            } else {
                self.del_cell(
                    Position::new(at.row, at.col - 1),
                    EditKind::DeleteChar,
                    cb,
                    &mut positions,
                );
            }
        }
        self.finish_edit(positions);
    }

    /// Right-arrow then backspace, composed per cursor.
    pub fn forward_delete(&mut self) {
        if self.selection.active && !self.selection.is_empty() && self.cursors.is_empty() {
            self.delete_selection();
            return;
        }
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(false);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            if at.row >= self.buffer.row_count() {
                continue;
            }
            if at.col < self.buffer.row_len(at.row) {
                self.del_cell(at, EditKind::DeleteCharForward, cb, &mut positions);
            } else if at.row + 1 < self.buffer.row_count() {
                self.merge_up(at.row + 1, cb, &mut positions);
            }
            // Last position of the last row: no-op.
        }
        self.finish_edit(positions);
    }

    pub fn delete_word_backward(&mut self) {
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            if at.col == 0 {
                if at.row > 0 && at.row < self.buffer.row_count() {
                    self.merge_up(at.row, cb, &mut positions);
                }
                continue;
            }
            let Some(row) = self.buffer.row(at.row) else {
                continue;
            };
            let cells = row.cells();
            let mut s = at.col.min(cells.len());
            while s > 0 && !is_word_char(cells[s - 1]) {
                s -= 1;
            }
            while s > 0 && is_word_char(cells[s - 1]) {
                s -= 1;
            }
            for _ in s..at.col {
                self.del_cell(Position::new(at.row, s), EditKind::DeleteChar, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    pub fn delete_word_forward(&mut self) {
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            if at.row >= self.buffer.row_count() {
                continue;
            }
            let len = self.buffer.row_len(at.row);
            if at.col >= len {
                if at.row + 1 < self.buffer.row_count() {
                    self.merge_up(at.row + 1, cb, &mut positions);
                }
                continue;
            }
            let Some(row) = self.buffer.row(at.row) else {
                continue;
            };
            let cells = row.cells();
            let mut e = at.col;
            while e < len && is_word_char(cells[e]) {
                e += 1;
            }
            while e < len && !is_word_char(cells[e]) {
                e += 1;
            }
            for _ in at.col..e {
                self.del_cell(at, EditKind::DeleteCharForward, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    // ---------------------------------------------------------------------
    // Line operations (one unique row at a time)
    // ---------------------------------------------------------------------

    fn unique_rows(&self, positions: &[Position], descending: bool) -> Vec<usize> {
        let count = self.buffer.row_count();
        let mut rows: Vec<usize> = positions
            .iter()
            .map(|p| p.row)
            .filter(|r| *r < count)
            .collect();
        rows.sort_unstable();
        rows.dedup();
        if descending {
            rows.reverse();
        }
        rows
    }

    pub fn duplicate_line(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            let text = self.buffer.row(r).map(|row| row.text()).unwrap_or_default();
            self.insert_row_prim(r + 1, &text, cb, &mut positions);
            for p in positions.iter_mut() {
                if p.row == r {
                    p.row = r + 1;
                }
            }
        }
        self.finish_edit(positions);
    }

    pub fn delete_line(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            let n = self.buffer.row_count();
            if n == 0 {
                break;
            }
            if n == 1 {
                let len = self.buffer.row_len(0);
                self.delete_range_prim(Position::origin(), Position::new(0, len), cb, &mut positions);
            } else if r + 1 < n {
                self.delete_range_prim(
                    Position::new(r, 0),
                    Position::new(r + 1, 0),
                    cb,
                    &mut positions,
                );
            } else {
                let prev_len = self.buffer.row_len(r - 1);
                self.delete_range_prim(
                    Position::new(r - 1, prev_len),
                    Position::new(r, self.buffer.row_len(r)),
                    cb,
                    &mut positions,
                );
            }
        }
        self.finish_edit(positions);
    }

    /// Append the next row with a single-space seam unless one already
    /// abuts it; the cursor lands on the join point.
    pub fn join_lines(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            if r + 1 >= self.buffer.row_count() {
                continue;
            }
            let (Some(left), Some(right)) = (self.buffer.row(r), self.buffer.row(r + 1)) else {
                continue;
            };
            let join_col = left.len();
            let need_space = !left.is_empty()
                && !right.is_empty()
                && !left.char_at(left.len() - 1).is_some_and(char::is_whitespace)
                && !right.char_at(0).is_some_and(char::is_whitespace);
            let on_seam: Vec<usize> = positions
                .iter()
                .enumerate()
                .filter(|(_, p)| p.row == r || p.row == r + 1)
                .map(|(i, _)| i)
                .collect();
            if need_space {
                self.ins_char(Position::new(r, join_col), ' ', cb, &mut positions);
            }
            self.merge_up(r + 1, cb, &mut positions);
            for i in on_seam {
                positions[i] = Position::new(r, join_col);
            }
        }
        self.finish_edit(positions);
    }

    pub fn move_line_up(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, false) {
            if r == 0 {
                continue;
            }
            self.swap_rows_down(r - 1, cb, &mut positions);
        }
        self.finish_edit(positions);
    }

    pub fn move_line_down(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            self.swap_rows_down(r, cb, &mut positions);
        }
        self.finish_edit(positions);
    }

    /// Swap rows `j` and `j+1`, journaled as remove-then-reinsert so replay
    /// and inversion reuse the range machinery.
    fn swap_rows_down(&mut self, j: usize, cb: Position, positions: &mut [Position]) {
        if j + 1 >= self.buffer.row_count() {
            return;
        }
        let text = self.buffer.row(j).map(|r| r.text()).unwrap_or_default();
        self.undo.push(
            EditKind::DeleteSelection,
            cb,
            Position::new(j, 0),
            '\0',
            format!("{text}\n"),
            Position::new(j + 1, 0),
        );
        self.buffer.delete_row(j);
        self.undo.push(
            EditKind::InsertRow,
            cb,
            Position::new(j + 1, 0),
            '\0',
            text.clone(),
            Position::new(j + 1, 0),
        );
        self.buffer.insert_row(j + 1, &text);
        for p in positions.iter_mut() {
            if p.row == j {
                p.row = j + 1;
            } else if p.row == j + 1 {
                p.row = j;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Indent and comment toggles
    // ---------------------------------------------------------------------

    pub fn indent_lines(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            let fnw = self.buffer.row(r).map(|row| row.first_non_ws()).unwrap_or(0);
            let frozen: Vec<(usize, usize)> = positions
                .iter()
                .enumerate()
                .filter(|(_, p)| p.row == r && p.col < fnw)
                .map(|(i, p)| (i, p.col))
                .collect();
            for k in 0..INDENT_WIDTH {
                self.ins_char(Position::new(r, k), ' ', cb, &mut positions);
            }
            for (i, col) in frozen {
                positions[i].col = col;
            }
        }
        self.finish_edit(positions);
    }

    pub fn unindent_lines(&mut self) {
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for r in self.unique_rows(&positions, true) {
            let Some(row) = self.buffer.row(r) else {
                continue;
            };
            let fnw = row.first_non_ws();
            let mut n = 0;
            while n < INDENT_WIDTH && row.char_at(n) == Some(' ') {
                n += 1;
            }
            if n == 0 {
                continue;
            }
            let frozen: Vec<(usize, usize)> = positions
                .iter()
                .enumerate()
                .filter(|(_, p)| p.row == r && p.col < fnw)
                .map(|(i, p)| (i, p.col))
                .collect();
            for _ in 0..n {
                self.del_cell(Position::new(r, 0), EditKind::DeleteChar, cb, &mut positions);
            }
            for (i, col) in frozen {
                positions[i].col = col.min(self.buffer.row_len(r));
            }
        }
        self.finish_edit(positions);
    }

    fn comment_markers(&self) -> (String, String, String) {
        let line = self
            .buffer
            .syntax()
            .and_then(|s| s.line_comment())
            .unwrap_or("//")
            .to_string();
        let (bs, be) = self
            .buffer
            .syntax()
            .and_then(|s| s.block_comment())
            .unwrap_or(("/*", "*/"));
        (line, bs.to_string(), be.to_string())
    }

    /// Uniform toggle: if every affected line is commented, uncomment them
    /// all; otherwise comment them all.
    pub fn toggle_line_comment(&mut self) {
        let (marker, _, _) = self.comment_markers();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        let rows: Vec<usize> = self
            .unique_rows(&positions, true)
            .into_iter()
            .filter(|r| self.buffer.row(*r).is_some_and(|row| row.first_non_ws() < row.len()))
            .collect();
        if rows.is_empty() {
            self.finish_edit(positions);
            return;
        }
        let all_commented = rows.iter().all(|r| self.line_is_commented(*r, &marker));
        for r in rows {
            if all_commented {
                self.uncomment_line(r, &marker, cb, &mut positions);
            } else {
                self.comment_line(r, &marker, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    fn line_is_commented(&self, r: usize, marker: &str) -> bool {
        let Some(row) = self.buffer.row(r) else {
            return false;
        };
        let fnw = row.first_non_ws();
        row.text_range(fnw, row.len()).starts_with(marker)
    }

    fn comment_line(&mut self, r: usize, marker: &str, cb: Position, positions: &mut [Position]) {
        let fnw = self.buffer.row(r).map(|row| row.first_non_ws()).unwrap_or(0);
        for (k, ch) in marker.chars().chain(std::iter::once(' ')).enumerate() {
            self.ins_char(Position::new(r, fnw + k), ch, cb, positions);
        }
    }

    fn uncomment_line(&mut self, r: usize, marker: &str, cb: Position, positions: &mut [Position]) {
        let Some(row) = self.buffer.row(r) else {
            return;
        };
        let fnw = row.first_non_ws();
        let mut remove = marker.chars().count();
        if row.char_at(fnw + remove) == Some(' ') {
            remove += 1;
        }
        for _ in 0..remove {
            self.del_cell(Position::new(r, fnw), EditKind::DeleteChar, cb, positions);
        }
    }

    /// Wrap or unwrap the non-whitespace span with `start … end` markers.
    pub fn toggle_block_comment(&mut self) {
        let (_, bs, be) = self.comment_markers();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        let rows: Vec<usize> = self
            .unique_rows(&positions, true)
            .into_iter()
            .filter(|r| self.buffer.row(*r).is_some_and(|row| row.first_non_ws() < row.len()))
            .collect();
        if rows.is_empty() {
            self.finish_edit(positions);
            return;
        }
        let all_wrapped = rows.iter().all(|r| self.line_is_block_commented(*r, &bs, &be));
        for r in rows {
            if all_wrapped {
                self.unwrap_block_comment(r, &bs, &be, cb, &mut positions);
            } else {
                self.wrap_block_comment(r, &bs, &be, cb, &mut positions);
            }
        }
        self.finish_edit(positions);
    }

    fn trimmed_span(&self, r: usize) -> Option<(usize, usize)> {
        let row = self.buffer.row(r)?;
        let fnw = row.first_non_ws();
        if fnw >= row.len() {
            return None;
        }
        let mut end = row.len();
        while end > fnw && row.char_at(end - 1).is_some_and(char::is_whitespace) {
            end -= 1;
        }
        Some((fnw, end))
    }

    fn line_is_block_commented(&self, r: usize, bs: &str, be: &str) -> bool {
        let Some((fnw, end)) = self.trimmed_span(r) else {
            return false;
        };
        let Some(row) = self.buffer.row(r) else {
            return false;
        };
        let content = row.text_range(fnw, end);
        content.len() >= bs.len() + be.len() && content.starts_with(bs) && content.ends_with(be)
    }

    fn wrap_block_comment(&mut self, r: usize, bs: &str, be: &str, cb: Position, positions: &mut [Position]) {
        let Some((fnw, end)) = self.trimmed_span(r) else {
            return;
        };
        for (k, ch) in bs.chars().chain(std::iter::once(' ')).enumerate() {
            self.ins_char(Position::new(r, fnw + k), ch, cb, positions);
        }
        let tail_at = end + bs.chars().count() + 1;
        for (k, ch) in std::iter::once(' ').chain(be.chars()).enumerate() {
            self.ins_char(Position::new(r, tail_at + k), ch, cb, positions);
        }
    }

    fn unwrap_block_comment(&mut self, r: usize, bs: &str, be: &str, cb: Position, positions: &mut [Position]) {
        let Some((fnw, end)) = self.trimmed_span(r) else {
            return;
        };
        // Trailing marker first so the leading columns stay valid.
        let mut tail_at = end - be.chars().count();
        let mut tail_len = be.chars().count();
        if tail_at > fnw + bs.chars().count()
            && self.buffer.row(r).and_then(|row| row.char_at(tail_at - 1)) == Some(' ')
        {
            tail_at -= 1;
            tail_len += 1;
        }
        for _ in 0..tail_len {
            self.del_cell(Position::new(r, tail_at), EditKind::DeleteChar, cb, positions);
        }
        let mut head_len = bs.chars().count();
        if self.buffer.row(r).and_then(|row| row.char_at(fnw + head_len)) == Some(' ') {
            head_len += 1;
        }
        for _ in 0..head_len {
            self.del_cell(Position::new(r, fnw), EditKind::DeleteChar, cb, positions);
        }
    }

    // ---------------------------------------------------------------------
    // Selection, clipboard text, paste
    // ---------------------------------------------------------------------

    /// Concatenation of the selected row slices joined by single newlines.
    pub fn selected_text(&self) -> String {
        if self.selection.is_empty() {
            return String::new();
        }
        let (start, end) = self.selection.normalized();
        self.buffer
            .text_in_range(self.clamp_to_rows(start), self.clamp_to_rows(end))
    }

    /// Journal one selection-delete, collapse the endpoint rows, park the
    /// cursor at the start, and drop the selection.
    pub fn delete_selection(&mut self) {
        if !self.selection.active {
            return;
        }
        if self.selection.is_empty() {
            self.selection.clear();
            return;
        }
        let (start, end) = self.selection.normalized();
        let cb = self.buffer.cursor;
        let mut positions = self.cursors.positions_with(cb);
        self.delete_range_prim(start, end, cb, &mut positions);
        positions[0] = self.clamp_to_rows(start);
        self.selection.clear();
        self.finish_edit(positions);
    }

    pub fn paste(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.take_selection_for_edit();
        let mut positions = self.begin_edit(true);
        let cb = positions[0];
        for idx in desc_order(&positions) {
            let at = positions[idx];
            self.insert_text_prim(at, text, cb, &mut positions);
        }
        self.finish_edit(positions);
    }

    // ---------------------------------------------------------------------
    // Undo / redo
    // ---------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let Some(entries) = self.undo.peel_group() else {
            self.set_status("Nothing to undo");
            return false;
        };
        trace!(target: "state.edit", entries = entries.len(), "undo_group");
        for e in &entries {
            self.apply_inverse(e);
        }
        if let Some(first) = entries.last() {
            self.buffer.cursor = first.cursor_before;
        }
        self.selection.clear();
        self.buffer.clamp_cursor();
        self.clamp_secondaries();
        self.cursors.dedup(self.buffer.cursor);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(entries) = self.undo.replay_group() else {
            self.set_status("Nothing to redo");
            return false;
        };
        trace!(target: "state.edit", entries = entries.len(), "redo_group");
        for e in &entries {
            self.apply_forward(e);
        }
        self.selection.clear();
        self.buffer.clamp_cursor();
        self.clamp_secondaries();
        self.cursors.dedup(self.buffer.cursor);
        true
    }

    fn apply_inverse(&mut self, e: &UndoEntry) {
        match e.kind {
            EditKind::InsertChar => {
                self.buffer.delete_char(e.at.row, e.at.col);
                self.cursors.adjust(&Delta::DeleteCols {
                    row: e.at.row,
                    col: e.at.col,
                    n: 1,
                });
            }
            EditKind::DeleteChar | EditKind::DeleteCharForward => {
                self.buffer.insert_char(e.at.row, e.at.col, e.ch);
                self.cursors.adjust(&Delta::InsertCols {
                    row: e.at.row,
                    col: e.at.col,
                    n: 1,
                });
            }
            EditKind::InsertRow => {
                self.buffer.delete_row(e.at.row);
                self.cursors.adjust(&Delta::DeleteRows {
                    row: e.at.row,
                    n: 1,
                });
            }
            EditKind::DeleteRow => {
                // Restore the merged-away row by splitting at the recorded
                // join column; the payload is exactly the tail.
                self.buffer.split_row(e.at.row, e.at.col);
                self.cursors.adjust(&Delta::SplitRow {
                    row: e.at.row,
                    col: e.at.col,
                    indent: 0,
                });
            }
            EditKind::SplitRow => {
                self.buffer.merge_row_up(e.at.row + 1);
                self.cursors.adjust(&Delta::MergeRow {
                    row: e.at.row + 1,
                    join_col: e.at.col,
                });
            }
            EditKind::DeleteSelection => {
                let end = self.insert_text_raw(e.at, &e.payload);
                self.cursors.adjust(&Delta::InsertText {
                    start: e.at,
                    end,
                });
            }
            EditKind::Paste => {
                self.delete_range_raw(e.at, e.end);
                self.cursors.adjust(&Delta::DeleteRange {
                    start: e.at,
                    end: e.end,
                });
            }
        }
    }

    fn apply_forward(&mut self, e: &UndoEntry) {
        match e.kind {
            EditKind::InsertChar => {
                self.buffer.insert_char(e.at.row, e.at.col, e.ch);
                self.cursors.adjust(&Delta::InsertCols {
                    row: e.at.row,
                    col: e.at.col,
                    n: 1,
                });
                self.buffer.cursor = Position::new(e.at.row, e.at.col + 1);
            }
            EditKind::DeleteChar | EditKind::DeleteCharForward => {
                self.buffer.delete_char(e.at.row, e.at.col);
                self.cursors.adjust(&Delta::DeleteCols {
                    row: e.at.row,
                    col: e.at.col,
                    n: 1,
                });
                self.buffer.cursor = e.at;
            }
            EditKind::InsertRow => {
                self.buffer.insert_row(e.at.row, &e.payload);
                self.cursors.adjust(&Delta::InsertRows {
                    row: e.at.row,
                    n: 1,
                });
                self.buffer.cursor = if e.payload.is_empty() {
                    Position::new(e.at.row + 1, 0)
                } else {
                    Position::new(e.at.row, 0)
                };
            }
            EditKind::DeleteRow => {
                self.buffer.merge_row_up(e.at.row + 1);
                self.cursors.adjust(&Delta::MergeRow {
                    row: e.at.row + 1,
                    join_col: e.at.col,
                });
                self.buffer.cursor = e.at;
            }
            EditKind::SplitRow => {
                self.buffer.split_row(e.at.row, e.at.col);
                self.cursors.adjust(&Delta::SplitRow {
                    row: e.at.row,
                    col: e.at.col,
                    indent: 0,
                });
                self.buffer.cursor = Position::new(e.at.row + 1, 0);
            }
            EditKind::DeleteSelection => {
                self.delete_range_raw(e.at, e.end);
                self.cursors.adjust(&Delta::DeleteRange {
                    start: e.at,
                    end: e.end,
                });
                self.buffer.cursor = e.at;
            }
            EditKind::Paste => {
                let end = self.insert_text_raw(e.at, &e.payload);
                self.cursors.adjust(&Delta::InsertText {
                    start: e.at,
                    end,
                });
                self.buffer.cursor = end;
            }
        }
    }
}
