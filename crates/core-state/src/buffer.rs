//! The row buffer: ordered rows, the file cursor, and file round-trips.
//!
//! Every mutation regenerates the affected row's render and highlight state
//! and bumps the dirty counter. When a scan flips a row's `open_comment`,
//! following rows are re-scanned iteratively until the flag stabilises, so
//! pathological files cannot grow the stack.

use anyhow::{Context, Result};
use core_syntax::{Syntax, scan_row};
use core_text::{Position, Row};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Default)]
pub struct Buffer {
    rows: Vec<Row>,
    /// The file cursor: `cursor.row == rows.len()` means one past the last
    /// row; `cursor.col` is clamped on every row transition.
    pub cursor: Position,
    dirty: u64,
    pub file_name: Option<PathBuf>,
    syntax: Option<Syntax>,
    wrap_width: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file into one row per line, trimming trailing CR/LF.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut buffer = Self {
            file_name: Some(path.to_path_buf()),
            syntax: Syntax::for_path(path),
            ..Self::default()
        };
        for line in BufReader::new(file).lines() {
            let mut line = line.with_context(|| format!("read {}", path.display()))?;
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            buffer.rows.push(Row::new(&line));
        }
        buffer.rescan_all();
        info!(
            target: "state.buffer",
            path = %path.display(),
            rows = buffer.rows.len(),
            syntax = buffer.syntax.as_ref().map(Syntax::name),
            "opened"
        );
        Ok(buffer)
    }

    /// Join all rows with `\n` (each saved row followed by exactly one) and
    /// rewrite the file with permissions 0644.
    pub fn save(&mut self, path: &Path) -> Result<u64> {
        let contents = self.contents();
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = file.set_permissions(std::fs::Permissions::from_mode(0o644));
        }
        self.dirty = 0;
        info!(target: "state.buffer", path = %path.display(), bytes = contents.len(), "saved");
        Ok(contents.len() as u64)
    }

    pub fn contents(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&row.text());
            out.push('\n');
        }
        out
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&Row> {
        self.rows.get(i)
    }

    /// Mutable row access for transient highlight painting only; chars
    /// mutations go through the buffer so derived state stays consistent.
    pub fn row_mut(&mut self, i: usize) -> Option<&mut Row> {
        self.rows.get_mut(i)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_len(&self, i: usize) -> usize {
        self.rows.get(i).map_or(0, Row::len)
    }

    /// Mutation counter; zero means unmodified since the last save.
    pub fn dirty(&self) -> u64 {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty > 0
    }

    pub fn syntax(&self) -> Option<&Syntax> {
        self.syntax.as_ref()
    }

    pub fn set_syntax(&mut self, syntax: Option<Syntax>) {
        self.syntax = syntax;
        self.rescan_all();
    }

    /// Re-derive the language from the file name's extension.
    pub fn detect_syntax(&mut self) {
        let syntax = self.file_name.as_deref().and_then(Syntax::for_path);
        self.set_syntax(syntax);
    }

    /// Current soft-wrap width (0 when wrap is off).
    pub fn wrap_width(&self) -> usize {
        self.wrap_width
    }

    pub fn set_wrap_width(&mut self, width: usize) {
        if self.wrap_width == width {
            return;
        }
        self.wrap_width = width;
        for row in &mut self.rows {
            row.rewrap(width);
        }
        debug!(target: "state.buffer", width, "rewrapped");
    }

    pub fn insert_row(&mut self, at: usize, text: &str) {
        let at = at.min(self.rows.len());
        let mut row = Row::new(text);
        row.rewrap(self.wrap_width);
        self.rows.insert(at, row);
        self.dirty += 1;
        self.rescan_from(at);
    }

    pub fn delete_row(&mut self, at: usize) -> Option<Row> {
        if at >= self.rows.len() {
            return None;
        }
        let row = self.rows.remove(at);
        self.dirty += 1;
        if at < self.rows.len() {
            self.rescan_from(at);
        }
        self.clamp_cursor();
        Some(row)
    }

    pub fn insert_char(&mut self, row: usize, col: usize, c: char) {
        if let Some(r) = self.rows.get_mut(row) {
            r.insert_char(col, c);
            self.dirty += 1;
            self.rescan_from(row);
        }
    }

    pub fn delete_char(&mut self, row: usize, col: usize) -> Option<char> {
        let r = self.rows.get_mut(row)?;
        if col >= r.len() {
            return None;
        }
        let c = r.delete_char(col);
        self.dirty += 1;
        self.rescan_from(row);
        Some(c)
    }

    pub fn append_to_row(&mut self, row: usize, s: &str) {
        if let Some(r) = self.rows.get_mut(row) {
            r.append_str(s);
            self.dirty += 1;
            self.rescan_from(row);
        }
    }

    /// Split `row` at `col`; the tail becomes a new row below.
    pub fn split_row(&mut self, row: usize, col: usize) {
        if row >= self.rows.len() {
            return;
        }
        let tail = self.rows[row].split_off(col);
        let mut new_row = Row::new(&tail);
        new_row.rewrap(self.wrap_width);
        self.rows.insert(row + 1, new_row);
        self.dirty += 1;
        self.rescan_from(row);
        // The tail row is freshly built and always needs its own scan.
        self.rescan_from(row + 1);
    }

    /// Append `row` onto `row - 1` and remove it; returns the join column.
    pub fn merge_row_up(&mut self, row: usize) -> Option<usize> {
        if row == 0 || row >= self.rows.len() {
            return None;
        }
        let dying = self.rows.remove(row);
        let join_col = self.rows[row - 1].len();
        self.rows[row - 1].append_str(&dying.text());
        self.dirty += 1;
        self.rescan_from(row - 1);
        Some(join_col)
    }

    pub fn insert_str_in_row(&mut self, row: usize, col: usize, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(r) = self.rows.get_mut(row) {
            for (k, c) in s.chars().enumerate() {
                r.insert_char(col + k, c);
            }
            self.dirty += 1;
            self.rescan_from(row);
        }
    }

    /// Truncate a row at `col`, returning the removed tail.
    pub fn truncate_row(&mut self, row: usize, col: usize) -> String {
        let Some(r) = self.rows.get_mut(row) else {
            return String::new();
        };
        let tail = r.split_off(col);
        if !tail.is_empty() {
            self.dirty += 1;
            self.rescan_from(row);
        }
        tail
    }

    /// Read-only extraction of `[start, end)`, rows joined by `\n`.
    pub fn text_in_range(&self, start: Position, end: Position) -> String {
        if start >= end || start.row >= self.rows.len() {
            return String::new();
        }
        if start.row == end.row {
            return self.rows[start.row].text_range(start.col, end.col);
        }
        let mut out = self.rows[start.row].text_range(start.col, self.rows[start.row].len());
        for row in &self.rows[start.row + 1..end.row.min(self.rows.len())] {
            out.push('\n');
            out.push_str(&row.text());
        }
        if let Some(last) = self.rows.get(end.row) {
            out.push('\n');
            out.push_str(&last.text_range(0, end.col));
        }
        out
    }

    pub fn remove_in_row(&mut self, row: usize, start: usize, end: usize) -> String {
        let Some(r) = self.rows.get_mut(row) else {
            return String::new();
        };
        let removed = r.remove_range(start, end);
        if !removed.is_empty() {
            self.dirty += 1;
            self.rescan_from(row);
        }
        removed
    }

    /// Clamp the cursor to `row <= rows.len()` and `col <= row length`.
    pub fn clamp_cursor(&mut self) {
        if self.cursor.row > self.rows.len() {
            self.cursor.row = self.rows.len();
        }
        let max = self.row_len(self.cursor.row);
        if self.cursor.col > max {
            self.cursor.col = max;
        }
    }

    fn rescan_all(&mut self) {
        for y in 0..self.rows.len() {
            let prev_open = y > 0 && self.rows[y - 1].open_comment;
            let scan = scan_row(self.syntax.as_ref(), self.rows[y].render(), prev_open);
            self.rows[y].set_highlight(scan.highlight, scan.open_comment);
        }
    }

    /// Re-run the scanner at `row`, walking forward while `open_comment`
    /// keeps flipping. Iterative on purpose: a file alternating comment
    /// state on every row must not grow the stack.
    fn rescan_from(&mut self, row: usize) {
        let mut y = row;
        while y < self.rows.len() {
            let prev_open = y > 0 && self.rows[y - 1].open_comment;
            let before = self.rows[y].open_comment;
            let scan = scan_row(self.syntax.as_ref(), self.rows[y].render(), prev_open);
            let after = scan.open_comment;
            self.rows[y].set_highlight(scan.highlight, after);
            if before == after {
                break;
            }
            y += 1;
        }
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
    fn empty_buffer_is_legal() {
        let mut b = buf(&["only"]);
        b.delete_row(0);
        assert_eq!(b.row_count(), 0);
        assert_eq!(b.cursor, Position::origin());
    }

    #[test]
    fn dirty_counts_every_mutation() {
        let mut b = buf(&["ab"]);
        let before = b.dirty();
        b.insert_char(0, 1, 'x');
        b.delete_char(0, 0);
        assert_eq!(b.dirty(), before + 2);
    }

    #[test]
    fn merge_returns_join_column() {
        let mut b = buf(&["abc", "def"]);
        assert_eq!(b.merge_row_up(1), Some(3));
        assert_eq!(b.row_count(), 1);
        assert_eq!(b.row(0).unwrap().text(), "abcdef");
    }

    #[test]
    fn open_comment_propagates_forward() {
        let mut b = Buffer::new();
        b.set_syntax(core_syntax::Syntax::for_path(Path::new("t.rs")));
        b.insert_row(0, "start");
        b.insert_row(1, "plain ( text");
        b.insert_row(2, "end");
        assert!(!b.row(1).unwrap().open_comment);

        // Opening a block comment on row 0 drags rows 1 and 2 into it.
        for (i, c) in "/*".chars().enumerate() {
            b.insert_char(0, i, c);
        }
        assert!(b.row(0).unwrap().open_comment);
        assert!(b.row(1).unwrap().open_comment);
        assert!(b.row(2).unwrap().open_comment);

        // Closing it on row 1 releases row 2.
        let len = b.row_len(1);
        b.insert_char(1, len, '*');
        b.insert_char(1, len + 1, '/');
        assert!(!b.row(1).unwrap().open_comment);
        assert!(!b.row(2).unwrap().open_comment);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "alpha\nbeta\r\ngamma\n").expect("seed file");

        let mut b = Buffer::from_file(&path).expect("open");
        assert_eq!(b.row_count(), 3);
        assert_eq!(b.row(1).unwrap().text(), "beta");

        b.insert_char(0, 0, 'x');
        assert!(b.is_dirty());
        b.save(&path.clone()).expect("save");
        assert!(!b.is_dirty());

        let reopened = Buffer::from_file(&path).expect("reopen");
        assert_eq!(reopened.contents(), b.contents());
        assert_eq!(reopened.row(0).unwrap().text(), "xalpha");
    }
}
