//! Row store leaf: raw cells, derived render state, and cursor math.
//!
//! A `Row` owns four parallel buffers: the raw `chars` the file is made of,
//! the `render` expansion (tabs to 8-column stops), a per-render-cell
//! `highlight` classification, and the cached soft-wrap break list. All
//! derived state is regenerated whenever the raw cells change; highlight
//! content is owned by the caller (the buffer re-scans after mutations) but
//! its length is kept in lockstep with `render` here so the invariant
//! `render.len() == highlight.len()` holds in every reachable state.
//!
//! Every cell renders as exactly one display column except tabs. Cursor
//! columns (`cx`) index `chars`; render columns (`rx`) index `render`.

use core_syntax::Highlight;

pub mod wrap;

/// Tab stops land on the next multiple of this.
pub const TAB_STOP: usize = 8;

/// A file position as (row index, cursor column).
///
/// Lexicographic ordering on `(row, col)` is the document order used by the
/// selection model and cursor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn origin() -> Self {
        Self { row: 0, col: 0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    chars: Vec<char>,
    render: Vec<char>,
    highlight: Vec<Highlight>,
    pub open_comment: bool,
    /// Exposed for UI layers; the core never reads it.
    pub dirty: bool,
    wrap_breaks: Vec<usize>,
    wrap_width: usize,
}

impl Row {
    pub fn new(text: &str) -> Self {
        let mut row = Self {
            chars: text.chars().collect(),
            ..Self::default()
        };
        row.update_render();
        row
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cells(&self) -> &[char] {
        &self.chars
    }

    pub fn char_at(&self, cx: usize) -> Option<char> {
        self.chars.get(cx).copied()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Column of the first non-whitespace cell, or the row length when blank.
    pub fn first_non_ws(&self) -> usize {
        self.chars
            .iter()
            .position(|c| !c.is_whitespace())
            .unwrap_or(self.chars.len())
    }

    pub fn leading_whitespace(&self) -> String {
        self.chars[..self.first_non_ws()].iter().collect()
    }

    pub fn insert_char(&mut self, at: usize, c: char) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, c);
        self.update_render();
    }

    /// Remove and return the cell at `at`. Out-of-range is the caller's bug;
    /// mutation paths clamp before calling.
    pub fn delete_char(&mut self, at: usize) -> char {
        let c = self.chars.remove(at);
        self.update_render();
        c
    }

    pub fn append_str(&mut self, s: &str) {
        self.chars.extend(s.chars());
        self.update_render();
    }

    /// Truncate to `at` cells, returning the removed tail.
    pub fn split_off(&mut self, at: usize) -> String {
        let at = at.min(self.chars.len());
        let tail: String = self.chars.split_off(at).into_iter().collect();
        self.update_render();
        tail
    }

    pub fn remove_range(&mut self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        let removed: String = self.chars.drain(start..end).collect();
        self.update_render();
        removed
    }

    pub fn render(&self) -> &[char] {
        &self.render
    }

    pub fn render_len(&self) -> usize {
        self.render.len()
    }

    pub fn render_text(&self) -> String {
        self.render.iter().collect()
    }

    pub fn highlight(&self) -> &[Highlight] {
        &self.highlight
    }

    /// Install a fresh classification. Length must match the render buffer.
    pub fn set_highlight(&mut self, hl: Vec<Highlight>, open_comment: bool) {
        debug_assert_eq!(hl.len(), self.render.len());
        self.highlight = hl;
        self.open_comment = open_comment;
    }

    /// Paint a transient class over a render span, e.g. the current search
    /// match; the caller keeps the saved slice for restoration.
    pub fn paint(&mut self, start: usize, len: usize, class: Highlight) -> Vec<Highlight> {
        let end = (start + len).min(self.highlight.len());
        let start = start.min(end);
        let saved = self.highlight[start..end].to_vec();
        for cell in &mut self.highlight[start..end] {
            *cell = class;
        }
        saved
    }

    pub fn restore(&mut self, start: usize, saved: &[Highlight]) {
        for (i, h) in saved.iter().enumerate() {
            if let Some(cell) = self.highlight.get_mut(start + i) {
                *cell = *h;
            }
        }
    }

    /// Cursor column to render column: tabs jump to the next multiple of
    /// [`TAB_STOP`], every other cell advances one column.
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0;
        for c in self.chars.iter().take(cx) {
            if *c == '\t' {
                rx += TAB_STOP - (rx % TAB_STOP);
            } else {
                rx += 1;
            }
        }
        rx
    }

    /// Inverse mapping: the largest `cx` whose render column is ≤ `rx`.
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur = 0;
        for (cx, c) in self.chars.iter().enumerate() {
            if *c == '\t' {
                cur += TAB_STOP - (cur % TAB_STOP);
            } else {
                cur += 1;
            }
            if cur > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    fn update_render(&mut self) {
        self.render.clear();
        for c in &self.chars {
            if *c == '\t' {
                self.render.push(' ');
                while self.render.len() % TAB_STOP != 0 {
                    self.render.push(' ');
                }
            } else {
                self.render.push(*c);
            }
        }
        // Stale until the owner re-scans; length stays in lockstep.
        self.highlight.resize(self.render.len(), Highlight::Normal);
        if self.wrap_width > 0 {
            wrap::compute_breaks(&self.render, self.wrap_width, &mut self.wrap_breaks);
        } else {
            self.wrap_breaks.clear();
        }
    }

    /// Re-segment for `width` columns (0 disables soft wrap). Cached until
    /// the width or the raw cells change.
    pub fn rewrap(&mut self, width: usize) {
        if width == self.wrap_width {
            return;
        }
        self.wrap_width = width;
        if width > 0 {
            wrap::compute_breaks(&self.render, width, &mut self.wrap_breaks);
        } else {
            self.wrap_breaks.clear();
        }
    }

    pub fn wrap_breaks(&self) -> &[usize] {
        &self.wrap_breaks
    }

    /// Number of visual rows this row occupies.
    pub fn wrap_row_count(&self) -> usize {
        self.wrap_breaks.len() + 1
    }

    /// Map a render column to its (wrap segment, column within segment).
    pub fn segment_of_rx(&self, rx: usize) -> (usize, usize) {
        let mut seg = 0;
        let mut start = 0;
        for b in &self.wrap_breaks {
            if rx < *b {
                break;
            }
            start = *b;
            seg += 1;
        }
        (seg, rx - start)
    }

    /// Half-open render-column bounds of a wrap segment.
    pub fn segment_bounds(&self, seg: usize) -> (usize, usize) {
        let start = if seg == 0 {
            0
        } else {
            self.wrap_breaks[seg - 1]
        };
        let end = self
            .wrap_breaks
            .get(seg)
            .copied()
            .unwrap_or(self.render.len());
        (start, end)
    }
}
