//! Transient substring search over render text.
//!
//! Results hold `(line, render offset, length)` triples and survive only
//! until the next buffer mutation; staleness is detected through the buffer
//! dirty counter and callers re-run the search as needed. The current match
//! is painted with a transient highlight class that must be restored before
//! the next action.

use crate::buffer::Buffer;
use core_syntax::Highlight;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub line: usize,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    matches: Vec<SearchMatch>,
    pub current: usize,
    stamp: u64,
    saved: Option<(usize, usize, Vec<Highlight>)>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Results are tied to the buffer revision they were computed against.
    pub fn is_stale(&self, buffer: &Buffer) -> bool {
        self.stamp != buffer.dirty()
    }

    pub fn clear(&mut self) {
        self.matches.clear();
        self.current = 0;
    }

    /// Scan every row's render string; occurrences step one past each hit.
    /// An empty query clears the results.
    pub fn run(&mut self, buffer: &Buffer, query: &str) {
        self.clear();
        self.stamp = buffer.dirty();
        if query.is_empty() {
            return;
        }
        let needle: Vec<char> = query.chars().collect();
        for (line, row) in buffer.rows().iter().enumerate() {
            let render = row.render();
            let mut offset = 0;
            while offset + needle.len() <= render.len() {
                if render[offset..offset + needle.len()] == needle[..] {
                    self.matches.push(SearchMatch {
                        line,
                        offset,
                        len: needle.len(),
                    });
                }
                offset += 1;
            }
        }
    }

    /// Step to the next match, wrapping; returns it for viewport placement.
    pub fn advance(&mut self, forward: bool) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let n = self.matches.len();
        self.current = if forward {
            (self.current + 1) % n
        } else {
            (self.current + n - 1) % n
        };
        Some(self.matches[self.current])
    }

    pub fn current_match(&self) -> Option<SearchMatch> {
        self.matches.get(self.current).copied()
    }

    /// Paint the current match; the previous classification is kept for
    /// [`restore`](Self::restore).
    pub fn paint_current(&mut self, buffer: &mut Buffer) {
        self.restore(buffer);
        let Some(m) = self.current_match() else {
            return;
        };
        if let Some(row) = buffer.row_mut(m.line) {
            let saved = row.paint(m.offset, m.len, Highlight::SearchMatch);
            self.saved = Some((m.line, m.offset, saved));
        }
    }

    /// Put back the highlight slice saved by the last paint.
    pub fn restore(&mut self, buffer: &mut Buffer) {
        if let Some((line, offset, saved)) = self.saved.take()
            && let Some(row) = buffer.row_mut(line)
        {
            row.restore(offset, &saved);
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
    fn finds_matches_across_rows() {
        let b = buf(&["abc abc", "no", "xabcx"]);
        let mut s = SearchIndex::new();
        s.run(&b, "abc");
        let got: Vec<(usize, usize)> = s.matches().iter().map(|m| (m.line, m.offset)).collect();
        assert_eq!(got, vec![(0, 0), (0, 4), (2, 1)]);
    }

    #[test]
    fn overlapping_hits_step_by_one() {
        let b = buf(&["aaaa"]);
        let mut s = SearchIndex::new();
        s.run(&b, "aa");
        assert_eq!(s.matches().len(), 3);
    }

    #[test]
    fn empty_query_clears() {
        let b = buf(&["abc"]);
        let mut s = SearchIndex::new();
        s.run(&b, "abc");
        assert!(!s.is_empty());
        s.run(&b, "");
        assert!(s.is_empty());
    }

    #[test]
    fn matches_against_render_columns() {
        // The tab expands, so "b" sits at render offset 8.
        let b = buf(&["a\tb"]);
        let mut s = SearchIndex::new();
        s.run(&b, "b");
        assert_eq!(s.matches()[0].offset, 8);
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let b = buf(&["x x x"]);
        let mut s = SearchIndex::new();
        s.run(&b, "x");
        assert_eq!(s.current, 0);
        s.advance(true);
        s.advance(true);
        assert_eq!(s.current, 2);
        s.advance(true);
        assert_eq!(s.current, 0);
        s.advance(false);
        assert_eq!(s.current, 2);
    }

    #[test]
    fn staleness_follows_dirty_counter() {
        let mut b = buf(&["abc"]);
        let mut s = SearchIndex::new();
        s.run(&b, "a");
        assert!(!s.is_stale(&b));
        b.insert_char(0, 0, 'z');
        assert!(s.is_stale(&b));
    }

    #[test]
    fn paint_restores_cleanly() {
        let mut b = buf(&["hello"]);
        let before = b.row(0).unwrap().highlight().to_vec();
        let mut s = SearchIndex::new();
        s.run(&b, "ell");
        s.paint_current(&mut b);
        assert_eq!(b.row(0).unwrap().highlight()[1], Highlight::SearchMatch);
        s.restore(&mut b);
        assert_eq!(b.row(0).unwrap().highlight(), &before[..]);
    }
}
