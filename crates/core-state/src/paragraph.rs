//! Paragraph reflow and join.
//!
//! A paragraph is the contiguous run of non-blank rows around the cursor.
//! The first line donates the prefix (leading whitespace plus an optional
//! `//` or `*` marker and one space); per-line prefixes are stripped, the
//! words are collapsed to single spaces, and the content is either re-wrapped
//! under the prefix or emitted as a single prefixed line.

use crate::EditorState;
use core_text::Position;

/// How far back from the wrap limit a whitespace break is searched for.
const WRAP_LOOKBACK: usize = 20;

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Split `content` (single-spaced words) into lines of at most `width`
/// cells, breaking at the latest space within the lookback window.
fn wrap_content(content: &str, width: usize) -> Vec<String> {
    let cells: Vec<char> = content.chars().collect();
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut s = 0;
    while cells.len() - s > width {
        let limit = s + width;
        let lo = limit.saturating_sub(WRAP_LOOKBACK).max(s + 1);
        let brk = (lo..=limit).rev().find(|i| cells[*i] == ' ');
        match brk {
            Some(w) => {
                lines.push(cells[s..w].iter().collect());
                s = w + 1;
            }
            None => {
                lines.push(cells[s..limit].iter().collect());
                s = limit;
            }
        }
    }
    lines.push(cells[s..].iter().collect());
    lines
}

/// Leading whitespace, optional comment marker, and the stripped remainder.
fn split_prefix(text: &str) -> (String, String) {
    let body_at = text.len() - text.trim_start().len();
    let (lead, rest) = text.split_at(body_at);
    let mut prefix = lead.to_string();
    let rest = if let Some(r) = rest.strip_prefix("//") {
        prefix.push_str("// ");
        r
    } else if let Some(r) = rest.strip_prefix('*') {
        prefix.push_str("* ");
        r
    } else {
        rest
    };
    (prefix, rest.trim_start().to_string())
}

impl EditorState {
    /// Re-wrap the paragraph around the cursor at `wrap_column`.
    pub fn reflow_paragraph(&mut self, wrap_column: usize) {
        self.reshape_paragraph(wrap_column, false);
    }

    /// Collapse the paragraph around the cursor to one prefixed line.
    pub fn join_paragraph(&mut self) {
        self.reshape_paragraph(0, true);
    }

    fn reshape_paragraph(&mut self, wrap_column: usize, join: bool) {
        let cy = self.buffer.cursor.row;
        if cy >= self.buffer.row_count()
            || self
                .buffer
                .row(cy)
                .is_none_or(|r| is_blank(&r.text()))
        {
            return;
        }
        let mut start = cy;
        while start > 0
            && self
                .buffer
                .row(start - 1)
                .is_some_and(|r| !is_blank(&r.text()))
        {
            start -= 1;
        }
        let mut end = cy;
        while end + 1 < self.buffer.row_count()
            && self
                .buffer
                .row(end + 1)
                .is_some_and(|r| !is_blank(&r.text()))
        {
            end += 1;
        }

        let (prefix, _) = split_prefix(&self.buffer.row(start).expect("row in bounds").text());
        let mut words: Vec<String> = Vec::new();
        for r in start..=end {
            let (_, body) = split_prefix(&self.buffer.row(r).expect("row in bounds").text());
            words.extend(body.split_whitespace().map(str::to_string));
        }
        let content = words.join(" ");

        let new_text = if join {
            format!("{prefix}{content}")
        } else {
            let width = wrap_column.saturating_sub(prefix.chars().count());
            wrap_content(&content, width)
                .into_iter()
                .map(|line| format!("{prefix}{line}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let cb = self.buffer.cursor;
        self.undo.begin_batch();
        let mut positions = self.cursors.positions_with(cb);
        let range_end = Position::new(end, self.buffer.row_len(end));
        self.delete_range_prim(Position::new(start, 0), range_end, cb, &mut positions);
        self.insert_text_prim(Position::new(start, 0), &new_text, cb, &mut positions);
        positions[0] = Position::new(start, prefix.chars().count());
        self.finish_edit(positions);
    }
}
