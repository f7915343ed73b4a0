//! Soft-wrap segmentation and visual-row addressing.
//!
//! Breaks are chosen greedily: when the next cell would exceed the available
//! width, the segment ends at the most recent whitespace boundary inside the
//! segment, falling back to a hard break at the width limit. Break positions
//! are strictly increasing render columns, always less than the render
//! length, so every segment is non-empty.

use crate::Row;

/// Recompute `breaks` for a render buffer at the given width.
pub fn compute_breaks(render: &[char], width: usize, breaks: &mut Vec<usize>) {
    breaks.clear();
    if width == 0 || render.len() <= width {
        return;
    }
    let mut seg_start = 0;
    let mut last_ws: Option<usize> = None;
    let mut i = 0;
    while i < render.len() {
        if i - seg_start + 1 > width {
            let brk = match last_ws {
                Some(w) if w >= seg_start => w + 1,
                _ => i,
            };
            breaks.push(brk);
            seg_start = brk;
            last_ws = None;
            i = brk;
            continue;
        }
        if render[i].is_whitespace() {
            last_ws = Some(i);
        }
        i += 1;
    }
}

/// Visual rows occupied by rows `0..r`.
pub fn visual_rows_up_to(rows: &[Row], r: usize) -> usize {
    rows.iter().take(r).map(Row::wrap_row_count).sum()
}

pub fn total_visual_rows(rows: &[Row]) -> usize {
    visual_rows_up_to(rows, rows.len())
}

/// Visual row of (logical row, wrap segment).
pub fn visual_of(rows: &[Row], row: usize, seg: usize) -> usize {
    visual_rows_up_to(rows, row) + seg
}

/// Map a visual row back to (logical row, wrap segment), clamped to the last
/// segment of the last row.
pub fn visual_to_logical(rows: &[Row], vrow: usize) -> (usize, usize) {
    let mut remaining = vrow;
    for (i, row) in rows.iter().enumerate() {
        let count = row.wrap_row_count();
        if remaining < count {
            return (i, remaining);
        }
        remaining -= count;
    }
    match rows.last() {
        Some(last) => (rows.len() - 1, last.wrap_row_count() - 1),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn breaks_of(text: &str, width: usize) -> Vec<usize> {
        let mut breaks = Vec::new();
        compute_breaks(&text.chars().collect::<Vec<_>>(), width, &mut breaks);
        breaks
    }

    #[test]
    fn short_row_never_breaks() {
        assert!(breaks_of("hello", 80).is_empty());
        assert!(breaks_of("", 10).is_empty());
    }

    #[test]
    fn solid_run_hard_breaks_at_width() {
        let long: String = std::iter::repeat_n('x', 200).collect();
        assert_eq!(breaks_of(&long, 80), vec![80, 160]);
    }

    #[test]
    fn break_prefers_whitespace_boundary() {
        // "hello " fits in 8 columns; the break lands after the space.
        assert_eq!(breaks_of("hello world", 8), vec![6]);
    }

    #[test]
    fn whitespace_at_segment_start_still_progresses() {
        assert_eq!(breaks_of(" aaaaaaaaaa", 4), vec![1, 5, 9]);
    }

    #[test]
    fn visual_addressing_round_trips() {
        let mut rows = vec![Row::new("short"), Row::new(&"y".repeat(25)), Row::new("z")];
        for r in &mut rows {
            r.rewrap(10);
        }
        assert_eq!(rows[1].wrap_row_count(), 3);
        assert_eq!(total_visual_rows(&rows), 5);
        assert_eq!(visual_of(&rows, 1, 2), 3);
        assert_eq!(visual_to_logical(&rows, 0), (0, 0));
        assert_eq!(visual_to_logical(&rows, 3), (1, 2));
        assert_eq!(visual_to_logical(&rows, 4), (2, 0));
        // Past-the-end clamps to the final segment.
        assert_eq!(visual_to_logical(&rows, 99), (2, 0));
    }

    proptest! {
        #[test]
        fn breaks_are_strictly_increasing_and_in_range(
            text in "[ a-z]{0,120}",
            width in 1usize..40,
        ) {
            let cells: Vec<char> = text.chars().collect();
            let mut breaks = Vec::new();
            compute_breaks(&cells, width, &mut breaks);
            for pair in breaks.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            if let Some(last) = breaks.last() {
                prop_assert!(*last < cells.len());
            }
        }

        #[test]
        fn no_segment_exceeds_width(
            text in "[ a-z]{0,120}",
            width in 1usize..40,
        ) {
            let cells: Vec<char> = text.chars().collect();
            let mut breaks = Vec::new();
            compute_breaks(&cells, width, &mut breaks);
            let mut start = 0;
            for b in breaks.iter().chain(std::iter::once(&cells.len())) {
                prop_assert!(b - start <= width);
                start = *b;
            }
        }
    }
}
