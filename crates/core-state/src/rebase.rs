//! Positional rebasing after buffer mutations.
//!
//! Every primitive buffer edit is described by a [`Delta`]; transforming a
//! position through the deltas of a batch, in the order the edits were
//! applied, yields the position that cursor would hold had it performed the
//! edit itself. Multi-cursor batches apply edits in reverse document order so
//! each edit's locus is still valid when it runs; the per-edit adjustment of
//! every live position is what makes interleaved inserts and chained line
//! merges come out right.

use core_text::Position;

/// One primitive buffer mutation, in the coordinates that were current when
/// it was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    /// `n` cells inserted at `(row, col)`.
    InsertCols { row: usize, col: usize, n: usize },
    /// `n` cells removed starting at `(row, col)`.
    DeleteCols { row: usize, col: usize, n: usize },
    /// `n` rows spliced in before `row`.
    InsertRows { row: usize, n: usize },
    /// `n` rows removed starting at `row`.
    DeleteRows { row: usize, n: usize },
    /// `row` merged into `row - 1`, whose length was `join_col`.
    MergeRow { row: usize, join_col: usize },
    /// `row` split at `col`; the tail begins at column `indent` of the new
    /// row below.
    SplitRow { row: usize, col: usize, indent: usize },
    /// The span `[start, end)` removed, collapsing the endpoint rows.
    DeleteRange { start: Position, end: Position },
    /// Text inserted at `start`, ending at `end` (multi-row when they differ
    /// in row).
    InsertText { start: Position, end: Position },
}

/// Map a position through one delta.
pub fn transform(pos: Position, delta: &Delta) -> Position {
    match *delta {
        Delta::InsertCols { row, col, n } => {
            if pos.row == row && pos.col >= col {
                Position::new(pos.row, pos.col + n)
            } else {
                pos
            }
        }
        Delta::DeleteCols { row, col, n } => {
            if pos.row == row && pos.col > col {
                Position::new(pos.row, pos.col.saturating_sub(n).max(col))
            } else {
                pos
            }
        }
        Delta::InsertRows { row, n } => {
            if pos.row >= row {
                Position::new(pos.row + n, pos.col)
            } else {
                pos
            }
        }
        Delta::DeleteRows { row, n } => {
            if pos.row >= row + n {
                Position::new(pos.row - n, pos.col)
            } else if pos.row >= row {
                Position::new(row, pos.col)
            } else {
                pos
            }
        }
        Delta::MergeRow { row, join_col } => {
            if pos.row == row {
                Position::new(row - 1, join_col + pos.col)
            } else if pos.row > row {
                Position::new(pos.row - 1, pos.col)
            } else {
                pos
            }
        }
        Delta::SplitRow { row, col, indent } => {
            if pos.row == row && pos.col >= col {
                Position::new(row + 1, indent + (pos.col - col))
            } else if pos.row > row {
                Position::new(pos.row + 1, pos.col)
            } else {
                pos
            }
        }
        Delta::DeleteRange { start, end } => {
            if pos < start {
                pos
            } else if pos < end {
                start
            } else if pos.row == end.row {
                Position::new(start.row, start.col + (pos.col - end.col))
            } else {
                Position::new(pos.row - (end.row - start.row), pos.col)
            }
        }
        Delta::InsertText { start, end } => {
            if pos < start {
                pos
            } else if pos.row == start.row {
                Position::new(end.row, end.col + (pos.col - start.col))
            } else {
                Position::new(pos.row + (end.row - start.row), pos.col)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn insert_cols_shifts_at_and_after() {
        let d = Delta::InsertCols { row: 1, col: 3, n: 2 };
        assert_eq!(transform(p(1, 3), &d), p(1, 5));
        assert_eq!(transform(p(1, 4), &d), p(1, 6));
        assert_eq!(transform(p(1, 2), &d), p(1, 2));
        assert_eq!(transform(p(0, 9), &d), p(0, 9));
    }

    #[test]
    fn delete_cols_clamps_into_gap() {
        let d = Delta::DeleteCols { row: 0, col: 2, n: 3 };
        assert_eq!(transform(p(0, 2), &d), p(0, 2));
        assert_eq!(transform(p(0, 4), &d), p(0, 2));
        assert_eq!(transform(p(0, 7), &d), p(0, 4));
    }

    #[test]
    fn merge_moves_row_onto_join_column() {
        let d = Delta::MergeRow { row: 2, join_col: 5 };
        assert_eq!(transform(p(2, 0), &d), p(1, 5));
        assert_eq!(transform(p(2, 3), &d), p(1, 8));
        assert_eq!(transform(p(3, 1), &d), p(2, 1));
        assert_eq!(transform(p(1, 9), &d), p(1, 9));
    }

    #[test]
    fn split_sends_tail_to_indent() {
        let d = Delta::SplitRow { row: 0, col: 4, indent: 2 };
        assert_eq!(transform(p(0, 4), &d), p(1, 2));
        assert_eq!(transform(p(0, 7), &d), p(1, 5));
        assert_eq!(transform(p(0, 3), &d), p(0, 3));
        assert_eq!(transform(p(1, 0), &d), p(2, 0));
    }

    #[test]
    fn chained_merges_accumulate_join_columns() {
        // Rows "aa" / "bbb" / "c": backspaces at (1,0) and (2,0), applied in
        // reverse document order.
        let merges = [
            Delta::MergeRow { row: 2, join_col: 3 },
            Delta::MergeRow { row: 1, join_col: 2 },
        ];
        let mut cursor_on_c = p(2, 0);
        let mut cursor_on_b = p(1, 0);
        for d in &merges {
            cursor_on_c = transform(cursor_on_c, d);
            cursor_on_b = transform(cursor_on_b, d);
        }
        assert_eq!(cursor_on_b, p(0, 2));
        assert_eq!(cursor_on_c, p(0, 5));
    }

    #[test]
    fn delete_range_collapses_interior() {
        let d = Delta::DeleteRange {
            start: p(1, 2),
            end: p(3, 4),
        };
        assert_eq!(transform(p(0, 5), &d), p(0, 5));
        assert_eq!(transform(p(2, 0), &d), p(1, 2));
        assert_eq!(transform(p(3, 6), &d), p(1, 4));
        assert_eq!(transform(p(5, 1), &d), p(3, 1));
    }

    #[test]
    fn insert_text_pushes_tail_of_start_row() {
        let d = Delta::InsertText {
            start: p(1, 2),
            end: p(2, 3),
        };
        assert_eq!(transform(p(1, 1), &d), p(1, 1));
        assert_eq!(transform(p(1, 2), &d), p(2, 3));
        assert_eq!(transform(p(1, 5), &d), p(2, 6));
        assert_eq!(transform(p(2, 0), &d), p(3, 0));
    }
}
