//! Enclosing-pair search honoring string and comment state.
//!
//! Recomputed once per refresh. The matcher scans forward from the buffer
//! start to the cursor, tracking single/double-quote strings (with
//! backslash-parity escapes), nested block comments, and a stack of
//! unmatched openers. That prefix walk answers all three questions at once:
//! whether the cursor sits inside an unterminated comment, which opener
//! encloses it, and whether a closer at the cursor already has its partner
//! on the stack. Partners ahead of the cursor are resolved by a forward
//! depth-counting scan under the same skip rules.

use crate::buffer::Buffer;
use core_text::Position;

const OPENERS: [char; 3] = ['(', '[', '{'];
const CLOSERS: [char; 3] = [')', ']', '}'];

fn partner_of(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Matched delimiter pair: positions plus delimiter lengths (1 for
/// brackets, marker length for comment delimiters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
    pub open: (Position, usize),
    pub close: (Position, usize),
}

struct PrefixScan {
    /// Comment nesting depth at the cursor.
    comment_depth: usize,
    /// Start positions of comments still open at the cursor.
    comment_starts: Vec<Position>,
    /// Unmatched openers before the cursor, outside strings and comments.
    opener_stack: Vec<(char, Position)>,
    /// Quote character when the cursor sits inside a string.
    in_string: Option<char>,
}

/// Walk `[origin, target)` accumulating bracket/comment/string state.
/// String state resets at each row end (strings do not span rows).
fn scan_prefix(buffer: &Buffer, target: Position) -> PrefixScan {
    let markers = buffer.syntax().and_then(|s| s.block_comment());
    let mut state = PrefixScan {
        comment_depth: 0,
        comment_starts: Vec::new(),
        opener_stack: Vec::new(),
        in_string: None,
    };

    for (y, row) in buffer.rows().iter().enumerate() {
        if y > target.row {
            break;
        }
        let cells = row.cells();
        let end = if y == target.row {
            target.col.min(cells.len())
        } else {
            cells.len()
        };
        let mut x = 0;
        state.in_string = None;
        while x < end {
            let c = cells[x];
            if let Some(quote) = state.in_string {
                if c == '\\' {
                    x += 2;
                    continue;
                }
                if c == quote {
                    state.in_string = None;
                }
                x += 1;
                continue;
            }
            if let Some((open, close)) = markers {
                if state.comment_depth > 0 {
                    if cells_start_with(cells, x, close) {
                        state.comment_depth -= 1;
                        state.comment_starts.pop();
                        x += close.len();
                        continue;
                    }
                    if cells_start_with(cells, x, open) {
                        state.comment_depth += 1;
                        state.comment_starts.push(Position::new(y, x));
                        x += open.len();
                        continue;
                    }
                    x += 1;
                    continue;
                }
                if cells_start_with(cells, x, open) {
                    state.comment_depth += 1;
                    state.comment_starts.push(Position::new(y, x));
                    x += open.len();
                    continue;
                }
            }
            if c == '"' || c == '\'' {
                state.in_string = Some(c);
                x += 1;
                continue;
            }
            if OPENERS.contains(&c) {
                state.opener_stack.push((c, Position::new(y, x)));
            } else if CLOSERS.contains(&c) {
                if let Some((open, _)) = state.opener_stack.last()
                    && partner_of(*open) == c
                {
                    state.opener_stack.pop();
                }
            }
            x += 1;
        }
        if y == target.row {
            break;
        }
    }
    state
}

fn cells_start_with(cells: &[char], at: usize, marker: &str) -> bool {
    marker.len() <= cells.len() - at
        && marker.chars().zip(&cells[at..]).all(|(m, c)| m == *c)
}

/// Forward scan from just after an opener for its closer, skipping strings
/// and block comments, counting nesting depth.
fn find_closer(buffer: &Buffer, open: char, from: Position) -> Option<Position> {
    let close = partner_of(open);
    let markers = buffer.syntax().and_then(|s| s.block_comment());
    let mut depth = 1usize;
    let mut comment_depth = 0usize;
    let mut y = from.row;
    let mut x = from.col + 1;
    while y < buffer.row_count() {
        let cells = buffer.row(y).map(|r| r.cells()).unwrap_or_default();
        let mut in_string: Option<char> = None;
        while x < cells.len() {
            let c = cells[x];
            if let Some(quote) = in_string {
                if c == '\\' {
                    x += 2;
                    continue;
                }
                if c == quote {
                    in_string = None;
                }
                x += 1;
                continue;
            }
            if let Some((mo, mc)) = markers {
                if comment_depth > 0 {
                    if cells_start_with(cells, x, mc) {
                        comment_depth -= 1;
                        x += mc.len();
                        continue;
                    }
                    if cells_start_with(cells, x, mo) {
                        comment_depth += 1;
                        x += mo.len();
                        continue;
                    }
                    x += 1;
                    continue;
                }
                if cells_start_with(cells, x, mo) {
                    comment_depth += 1;
                    x += mo.len();
                    continue;
                }
            }
            if c == '"' || c == '\'' {
                in_string = Some(c);
                x += 1;
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(Position::new(y, x));
                }
            }
            x += 1;
        }
        y += 1;
        x = 0;
    }
    None
}

/// Forward scan from a comment opener for its end marker.
fn find_comment_end(buffer: &Buffer, from: Position) -> Option<Position> {
    let (open, close) = buffer.syntax()?.block_comment()?;
    let mut depth = 1usize;
    let mut y = from.row;
    let mut x = from.col + open.len();
    while y < buffer.row_count() {
        let cells = buffer.row(y).map(|r| r.cells()).unwrap_or_default();
        while x < cells.len() {
            if cells_start_with(cells, x, close) {
                depth -= 1;
                if depth == 0 {
                    return Some(Position::new(y, x));
                }
                x += close.len();
                continue;
            }
            if cells_start_with(cells, x, open) {
                depth += 1;
                x += open.len();
                continue;
            }
            x += 1;
        }
        y += 1;
        x = 0;
    }
    None
}

/// Resolve the pair enclosing (or at) the cursor, or `None` with no
/// diagnostic.
pub fn find_match(buffer: &Buffer, cursor: Position) -> Option<BracketMatch> {
    if buffer.row_count() == 0 || cursor.row >= buffer.row_count() {
        return None;
    }
    let markers = buffer.syntax().and_then(|s| s.block_comment());
    let prefix = scan_prefix(buffer, cursor);

    // Inside an unterminated block comment: match its delimiters, not the
    // brackets within.
    if prefix.comment_depth > 0 {
        let start = *prefix.comment_starts.last()?;
        let (open, close) = markers?;
        let end = find_comment_end(buffer, start)?;
        return Some(BracketMatch {
            open: (start, open.len()),
            close: (end, close.len()),
        });
    }

    let cells = buffer.row(cursor.row)?.cells();

    // Exact position: a comment delimiter.
    if let Some((open, close)) = markers {
        if cells_start_with(cells, cursor.col.min(cells.len()), open)
            && prefix.in_string.is_none()
        {
            let end = find_comment_end(buffer, cursor)?;
            return Some(BracketMatch {
                open: (cursor, open.len()),
                close: (end, close.len()),
            });
        }
    }

    // Exact position: a bracket (outside strings).
    if prefix.in_string.is_none()
        && let Some(c) = cells.get(cursor.col).copied()
    {
        if OPENERS.contains(&c) {
            let close = find_closer(buffer, c, cursor)?;
            return Some(BracketMatch {
                open: (cursor, 1),
                close: (close, 1),
            });
        }
        if CLOSERS.contains(&c)
            && let Some((open, open_pos)) = prefix.opener_stack.last().copied()
            && partner_of(open) == c
        {
            return Some(BracketMatch {
                open: (open_pos, 1),
                close: (cursor, 1),
            });
        }
    }

    // Otherwise: nearest unmatched opener before the cursor.
    let (open, open_pos) = prefix.opener_stack.last().copied()?;
    let close = find_closer(buffer, open, open_pos)?;
    Some(BracketMatch {
        open: (open_pos, 1),
        close: (close, 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn buf(lines: &[&str]) -> Buffer {
        let mut b = Buffer::new();
        b.set_syntax(core_syntax::Syntax::for_path(Path::new("t.rs")));
        for (i, l) in lines.iter().enumerate() {
            b.insert_row(i, l);
        }
        b
    }

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn exact_opener_matches_forward() {
        let b = buf(&["fn f(a, b) {", "}"]);
        let m = find_match(&b, p(0, 4)).expect("paren pair");
        assert_eq!(m.open.0, p(0, 4));
        assert_eq!(m.close.0, p(0, 9));
    }

    #[test]
    fn exact_closer_matches_backward() {
        let b = buf(&["(ab)"]);
        let m = find_match(&b, p(0, 3)).expect("pair");
        assert_eq!(m.open.0, p(0, 0));
        assert_eq!(m.close.0, p(0, 3));
    }

    #[test]
    fn enclosing_pair_found_from_interior() {
        let b = buf(&["{ a [b] c }"]);
        let m = find_match(&b, p(0, 8)).expect("brace pair");
        assert_eq!(m.open.0, p(0, 0));
        assert_eq!(m.close.0, p(0, 10));
    }

    #[test]
    fn pair_spans_rows() {
        let b = buf(&["fn main() {", "    body();", "}"]);
        let m = find_match(&b, p(1, 4)).expect("brace pair");
        assert_eq!(m.open.0, p(0, 10));
        assert_eq!(m.close.0, p(2, 0));
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let b = buf(&[r#"let s = "(unclosed"; (x)"#]);
        let m = find_match(&b, p(0, 22)).expect("real pair");
        assert_eq!(m.open.0, p(0, 21));
        assert_eq!(m.close.0, p(0, 23));
    }

    #[test]
    fn comment_interior_matches_markers_not_brackets() {
        let b = buf(&["/* ( hi */"]);
        let m = find_match(&b, p(0, 5)).expect("comment pair");
        assert_eq!(m.open, (p(0, 0), 2));
        assert_eq!(m.close, (p(0, 8), 2));
    }

    #[test]
    fn unterminated_comment_spanning_rows() {
        let b = buf(&["x /* open", "( inside", "still */ done"]);
        let m = find_match(&b, p(1, 3)).expect("comment pair");
        assert_eq!(m.open, (p(0, 2), 2));
        assert_eq!(m.close, (p(2, 6), 2));
    }

    #[test]
    fn no_pair_clears_quietly() {
        let b = buf(&["plain text"]);
        assert!(find_match(&b, p(0, 3)).is_none());
    }
}
