//! Multi-cursor batches: rebasing, dedup, and atomic undo.

use core_state::{Buffer, EditorState};
use core_text::Position;

fn state(lines: &[&str]) -> EditorState {
    let mut b = Buffer::new();
    for (i, l) in lines.iter().enumerate() {
        b.insert_row(i, l);
    }
    EditorState::new(b)
}

fn rows(s: &EditorState) -> Vec<String> {
    s.buffer.rows().iter().map(|r| r.text()).collect()
}

fn all_cursors(s: &EditorState) -> Vec<Position> {
    let mut v = vec![s.buffer.cursor];
    v.extend(s.cursors.iter());
    v
}

#[test]
fn insert_at_three_cursors() {
    let mut s = state(&["foo", "bar", "baz"]);
    s.buffer.cursor = Position::new(0, 0);
    s.cursors.add(Position::new(1, 0));
    s.cursors.add(Position::new(2, 0));

    s.insert_char('x');
    assert_eq!(rows(&s), vec!["xfoo", "xbar", "xbaz"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 1), Position::new(1, 1), Position::new(2, 1)]
    );

    // One undo restores the whole batch.
    assert!(s.undo());
    assert_eq!(rows(&s), vec!["foo", "bar", "baz"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)]
    );
}

#[test]
fn same_line_inserts_rebase_later_columns() {
    let mut s = state(&["abcd"]);
    s.buffer.cursor = Position::new(0, 1);
    s.cursors.add(Position::new(0, 3));

    s.insert_char('-');
    assert_eq!(rows(&s), vec!["a-bc-d"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 2), Position::new(0, 5)]
    );
}

#[test]
fn chained_merges_accumulate() {
    let mut s = state(&["aa", "bbb", "c"]);
    s.buffer.cursor = Position::new(1, 0);
    s.cursors.add(Position::new(2, 0));

    s.backspace();
    assert_eq!(rows(&s), vec!["aabbbc"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 2), Position::new(0, 5)]
    );

    assert!(s.undo());
    assert_eq!(rows(&s), vec!["aa", "bbb", "c"]);
}

#[test]
fn newline_at_each_cursor_splits_independently() {
    let mut s = state(&["one two", "three four"]);
    s.buffer.cursor = Position::new(0, 3);
    s.cursors.add(Position::new(1, 5));

    s.insert_newline();
    assert_eq!(rows(&s), vec!["one", " two", "three", " four"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(1, 0), Position::new(3, 0)]
    );

    assert!(s.undo());
    assert_eq!(rows(&s), vec!["one two", "three four"]);
}

#[test]
fn coincident_cursors_collapse_after_edit() {
    let mut s = state(&["ab", "ab"]);
    s.buffer.cursor = Position::new(0, 1);
    s.cursors.add(Position::new(0, 2));

    // Both cursors backspace; the second lands on the first's position.
    s.backspace();
    assert_eq!(rows(&s), vec!["", "ab"]);
    assert_eq!(all_cursors(&s), vec![Position::new(0, 0)]);
}

#[test]
fn duplicate_line_once_per_unique_row() {
    let mut s = state(&["aa", "bb"]);
    s.buffer.cursor = Position::new(0, 0);
    s.cursors.add(Position::new(0, 2));
    s.cursors.add(Position::new(1, 1));

    s.duplicate_line();
    assert_eq!(rows(&s), vec!["aa", "aa", "bb", "bb"]);
    // Cursors on a duplicated row follow to the copy.
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(1, 0), Position::new(1, 2), Position::new(3, 1)]
    );
}

#[test]
fn indent_shifts_only_cursors_past_leading_whitespace() {
    let mut s = state(&["  text"]);
    s.buffer.cursor = Position::new(0, 4);
    s.cursors.add(Position::new(0, 1));

    s.indent_lines();
    assert_eq!(rows(&s), vec!["      text"]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 8), Position::new(0, 1)]
    );
}

#[test]
fn comment_toggle_is_uniform_across_mixed_rows() {
    let mut s = state(&["// one", "two"]);
    s.buffer.cursor = Position::new(0, 4);
    s.cursors.add(Position::new(1, 1));

    // Not all rows are commented, so the batch comments everything.
    s.toggle_line_comment();
    assert_eq!(rows(&s), vec!["// // one", "// two"]);

    // Now all rows are commented, so the batch uncomments everything.
    s.toggle_line_comment();
    assert_eq!(rows(&s), vec!["// one", "two"]);
}

#[test]
fn word_delete_at_each_cursor() {
    let mut s = state(&["foo bar", "baz qux"]);
    s.buffer.cursor = Position::new(0, 7);
    s.cursors.add(Position::new(1, 7));

    s.delete_word_backward();
    assert_eq!(rows(&s), vec!["foo ", "baz "]);
    assert_eq!(
        all_cursors(&s),
        vec![Position::new(0, 4), Position::new(1, 4)]
    );
}

#[test]
fn paste_at_every_cursor() {
    let mut s = state(&["a", "b"]);
    s.buffer.cursor = Position::new(0, 1);
    s.cursors.add(Position::new(1, 1));

    s.paste("!");
    assert_eq!(rows(&s), vec!["a!", "b!"]);

    assert!(s.undo());
    assert_eq!(rows(&s), vec!["a", "b"]);
}

#[test]
fn overlap_flag_keeps_one_secondary_on_primary() {
    let mut s = state(&["abc"]);
    s.cursors.allow_overlap = true;
    s.buffer.cursor = Position::new(0, 1);
    s.cursors.add(Position::new(0, 1));
    s.cursors.dedup(s.buffer.cursor);
    assert_eq!(s.cursors.len(), 1);

    s.cursors.allow_overlap = false;
    s.cursors.dedup(s.buffer.cursor);
    assert!(s.cursors.is_empty());
}
