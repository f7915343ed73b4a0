//! Per-row syntax classification.
//!
//! The scanner is a pure function of a single row's render cells and the
//! comment state inherited from the previous row (`open_comment`). Callers own
//! cross-row propagation: when a row's end-of-row comment state flips, the next
//! row must be re-scanned with the new inherited state.
//!
//! Design invariants:
//! * The returned classification has exactly one entry per render cell.
//! * `open_comment` reported for row *i* depends only on rows `0..=i`.
//! * Regex patterns are line-anchored and painted once at row start; a pattern
//!   that fails to compile is skipped, never fatal.

use regex::Regex;
use tracing::warn;

pub mod languages;

pub use languages::{LANGUAGES, Language};

/// Classification of a single render cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Normal,
    LineComment,
    BlockComment,
    /// Control-flow keywords.
    Keyword1,
    /// Type keywords, flagged by a trailing `|` in the keyword list.
    Keyword2,
    Str,
    Number,
    /// Transient class painted over the current search match.
    SearchMatch,
    /// Transient class painted over matched bracket delimiters.
    BracketMatch,
}

/// A language definition with its line-anchored patterns compiled.
pub struct Syntax {
    def: &'static Language,
    patterns: Vec<(Regex, Highlight)>,
}

impl Syntax {
    pub fn new(def: &'static Language) -> Self {
        let mut patterns = Vec::new();
        for (src, class) in def.patterns {
            match Regex::new(src) {
                Ok(re) => patterns.push((re, *class)),
                Err(err) => {
                    warn!(target: "syntax", pattern = src, %err, "pattern_skipped");
                }
            }
        }
        Self { def, patterns }
    }

    /// Look up a definition by file extension.
    pub fn for_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        LANGUAGES
            .iter()
            .find(|l| l.extensions.contains(&ext))
            .map(Self::new)
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn line_comment(&self) -> Option<&'static str> {
        self.def.line_comment
    }

    pub fn block_comment(&self) -> Option<(&'static str, &'static str)> {
        self.def.block_comment
    }
}

/// Word boundary set shared by the scanner and the bracket matcher.
pub fn is_separator(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\0' || ",.()+-/*=~%<>[];".contains(c)
}

/// Result of scanning one row.
pub struct ScanResult {
    pub highlight: Vec<Highlight>,
    /// True when the row ends inside an unterminated block comment.
    pub open_comment: bool,
}

/// Classify every render cell of a row.
///
/// `prev_open_comment` is the `open_comment` flag of the preceding row (false
/// for row 0). Without a syntax definition everything is `Normal` and comment
/// state never opens.
pub fn scan_row(syntax: Option<&Syntax>, render: &[char], prev_open_comment: bool) -> ScanResult {
    let Some(syntax) = syntax else {
        return ScanResult {
            highlight: vec![Highlight::Normal; render.len()],
            open_comment: false,
        };
    };

    let mut hl = vec![Highlight::Normal; render.len()];
    let pattern_end = paint_patterns(syntax, render, &mut hl);

    let mut prev_sep = true;
    let mut in_string: Option<char> = None;
    let mut in_comment = prev_open_comment;

    let line_comment = syntax.def.line_comment.map(str::as_bytes);
    let block = syntax.def.block_comment;

    let mut i = pattern_end;
    if pattern_end > 0 {
        prev_sep = render
            .get(pattern_end - 1)
            .copied()
            .is_none_or(is_separator);
    }
    while i < render.len() {
        let c = render[i];
        let prev_hl = if i > 0 { hl[i - 1] } else { Highlight::Normal };

        if in_string.is_none() && !in_comment {
            if let Some(marker) = line_comment
                && !marker.is_empty()
                && starts_with(render, i, marker)
            {
                for cell in hl.iter_mut().skip(i) {
                    *cell = Highlight::LineComment;
                }
                break;
            }
        }

        if let Some((start, end)) = block
            && in_string.is_none()
        {
            if in_comment {
                hl[i] = Highlight::BlockComment;
                if starts_with(render, i, end.as_bytes()) {
                    for cell in hl.iter_mut().skip(i).take(end.len()) {
                        *cell = Highlight::BlockComment;
                    }
                    i += end.len();
                    in_comment = false;
                    prev_sep = true;
                    continue;
                }
                i += 1;
                continue;
            } else if starts_with(render, i, start.as_bytes()) {
                for cell in hl.iter_mut().skip(i).take(start.len()) {
                    *cell = Highlight::BlockComment;
                }
                i += start.len();
                in_comment = true;
                continue;
            }
        }

        if syntax.def.highlight_strings {
            if let Some(quote) = in_string {
                hl[i] = Highlight::Str;
                if c == '\\' && i + 1 < render.len() {
                    hl[i + 1] = Highlight::Str;
                    i += 2;
                    continue;
                }
                if c == quote {
                    in_string = None;
                }
                prev_sep = true;
                i += 1;
                continue;
            } else if c == '"' || c == '\'' {
                in_string = Some(c);
                hl[i] = Highlight::Str;
                i += 1;
                continue;
            }
        }

        if syntax.def.highlight_numbers
            && ((c.is_ascii_digit() && (prev_sep || prev_hl == Highlight::Number))
                || (c == '.' && prev_hl == Highlight::Number))
        {
            hl[i] = Highlight::Number;
            prev_sep = false;
            i += 1;
            continue;
        }

        if prev_sep && let Some((len, class)) = keyword_at(syntax.def, render, i) {
            for cell in hl.iter_mut().skip(i).take(len) {
                *cell = class;
            }
            i += len;
            prev_sep = false;
            continue;
        }

        prev_sep = is_separator(c);
        i += 1;
    }

    ScanResult {
        highlight: hl,
        open_comment: in_comment,
    }
}

/// Paint line-anchored regex matches; returns the render index scanning
/// resumes at (end of the longest anchored match, if any).
fn paint_patterns(syntax: &Syntax, render: &[char], hl: &mut [Highlight]) -> usize {
    if syntax.patterns.is_empty() || render.is_empty() {
        return 0;
    }
    let row: String = render.iter().collect();
    // Map byte offsets back to cell indices for non-ASCII rows.
    let mut cell_of_byte = vec![0usize; row.len() + 1];
    for (cell, (byte, _)) in row.char_indices().enumerate() {
        cell_of_byte[byte] = cell;
    }
    cell_of_byte[row.len()] = render.len();

    let mut resume = 0;
    for (re, class) in &syntax.patterns {
        if let Some(m) = re.find(&row)
            && m.start() == 0
        {
            let end = cell_of_byte[m.end()];
            for cell in hl.iter_mut().take(end) {
                *cell = *class;
            }
            resume = resume.max(end);
        }
    }
    resume
}

fn starts_with(render: &[char], at: usize, marker: &[u8]) -> bool {
    marker.len() <= render.len() - at
        && marker
            .iter()
            .zip(&render[at..])
            .all(|(m, c)| *m as char == *c)
}

/// Longest keyword match at a separator boundary, with the class selected by
/// the trailing `|` convention.
fn keyword_at(def: &Language, render: &[char], at: usize) -> Option<(usize, Highlight)> {
    let mut best: Option<(usize, Highlight)> = None;
    for raw in def.keywords {
        let (word, class) = match raw.strip_suffix('|') {
            Some(w) => (w, Highlight::Keyword2),
            None => (*raw, Highlight::Keyword1),
        };
        if word.is_empty() || !starts_with(render, at, word.as_bytes()) {
            continue;
        }
        let end = at + word.len();
        let bounded = render.get(end).copied().is_none_or(is_separator);
        if bounded && best.is_none_or(|(len, _)| word.len() > len) {
            best = Some((word.len(), class));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn rust() -> Syntax {
        Syntax::new(
            LANGUAGES
                .iter()
                .find(|l| l.name == "rust")
                .expect("rust definition"),
        )
    }

    fn scan(s: &str, open: bool) -> ScanResult {
        scan_row(Some(&rust()), &cells(s), open)
    }

    #[test]
    fn plain_text_is_all_normal() {
        let r = scan_row(None, &cells("/* not a comment */"), false);
        assert!(r.highlight.iter().all(|h| *h == Highlight::Normal));
        assert!(!r.open_comment);
    }

    #[test]
    fn classification_covers_every_cell() {
        let r = scan("let x = 42; // done", false);
        assert_eq!(r.highlight.len(), "let x = 42; // done".len());
    }

    #[test]
    fn line_comment_paints_to_end() {
        let r = scan("x // rest of row", false);
        assert_eq!(r.highlight[0], Highlight::Normal);
        assert!(
            r.highlight[2..]
                .iter()
                .all(|h| *h == Highlight::LineComment)
        );
    }

    #[test]
    fn block_comment_spans_rows() {
        let first = scan("code /* open", false);
        assert!(first.open_comment);
        assert_eq!(first.highlight[5], Highlight::BlockComment);

        let second = scan("still inside */ after", true);
        assert!(!second.open_comment);
        assert_eq!(second.highlight[0], Highlight::BlockComment);
        assert_eq!(second.highlight[14], Highlight::BlockComment);
        assert_eq!(*second.highlight.last().unwrap(), Highlight::Normal);
    }

    #[test]
    fn string_escapes_do_not_terminate() {
        let r = scan(r#"let s = "a\"b";"#, false);
        let quote_end = r#"let s = "a\"b""#.len() - 1;
        assert_eq!(r.highlight[quote_end], Highlight::Str);
        assert_eq!(r.highlight[quote_end + 1], Highlight::Normal);
    }

    #[test]
    fn comment_marker_inside_string_is_string() {
        let r = scan(r#""no // comment""#, false);
        assert!(r.highlight.iter().all(|h| *h == Highlight::Str));
    }

    #[test]
    fn numbers_need_separator_boundary() {
        let r = scan("a1 12.5", false);
        assert_eq!(r.highlight[1], Highlight::Normal);
        assert_eq!(r.highlight[3], Highlight::Number);
        assert_eq!(r.highlight[5], Highlight::Number);
        assert_eq!(r.highlight[6], Highlight::Number);
    }

    #[test]
    fn keyword_classes_split_on_pipe() {
        let r = scan("if usize", false);
        assert_eq!(r.highlight[0], Highlight::Keyword1);
        assert_eq!(r.highlight[1], Highlight::Keyword1);
        assert_eq!(r.highlight[3], Highlight::Keyword2);
    }

    #[test]
    fn keyword_requires_trailing_separator() {
        let r = scan("iffy", false);
        assert!(r.highlight.iter().all(|h| *h == Highlight::Normal));
    }
}
