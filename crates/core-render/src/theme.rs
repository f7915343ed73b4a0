//! 24-bit palette keyed by highlight class.

use core_syntax::Highlight;
use crossterm::style::Color;

/// Foreground colors per class plus the chrome colors. The UI layer may
/// swap whole themes in; the core only ever looks classes up.
#[derive(Debug, Clone)]
pub struct Theme {
    pub normal: Color,
    pub line_comment: Color,
    pub block_comment: Color,
    pub keyword1: Color,
    pub keyword2: Color,
    pub string: Color,
    pub number: Color,
    pub search_match: Color,
    pub bracket_match: Color,
    pub gutter: Color,
    pub status: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            normal: Color::Rgb { r: 214, g: 214, b: 214 },
            line_comment: Color::Rgb { r: 106, g: 153, b: 85 },
            block_comment: Color::Rgb { r: 106, g: 153, b: 85 },
            keyword1: Color::Rgb { r: 197, g: 134, b: 192 },
            keyword2: Color::Rgb { r: 78, g: 201, b: 176 },
            string: Color::Rgb { r: 206, g: 145, b: 120 },
            number: Color::Rgb { r: 181, g: 206, b: 168 },
            search_match: Color::Rgb { r: 255, g: 203, b: 107 },
            bracket_match: Color::Rgb { r: 255, g: 255, b: 128 },
            gutter: Color::Rgb { r: 110, g: 110, b: 110 },
            status: Color::Rgb { r: 160, g: 160, b: 160 },
        }
    }
}

impl Theme {
    pub fn color_for(&self, hl: Highlight) -> Color {
        match hl {
            Highlight::Normal => self.normal,
            Highlight::LineComment => self.line_comment,
            Highlight::BlockComment => self.block_comment,
            Highlight::Keyword1 => self.keyword1,
            Highlight::Keyword2 => self.keyword2,
            Highlight::Str => self.string,
            Highlight::Number => self.number,
            Highlight::SearchMatch => self.search_match,
            Highlight::BracketMatch => self.bracket_match,
        }
    }
}
