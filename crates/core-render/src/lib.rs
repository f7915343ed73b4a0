//! Frame assembly: one consolidated buffer per refresh.
//!
//! Commands are queued into an in-memory frame (crossterm commands write to
//! any `Write`) and flushed to the terminal in a single write, so a refresh
//! is never visible half-drawn. Coordinates follow the viewport: visual
//! rows under soft wrap, logical rows plus a horizontal offset otherwise.

use anyhow::Result;
use core_state::EditorState;
use core_syntax::Highlight;
use core_text::{Position, Row, wrap};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};

pub mod theme;
pub mod viewport;

pub use theme::Theme;
pub use viewport::Viewport;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub line_numbers: bool,
    pub soft_wrap: bool,
}

/// Gutter width: line-number digits plus one space, or zero when hidden.
pub fn gutter_width(row_count: usize, line_numbers: bool) -> usize {
    if !line_numbers {
        return 0;
    }
    let digits = row_count.max(1).ilog10() as usize + 1;
    digits + 1
}

/// Map each render column of a row back to its cursor column (tabs cover a
/// span of render cells).
fn cx_of_render(row: &Row) -> Vec<usize> {
    let mut map = Vec::with_capacity(row.render_len());
    for (cx, c) in row.cells().iter().enumerate() {
        if *c == '\t' {
            map.push(cx);
            while map.len() % core_text::TAB_STOP != 0 {
                map.push(cx);
            }
        } else {
            map.push(cx);
        }
    }
    map
}

/// Cursor position on screen, or `None` when scrolled out of view.
fn screen_position(
    state: &EditorState,
    vp: &Viewport,
    opts: &RenderOptions,
    gutter: usize,
    pos: Position,
) -> Option<(u16, u16)> {
    let rows = state.buffer.rows();
    let (vrow, vcol) = if pos.row >= rows.len() {
        (
            if opts.soft_wrap {
                wrap::total_visual_rows(rows)
            } else {
                rows.len()
            },
            0,
        )
    } else {
        let row = &rows[pos.row];
        let rx = row.cx_to_rx(pos.col);
        if opts.soft_wrap {
            let (seg, seg_col) = row.segment_of_rx(rx);
            (wrap::visual_of(rows, pos.row, seg), seg_col)
        } else {
            (pos.row, rx.saturating_sub(vp.col_offset))
        }
    };
    if vrow < vp.row_offset || vrow >= vp.row_offset + vp.screen_rows {
        return None;
    }
    Some(((vrow - vp.row_offset) as u16, (gutter + vcol) as u16))
}

/// Inverse mapping for mouse clicks: a screen cell to a buffer position.
pub fn screen_to_position(
    state: &EditorState,
    vp: &Viewport,
    opts: &RenderOptions,
    screen_row: usize,
    screen_col: usize,
) -> Position {
    let rows = state.buffer.rows();
    let gutter = gutter_width(rows.len(), opts.line_numbers);
    let text_col = screen_col.saturating_sub(gutter);
    if opts.soft_wrap {
        let vindex = vp.row_offset + screen_row;
        if vindex >= wrap::total_visual_rows(rows) {
            let last = rows.len().saturating_sub(1);
            return Position::new(last, rows.get(last).map_or(0, Row::len));
        }
        let (lrow, seg) = wrap::visual_to_logical(rows, vindex);
        let row = &rows[lrow];
        let (start, end) = row.segment_bounds(seg);
        let rx = (start + text_col).min(end);
        Position::new(lrow, row.rx_to_cx(rx))
    } else {
        let lrow = vp.row_offset + screen_row;
        if lrow >= rows.len() {
            let last = rows.len().saturating_sub(1);
            return Position::new(last, rows.get(last).map_or(0, Row::len));
        }
        let rx = vp.col_offset + text_col;
        Position::new(lrow, rows[lrow].rx_to_cx(rx))
    }
}

/// The bracket-match override span on one row, in render columns.
fn bracket_spans(state: &EditorState, lrow: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if let Some(m) = &state.bracket {
        for (pos, len) in [m.open, m.close] {
            if pos.row == lrow
                && let Some(row) = state.buffer.row(lrow)
            {
                let rx = row.cx_to_rx(pos.col);
                spans.push((rx, rx + len));
            }
        }
    }
    spans
}

/// Build and write one frame.
pub fn draw(
    state: &EditorState,
    vp: &Viewport,
    theme: &Theme,
    opts: &RenderOptions,
    status_line: &str,
) -> Result<()> {
    let rows = state.buffer.rows();
    let gutter = gutter_width(rows.len(), opts.line_numbers);
    let total_visual = if opts.soft_wrap {
        wrap::total_visual_rows(rows)
    } else {
        rows.len()
    };

    let mut frame: Vec<u8> = Vec::with_capacity(vp.screen_rows * vp.screen_cols * 4);
    frame.extend_from_slice(core_terminal::ansi::HIDE_CURSOR.as_bytes());
    frame.extend_from_slice(core_terminal::ansi::CLEAR_SECONDARY_CURSORS.as_bytes());
    queue!(frame, MoveTo(0, 0))?;

    for i in 0..vp.screen_rows {
        let vindex = vp.row_offset + i;
        queue!(frame, MoveTo(0, i as u16))?;
        if vindex >= total_visual {
            queue!(frame, SetForegroundColor(theme.gutter), Print("~"), ResetColor)?;
            queue!(frame, Clear(ClearType::UntilNewLine))?;
            continue;
        }
        let (lrow, seg) = if opts.soft_wrap {
            wrap::visual_to_logical(rows, vindex)
        } else {
            (vindex, 0)
        };
        let row = &rows[lrow];

        if gutter > 0 {
            let label = if seg == 0 {
                format!("{:>width$} ", lrow + 1, width = gutter - 1)
            } else {
                " ".repeat(gutter)
            };
            queue!(frame, SetForegroundColor(theme.gutter), Print(label))?;
        }

        let (start, end) = if opts.soft_wrap {
            row.segment_bounds(seg)
        } else {
            let start = vp.col_offset.min(row.render_len());
            (start, (start + vp.screen_cols).min(row.render_len()))
        };

        let cx_map = cx_of_render(row);
        let spans = bracket_spans(state, lrow);
        let mut current_color = None;
        let mut reversed = false;
        for rx in start..end {
            let mut class = row.highlight().get(rx).copied().unwrap_or(Highlight::Normal);
            if spans.iter().any(|(s, e)| rx >= *s && rx < *e) {
                class = Highlight::BracketMatch;
            }
            let cx = cx_map.get(rx).copied().unwrap_or(0);
            let selected = state.selection.contains(Position::new(lrow, cx));
            if selected != reversed {
                let attr = if selected {
                    Attribute::Reverse
                } else {
                    Attribute::NoReverse
                };
                queue!(frame, SetAttribute(attr))?;
                reversed = selected;
            }
            let color = theme.color_for(class);
            if current_color != Some(color) {
                queue!(frame, SetForegroundColor(color))?;
                current_color = Some(color);
            }
            queue!(frame, Print(row.render()[rx]))?;
        }
        if reversed {
            queue!(frame, SetAttribute(Attribute::NoReverse))?;
        }
        queue!(frame, ResetColor, Clear(ClearType::UntilNewLine))?;
    }

    // Status line.
    queue!(
        frame,
        MoveTo(0, vp.screen_rows as u16),
        SetForegroundColor(theme.status),
        Print(status_line),
        ResetColor,
        Clear(ClearType::UntilNewLine)
    )?;

    // Secondary cursors through the Kitty protocol, then the hardware
    // cursor on the primary.
    for pos in state.cursors.iter() {
        if let Some((r, c)) = screen_position(state, vp, opts, gutter, pos) {
            frame.extend_from_slice(
                core_terminal::ansi::secondary_cursor(r + 1, c + 1).as_bytes(),
            );
        }
    }
    let (cr, cc) =
        screen_position(state, vp, opts, gutter, state.buffer.cursor).unwrap_or((0, 0));
    queue!(frame, MoveTo(cc, cr))?;
    frame.extend_from_slice(core_terminal::ansi::SHOW_CURSOR.as_bytes());

    core_terminal::write_frame(&frame)?;
    Ok(())
}

/// Visual row of the primary cursor, for scroll decisions.
pub fn cursor_visual_row(state: &EditorState, soft_wrap: bool) -> usize {
    let rows = state.buffer.rows();
    let pos = state.buffer.cursor;
    if pos.row >= rows.len() {
        return if soft_wrap {
            wrap::total_visual_rows(rows)
        } else {
            rows.len()
        };
    }
    if soft_wrap {
        let row = &rows[pos.row];
        let (seg, _) = row.segment_of_rx(row.cx_to_rx(pos.col));
        wrap::visual_of(rows, pos.row, seg)
    } else {
        pos.row
    }
}
