//! Escape sequences emitted outside crossterm's command set.

/// SGR mouse reporting: button-drag events (1002) with SGR encoding (1006).
pub const ENABLE_MOUSE: &str = "\x1b[?1002h\x1b[?1006h";
pub const DISABLE_MOUSE: &str = "\x1b[?1006l\x1b[?1002l";

pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Kitty multi-cursor protocol: drop all secondary cursor marks.
pub const CLEAR_SECONDARY_CURSORS: &str = "\x1b[>0;4 q";

/// Kitty multi-cursor protocol: mark one secondary cursor at a one-based
/// screen position.
pub fn secondary_cursor(row: u16, col: u16) -> String {
    format!("\x1b[>29;2:{row}:{col} q")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_cursor_sequence_shape() {
        assert_eq!(secondary_cursor(3, 7), "\x1b[>29;2:3:7 q");
    }
}
