//! Event vocabulary shared by the byte decoder and the dispatch table.
//!
//! The decoder translates terminal byte sequences into this internal key
//! enumeration so bindings stay independent of terminal quirks; nothing above
//! the decoder ever sees raw escape bytes.

use bitflags::bitflags;

bitflags! {
    /// Modifier mask attached to arrows, Home/End, and mouse events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mods: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable cell (or any byte the decoder passes through verbatim).
    Char(char),
    /// Control-chord on a letter (`Ctrl('q')` for byte 0x11).
    Ctrl(char),
    Alt(char),
    AltOpenBracket,
    AltCloseBracket,
    Enter,
    Escape,
    Backspace,
    Tab,
    ShiftTab,
    Arrow(Direction, Mods),
    Home(Mods),
    End(Mods),
    PageUp,
    PageDown,
    Delete,
    CtrlDelete,
    F10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Button held while the pointer moves (SGR motion bit).
    Drag(MouseButton),
    ScrollUp,
    ScrollDown,
}

/// An SGR mouse report with zero-based screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseKind,
    pub col: usize,
    pub row: usize,
    pub mods: Mods,
}

/// One decoded input item handed to the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    Mouse(MouseEvent),
}

impl Key {
    /// Map a plain (non-escape) input byte to a key.
    pub fn from_byte(b: u8) -> Key {
        match b {
            b'\r' | b'\n' => Key::Enter,
            b'\t' => Key::Tab,
            127 => Key::Backspace,
            0x1b => Key::Escape,
            c if c < 0x20 => Key::Ctrl(((c ^ 0x40) as char).to_ascii_lowercase()),
            c => Key::Char(c as char),
        }
    }
}
