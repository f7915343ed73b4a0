//! Table-driven decoder tests over scripted byte streams.

use anyhow::Result;
use core_events::{Direction, InputEvent, Key, Mods, MouseButton, MouseEvent, MouseKind};
use core_input::{ByteSource, next_event};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;

struct Scripted(VecDeque<u8>);

impl Scripted {
    fn new(bytes: &[u8]) -> Self {
        Self(bytes.iter().copied().collect())
    }
}

impl ByteSource for Scripted {
    fn read_byte(&mut self, _timeout_ms: u32) -> Result<Option<u8>> {
        Ok(self.0.pop_front())
    }
}

fn decode(bytes: &[u8]) -> InputEvent {
    let mut src = Scripted::new(bytes);
    next_event(&mut src, 100)
        .expect("decode")
        .expect("event present")
}

fn decode_key(bytes: &[u8]) -> Key {
    match decode(bytes) {
        InputEvent::Key(k) => k,
        other => panic!("expected key, got {other:?}"),
    }
}

fn decode_mouse(bytes: &[u8]) -> MouseEvent {
    match decode(bytes) {
        InputEvent::Mouse(m) => m,
        other => panic!("expected mouse, got {other:?}"),
    }
}

#[test]
fn timeout_yields_no_event() {
    let mut src = Scripted::new(&[]);
    assert_eq!(next_event(&mut src, 100).expect("decode"), None);
}

#[test]
fn plain_bytes_are_ordinary_keys() {
    assert_eq!(decode_key(b"a"), Key::Char('a'));
    assert_eq!(decode_key(&[0x7f]), Key::Backspace);
    assert_eq!(decode_key(&[0x13]), Key::Ctrl('s'));
    assert_eq!(decode_key(b"\r"), Key::Enter);
}

#[test]
fn lone_escape_is_escape() {
    assert_eq!(decode_key(&[0x1b]), Key::Escape);
}

#[test]
fn alt_letters() {
    assert_eq!(decode_key(b"\x1bq"), Key::Alt('q'));
    assert_eq!(decode_key(b"\x1bQ"), Key::Alt('q'));
    assert_eq!(decode_key(b"\x1bj"), Key::Alt('j'));
    assert_eq!(decode_key(b"\x1bN"), Key::Alt('n'));
}

#[test]
fn bare_brackets_are_alt_brackets() {
    assert_eq!(decode_key(b"\x1b["), Key::AltOpenBracket);
    assert_eq!(decode_key(b"\x1b]"), Key::AltCloseBracket);
}

#[test]
fn arrows_home_end_shift_tab() {
    assert_eq!(decode_key(b"\x1b[A"), Key::Arrow(Direction::Up, Mods::empty()));
    assert_eq!(decode_key(b"\x1b[B"), Key::Arrow(Direction::Down, Mods::empty()));
    assert_eq!(decode_key(b"\x1b[C"), Key::Arrow(Direction::Right, Mods::empty()));
    assert_eq!(decode_key(b"\x1b[D"), Key::Arrow(Direction::Left, Mods::empty()));
    assert_eq!(decode_key(b"\x1b[H"), Key::Home(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[F"), Key::End(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[Z"), Key::ShiftTab);
    assert_eq!(decode_key(b"\x1bOH"), Key::Home(Mods::empty()));
    assert_eq!(decode_key(b"\x1bOF"), Key::End(Mods::empty()));
}

#[test]
fn parametric_navigation() {
    assert_eq!(decode_key(b"\x1b[1~"), Key::Home(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[7~"), Key::Home(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[4~"), Key::End(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[8~"), Key::End(Mods::empty()));
    assert_eq!(decode_key(b"\x1b[5~"), Key::PageUp);
    assert_eq!(decode_key(b"\x1b[6~"), Key::PageDown);
    assert_eq!(decode_key(b"\x1b[3~"), Key::Delete);
    assert_eq!(decode_key(b"\x1b[21~"), Key::F10);
    assert_eq!(decode_key(b"\x1b[3;5~"), Key::CtrlDelete);
}

#[test]
fn modified_arrows() {
    assert_eq!(
        decode_key(b"\x1b[1;2C"),
        Key::Arrow(Direction::Right, Mods::SHIFT)
    );
    assert_eq!(
        decode_key(b"\x1b[1;3A"),
        Key::Arrow(Direction::Up, Mods::ALT)
    );
    assert_eq!(
        decode_key(b"\x1b[1;4B"),
        Key::Arrow(Direction::Down, Mods::ALT | Mods::SHIFT)
    );
    assert_eq!(
        decode_key(b"\x1b[1;5D"),
        Key::Arrow(Direction::Left, Mods::CTRL)
    );
    assert_eq!(decode_key(b"\x1b[1;2H"), Key::Home(Mods::SHIFT));
    assert_eq!(decode_key(b"\x1b[1;5F"), Key::End(Mods::CTRL));
}

#[test]
fn sgr_mouse_press_release() {
    let press = decode_mouse(b"\x1b[<0;10;5M");
    assert_eq!(press.kind, MouseKind::Press(MouseButton::Left));
    assert_eq!((press.col, press.row), (9, 4));
    assert_eq!(press.mods, Mods::empty());

    let release = decode_mouse(b"\x1b[<0;10;5m");
    assert_eq!(release.kind, MouseKind::Release(MouseButton::Left));
}

#[test]
fn sgr_mouse_modifiers_and_motion() {
    let alt_click = decode_mouse(b"\x1b[<8;3;4M");
    assert_eq!(alt_click.kind, MouseKind::Press(MouseButton::Left));
    assert_eq!(alt_click.mods, Mods::ALT);

    let drag = decode_mouse(b"\x1b[<32;7;2M");
    assert_eq!(drag.kind, MouseKind::Drag(MouseButton::Left));

    let ctrl_shift = decode_mouse(b"\x1b[<20;1;1M");
    assert_eq!(ctrl_shift.mods, Mods::CTRL | Mods::SHIFT);
}

#[test]
fn sgr_mouse_wheel() {
    assert_eq!(decode_mouse(b"\x1b[<64;1;1M").kind, MouseKind::ScrollUp);
    assert_eq!(decode_mouse(b"\x1b[<65;1;1M").kind, MouseKind::ScrollDown);
}

#[test]
fn truncated_sequences_degrade_to_escape() {
    assert_eq!(decode_key(b"\x1b[1;"), Key::Escape);
    assert_eq!(decode_key(b"\x1b[<0;10"), Key::Escape);
    assert_eq!(decode_key(b"\x1bO"), Key::Escape);
}
