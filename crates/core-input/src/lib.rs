//! Byte-sequence decoding: raw terminal bytes to key and mouse events.
//!
//! Bytes arrive one at a time from a [`ByteSource`]. A byte that is not ESC
//! is an ordinary key. On ESC the decoder peeks the follow-up under a short
//! timeout; a lone ESC is the Escape key. The decoder is an explicit state
//! walk, never a direct byte-to-binding map, so the dispatch table above it
//! stays independent of terminal quirks.
//!
//! Recognized families:
//! * `ESC <letter>` for a small Alt-letter set, `ESC [`/`ESC ]` alone for
//!   the Alt-bracket pair;
//! * `ESC [ <` SGR mouse reports (`button;col;row` then `M`/`m`);
//! * `ESC [ <digits...>` parametric sequences (Home/End/Page/Delete/F10 and
//!   the `1;<mod>` modifier form);
//! * `ESC [ A..D/H/F/Z` and `ESC O H/F` finals.

use anyhow::Result;
use core_events::{Direction, InputEvent, Key, Mods, MouseButton, MouseEvent, MouseKind};
use std::time::{Duration, Instant};
use tracing::trace;

/// Timeout used when peeking ESC follow-up bytes.
pub const PEEK_TIMEOUT_MS: u32 = 25;

const ALT_LETTERS: &str = "tTlLqQjJsSrRnNwWcCvVzZmM";

/// One byte at a time, with a millisecond timeout. `Ok(None)` is a timeout;
/// errors are fatal to the caller.
pub trait ByteSource {
    fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>>;
}

/// Decode the next input event, waiting up to `timeout_ms` for the first
/// byte. Returns `Ok(None)` when nothing arrived (the idle tick).
pub fn next_event<S: ByteSource>(src: &mut S, timeout_ms: u32) -> Result<Option<InputEvent>> {
    let Some(b) = src.read_byte(timeout_ms)? else {
        return Ok(None);
    };
    if b != 0x1b {
        return Ok(Some(InputEvent::Key(Key::from_byte(b))));
    }
    let Some(b1) = src.read_byte(PEEK_TIMEOUT_MS)? else {
        return Ok(Some(InputEvent::Key(Key::Escape)));
    };
    let event = match b1 {
        b'[' => decode_csi(src)?,
        b']' => InputEvent::Key(Key::AltCloseBracket),
        b'O' => match src.read_byte(PEEK_TIMEOUT_MS)? {
            Some(b'H') => InputEvent::Key(Key::Home(Mods::empty())),
            Some(b'F') => InputEvent::Key(Key::End(Mods::empty())),
            _ => InputEvent::Key(Key::Escape),
        },
        c if ALT_LETTERS.contains(c as char) => {
            InputEvent::Key(Key::Alt((c as char).to_ascii_lowercase()))
        }
        other => {
            trace!(target: "input.decode", byte = other, "unknown_escape_followup");
            InputEvent::Key(Key::Escape)
        }
    };
    Ok(Some(event))
}

/// Everything after `ESC [`.
fn decode_csi<S: ByteSource>(src: &mut S) -> Result<InputEvent> {
    let Some(b2) = src.read_byte(PEEK_TIMEOUT_MS)? else {
        return Ok(InputEvent::Key(Key::AltOpenBracket));
    };
    match b2 {
        b'<' => decode_sgr_mouse(src),
        b'A' => Ok(InputEvent::Key(Key::Arrow(Direction::Up, Mods::empty()))),
        b'B' => Ok(InputEvent::Key(Key::Arrow(Direction::Down, Mods::empty()))),
        b'C' => Ok(InputEvent::Key(Key::Arrow(Direction::Right, Mods::empty()))),
        b'D' => Ok(InputEvent::Key(Key::Arrow(Direction::Left, Mods::empty()))),
        b'H' => Ok(InputEvent::Key(Key::Home(Mods::empty()))),
        b'F' => Ok(InputEvent::Key(Key::End(Mods::empty()))),
        b'Z' => Ok(InputEvent::Key(Key::ShiftTab)),
        d if d.is_ascii_digit() => decode_parametric(src, d),
        other => {
            trace!(target: "input.decode", byte = other, "unknown_csi_final");
            Ok(InputEvent::Key(Key::Escape))
        }
    }
}

/// `ESC [ <digits...>` with optional `;<param>` groups, ending in `~` or a
/// letter final.
fn decode_parametric<S: ByteSource>(src: &mut S, first: u8) -> Result<InputEvent> {
    let mut params: Vec<usize> = vec![(first - b'0') as usize];
    let final_byte = loop {
        match src.read_byte(PEEK_TIMEOUT_MS)? {
            Some(d) if d.is_ascii_digit() => {
                let cur = params.last_mut().expect("params never empty");
                *cur = *cur * 10 + (d - b'0') as usize;
            }
            Some(b';') => params.push(0),
            Some(f) => break f,
            None => return Ok(InputEvent::Key(Key::Escape)),
        }
    };

    let key = match (final_byte, params.as_slice()) {
        (b'~', [1] | [7]) => Key::Home(Mods::empty()),
        (b'~', [4] | [8]) => Key::End(Mods::empty()),
        (b'~', [5]) => Key::PageUp,
        (b'~', [6]) => Key::PageDown,
        (b'~', [3]) => Key::Delete,
        (b'~', [3, 5]) => Key::CtrlDelete,
        (b'~', [21]) => Key::F10,
        (final_key, [1, modifier]) => {
            let mods = decode_modifier(*modifier);
            match final_key {
                b'A' => Key::Arrow(Direction::Up, mods),
                b'B' => Key::Arrow(Direction::Down, mods),
                b'C' => Key::Arrow(Direction::Right, mods),
                b'D' => Key::Arrow(Direction::Left, mods),
                b'H' => Key::Home(mods),
                b'F' => Key::End(mods),
                _ => Key::Escape,
            }
        }
        _ => {
            trace!(target: "input.decode", final_byte, ?params, "unknown_parametric");
            Key::Escape
        }
    };
    Ok(InputEvent::Key(key))
}

/// `1;<m>` modifier encoding: 2=Shift, 3=Alt, 4=Alt+Shift, 5=Ctrl.
fn decode_modifier(code: usize) -> Mods {
    match code {
        2 => Mods::SHIFT,
        3 => Mods::ALT,
        4 => Mods::ALT | Mods::SHIFT,
        5 => Mods::CTRL,
        _ => Mods::empty(),
    }
}

/// SGR report: `button;col;row` then `M` (press) or `m` (release), with
/// one-based coordinates.
fn decode_sgr_mouse<S: ByteSource>(src: &mut S) -> Result<InputEvent> {
    let mut params: Vec<usize> = vec![0];
    let terminator = loop {
        match src.read_byte(PEEK_TIMEOUT_MS)? {
            Some(d) if d.is_ascii_digit() => {
                let cur = params.last_mut().expect("params never empty");
                *cur = *cur * 10 + (d - b'0') as usize;
            }
            Some(b';') => params.push(0),
            Some(t @ (b'M' | b'm')) => break t,
            _ => return Ok(InputEvent::Key(Key::Escape)),
        }
    };
    let [value, col, row] = params.as_slice() else {
        return Ok(InputEvent::Key(Key::Escape));
    };

    let mut mods = Mods::empty();
    if value & 4 != 0 {
        mods |= Mods::SHIFT;
    }
    if value & 8 != 0 {
        mods |= Mods::ALT;
    }
    if value & 16 != 0 {
        mods |= Mods::CTRL;
    }
    let motion = value & 32 != 0;

    let kind = if value & 64 != 0 {
        if value & 1 == 0 {
            MouseKind::ScrollUp
        } else {
            MouseKind::ScrollDown
        }
    } else {
        let button = match value & 3 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Other,
        };
        if terminator == b'm' {
            MouseKind::Release(button)
        } else if motion {
            MouseKind::Drag(button)
        } else {
            MouseKind::Press(button)
        }
    };

    Ok(InputEvent::Mouse(MouseEvent {
        kind,
        col: col.saturating_sub(1),
        row: row.saturating_sub(1),
        mods,
    }))
}

/// Wheel-tick accelerator: ticks under 80 ms apart raise the multiplier (to
/// a cap of 15), a gap over 150 ms resets it to 1. The multiplier is the
/// number of movement steps dispatched per tick.
#[derive(Debug)]
pub struct ScrollSpeed {
    multiplier: u32,
    last_tick: Option<Instant>,
}

const SPEEDUP_WINDOW: Duration = Duration::from_millis(80);
const RESET_WINDOW: Duration = Duration::from_millis(150);
const MAX_MULTIPLIER: u32 = 15;

impl Default for ScrollSpeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollSpeed {
    pub fn new() -> Self {
        Self {
            multiplier: 1,
            last_tick: None,
        }
    }

    pub fn tick(&mut self, now: Instant) -> u32 {
        if let Some(last) = self.last_tick {
            let gap = now.duration_since(last);
            if gap < SPEEDUP_WINDOW {
                self.multiplier = (self.multiplier + 1).min(MAX_MULTIPLIER);
            } else if gap > RESET_WINDOW {
                self.multiplier = 1;
            }
        }
        self.last_tick = Some(now);
        self.multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_speed_ramps_and_caps() {
        let mut s = ScrollSpeed::new();
        let t0 = Instant::now();
        assert_eq!(s.tick(t0), 1);
        let mut t = t0;
        for _ in 0..30 {
            t += Duration::from_millis(20);
            s.tick(t);
        }
        t += Duration::from_millis(20);
        assert_eq!(s.tick(t), 15);
    }

    #[test]
    fn scroll_speed_resets_after_pause() {
        let mut s = ScrollSpeed::new();
        let t0 = Instant::now();
        s.tick(t0);
        s.tick(t0 + Duration::from_millis(40));
        assert_eq!(s.tick(t0 + Duration::from_millis(400)), 1);
    }

    #[test]
    fn scroll_speed_holds_between_windows() {
        let mut s = ScrollSpeed::new();
        let t0 = Instant::now();
        s.tick(t0);
        let m = s.tick(t0 + Duration::from_millis(40));
        assert_eq!(s.tick(t0 + Duration::from_millis(40 + 100)), m);
    }
}
