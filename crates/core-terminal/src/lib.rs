//! Terminal plumbing: raw mode, sizing, the resize flag, and timed byte
//! reads.
//!
//! Raw mode is entered through crossterm and restored on every exit path by
//! an RAII guard (drop runs on unwind too). Input bypasses crossterm's event
//! layer: the decoder owns escape parsing, so this crate only hands it one
//! byte at a time, waiting on `poll(2)` with a millisecond timeout. The
//! SIGWINCH handler does nothing but set an atomic flag; dimensions are
//! recomputed in the main loop.

use anyhow::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::{debug, warn};

pub mod ansi;

/// Fatal terminal failures; everything here aborts startup.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to enter raw mode: {0}")]
    RawMode(#[source] std::io::Error),
    #[error("failed to query window size")]
    WindowSize,
    #[error("terminal read failed: {0}")]
    Read(#[source] std::io::Error),
}

/// RAII raw-mode guard; restores cooked mode (and mouse/cursor protocol
/// state) however the process leaves.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enter() -> Result<Self, TerminalError> {
        enable_raw_mode().map_err(TerminalError::RawMode)?;
        debug!(target: "terminal", "raw_mode_entered");
        Ok(Self { active: true })
    }

    pub fn leave(&mut self) {
        if self.active {
            let mut out = std::io::stdout();
            let _ = out.write_all(ansi::DISABLE_MOUSE.as_bytes());
            let _ = out.write_all(ansi::CLEAR_SECONDARY_CURSORS.as_bytes());
            let _ = out.write_all(ansi::SHOW_CURSOR.as_bytes());
            let _ = out.flush();
            let _ = disable_raw_mode();
            self.active = false;
            debug!(target: "terminal", "raw_mode_left");
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.leave();
    }
}

/// Register the SIGWINCH flag. The handler only stores into the atomic.
pub fn winch_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&flag))?;
    Ok(flag)
}

/// Window size as (columns, rows): the OS query first, the cursor-report
/// fallback when that fails.
pub fn window_size() -> Result<(u16, u16), TerminalError> {
    match crossterm::terminal::size() {
        Ok(size) => Ok(size),
        Err(err) => {
            warn!(target: "terminal", %err, "size_ioctl_failed");
            cursor_report_size().ok_or(TerminalError::WindowSize)
        }
    }
}

/// Push the cursor to the bottom-right corner and ask it where it landed
/// (`ESC [ 6 n` → `ESC [ rows ; cols R`).
fn cursor_report_size() -> Option<(u16, u16)> {
    let mut out = std::io::stdout();
    out.write_all(b"\x1b[999C\x1b[999B\x1b[6n").ok()?;
    out.flush().ok()?;

    let mut reply = Vec::new();
    loop {
        match read_byte(100) {
            Ok(Some(b'R')) => break,
            Ok(Some(b)) => reply.push(b),
            _ => return None,
        }
        if reply.len() > 32 {
            return None;
        }
    }
    let reply = std::str::from_utf8(&reply).ok()?;
    let (rows, cols) = reply.strip_prefix("\x1b[")?.split_once(';')?;
    Some((cols.parse().ok()?, rows.parse().ok()?))
}

/// One byte from stdin, waiting up to `timeout_ms`. `Ok(None)` is the idle
/// tick; `EINTR` (a signal, usually the resize) also reads as idle so the
/// main loop can notice its flag.
pub fn read_byte(timeout_ms: u32) -> Result<Option<u8>, TerminalError> {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    let ready = unsafe { libc::poll(&mut fds, 1, timeout_ms as libc::c_int) };
    if ready < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            return Ok(None);
        }
        return Err(TerminalError::Read(err));
    }
    if ready == 0 {
        return Ok(None);
    }
    let mut byte = 0u8;
    let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
    match n {
        1 => Ok(Some(byte)),
        0 => Ok(None),
        _ => {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted
                || err.kind() == std::io::ErrorKind::WouldBlock
            {
                Ok(None)
            } else {
                Err(TerminalError::Read(err))
            }
        }
    }
}

/// Stdin as a decoder byte source.
pub struct TtyByteSource;

impl core_input::ByteSource for TtyByteSource {
    fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>> {
        Ok(read_byte(timeout_ms)?)
    }
}

/// Write one consolidated frame and flush.
pub fn write_frame(frame: &[u8]) -> Result<()> {
    let mut out = std::io::stdout();
    out.write_all(frame)?;
    out.flush()?;
    Ok(())
}
