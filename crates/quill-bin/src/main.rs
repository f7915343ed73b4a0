//! Quill entrypoint: startup, the event loop, and the dispatch table.

use anyhow::Result;
use clap::Parser;
use core_events::{Direction, InputEvent, Key, Mods, MouseButton, MouseEvent, MouseKind};
use core_input::{ScrollSpeed, next_event};
use core_render::{RenderOptions, Theme, Viewport};
use core_state::{EditorState, Motion};
use core_terminal::{RawModeGuard, TtyByteSource};
use core_text::Position;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Consecutive quit presses required while the buffer is dirty.
const QUIT_TIMES: u8 = 3;

/// Main-loop read timeout (one decisecond).
const READ_TIMEOUT_MS: u32 = 100;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill editor")]
struct Args {
    /// Path to open at startup; a fresh unnamed buffer when omitted.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `quill.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(Path::new("."), "quill.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!(target: "runtime.panic", ?panic_info, "panic");
        default_panic(panic_info);
    }));
}

/// What a prompt keystroke should do next.
enum PromptStep {
    Continue,
    Accept,
    Cancel,
}

struct App {
    state: EditorState,
    viewport: Viewport,
    theme: Theme,
    soft_wrap: bool,
    wrap_column: usize,
    line_numbers: bool,
    scroll_speed: ScrollSpeed,
    winch: Arc<AtomicBool>,
    quit_times: u8,
    center_next: bool,
    running: bool,
}

impl App {
    fn new(state: EditorState, config: &core_config::Config) -> Result<Self> {
        let mut app = Self {
            state,
            viewport: Viewport::new(0, 0),
            theme: Theme::default(),
            soft_wrap: config.editor.soft_wrap,
            wrap_column: config.editor.wrap_column,
            line_numbers: config.editor.line_numbers,
            scroll_speed: ScrollSpeed::new(),
            winch: core_terminal::winch_flag()?,
            quit_times: QUIT_TIMES,
            center_next: false,
            running: true,
        };
        app.state.cursors.follow_primary = config.cursors.follow_primary;
        app.state.cursors.allow_overlap = config.cursors.allow_overlap;
        app.resize()?;
        Ok(app)
    }

    fn options(&self) -> RenderOptions {
        RenderOptions {
            line_numbers: self.line_numbers,
            soft_wrap: self.soft_wrap,
        }
    }

    fn resize(&mut self) -> Result<()> {
        let (cols, rows) = core_terminal::window_size()?;
        let gutter =
            core_render::gutter_width(self.state.buffer.row_count(), self.line_numbers);
        self.viewport.screen_rows = (rows as usize).saturating_sub(1);
        self.viewport.screen_cols = (cols as usize).saturating_sub(gutter);
        self.sync_wrap();
        Ok(())
    }

    /// Keep the buffer's wrap width in step with the text area; a no-op
    /// when nothing changed, so rows keep their cached segmentation.
    fn sync_wrap(&mut self) {
        let width = if self.soft_wrap {
            self.viewport.screen_cols.max(1)
        } else {
            0
        };
        self.state.buffer.set_wrap_width(width);
    }

    fn refresh(&mut self) -> Result<()> {
        let gutter =
            core_render::gutter_width(self.state.buffer.row_count(), self.line_numbers);
        if let Ok((cols, _)) = core_terminal::window_size() {
            self.viewport.screen_cols = (cols as usize).saturating_sub(gutter);
        }
        self.sync_wrap();
        self.state.refresh_bracket_match();

        let vrow = core_render::cursor_visual_row(&self.state, self.soft_wrap);
        if self.center_next {
            let total = if self.soft_wrap {
                core_text::wrap::total_visual_rows(self.state.buffer.rows())
            } else {
                self.state.buffer.row_count()
            };
            self.viewport.center_on(vrow, total);
            self.center_next = false;
        } else {
            self.viewport.scroll_to(vrow);
        }
        if !self.soft_wrap {
            let rx = self
                .state
                .buffer
                .row(self.state.buffer.cursor.row)
                .map(|r| r.cx_to_rx(self.state.buffer.cursor.col))
                .unwrap_or(0);
            self.viewport.scroll_to_col(rx);
        }

        let status = self.status_line();
        core_render::draw(
            &self.state,
            &self.viewport,
            &self.theme,
            &self.options(),
            &status,
        )
    }

    fn status_line(&self) -> String {
        if let Some(msg) = self.state.status() {
            return msg.to_string();
        }
        let name = self
            .state
            .buffer
            .file_name
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "[No Name]".to_string());
        let dirty = if self.state.buffer.is_dirty() {
            " (modified)"
        } else {
            ""
        };
        let cursor = self.state.buffer.cursor;
        format!(
            "{name}{dirty} - {} lines | Ln {}, Col {}",
            self.state.buffer.row_count(),
            cursor.row + 1,
            cursor.col + 1,
        )
    }

    // -----------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------

    fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
        }
        if !matches!(event, InputEvent::Key(Key::Ctrl('q')) | InputEvent::Key(Key::F10)) {
            self.quit_times = QUIT_TIMES;
        }
    }

    fn handle_key(&mut self, key: Key) {
        match key {
            Key::Char(c) => self.state.insert_char(c),
            Key::Enter => self.state.insert_newline(),
            Key::Backspace | Key::Ctrl('h') => self.state.backspace(),
            Key::Delete => self.state.forward_delete(),
            Key::CtrlDelete => self.state.delete_word_forward(),
            Key::Ctrl('w') => self.state.delete_word_backward(),
            Key::Tab => self.state.indent_lines(),
            Key::ShiftTab => self.state.unindent_lines(),

            Key::Arrow(dir, mods) => self.handle_arrow(dir, mods),
            Key::Home(mods) => self.handle_motion(Motion::LineStart, mods),
            Key::End(mods) => self.handle_motion(Motion::LineEnd, mods),
            Key::PageUp => {
                self.handle_motion(Motion::PageUp(self.viewport.screen_rows), Mods::empty())
            }
            Key::PageDown => {
                self.handle_motion(Motion::PageDown(self.viewport.screen_rows), Mods::empty())
            }

            Key::Ctrl('q') | Key::F10 => self.request_quit(),
            Key::Ctrl('s') => self.save(),
            Key::Ctrl('f') => self.find(),
            Key::Ctrl('z') => {
                self.state.undo();
            }
            Key::Ctrl('y') => {
                self.state.redo();
            }
            Key::Ctrl('a') => self.state.selection.select_all(&self.state.buffer),
            Key::Ctrl('c') => self.copy_selection(),
            Key::Ctrl('x') => {
                self.copy_selection();
                self.state.delete_selection();
            }
            Key::Ctrl('v') => {
                let text = self.state.clipboard.paste();
                self.state.paste(&text);
            }
            Key::Ctrl('d') => self.state.duplicate_line(),
            Key::Ctrl('k') => self.state.delete_line(),
            Key::Ctrl('l') => self.center_next = true,
            Key::Ctrl('_') => self.state.toggle_line_comment(),

            Key::Alt('q') => {
                let col = self.wrap_column;
                self.state.reflow_paragraph(col);
            }
            Key::Alt('j') => self.state.join_paragraph(),
            Key::Alt('t') => self.state.join_lines(),
            Key::Alt('c') => self.state.toggle_line_comment(),
            Key::Alt('v') => self.state.toggle_block_comment(),
            Key::Alt('n') => self.state.add_cursor_at_next_match(),
            Key::Alt('m') => self.center_next = true,
            Key::Alt('s') => self.save(),
            Key::Alt('w') => {
                self.soft_wrap = !self.soft_wrap;
                self.viewport.col_offset = 0;
                self.sync_wrap();
            }
            Key::Alt('l') => {
                self.line_numbers = !self.line_numbers;
                let _ = self.resize();
            }
            Key::Alt('z') => {
                self.state.undo();
            }
            Key::Alt('r') => {
                self.state.redo();
            }
            Key::AltOpenBracket => self.jump_to_bracket(false),
            Key::AltCloseBracket => self.jump_to_bracket(true),

            Key::Escape => {
                self.state.clear_secondary_cursors();
                self.state.selection.clear();
                self.state.search.clear();
            }
            _ => {}
        }
    }

    fn handle_arrow(&mut self, dir: Direction, mods: Mods) {
        if mods.contains(Mods::ALT) && mods.contains(Mods::SHIFT) {
            match dir {
                Direction::Up => self.state.add_cursor_vertical(false),
                Direction::Down => self.state.add_cursor_vertical(true),
                _ => {}
            }
            return;
        }
        if mods.contains(Mods::CTRL) {
            match dir {
                Direction::Up => self.state.move_line_up(),
                Direction::Down => self.state.move_line_down(),
                Direction::Left => self.handle_motion(Motion::WordLeft, mods & Mods::SHIFT),
                Direction::Right => self.handle_motion(Motion::WordRight, mods & Mods::SHIFT),
            }
            return;
        }
        let motion = match dir {
            Direction::Up => Motion::Up,
            Direction::Down => Motion::Down,
            Direction::Left => Motion::Left,
            Direction::Right => Motion::Right,
        };
        self.handle_motion(motion, mods);
    }

    /// Shift-modified movement extends the selection; plain movement drops
    /// it.
    fn handle_motion(&mut self, motion: Motion, mods: Mods) {
        if mods.contains(Mods::SHIFT) {
            if !self.state.selection.active {
                self.state.selection.start(self.state.buffer.cursor);
            }
            self.state.move_cursor(motion);
            let cursor = self.state.buffer.cursor;
            self.state.selection.extend(cursor);
        } else {
            self.state.selection.clear();
            self.state.move_cursor(motion);
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let pos = core_render::screen_to_position(
            &self.state,
            &self.viewport,
            &self.options(),
            mouse.row,
            mouse.col,
        );
        match mouse.kind {
            MouseKind::Press(MouseButton::Left) => {
                if mouse.mods.contains(Mods::ALT) {
                    if !self.state.cursors.remove_at(pos) && pos != self.state.buffer.cursor {
                        self.state.cursors.add(pos);
                    }
                    return;
                }
                let count = self.state.selection.register_click(pos, Instant::now());
                self.state.buffer.cursor = pos;
                self.state.buffer.clamp_cursor();
                match count {
                    2 => {
                        self.state.selection.select_word(&self.state.buffer, pos);
                        self.state.buffer.cursor = self.state.selection.cursor;
                    }
                    3 => {
                        self.state.selection.select_line(&self.state.buffer, pos.row);
                        self.state.buffer.cursor = self.state.selection.cursor;
                    }
                    _ => self.state.selection.start(pos),
                }
            }
            MouseKind::Drag(MouseButton::Left) => {
                self.state.selection.extend(pos);
                self.state.buffer.cursor = pos;
                self.state.buffer.clamp_cursor();
            }
            MouseKind::Release(MouseButton::Left) => {
                if self.state.selection.is_empty() {
                    self.state.selection.clear();
                }
            }
            MouseKind::ScrollUp | MouseKind::ScrollDown => {
                let steps = self.scroll_speed.tick(Instant::now());
                let motion = if matches!(mouse.kind, MouseKind::ScrollUp) {
                    Motion::Up
                } else {
                    Motion::Down
                };
                for _ in 0..steps {
                    self.state.move_cursor(motion);
                }
            }
            _ => {}
        }
    }

    fn jump_to_bracket(&mut self, to_close: bool) {
        self.state.refresh_bracket_match();
        if let Some(m) = self.state.bracket {
            let target = if to_close { m.close.0 } else { m.open.0 };
            self.state.buffer.cursor = target;
            self.state.buffer.clamp_cursor();
        }
    }

    fn request_quit(&mut self) {
        if self.state.buffer.is_dirty() && self.quit_times > 0 {
            self.quit_times -= 1;
            if self.quit_times == 0 {
                self.running = false;
                return;
            }
            self.state.set_status(format!(
                "File has unsaved changes. Press quit {} more time{} to discard them.",
                self.quit_times,
                if self.quit_times == 1 { "" } else { "s" },
            ));
            return;
        }
        self.running = false;
    }

    fn copy_selection(&mut self) {
        let text = self.state.selected_text();
        if !text.is_empty() {
            self.state.clipboard.copy(text);
            self.state.set_status("Copied");
        }
    }

    // -----------------------------------------------------------------
    // Save and prompts
    // -----------------------------------------------------------------

    fn save(&mut self) {
        let path = match self.state.buffer.file_name.clone() {
            Some(path) => path,
            None => match self.prompt("Save as: ", |_, _, _| {}) {
                Some(name) if !name.is_empty() => {
                    let path = PathBuf::from(name);
                    self.state.buffer.file_name = Some(path.clone());
                    self.state.buffer.detect_syntax();
                    path
                }
                _ => {
                    self.state.set_status("Save aborted");
                    return;
                }
            },
        };
        match self.state.buffer.save(&path) {
            Ok(bytes) => {
                self.state
                    .set_status(format!("{bytes} bytes written to {}", path.display()));
            }
            Err(err) => {
                error!(target: "runtime", %err, "save_failed");
                self.state.set_status(format!("Save failed: {err:#}"));
            }
        }
    }

    /// Incremental search: every keystroke re-runs the scan, arrows cycle
    /// matches, Enter accepts, Escape restores cursor and viewport.
    fn find(&mut self) {
        let saved_cursor = self.state.buffer.cursor;
        let saved_viewport = self.viewport;
        let accepted = self.prompt("Find: ", |app, query, key| {
            match key {
                Some(Key::Arrow(Direction::Down, _)) | Some(Key::Arrow(Direction::Right, _)) => {
                    app.state.search.advance(true);
                }
                Some(Key::Arrow(Direction::Up, _)) | Some(Key::Arrow(Direction::Left, _)) => {
                    app.state.search.advance(false);
                }
                _ => {
                    app.state.search.run(&app.state.buffer, query);
                    app.seek_match_from(saved_cursor);
                }
            }
            if let Some(m) = app.state.search.current_match() {
                let col = app
                    .state
                    .buffer
                    .row(m.line)
                    .map(|r| r.rx_to_cx(m.offset))
                    .unwrap_or(0);
                app.state.buffer.cursor = Position::new(m.line, col);
                app.state.buffer.clamp_cursor();
                app.center_next = true;
            }
            app.state.search.paint_current(&mut app.state.buffer);
        });
        self.state.search.restore(&mut self.state.buffer);
        if accepted.is_none() {
            self.state.buffer.cursor = saved_cursor;
            self.viewport = saved_viewport;
            self.state.search.clear();
        }
    }

    /// Pick the first match at or after `from`, to keep search forward-
    /// feeling while typing.
    fn seek_match_from(&mut self, from: Position) {
        let matches = self.state.search.matches();
        if matches.is_empty() {
            return;
        }
        let idx = matches
            .iter()
            .position(|m| Position::new(m.line, m.offset) >= from)
            .unwrap_or(0);
        self.state.search.current = idx;
    }

    /// Minimal status-line prompt; `on_change` runs after every keystroke
    /// with the current input.
    fn prompt(
        &mut self,
        label: &str,
        mut on_change: impl FnMut(&mut Self, &str, Option<Key>),
    ) -> Option<String> {
        let mut input = String::new();
        let mut src = TtyByteSource;
        on_change(self, &input, None);
        loop {
            let status = format!("{label}{input}");
            self.state.set_status(status);
            if self.refresh().is_err() {
                return None;
            }
            let event = match next_event(&mut src, READ_TIMEOUT_MS) {
                Ok(Some(ev)) => ev,
                Ok(None) => continue,
                Err(_) => return None,
            };
            let InputEvent::Key(key) = event else {
                continue;
            };
            let step = match key {
                Key::Enter => PromptStep::Accept,
                Key::Escape => PromptStep::Cancel,
                Key::Backspace | Key::Ctrl('h') => {
                    input.pop();
                    PromptStep::Continue
                }
                Key::Char(c) => {
                    input.push(c);
                    PromptStep::Continue
                }
                _ => PromptStep::Continue,
            };
            match step {
                PromptStep::Accept => {
                    self.state.clear_status();
                    return Some(input);
                }
                PromptStep::Cancel => {
                    self.state.clear_status();
                    return None;
                }
                PromptStep::Continue => on_change(self, &input, Some(key)),
            }
        }
    }

    // -----------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------

    fn run(&mut self) -> Result<()> {
        let mut src = TtyByteSource;
        self.refresh()?;
        while self.running {
            if self.winch.swap(false, Ordering::Relaxed) {
                self.resize()?;
            }
            match next_event(&mut src, READ_TIMEOUT_MS)? {
                Some(event) => {
                    self.handle_event(event);
                }
                None => {
                    if !self.winch.load(Ordering::Relaxed) {
                        // Idle tick: redraw only for status fade.
                        self.refresh()?;
                        continue;
                    }
                }
            }
            self.refresh()?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;

    let state = match args.path.as_ref() {
        Some(path) if path.exists() => EditorState::open(path)?,
        Some(path) => {
            // A fresh buffer headed for a new file.
            let mut state = EditorState::default();
            state.buffer.file_name = Some(path.clone());
            state.buffer.detect_syntax();
            state
        }
        None => EditorState::default(),
    };

    let mut raw = RawModeGuard::enter()?;
    core_terminal::write_frame(core_terminal::ansi::ENABLE_MOUSE.as_bytes())?;

    let mut app = App::new(state, &config)?;
    let result = app.run();

    raw.leave();
    drop(log_guard);
    result
}
