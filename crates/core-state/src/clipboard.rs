//! Internal clipboard with an external-program bridge.
//!
//! Copy pipes through `xsel --clipboard --input`, falling back to
//! `xclip -selection clipboard`; paste runs the inverse direction. The
//! bridge is best-effort: when neither program is usable the internal
//! string keeps working and nothing is reported. The last successfully
//! synced text is remembered so externally-changed content is imported
//! before a paste (smart merge).

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Clipboard {
    content: String,
    last_synced: Option<String>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Store `text` internally and push it to the system clipboard.
    pub fn copy(&mut self, text: String) {
        match write_external(&text) {
            Ok(()) => self.last_synced = Some(text.clone()),
            Err(err) => debug!(target: "state.clipboard", %err, "external_copy_unavailable"),
        }
        self.content = text;
    }

    /// Text to paste. External content that differs from the last sync wins
    /// over the internal string.
    pub fn paste(&mut self) -> String {
        match read_external() {
            Ok(external) => {
                if self.last_synced.as_deref() != Some(external.as_str()) {
                    self.content = external.clone();
                    self.last_synced = Some(external);
                }
            }
            Err(err) => debug!(target: "state.clipboard", %err, "external_paste_unavailable"),
        }
        self.content.clone()
    }
}

fn write_external(text: &str) -> std::io::Result<()> {
    let candidates: [(&str, &[&str]); 2] = [
        ("xsel", &["--clipboard", "--input"]),
        ("xclip", &["-selection", "clipboard"]),
    ];
    let mut last_err = None;
    for (program, args) in candidates {
        match pipe_to(program, args, text) {
            Ok(()) => return Ok(()),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("no clipboard program")))
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> std::io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("{program} exited {status}")))
    }
}

fn read_external() -> std::io::Result<String> {
    let candidates: [(&str, &[&str]); 2] = [
        ("xsel", &["--clipboard", "--output"]),
        ("xclip", &["-selection", "clipboard", "-o"]),
    ];
    let mut last_err = None;
    for (program, args) in candidates {
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => {
                return Ok(String::from_utf8_lossy(&out.stdout).into_owned());
            }
            Ok(out) => {
                last_err = Some(std::io::Error::other(format!(
                    "{program} exited {}",
                    out.status
                )));
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("no clipboard program")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_always_lands_internally() {
        let mut c = Clipboard::new();
        assert!(c.is_empty());
        c.copy("hello".to_string());
        assert_eq!(c.content(), "hello");
        c.copy(String::new());
        assert!(c.is_empty());
    }
}
