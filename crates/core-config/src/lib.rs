//! Preference file loading and parsing.
//!
//! `quill.toml` is looked up in the working directory first, then the
//! platform config dir. Unknown fields are ignored and a file that fails to
//! parse falls back to defaults, so a bad config never blocks startup.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct EditorSection {
    #[serde(default = "EditorSection::default_soft_wrap")]
    pub soft_wrap: bool,
    #[serde(default = "EditorSection::default_wrap_column")]
    pub wrap_column: usize,
    #[serde(default = "EditorSection::default_line_numbers")]
    pub line_numbers: bool,
}

impl EditorSection {
    const fn default_soft_wrap() -> bool {
        true
    }
    const fn default_wrap_column() -> usize {
        80
    }
    const fn default_line_numbers() -> bool {
        true
    }
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            soft_wrap: Self::default_soft_wrap(),
            wrap_column: Self::default_wrap_column(),
            line_numbers: Self::default_line_numbers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct CursorsSection {
    #[serde(default)]
    pub follow_primary: bool,
    #[serde(default)]
    pub allow_overlap: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorSection,
    #[serde(default)]
    pub cursors: CursorsSection,
}

/// Working directory first, platform config dir second.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("quill.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("quill").join("quill.toml");
    }
    PathBuf::from("quill.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!(target: "config", path = %path.display(), %err, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__no_such_config__.toml"))).unwrap();
        assert!(cfg.editor.soft_wrap);
        assert_eq!(cfg.editor.wrap_column, 80);
        assert!(cfg.editor.line_numbers);
        assert!(!cfg.cursors.follow_primary);
        assert!(!cfg.cursors.allow_overlap);
    }

    #[test]
    fn parses_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[editor]\nsoft_wrap = false\nwrap_column = 100\n[cursors]\nfollow_primary = true\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(!cfg.editor.soft_wrap);
        assert_eq!(cfg.editor.wrap_column, 100);
        assert!(cfg.cursors.follow_primary);
        assert!(!cfg.cursors.allow_overlap);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[editor]\nmystery = 3\n[theme]\nname = \"x\"\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.editor.soft_wrap);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not = [valid").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.editor.wrap_column, 80);
    }
}
