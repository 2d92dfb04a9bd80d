//! `.mmmignore` handling
//!
//! One glob per line, relative to the directory holding the config document.
//! Blank lines are skipped. `**/*.disabled` is always in effect.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::DEFAULT_IGNORE_PATTERN;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled ignore patterns anchored at a root directory.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// Only the built-in pattern.
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        Self::from_lines(root, std::iter::empty::<&str>())
    }

    /// Read `ignore_file` if it exists; a missing file means defaults only.
    pub fn load(ignore_file: &Path, root: impl Into<PathBuf>) -> std::io::Result<Self> {
        match std::fs::read_to_string(ignore_file) {
            Ok(content) => Ok(Self::from_lines(root, content.lines())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::defaults(root)),
            Err(e) => Err(e),
        }
    }

    pub fn from_lines<'a>(root: impl Into<PathBuf>, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut patterns = Vec::new();
        for line in std::iter::once(DEFAULT_IGNORE_PATTERN).chain(lines) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match Pattern::new(line) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => warn!(pattern = line, error = %e, "Skipping invalid ignore pattern"),
            }
        }

        Self {
            root: root.into(),
            patterns,
        }
    }

    /// Whether `path` matches any pattern, relative to the root when it is inside it.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let candidate = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.patterns.iter().any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
    }
}
