//! Bounded log of accepted input lines with a recall cursor.
//!
//! The store keeps at most [`HISTORY_CAPACITY`] entries in chronological order.
//! Recording into a full store evicts the oldest entry. The cursor lives in
//! `[0, len]`; `len` is the "new line" position the editor starts from.

use crate::error::ShellError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Default number of lines kept by [`HistoryStore::new`].
pub const HISTORY_CAPACITY: usize = 1000;

/// Direction of a history recall step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recall {
    /// Towards older entries (cursor - 1).
    Older,
    /// Towards newer entries and finally the empty line (cursor + 1).
    Newer,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: Vec<String>,
    capacity: usize,
    cursor: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor back to the "new line" position.
    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
    }

    /// Append an accepted line.
    ///
    /// Blank lines (only spaces and tabs) and a repeat of the most recent
    /// entry are ignored. The cursor is reset either way.
    pub fn record(&mut self, line: &str) {
        self.reset_cursor();
        if line.trim_start_matches([' ', '\t']).is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == line) {
            return;
        }
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(line.to_string());
        self.reset_cursor();
    }

    /// Step the cursor one entry in `direction`.
    ///
    /// Returns `None` when the cursor is already at the boundary. Otherwise
    /// returns the text the line buffer should now hold: the entry under the
    /// cursor, or an empty string once the cursor is back at `len`.
    pub fn step(&mut self, direction: Recall) -> Option<&str> {
        let next = match direction {
            Recall::Older => self.cursor.checked_sub(1)?,
            Recall::Newer if self.cursor < self.entries.len() => self.cursor + 1,
            Recall::Newer => return None,
        };
        self.cursor = next;
        Some(self.entries.get(next).map(String::as_str).unwrap_or(""))
    }

    /// Load entries from a line-oriented file.
    ///
    /// Blank lines and `#` comments are skipped; loading stops at capacity.
    /// A missing or unreadable file leaves the store as it was.
    pub fn load(&mut self, path: &Path) {
        let Ok(content) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "no history file to load");
            return;
        };
        for line in content.lines() {
            if self.entries.len() >= self.capacity {
                break;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.entries.push(line.to_string());
        }
        self.reset_cursor();
        debug!(entries = self.entries.len(), "history loaded");
    }

    /// Overwrite `path` with every stored entry, one per line.
    pub fn save(&self, path: &Path) -> Result<(), ShellError> {
        let persist = |source| ShellError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(persist)?;
        let mut out = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(out, "{entry}").map_err(persist)?;
        }
        out.flush().map_err(persist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(lines: &[&str]) -> HistoryStore {
        let mut history = HistoryStore::new();
        for line in lines {
            history.record(line);
        }
        history
    }

    #[test]
    fn test_consecutive_duplicates_are_collapsed() {
        let history = store_with(&["ls", "ls", "pwd", "ls"]);
        assert_eq!(history.entries(), ["ls", "pwd", "ls"]);
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let history = store_with(&["", "   ", "\t \t", "echo hi"]);
        assert_eq!(history.entries(), ["echo hi"]);
    }

    #[test]
    fn test_full_store_keeps_most_recent_in_order() {
        let mut history = HistoryStore::with_capacity(3);
        for line in ["a", "b", "c", "d", "e"] {
            history.record(line);
        }
        assert_eq!(history.entries(), ["c", "d", "e"]);
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn test_recall_walks_back_and_forth() {
        let mut history = store_with(&["one", "two", "three"]);
        assert_eq!(history.step(Recall::Older), Some("three"));
        assert_eq!(history.step(Recall::Older), Some("two"));
        assert_eq!(history.step(Recall::Older), Some("one"));
        // already at the oldest entry
        assert_eq!(history.step(Recall::Older), None);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.step(Recall::Newer), Some("two"));
        assert_eq!(history.step(Recall::Newer), Some("three"));
        assert_eq!(history.step(Recall::Newer), Some(""));
        assert_eq!(history.step(Recall::Newer), None);
    }

    #[test]
    fn test_record_resets_cursor() {
        let mut history = store_with(&["one", "two"]);
        history.step(Recall::Older);
        history.step(Recall::Older);
        history.record("three");
        assert_eq!(history.cursor(), 3);
        history.step(Recall::Older);
        history.record("three");
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn test_load_skips_comments_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "# header\n\nls -la\n#cd\ncd /tmp\n").unwrap();

        let mut history = HistoryStore::new();
        history.load(&path);

        assert_eq!(history.entries(), ["ls -la", "cd /tmp"]);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_load_stops_at_capacity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "a\nb\nc\nd\n").unwrap();

        let mut history = HistoryStore::with_capacity(2);
        history.load(&path);

        assert_eq!(history.entries(), ["a", "b"]);
    }

    #[test]
    fn test_load_missing_file_is_silent() {
        let dir = TempDir::new().unwrap();
        let mut history = store_with(&["kept"]);
        history.load(&dir.path().join("absent"));
        assert_eq!(history.entries(), ["kept"]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history");
        let history = store_with(&["make", "make test", "git status"]);
        history.save(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "make\nmake test\ngit status\n"
        );

        let mut loaded = HistoryStore::new();
        loaded.load(&path);
        assert_eq!(loaded.entries(), history.entries());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("history");
        let err = store_with(&["x"]).save(&path).unwrap_err();
        assert!(matches!(err, ShellError::Persist { .. }));
    }
}
