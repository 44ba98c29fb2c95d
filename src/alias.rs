//! User-defined command aliases and their rc-file persistence.
//!
//! Aliases live in an ordered table with unique names and a fixed capacity.
//! On disk each alias is one line `alias <name>:{<value>}` below a fixed
//! comment header that is rewritten on every save.

use crate::error::ShellError;
use regex::Regex;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Maximum number of aliases the table holds.
pub const ALIAS_CAPACITY: usize = 50;

/// Header written at the top of every rc file.
pub const RC_HEADER: &str = "# .rshrc\n\
# rsh rc file\n\
\n\
# This file stores the aliases created from the shell.\n\
# Editing it by hand is not recommended.\n\
\n\
# Use the builtin alias and unalias commands to change your aliases.\n\
\n";

// name, then the first `{` after the colon up to the last `}`
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^:]*?)[ \t]*:[^{]*\{(?P<value>.*)\}").expect("valid alias regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub name: String,
    pub value: String,
}

/// Parse `name:{value}` into its parts.
///
/// The name is everything before the first `:` with trailing blanks removed
/// and must be a single non-empty word. The value sits between the first `{`
/// after the colon and the last `}`.
pub fn parse_definition(definition: &str) -> Result<AliasEntry, ShellError> {
    if !definition.contains(':') {
        return Err(ShellError::AliasUsage);
    }
    let caps = DEFINITION
        .captures(definition)
        .ok_or_else(|| ShellError::MalformedAlias(definition.to_string()))?;
    let name = &caps["name"];
    if name.is_empty() || name.contains([' ', '\t']) {
        return Err(ShellError::MalformedAlias(definition.to_string()));
    }
    Ok(AliasEntry {
        name: name.to_string(),
        value: caps["value"].to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    capacity: usize,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasTable {
    pub fn new() -> Self {
        Self::with_capacity(ALIAS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    /// Define or redefine an alias.
    ///
    /// Redefining an existing name always succeeds. A new name fails with
    /// [`ShellError::AliasCapacity`] when the table is full, leaving it untouched.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ShellError> {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.value = value.to_string();
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(ShellError::AliasCapacity {
                limit: self.capacity,
            });
        }
        self.entries.push(AliasEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Remove an alias, keeping the order of the rest. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|entry| entry.name == name) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the first word of `line` with its alias, if it has one.
    ///
    /// The rest of the line follows the expansion after a single space. The
    /// expansion itself is not looked up again.
    pub fn expand(&self, line: &str) -> String {
        let trimmed = line.trim_start_matches([' ', '\t']);
        let (first, rest) = match trimmed.find([' ', '\t']) {
            Some(end) => trimmed.split_at(end),
            None => (trimmed, ""),
        };
        let Some(value) = self.get(first) else {
            return line.to_string();
        };
        let rest = rest.trim_start_matches([' ', '\t']);
        if rest.is_empty() {
            value.to_string()
        } else {
            format!("{value} {rest}")
        }
    }

    /// Read aliases from an rc file.
    ///
    /// Comments, blank lines and malformed definitions are skipped. A missing
    /// file leaves the table unchanged.
    pub fn load(&mut self, path: &Path) {
        let Ok(content) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "no rc file to load");
            return;
        };
        for line in content.lines() {
            let line = line.trim_start_matches([' ', '\t']);
            let Some(definition) = line.strip_prefix("alias ") else {
                continue;
            };
            let Ok(entry) = parse_definition(definition.trim_start_matches([' ', '\t'])) else {
                continue;
            };
            if let Err(e) = self.set(&entry.name, &entry.value) {
                warn!(alias = %entry.name, "{e}");
                break;
            }
        }
        debug!(aliases = self.entries.len(), "aliases loaded");
    }

    /// Rewrite `path` with the header followed by every alias.
    pub fn save(&self, path: &Path) -> Result<(), ShellError> {
        let persist = |source| ShellError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(persist)?;
        let mut out = BufWriter::new(file);
        out.write_all(RC_HEADER.as_bytes()).map_err(persist)?;
        for entry in &self.entries {
            writeln!(out, "{}", format_entry(entry)).map_err(persist)?;
        }
        out.flush().map_err(persist)
    }
}

/// The rc-file and listing form of one alias.
pub fn format_entry(entry: &AliasEntry) -> String {
    format!("alias {}:{{{}}}", entry.name, entry.value)
}
