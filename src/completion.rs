//! Tab completion.
//!
//! The word under completion is the last blank-delimited word of the line.
//! The first word of a line is completed against executables on the search
//! path; every other word is completed against the filesystem. Candidates are
//! byte strings so file names that are not UTF-8 survive intact.

use crate::env::Environment;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// A source of completion candidates for a partial word.
pub trait CandidateSource {
    /// Every candidate that starts with `word`, in no particular order.
    fn candidates(&self, word: &[u8]) -> Vec<Vec<u8>>;
}

/// Executable names found in the directories of a `PATH`-style list.
pub struct ExecutableSource {
    search_paths: Option<String>,
}

impl ExecutableSource {
    pub fn new(search_paths: Option<String>) -> Self {
        Self { search_paths }
    }
}

impl CandidateSource for ExecutableSource {
    fn candidates(&self, word: &[u8]) -> Vec<Vec<u8>> {
        let Some(search_paths) = &self.search_paths else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for dir in search_paths.split(':').filter(|dir| !dir.is_empty()) {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.as_bytes();
                if !name.starts_with(word) || seen.contains(name) {
                    continue;
                }
                if is_executable_file(&entry.path()) {
                    seen.insert(name.to_vec());
                    out.push(name.to_vec());
                }
            }
        }
        out
    }
}

fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o100 != 0)
        .unwrap_or(false)
}

/// Filesystem entries relative to the current directory, with `~` shorthand.
pub struct PathSource {
    home: Option<PathBuf>,
}

impl PathSource {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self { home }
    }

    fn expand_tilde(&self, dir: &[u8]) -> PathBuf {
        let rest = match dir.strip_prefix(b"~") {
            Some(rest) if rest.is_empty() || rest.starts_with(b"/") => rest,
            _ => return PathBuf::from(OsStr::from_bytes(dir)),
        };
        match &self.home {
            Some(home) => {
                let mut expanded = home.as_os_str().as_bytes().to_vec();
                expanded.extend_from_slice(rest);
                PathBuf::from(OsStr::from_bytes(&expanded))
            }
            None => PathBuf::from(OsStr::from_bytes(dir)),
        }
    }
}

impl CandidateSource for PathSource {
    fn candidates(&self, word: &[u8]) -> Vec<Vec<u8>> {
        let (dir, prefix) = match word.iter().rposition(|&b| b == b'/') {
            Some(slash) => word.split_at(slash + 1),
            None => (&word[..0], word),
        };
        let listing = if dir.is_empty() {
            PathBuf::from(".")
        } else {
            self.expand_tilde(dir)
        };
        let Ok(entries) = fs::read_dir(&listing) else {
            return Vec::new();
        };
        let show_hidden = prefix.starts_with(b".");
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.as_bytes();
            if !name.starts_with(prefix) || (name.starts_with(b".") && !show_hidden) {
                continue;
            }
            let mut candidate = dir.to_vec();
            candidate.extend_from_slice(name);
            if entry.path().is_dir() {
                candidate.push(b'/');
            }
            out.push(candidate);
        }
        out
    }
}

/// What the editor should do with the word under completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matched, or there was nothing to complete.
    NoMatch,
    /// Replace the bytes from `start` to the end of the line with `text`.
    Replace { start: usize, text: Vec<u8> },
    /// Several candidates and no longer unambiguous prefix; show them sorted.
    List(Vec<Vec<u8>>),
}

pub struct CompletionEngine {
    executables: ExecutableSource,
    paths: PathSource,
}

impl CompletionEngine {
    pub fn new(search_paths: Option<String>, home: Option<PathBuf>) -> Self {
        Self {
            executables: ExecutableSource::new(search_paths),
            paths: PathSource::new(home),
        }
    }

    pub fn from_env(env: &Environment) -> Self {
        Self::new(env.get_var("PATH"), env.home())
    }

    /// Complete the last word of `line`.
    pub fn complete(&self, line: &[u8]) -> Completion {
        let start = word_start(line);
        let word = &line[start..];
        let is_command = line[..start].iter().all(|&b| is_blank(b));
        let candidates = if is_command && !word.contains(&b'/') {
            if word.is_empty() {
                return Completion::NoMatch;
            }
            self.executables.candidates(word)
        } else {
            self.paths.candidates(word)
        };
        match resolve(word, candidates) {
            Resolved::NoMatch => Completion::NoMatch,
            Resolved::Extend(text) => Completion::Replace { start, text },
            Resolved::Ambiguous(all) => Completion::List(all),
        }
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Offset of the first byte of the last blank-delimited word.
pub fn word_start(line: &[u8]) -> usize {
    line.iter()
        .rposition(|&b| is_blank(b))
        .map_or(0, |blank| blank + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    NoMatch,
    Extend(Vec<u8>),
    Ambiguous(Vec<Vec<u8>>),
}

/// Decide how `word` changes given its candidates.
///
/// A single candidate replaces the word. Several candidates extend it to their
/// longest common prefix when that is longer than the word, and are otherwise
/// returned sorted for display.
pub fn resolve(word: &[u8], mut candidates: Vec<Vec<u8>>) -> Resolved {
    candidates.sort();
    candidates.dedup();
    match candidates.len() {
        0 => Resolved::NoMatch,
        1 => Resolved::Extend(candidates.remove(0)),
        _ => {
            let common = longest_common_prefix(&candidates);
            if common.len() > word.len() {
                Resolved::Extend(common.to_vec())
            } else {
                Resolved::Ambiguous(candidates)
            }
        }
    }
}

/// Byte-wise longest prefix shared by every candidate.
pub fn longest_common_prefix(candidates: &[Vec<u8>]) -> &[u8] {
    let Some((first, rest)) = candidates.split_first() else {
        return &[];
    };
    let mut len = first.len();
    for candidate in rest {
        len = common_len(&first[..len], candidate);
    }
    &first[..len]
}

fn common_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Terminal update turning `old` into `new` on screen: erase `erase` bytes
/// from the end, then print `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redraw {
    pub erase: usize,
    pub insert: Vec<u8>,
}

impl Redraw {
    pub fn between(old: &[u8], new: &[u8]) -> Self {
        let keep = common_len(old, new);
        Self {
            erase: old.len() - keep,
            insert: new[keep..].to_vec(),
        }
    }

    /// The bytes to send to the terminal.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.erase * 3 + self.insert.len());
        for _ in 0..self.erase {
            out.extend_from_slice(b"\x08 \x08");
        }
        out.extend_from_slice(&self.insert);
        out
    }
}
