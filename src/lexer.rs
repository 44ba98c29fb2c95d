//! Tokenization of an (alias-expanded) input line.
//!
//! Words are separated by runs of spaces and tabs. There is no quoting,
//! escaping or globbing. A standalone `&` ends the command and asks for it
//! to run in the background; anything after it is ignored.

/// A tokenized command ready for dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// The command name followed by its arguments.
    pub argv: Vec<String>,
    /// Set when the line contained a standalone `&`.
    pub background: bool,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

/// Split `line` into a [`CommandLine`].
pub fn split_into_tokens(line: &str) -> CommandLine {
    let mut out = CommandLine::default();
    for token in line.split([' ', '\t']).filter(|t| !t.is_empty()) {
        if token == "&" {
            out.background = true;
            break;
        }
        out.argv.push(token.to_string());
    }
    out
}
