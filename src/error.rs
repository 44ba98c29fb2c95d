//! Typed errors for the parts of the shell whose callers need to branch on
//! the failure kind. Everything above this layer talks `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the shell's stores, terminal session and executor.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The alias table already holds `limit` names and the new one is not among them.
    #[error("alias: too many aliases (limit is {limit})")]
    AliasCapacity { limit: usize },

    /// An alias definition had a colon but no `{value}` part.
    #[error("alias: invalid value in definition `{0}`")]
    MalformedAlias(String),

    /// An alias definition without the `name:` separator.
    #[error("alias: usage: alias name:{{value}}")]
    AliasUsage,

    /// Writing a history or rc file failed.
    #[error("can't write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Querying or setting terminal attributes failed.
    #[error("terminal: {0}")]
    Terminal(#[source] nix::Error),

    /// Installing the interrupt handler failed.
    #[error("sigaction: {0}")]
    Signal(#[source] nix::Error),

    /// The shell could not duplicate itself to run an external command.
    #[error("fork: {0}")]
    Fork(#[source] nix::Error),
}
