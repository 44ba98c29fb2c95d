use crate::alias::AliasTable;
use crate::config::ShellFiles;
use crate::env::Environment;
use crate::history::HistoryStore;
use tracing::{info, warn};

/// Everything the main loop owns and lends to the editor and the builtins.
///
/// The foreground child pid is not part of it; the interrupt handler reads
/// that from [`crate::external::FOREGROUND_CHILD`].
#[derive(Debug)]
pub struct ShellState {
    pub env: Environment,
    pub history: HistoryStore,
    pub aliases: AliasTable,
    pub files: ShellFiles,
}

impl ShellState {
    /// Empty stores bound to `files`; nothing is read from disk.
    pub fn new(env: Environment, files: ShellFiles) -> Self {
        Self {
            env,
            history: HistoryStore::new(),
            aliases: AliasTable::new(),
            files,
        }
    }

    /// Build the state and load aliases and history from `files`.
    pub fn load(env: Environment, files: ShellFiles) -> Self {
        let mut state = Self::new(env, files);
        state.aliases.load(&state.files.rc);
        state.history.load(&state.files.history);
        info!(
            aliases = state.aliases.len(),
            history = state.history.len(),
            "state loaded"
        );
        state
    }

    /// Write the alias table back to the rc file.
    pub fn persist_aliases(&self) -> Result<(), crate::error::ShellError> {
        self.aliases.save(&self.files.rc)
    }

    /// Shutdown persistence: history, then aliases. Failures are reported on
    /// stderr and do not stop the other file from being written.
    pub fn save_all(&self) {
        if let Err(e) = self.history.save(&self.files.history) {
            warn!("{e}");
            eprintln!("rsh: {e}");
        }
        if let Err(e) = self.persist_aliases() {
            warn!("{e}");
            eprintln!("rsh: {e}");
        }
    }
}
