//! Locations of the shell's own files and their first-run defaults.

use crate::alias::RC_HEADER;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RC_FILE_NAME: &str = ".rshrc";
pub const HISTORY_FILE_NAME: &str = ".rsh_history";
pub const LOG_FILE_NAME: &str = ".rsh.log";

const HISTORY_HEADER: &str = "# .rsh_history\n\n";

/// Paths of the rc, history and log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellFiles {
    pub rc: PathBuf,
    pub history: PathBuf,
    pub log: PathBuf,
}

impl ShellFiles {
    /// All files inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            rc: dir.join(RC_FILE_NAME),
            history: dir.join(HISTORY_FILE_NAME),
            log: dir.join(LOG_FILE_NAME),
        }
    }

    /// Files next to the running executable, or in the current directory
    /// when the executable's location is unknown.
    pub fn beside_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&dir)
    }

    /// Create the rc and history files with default content if they are absent.
    pub fn ensure_exist(&self) -> io::Result<()> {
        ensure_file(&self.rc, RC_HEADER)?;
        ensure_file(&self.history, HISTORY_HEADER)
    }
}

fn ensure_file(path: &Path, default: &str) -> io::Result<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            debug!(path = %path.display(), "created with defaults");
            file.write_all(default.as_bytes())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}
