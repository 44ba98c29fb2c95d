//! Tracing subscriber setup.
//!
//! The terminal belongs to the line editor, so log records go to a file.
//! Filtering follows `RUST_LOG` and defaults to `info`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber writing to `log_file_path`.
///
/// Returns `false` if the file could not be opened or a subscriber was
/// already installed; the shell then runs without logging.
pub fn init_global(log_file_path: &Path) -> bool {
    let Ok(log_file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
    else {
        return false;
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .is_ok()
}
