//! rsh, a small interactive shell for raw-mode terminals.
//!
//! The crate reads keystrokes itself instead of relying on the terminal's line
//! discipline. This gives it history recall with the arrow keys, tab
//! completion of commands and paths, and aliases stored in an rc file.
//!
//! The main entry point is [`Interpreter`], which dispatches a line either to
//! one of the builtins or to an external program started with fork and exec.
//! The public modules expose the stores, the editor and the terminal session
//! so that each piece can be driven on its own.

pub mod alias;
mod builtin;
pub mod command;
pub mod completion;
pub mod config;
pub mod editor;
pub mod env;
pub mod error;
pub mod external;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod logging;
pub mod prompt;
pub mod state;
pub mod terminal;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
pub use error::ShellError;
pub use state::ShellState;
