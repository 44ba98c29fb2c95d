use crate::state::ShellState;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Commands killed by a signal report `128 + signal`.
pub type ExitCode = i32;

/// Object-safe trait for a command the shell runs in-process.
pub trait ExecutableCommand {
    /// Executes the command, writing any report to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, state: &mut ShellState)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
