use crate::alias::{self, parse_definition};
use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::state::ShellState;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process against the shell state.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "alias" or "cd".
    fn name() -> &'static str;

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        state: &mut ShellState,
    ) -> Result<ExitCode> {
        debug!(builtin = T::name(), "dispatch");
        match T::execute(*self, stdout, state) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "rsh: {e:#}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _state: &mut ShellState,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output)?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub ignored: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        state.env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the user's home directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute, relative to the current directory or starting with `~`.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        let env_state = &mut state.env;
        let target = match &self.target {
            Some(t) if !t.is_empty() => env_state.expand_tilde(t),
            _ => env_state
                .home()
                .ok_or_else(|| anyhow::anyhow!("cd: no target and HOME not set"))?,
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env_state.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        env_state.set_var("PWD", canonical.to_string_lossy());
        env_state.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn execute(self, stdout: &mut dyn Write, _state: &mut ShellState) -> Result<ExitCode> {
        stdout.write_all(b"\x1b[H\x1b[2J")?;
        stdout.flush()?;
        Ok(0)
    }
}

const HELP_TEXT: &str = "\
Builtin commands:
  cd [dir]            Change directory (defaults to home)
  exit                Exit the shell
  clear               Clear the screen
  help                Show this list
  alias [name:{cmd}]  Create an alias, or list them all
  unalias name        Remove an alias

Anything else runs as an external program. End a line with `&` to run it
in the background.";

#[derive(FromArgs)]
/// List the builtin commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, stdout: &mut dyn Write, _state: &mut ShellState) -> Result<ExitCode> {
        writeln!(stdout, "{HELP_TEXT}")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create or update an alias, or list every alias when called without arguments.
pub struct Alias {
    #[argh(positional, greedy)]
    /// definition in the form name:{value}; the words are joined with single spaces.
    pub definition: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        if self.definition.is_empty() {
            for entry in state.aliases.entries() {
                writeln!(stdout, "{}", alias::format_entry(entry))?;
            }
            return Ok(0);
        }

        let entry = parse_definition(&self.definition.join(" "))?;
        state.aliases.set(&entry.name, &entry.value)?;
        state.persist_aliases()?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove an alias.
pub struct Unalias {
    #[argh(positional)]
    /// name of the alias to remove.
    pub name: Option<String>,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, _stdout: &mut dyn Write, state: &mut ShellState) -> Result<ExitCode> {
        let Some(name) = self.name else {
            anyhow::bail!("unalias: usage: unalias name");
        };
        state.aliases.remove(&name);
        state.persist_aliases()?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellFiles;
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use tempfile::TempDir;

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_in(dir: &TempDir) -> ShellState {
        let env = Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        };
        ShellState::new(env, ShellFiles::in_dir(dir.path()))
    }

    fn run(factory: &dyn CommandFactory, name: &str, args: &[&str], state: &mut ShellState) -> (ExitCode, String) {
        let cmd = factory.try_create(name, args).expect("factory accepts its own name");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, state).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_factory_ignores_other_names() {
        assert!(Factory::<Cd>::default().try_create("ls", &[]).is_none());
        assert!(Factory::<Alias>::default().try_create("aliases", &[]).is_none());
    }

    #[test]
    fn test_exit_sets_run_flag() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        let (code, _) = run(&Factory::<Exit>::default(), "exit", &["3"], &mut state);
        assert_eq!(code, 0);
        assert!(state.env.should_exit);
    }

    #[test]
    fn test_clear_writes_reset_sequence() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        let (_, out) = run(&Factory::<Clear>::default(), "clear", &[], &mut state);
        assert_eq!(out, "\x1b[H\x1b[2J");
    }

    #[test]
    fn test_help_lists_builtins() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        let (code, out) = run(&Factory::<Help>::default(), "help", &[], &mut state);
        assert_eq!(code, 0);
        for name in ["cd", "exit", "clear", "alias", "unalias"] {
            assert!(out.contains(name), "help should mention {name}");
        }
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let canonical_target = fs::canonicalize(target.path()).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut state = state_in(&dir);

        let target_arg = canonical_target.to_string_lossy().to_string();
        let (code, _) = run(&Factory::<Cd>::default(), "cd", &[&target_arg], &mut state);

        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(code, 0);
        assert_eq!(new_cwd, canonical_target);
        assert_eq!(state.env.current_dir, canonical_target);
        assert_eq!(state.env.get_var("PWD"), Some(target_arg));
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let dir = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let canonical_home = fs::canonicalize(home.path()).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut state = state_in(&dir);
        state.env.set_var("HOME", canonical_home.to_string_lossy());

        let (code, _) = run(&Factory::<Cd>::default(), "cd", &[], &mut state);
        let after_plain = state.env.current_dir.clone();

        stdenv::set_current_dir(&orig).expect("failed to restore cwd");
        fs::create_dir(canonical_home.join("sub")).unwrap();
        let (tilde_code, _) = run(&Factory::<Cd>::default(), "cd", &["~/sub"], &mut state);
        let after_tilde = state.env.current_dir.clone();

        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(code, 0);
        assert_eq!(after_plain, canonical_home);
        assert_eq!(tilde_code, 0);
        assert_eq!(after_tilde, canonical_home.join("sub"));
    }

    #[test]
    fn test_cd_nonexistent_path_is_reported() {
        let _lock = lock_current_dir();
        let dir = TempDir::new().unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut state = state_in(&dir);

        let name = format!("nonexistent_dir_for_rsh_test_{}", std::process::id());
        let (code, out) = run(&Factory::<Cd>::default(), "cd", &[&name], &mut state);

        assert_eq!(code, 1);
        assert!(out.starts_with("rsh: cd: "), "unexpected report: {out}");
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_alias_defines_persists_and_lists() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        let factory = Factory::<Alias>::default();

        let (code, _) = run(&factory, "alias", &["ll:{ls", "-la}"], &mut state);
        assert_eq!(code, 0);
        assert_eq!(state.aliases.get("ll"), Some("ls -la"));

        let on_disk = fs::read_to_string(&state.files.rc).unwrap();
        assert!(on_disk.ends_with("alias ll:{ls -la}\n"));

        let (_, listing) = run(&factory, "alias", &[], &mut state);
        assert_eq!(listing, "alias ll:{ls -la}\n");
    }

    #[test]
    fn test_alias_reports_bad_definitions() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        let factory = Factory::<Alias>::default();

        let (code, out) = run(&factory, "alias", &["ll", "ls"], &mut state);
        assert_eq!(code, 1);
        assert!(out.contains("usage"), "unexpected report: {out}");

        let (code, out) = run(&factory, "alias", &["ll:ls"], &mut state);
        assert_eq!(code, 1);
        assert!(out.contains("invalid value"), "unexpected report: {out}");
        assert!(state.aliases.is_empty());
    }

    #[test]
    fn test_alias_reports_full_table() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        for i in 0..crate::alias::ALIAS_CAPACITY {
            state.aliases.set(&format!("a{i}"), "true").unwrap();
        }

        let (code, out) = run(&Factory::<Alias>::default(), "alias", &["extra:{true}"], &mut state);

        assert_eq!(code, 1);
        assert!(out.contains("too many aliases"), "unexpected report: {out}");
        assert_eq!(state.aliases.get("extra"), None);
    }

    #[test]
    fn test_unalias_removes_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut state = state_in(&dir);
        state.aliases.set("gs", "git status").unwrap();
        state.aliases.set("ll", "ls -l").unwrap();

        let (code, _) = run(&Factory::<Unalias>::default(), "unalias", &["gs"], &mut state);
        assert_eq!(code, 0);
        assert_eq!(state.aliases.get("gs"), None);
        let on_disk = fs::read_to_string(&state.files.rc).unwrap();
        assert!(!on_disk.contains("gs:"));
        assert!(on_disk.contains("alias ll:{ls -l}"));

        let (code, out) = run(&Factory::<Unalias>::default(), "unalias", &[], &mut state);
        assert_eq!(code, 1);
        assert!(out.contains("usage"));
    }

    #[test]
    fn test_alias_write_failure_keeps_definition() {
        let dir = TempDir::new().unwrap();
        let env = Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        };
        let mut state = ShellState::new(env, ShellFiles::in_dir(&dir.path().join("missing")));

        let (code, out) = run(&Factory::<Alias>::default(), "alias", &["x:{true}"], &mut state);

        assert_eq!(code, 1);
        assert!(out.contains("can't write"), "unexpected report: {out}");
        assert_eq!(state.aliases.get("x"), Some("true"));
    }
}
