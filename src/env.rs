use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::CString;
use std::path::PathBuf;

/// Defaults given to presentation variables the user's environment lacks.
const PRESENTATION_DEFAULTS: [(&str, &str); 2] =
    [("TERM", "xterm-256color"), ("COLORTERM", "truecolor")];

/// Mutable, user-level view of the process environment used by the shell.
///
/// The environment contains:
/// - `vars`: the variables handed to every external command.
/// - `current_dir`: the working directory, kept in sync by `cd`.
/// - `should_exit`: the run flag; the main loop stops once it is set.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Capture the current process state.
    ///
    /// Copies variables from `std::env::vars()`, fills in missing presentation
    /// variables and reads the working directory.
    pub fn new() -> Self {
        let mut env = Self {
            vars: stdenv::vars().collect(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            should_exit: false,
        };
        env.apply_presentation_defaults();
        env
    }

    /// Get the value of a variable, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn apply_presentation_defaults(&mut self) {
        for (key, value) in PRESENTATION_DEFAULTS {
            self.vars
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    /// The user's home directory: `HOME`, or the password database entry.
    pub fn home(&self) -> Option<PathBuf> {
        if let Some(home) = self.get_var("HOME").filter(|home| !home.is_empty()) {
            return Some(PathBuf::from(home));
        }
        nix::unistd::User::from_uid(nix::unistd::getuid())
            .ok()
            .flatten()
            .map(|user| user.dir)
    }

    /// Expand a leading `~` or `~/` to the home directory.
    pub fn expand_tilde(&self, path: &str) -> PathBuf {
        let rest = match path.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => return PathBuf::from(path),
        };
        match self.home() {
            Some(home) if rest.is_empty() => home,
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }

    /// `KEY=value` strings for a child's environment block.
    pub fn to_envp(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| CString::new(format!("{k}={v}")).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::path::PathBuf;

    fn bare() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        }
    }

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = bare();

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_presentation_defaults_do_not_override() {
        let mut env = bare();
        env.set_var("TERM", "dumb");
        env.apply_presentation_defaults();
        assert_eq!(env.vars["TERM"], "dumb");
        assert_eq!(env.vars["COLORTERM"], "truecolor");
    }

    #[test]
    fn test_expand_tilde() {
        let mut env = bare();
        env.set_var("HOME", "/home/tester");
        assert_eq!(env.expand_tilde("~"), PathBuf::from("/home/tester"));
        assert_eq!(env.expand_tilde("~/src"), PathBuf::from("/home/tester/src"));
        assert_eq!(env.expand_tilde("~other"), PathBuf::from("~other"));
        assert_eq!(env.expand_tilde("/tmp"), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_envp_pairs() {
        let mut env = bare();
        env.set_var("A", "1");
        let envp = env.to_envp();
        assert_eq!(envp.len(), 1);
        assert_eq!(envp[0].to_str().unwrap(), "A=1");
    }
}
