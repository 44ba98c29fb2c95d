//! Launching programs that are not builtins.
//!
//! The shell forks, the child restores the default SIGINT disposition and
//! replaces its image with the target program. A foreground child is waited
//! for while its pid sits in [`FOREGROUND_CHILD`], where the SIGINT handler
//! finds it. A background child is announced and left alone.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, kill, sigaction, signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execve, fork, write};
use std::borrow::Cow;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, info};

/// Exit status of a child whose image could not be replaced.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// Pid of the child the shell is currently blocked on, shared with the
/// SIGINT handler. Zero means there is none.
pub struct ForegroundChild(AtomicI32);

impl ForegroundChild {
    pub const fn new() -> Self {
        Self(AtomicI32::new(0))
    }

    pub fn set(&self, pid: Pid) {
        self.0.store(pid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<Pid> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(Pid::from_raw(pid)),
        }
    }
}

impl Default for ForegroundChild {
    fn default() -> Self {
        Self::new()
    }
}

pub static FOREGROUND_CHILD: ForegroundChild = ForegroundChild::new();

extern "C" fn forward_interrupt(_: libc::c_int) {
    match FOREGROUND_CHILD.get() {
        Some(pid) => {
            let _ = kill(pid, Signal::SIGINT);
        }
        None => {
            let _ = write(std::io::stdout(), b"\n");
        }
    }
}

/// Route Ctrl-C to the foreground child instead of terminating the shell.
///
/// Installed with `SA_RESTART` so the terminal read and the foreground wait
/// resume after the handler runs.
pub fn install_interrupt_handler() -> Result<(), ShellError> {
    let action = SigAction::new(
        SigHandler::Handler(forward_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGINT, &action) }
        .map(drop)
        .map_err(ShellError::Signal)
}

/// How a launch ended from the shell's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// A foreground child terminated with this status.
    Finished(ExitCode),
    /// A background child was started and not waited for.
    Background(Pid),
}

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: String,
    path: Option<PathBuf>,
    args: Vec<String>,
}

impl ExternalCommand {
    /// Resolve `argv[0]` against the environment's `PATH`.
    ///
    /// An unresolved name is kept; the child reports it and exits with
    /// [`EXEC_FAILURE_STATUS`].
    pub fn new(env: &Environment, argv: &[String]) -> Self {
        let name = argv.first().cloned().unwrap_or_default();
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let path = find_command_path(OsStr::new(&search_paths), Path::new(&name))
            .map(Cow::into_owned);
        Self {
            name,
            path,
            args: argv.to_vec(),
        }
    }

    /// Fork and exec the command, waiting for it unless `background` is set.
    pub fn launch(&self, env: &Environment, background: bool) -> Result<Launch> {
        // everything the child needs is allocated before the fork
        let program = self
            .path
            .as_ref()
            .map(|path| CString::new(path.as_os_str().as_bytes()))
            .transpose()
            .with_context(|| format!("{}: invalid command path", self.name))?;
        let argv = self
            .args
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{}: argument contains a NUL byte", self.name))?;
        let envp = env.to_envp();
        let report_prefix = format!("rsh: {}: ", self.name);

        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => {
                let _ = unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) };
                match program {
                    Some(program) => match execve(&program, &argv, &envp) {
                        Ok(never) => match never {},
                        Err(errno) => child_report(&report_prefix, errno.desc()),
                    },
                    None => child_report(&report_prefix, "command not found"),
                }
                unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
            }
            ForkResult::Parent { child } => {
                info!(pid = child.as_raw(), command = %self.name, background, "launched");
                if background {
                    println!("[bg] {child}");
                    return Ok(Launch::Background(child));
                }
                FOREGROUND_CHILD.set(child);
                let status = wait_for(child);
                FOREGROUND_CHILD.clear();
                let code = status?;
                debug!(pid = child.as_raw(), code, "foreground child finished");
                Ok(Launch::Finished(code))
            }
        }
    }
}

// only write(2) between fork and exit
fn child_report(prefix: &str, reason: &str) {
    for part in [prefix.as_bytes(), reason.as_bytes(), &b"\n"[..]] {
        let _ = write(std::io::stderr(), part);
    }
}

/// Block until `child` terminates, by exit or by signal.
fn wait_for(child: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(terminated_by_signal(signal)),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).with_context(|| format!("waitpid {child}")),
        }
    }
}

fn terminated_by_signal(signal: Signal) -> ExitCode {
    128 + signal as i32
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo`: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if path.starts_with("./") && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let path = dir.join(cmd);
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

/// Serializes tests that run foreground children, since they share
/// [`FOREGROUND_CHILD`] and the interrupt handler.
#[cfg(test)]
pub(crate) fn lock_foreground() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
