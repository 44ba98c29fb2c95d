//! Raw-mode terminal session.
//!
//! [`TerminalSession::enter`] saves the terminal attributes and switches off
//! canonical input and echo. The saved attributes come back when the session
//! is dropped, and a panic hook restores them too, so the user's terminal is
//! never left in raw mode.

use crate::error::ShellError;
use nix::sys::termios::{LocalFlags, SetArg, SpecialCharacterIndices, Termios, tcgetattr, tcsetattr};
use std::io::{self, Read};
use std::sync::OnceLock;
use tracing::warn;

static SAVED_ATTRS: OnceLock<libc::termios> = OnceLock::new();

pub struct TerminalSession {
    saved: Termios,
}

impl TerminalSession {
    /// Capture the current attributes and install raw mode: no canonical
    /// processing, no echo, reads return after one byte with no timeout.
    pub fn enter() -> Result<Self, ShellError> {
        let stdin = io::stdin();
        let saved = tcgetattr(&stdin).map_err(ShellError::Terminal)?;
        let _ = SAVED_ATTRS.set(saved.clone().into());

        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(ShellError::Terminal)?;

        Ok(Self { saved })
    }

    /// Put the captured attributes back. Failures are logged and ignored.
    pub fn restore(&self) {
        if let Err(e) = tcsetattr(io::stdin(), SetArg::TCSANOW, &self.saved) {
            warn!("failed to restore terminal attributes: {e}");
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Chain a panic hook that restores the attributes saved by the last
/// [`TerminalSession::enter`] before the previous hook prints the panic.
pub fn install_panic_restore() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(attrs) = SAVED_ATTRS.get() {
            let _ = tcsetattr(io::stdin(), SetArg::TCSANOW, &Termios::from(*attrs));
        }
        previous(info);
    }));
}

/// Unbuffered reader over file descriptor 0. Bytes not yet consumed by the
/// editor stay in the terminal for the next foreground command.
pub struct TtyInput;

impl Read for TtyInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(io::stdin(), buf).map_err(io::Error::from)
    }
}
