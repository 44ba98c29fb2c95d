//! Raw-mode line editor.
//!
//! Bytes are consumed one at a time by a small state machine that handles
//! insertion at the end of the line, backspace, history recall through the
//! `ESC [ A` / `ESC [ B` arrow sequences and tab completion. Everything the
//! user should see is echoed by the editor itself.

use crate::completion::{Completion, CompletionEngine, Redraw};
use crate::history::{HistoryStore, Recall};
use std::io::{self, Read, Write};

/// Longest line the editor accepts, in bytes.
pub const LINE_CAPACITY: usize = 1023;

const BACKSPACE: &[u8] = b"\x08 \x08";
const CLEAR_LINE: &[u8] = b"\r\x1b[K";

/// The line being edited. The insertion point is always the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(LINE_CAPACITY),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append one byte; returns `false` when the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= LINE_CAPACITY {
            return false;
        }
        self.bytes.push(byte);
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop()
    }

    /// Replace the whole content, truncated to capacity.
    pub fn set(&mut self, content: &[u8]) {
        self.bytes.clear();
        self.bytes
            .extend_from_slice(&content[..content.len().min(LINE_CAPACITY)]);
    }

    /// Replace the bytes from `start` to the end with `text`.
    ///
    /// Leaves the buffer untouched and returns `false` if the result would
    /// not fit.
    pub fn replace_tail(&mut self, start: usize, text: &[u8]) -> bool {
        if start > self.bytes.len() || start + text.len() > LINE_CAPACITY {
            return false;
        }
        self.bytes.truncate(start);
        self.bytes.extend_from_slice(text);
        true
    }

    pub fn into_string(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeState {
    Normal,
    EscapeSeen,
    // ESC and a byte other than `[`; the next byte is dropped too
    EscapeOther,
    BracketSeen,
}

pub struct LineEditor<R, W> {
    input: R,
    output: W,
    state: EscapeState,
    redraw_pending: bool,
}

impl<R: Read, W: Write> LineEditor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            state: EscapeState::Normal,
            redraw_pending: false,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Print `prompt` and read one line.
    ///
    /// Returns `Ok(None)` when input ends before a line is finished. Errors
    /// only come from writing to the terminal.
    pub fn read_line(
        &mut self,
        prompt: &str,
        history: &mut HistoryStore,
        completion: &CompletionEngine,
    ) -> io::Result<Option<String>> {
        history.reset_cursor();
        self.state = EscapeState::Normal;
        self.redraw_pending = false;
        let mut buffer = LineBuffer::new();

        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()?;

        loop {
            let Some(byte) = self.read_byte() else {
                return Ok(None);
            };
            if self.redraw_pending {
                self.redraw_pending = false;
                self.redraw(prompt, &buffer)?;
            }

            match self.state {
                EscapeState::Normal => match byte {
                    b'\r' | b'\n' => {
                        self.output.write_all(b"\n")?;
                        self.output.flush()?;
                        return Ok(Some(buffer.into_string()));
                    }
                    0x7f | 0x08 => {
                        if buffer.pop().is_some() {
                            self.output.write_all(BACKSPACE)?;
                        }
                    }
                    0x1b => self.state = EscapeState::EscapeSeen,
                    b'\t' => self.complete(&mut buffer, completion)?,
                    // ctrl-d
                    0x04 if buffer.is_empty() => return Ok(None),
                    byte if byte < 0x20 => {}
                    byte => {
                        if buffer.push(byte) {
                            self.output.write_all(&[byte])?;
                        }
                    }
                },
                EscapeState::EscapeSeen => {
                    self.state = if byte == b'[' {
                        EscapeState::BracketSeen
                    } else {
                        EscapeState::EscapeOther
                    };
                }
                EscapeState::EscapeOther => self.state = EscapeState::Normal,
                EscapeState::BracketSeen => match byte {
                    b'A' => {
                        self.state = EscapeState::Normal;
                        self.recall(prompt, &mut buffer, history, Recall::Older)?;
                    }
                    b'B' => {
                        self.state = EscapeState::Normal;
                        self.recall(prompt, &mut buffer, history, Recall::Newer)?;
                    }
                    // CSI parameter bytes, e.g. the `3` of `ESC [ 3 ~`
                    0x30..=0x3f => {}
                    _ => self.state = EscapeState::Normal,
                },
            }
            self.output.flush()?;
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => return Some(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return None,
            }
        }
    }

    fn redraw(&mut self, prompt: &str, buffer: &LineBuffer) -> io::Result<()> {
        let prompt_line = prompt.rsplit('\n').next().unwrap_or(prompt);
        self.output.write_all(CLEAR_LINE)?;
        self.output.write_all(prompt_line.as_bytes())?;
        self.output.write_all(buffer.as_bytes())
    }

    fn recall(
        &mut self,
        prompt: &str,
        buffer: &mut LineBuffer,
        history: &mut HistoryStore,
        direction: Recall,
    ) -> io::Result<()> {
        let Some(entry) = history.step(direction) else {
            return Ok(());
        };
        buffer.set(entry.as_bytes());
        self.redraw(prompt, buffer)
    }

    fn complete(
        &mut self,
        buffer: &mut LineBuffer,
        completion: &CompletionEngine,
    ) -> io::Result<()> {
        match completion.complete(buffer.as_bytes()) {
            Completion::NoMatch => Ok(()),
            Completion::Replace { start, text } => {
                let redraw = Redraw::between(&buffer.as_bytes()[start..], &text);
                if buffer.replace_tail(start, &text) {
                    self.output.write_all(&redraw.to_bytes())?;
                }
                Ok(())
            }
            Completion::List(candidates) => {
                self.output.write_all(b"\n")?;
                for (i, candidate) in candidates.iter().enumerate() {
                    if i > 0 {
                        self.output.write_all(b"  ")?;
                    }
                    self.output.write_all(candidate)?;
                }
                self.output.write_all(b"\n")?;
                self.redraw_pending = true;
                Ok(())
            }
        }
    }
}
