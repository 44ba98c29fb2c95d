use crate::command::{CommandFactory, ExitCode};
use crate::completion::CompletionEngine;
use crate::editor::LineEditor;
use crate::external::{ExternalCommand, Launch};
use crate::lexer;
use crate::prompt;
use crate::state::ShellState;
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports builtins defined in this crate; anything else is launched
/// as an [`ExternalCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell's main loop and command dispatcher.
///
/// The interpreter owns the [`ShellState`] and a list of [`CommandFactory`]
/// objects that are queried by name before falling back to an external
/// program. See [`Interpreter::with_builtins`] for the factories included
/// out of the box.
pub struct Interpreter {
    state: ShellState,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(state: ShellState, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { state, commands }
    }

    /// Create an interpreter with the builtins `exit`, `cd`, `clear`,
    /// `help`, `alias` and `unalias`.
    pub fn with_builtins(state: ShellState) -> Self {
        use crate::builtin::*;
        Self::new(
            state,
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Clear>::default()),
                Box::new(Factory::<Help>::default()),
                Box::new(Factory::<Alias>::default()),
                Box::new(Factory::<Unalias>::default()),
            ],
        )
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Builtins report into `stdout`; external programs inherit the shell's
    /// descriptors. A background launch counts as success.
    pub fn run(
        &mut self,
        name: &str,
        args: &[&str],
        background: bool,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, args) {
                return cmd.execute(stdout, &mut self.state);
            }
        }

        let argv: Vec<String> = std::iter::once(name)
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect();
        let external = ExternalCommand::new(&self.state.env, &argv);
        match external.launch(&self.state.env, background)? {
            Launch::Finished(code) => Ok(code),
            Launch::Background(_) => Ok(0),
        }
    }

    /// Expand aliases, split into words and run the result.
    ///
    /// Returns `Ok(None)` when the line holds no command.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<Option<ExitCode>> {
        let expanded = self.state.aliases.expand(line);
        let command = lexer::split_into_tokens(&expanded);
        let Some((name, rest)) = command.argv.split_first() else {
            return Ok(None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let code = self.run(name, &args, command.background, stdout)?;
        debug!(command = %name, code, background = command.background, "finished");
        Ok(Some(code))
    }

    /// Read, record and run lines until `exit` or end of input.
    ///
    /// Errors are terminal write failures; failures of individual commands
    /// are reported on stderr and the loop goes on.
    pub fn repl<R: Read, W: Write>(&mut self, editor: &mut LineEditor<R, W>) -> io::Result<()> {
        while !self.state.env.should_exit {
            let prompt = prompt::render(&self.state.env);
            let completion = CompletionEngine::from_env(&self.state.env);
            let Some(line) = editor.read_line(&prompt, &mut self.state.history, &completion)?
            else {
                info!("end of input");
                break;
            };
            if line.is_empty() {
                continue;
            }

            self.state.history.record(&line);
            if let Err(e) = self.execute_line(&line, &mut io::stdout()) {
                eprintln!("rsh: {e:#}");
            }
        }
        Ok(())
    }
}
