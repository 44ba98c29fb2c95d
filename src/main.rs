use anyhow::Context;
use argh::{EarlyExit, FromArgs};
use rsh::config::ShellFiles;
use rsh::editor::LineEditor;
use rsh::env::Environment;
use rsh::terminal::{self, TerminalSession, TtyInput};
use rsh::{Interpreter, ShellState, external, logging};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::info;

#[derive(FromArgs, Debug, PartialEq)]
/// An interactive shell with history, aliases and tab completion.
struct Cli {
    #[argh(switch, short = 'v')]
    /// print version and system information, then exit.
    version: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli, EarlyExit> {
    let command = args.first().map(String::as_str).unwrap_or("rsh");
    let rest: Vec<&str> = args
        .iter()
        .skip(1)
        .map(|arg| if arg == "-h" { "--help" } else { arg.as_str() })
        .collect();
    Cli::from_args(&[command], &rest)
}

fn print_version() {
    println!("rsh {}", env!("CARGO_PKG_VERSION"));
    if let Ok(uts) = nix::sys::utsname::uname() {
        println!(
            "{} {} {}",
            uts.sysname().to_string_lossy(),
            uts.release().to_string_lossy(),
            uts.machine().to_string_lossy()
        );
    }
}

fn run() -> anyhow::Result<()> {
    let files = ShellFiles::beside_executable();
    if let Err(e) = files.ensure_exist() {
        eprintln!("rsh: can't create default files: {e}");
    }
    logging::init_global(&files.log);
    info!(rc = %files.rc.display(), history = %files.history.display(), "starting");

    external::install_interrupt_handler()?;
    terminal::install_panic_restore();

    let state = ShellState::load(Environment::new(), files);
    let session = TerminalSession::enter().context("can't switch the terminal to raw mode")?;

    let mut stdout = io::stdout();
    stdout.write_all(b"\x1b[H\x1b[2J")?;
    stdout.flush()?;

    let mut interpreter = Interpreter::with_builtins(state);
    let mut editor = LineEditor::new(TtyInput, stdout);
    let result = interpreter.repl(&mut editor);

    interpreter.state().save_all();
    drop(session);
    println!("\nGoodbye from rsh.");
    info!("exiting");
    result.context("terminal write failed")
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_cli(&args) {
        Ok(cli) => cli,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => {
                    println!("{output}");
                    ExitCode::SUCCESS
                }
                Err(()) => {
                    eprintln!("{output}");
                    eprintln!("Try 'rsh --help' for more information.");
                    ExitCode::FAILURE
                }
            };
        }
    };

    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}
