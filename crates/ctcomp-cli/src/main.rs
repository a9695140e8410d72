//! `ctcomp` — binaire principal
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger, couleur), et
//! délégation à `ctcomp_cli` (lib).

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};

use ctcomp_cli as cli;
use ctcomp_vm::{VmOptions, STACK_MAX};

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "ctcomp",
    version,
    about = "ctcomp: compile arithmetic expressions to bytecode and run them",
    long_about = None
)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Print the token stream instead of running
    #[arg(long, requires = "file", conflicts_with = "disasm")]
    tokens: bool,

    /// Print the compiled bytecode instead of running
    #[arg(long, requires = "file")]
    disasm: bool,

    /// Log consumed tokens and every executed instruction with the stack
    #[arg(long)]
    trace: bool,

    /// VM stack capacity, in values
    #[arg(long = "stack-size", default_value_t = STACK_MAX, value_parser = cli::parse_stack_size)]
    stack_size: usize,

    /// Source file (`-` for stdin); starts the REPL when omitted
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool, trace: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        let filter = if trace {
            format!("{level},ctcomp::trace=info,ctcomp_compiler=debug")
        } else {
            level.to_string()
        };
        std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or(filter));
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    let _ = (verbose, quiet, trace);
}

fn init_color(choice: ColorChoice) {
    // `owo-colors` détecte seul le TTY ; on ne fait que forcer via NO_COLOR / CLICOLOR_FORCE.
    match choice {
        ColorChoice::Auto => {},
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        },
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        },
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(e) => {
            // --help / --version are not usage errors
            let code = if e.use_stderr() { cli::EXIT_USAGE } else { cli::EXIT_OK };
            let _ = e.print();
            return ExitCode::from(code);
        },
    };

    match real_main(opt) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(cli::EXIT_INTERNAL)
        },
    }
}

fn real_main(opt: Opt) -> Result<u8> {
    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet, opt.trace);

    let vm = VmOptions { stack_capacity: opt.stack_size, trace_execution: opt.trace, trace_tokens: opt.trace };

    let command = match opt.file.map(cli::Input::from_arg) {
        Some(input) if opt.tokens => cli::Command::Tokens(input),
        Some(input) if opt.disasm => cli::Command::Disasm(input),
        Some(input) => cli::Command::Run { input, vm },
        None => cli::Command::Repl { prompt: "> ".to_string(), vm },
    };

    cli::execute(command)
}
