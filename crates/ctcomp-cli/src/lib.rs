//! ctcomp-cli — bibliothèque interne du binaire `ctcomp`
//!
//! Keeps I/O and printing out of `main.rs`, which only parses arguments and sets up
//! logging/colours.
//!
//! - `execute` runs a [`Command`] and returns the process exit code
//! - file mode: read, interpret, print the value; exit 0 / 2 (compile) / 3 (runtime)
//! - REPL: `rustyline` editor, one independent program per line, same VM throughout
//! - `--tokens` / `--disasm` listings as plain strings ([`render_tokens`], [`render_disasm`])
//! - traces (`feature = "trace"`) and colours (`feature = "color"`) are optional

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use rustyline::{error::ReadlineError, DefaultEditor};

use ctcomp_compiler::{compile_with, CompileError, CompilerOptions};
use ctcomp_core::bytecode::disassemble_chunk;
use ctcomp_lexer::Lexer;
use ctcomp_vm::{InterpretError, InterpretResult, Vm, VmOptions};

#[cfg(feature = "color")]
use owo_colors::{OwoColorize, Stream};

// ───────────────────────────── Codes de sortie ─────────────────────────────

/// Success.
pub const EXIT_OK: u8 = 0;
/// Bad command line.
pub const EXIT_USAGE: u8 = 1;
/// Source could not be read.
pub const EXIT_IO: u8 = 4;
/// Any other failure of the tool itself (terminal, stdout), as in sysexits' `EX_SOFTWARE`.
pub const EXIT_INTERNAL: u8 = 70;

/// Largest `--stack-size` accepted.
pub const MAX_STACK_SIZE: usize = 1 << 20;

// ───────────────────────────── Types publics ─────────────────────────────

/// Where the source comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Standard input.
    Stdin,
    /// A file on disk.
    Path(PathBuf),
}

impl Input {
    /// `-` means stdin, anything else is a path.
    pub fn from_arg(p: PathBuf) -> Self {
        if p.as_os_str() == "-" { Input::Stdin } else { Input::Path(p) }
    }

    fn name(&self) -> String {
        match self {
            Input::Stdin => "<stdin>".to_string(),
            Input::Path(p) => display(p),
        }
    }
}

/// High-level command (argument parsing stays in main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Interpret a whole file.
    Run {
        /// Source.
        input: Input,
        /// VM configuration.
        vm: VmOptions,
    },
    /// Interactive loop.
    Repl {
        /// Prompt shown before each line.
        prompt: String,
        /// VM configuration.
        vm: VmOptions,
    },
    /// Print the token stream.
    Tokens(Input),
    /// Compile and print the disassembly.
    Disasm(Input),
}

// ───────────────────────────── Arguments ─────────────────────────────

/// clap value parser for `--stack-size`: an integer in `1..=MAX_STACK_SIZE`.
pub fn parse_stack_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if (1..=MAX_STACK_SIZE).contains(&n) => Ok(n),
        Ok(_) => Err(format!("stack size must be between 1 and {MAX_STACK_SIZE}")),
        Err(e) => Err(e.to_string()),
    }
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .format_target(false)
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Runs a command and returns the process exit code.
///
/// An unreadable source is reported here and yields [`EXIT_IO`]; `Err` is left for failures of
/// the tool itself (REPL terminal, stdout), which the binary maps to [`EXIT_INTERNAL`].
pub fn execute(cmd: Command) -> Result<u8> {
    match cmd {
        Command::Run { input, vm } => {
            let Some(src) = read_or_report(&input) else { return Ok(EXIT_IO) };
            #[cfg(feature = "trace")]
            log::info!("running {} ({} bytes)", input.name(), src.len());
            let mut vm = Vm::with_options(vm);
            let outcome = run_source(&mut vm, &src, &mut io::stdout().lock())?;
            Ok(outcome.exit_code())
        },
        Command::Repl { prompt, vm } => repl(&prompt, vm),
        Command::Tokens(input) => {
            let Some(src) = read_or_report(&input) else { return Ok(EXIT_IO) };
            print!("{}", render_tokens(&src));
            Ok(EXIT_OK)
        },
        Command::Disasm(input) => {
            let Some(src) = read_or_report(&input) else { return Ok(EXIT_IO) };
            match render_disasm(&src, &input.name()) {
                Ok(text) => {
                    print!("{text}");
                    Ok(EXIT_OK)
                },
                Err(err) => {
                    report(&InterpretError::Compile(err));
                    Ok(InterpretResult::CompileError.exit_code())
                },
            }
        },
    }
}

/// Interprets `source`, writes the resulting value to `out` and reports failures on stderr.
pub fn run_source<W: Write>(vm: &mut Vm, source: &str, out: &mut W) -> Result<InterpretResult> {
    let result = vm.interpret(source);
    match &result {
        Ok(value) => writeln!(out, "{value}").context("écriture du résultat")?,
        Err(err) => report(err),
    }
    Ok(InterpretResult::of(&result))
}

/// Line-by-line interactive loop. Ctrl-C and Ctrl-D leave with exit code 0.
pub fn repl(prompt: &str, options: VmOptions) -> Result<u8> {
    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("initialisation du REPL: {e}"))?;
    let mut vm = Vm::with_options(options);
    let mut stdout = io::stdout();

    loop {
        let line = match rl.readline(prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(anyhow!("readline: {e}")),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());
        // errors are reported by run_source; the session goes on
        run_source(&mut vm, &line, &mut stdout)?;
        stdout.flush()?;
    }
    Ok(EXIT_OK)
}

// ───────────────────────────── Listings ─────────────────────────────

/// Token listing: line number (or `|` when unchanged), kind, lexeme. Ends with `Eof`.
pub fn render_tokens(source: &str) -> String {
    let mut out = String::new();
    let mut last_line = 0;
    for tok in Lexer::new(source) {
        if tok.line == last_line {
            out.push_str("   | ");
        } else {
            out.push_str(&format!("{:4} ", tok.line));
            last_line = tok.line;
        }
        let kind = format!("{:?}", tok.kind);
        out.push_str(&format!("{kind:<26} '{}'\n", tok.lexeme));
    }
    out
}

/// Compiles `source` and disassembles the chunk under `name`.
pub fn render_disasm(source: &str, name: &str) -> Result<String, CompileError> {
    let chunk = compile_with(source, CompilerOptions::default())?;
    Ok(disassemble_chunk(&chunk, name))
}

// ───────────────────────────── Utilitaires I/O ─────────────────────────────

/// Reads the whole source.
pub fn read_source(input: &Input) -> Result<String> {
    match input {
        Input::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("lecture de stdin")?;
            Ok(s)
        },
        Input::Path(p) => {
            let f = File::open(p).with_context(|| format!("ouverture: {}", display(p)))?;
            let mut r = BufReader::new(f);
            let mut s = String::new();
            r.read_to_string(&mut s).with_context(|| format!("lecture: {}", display(p)))?;
            Ok(s)
        },
    }
}

fn read_or_report(input: &Input) -> Option<String> {
    match read_source(input) {
        Ok(src) => Some(src),
        Err(e) => {
            status_err("error", &format!("{e:#}"));
            None
        },
    }
}

fn display(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

// ───────────────────────────── Sorties jolies ─────────────────────────────

fn report(err: &InterpretError) {
    match err {
        InterpretError::Compile(c) => {
            for d in &c.diagnostics {
                status_err("compile error", &d.to_string());
            }
        },
        InterpretError::Runtime(r) => status_err("runtime error", &r.to_string()),
    }
}

fn status_err(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.if_supports_color(Stream::Stderr, |t| t.red().bold().to_string()), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{} {}", tag, msg);
    }
}

// ───────────────────────────── Tests ─────────────────────────────
