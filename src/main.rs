// File: src/main.rs
//
// Entry point: no args starts the REPL, one arg runs that file, more
// than one is a usage error. Mirrors
// `original_source/lox/apps/main.c`'s `main` dispatch and exit-code
// table exactly (0 success, 65 compile error, 70 runtime error, 74
// I/O or out-of-memory reading the file, 64 usage error) -- `clap` is
// used only to parse the single optional positional argument, not for
// `ruff/src/main.rs`'s subcommand surface, since this spec has no
// subcommands.

mod chunk;
mod compiler;
mod debug;
mod errors;
mod gc;
mod heap;
mod native;
mod repl;
mod scanner;
mod table;
mod value;
mod vm;

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use vm::{InterpretResult, Vm};

#[derive(Parser)]
#[command(name = "loxide", version = env!("CARGO_PKG_VERSION"), about = "A bytecode compiler and VM for a small dynamic scripting language")]
struct Cli {
    /// Script to run. Omit to start the REPL.
    path: Option<String>,
}

const EX_OK: u8 = 0;
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: loxide [path]");
        return ExitCode::from(EX_USAGE);
    }

    let cli = Cli::parse();
    match cli.path {
        None => {
            if let Err(err) = run_repl() {
                eprintln!("{}", err);
                return ExitCode::from(EX_IOERR);
            }
            ExitCode::from(EX_OK)
        }
        Some(path) => match run_file(&path) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("{:?}", err);
                ExitCode::from(EX_IOERR)
            }
        },
    }
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = repl::Repl::new()?;
    repl.run()
}

/// Read and run a script file. I/O failures are reported with `anyhow`
/// context (which file, what went wrong) the way the other retrieval-
/// pack CLIs report host-level errors; a successful read always
/// produces an `Ok(ExitCode)`, even when the script itself fails to
/// compile or run.
fn run_file(path: &str) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file \"{}\"", path))?;

    Ok(match Vm::new().interpret(&source) {
        InterpretResult::Ok => ExitCode::from(EX_OK),
        InterpretResult::CompileError => ExitCode::from(EX_DATAERR),
        InterpretResult::RuntimeError => ExitCode::from(EX_SOFTWARE),
    })
}
