//! Logsim - Logic Circuit Simulator
//!
//! Compiles a circuit definition file, runs it for a number of cycles and
//! prints the traces of the monitored outputs.
//!
//! # Usage
//!
//! ```bash
//! logsim circuit.def --cycles 20 --switch SW1=1 --switch SW2=0
//! logsim circuit.def --check -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;
use logsim_core::{
    dsl::{self, render_location},
    error::{LogsimError, Result},
    DEFAULT_CYCLES,
};

/// Logic circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit definition file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Only compile the file and report errors
    #[arg(long)]
    check: bool,

    /// Number of cycles to simulate
    #[arg(short, long, default_value_t = DEFAULT_CYCLES)]
    cycles: usize,

    /// Set a switch before running, as NAME=0 or NAME=1
    #[arg(long = "switch", value_name = "NAME=STATE", value_parser = parse_switch)]
    switches: Vec<(String, bool)>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_switch(arg: &str) -> std::result::Result<(String, bool), String> {
    let (name, state) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=STATE, got '{}'", arg))?;
    match state {
        "0" => Ok((name.to_string(), false)),
        "1" => Ok((name.to_string(), true)),
        _ => Err(format!("switch state must be 0 or 1, got '{}'", state)),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let source = dsl::read_source(&args.circuit_file)?;

    let compiled = match dsl::compile(&source) {
        Ok(compiled) => compiled,
        Err(err) => {
            if let Some((line, column)) = err.location() {
                eprint!("{}", render_location(&source, line, column));
            }
            return Err(err);
        }
    };

    for diagnostic in &compiled.diagnostics {
        eprintln!("{}\n", diagnostic);
    }
    if !compiled.is_ok() {
        return Err(LogsimError::CompilationFailed {
            errors: compiled.error_count(),
        });
    }
    info!("compiled {}", args.circuit_file.display());
    if args.check {
        return Ok(());
    }

    let mut circuit = compiled.circuit;
    for (name, high) in &args.switches {
        circuit.set_switch_by_name(name, *high)?;
    }
    circuit.run(args.cycles)?;
    print!("{}", circuit.display_signals());

    Ok(())
}
