//! `trietool` — a small command-line harness exercising the trie engine
//! end to end, modeled on the teacher's own `trietool` binary.
//!
//! Only the trie-relevant subset of spec §6's host-visible command set
//! is implemented here (`TSET`/`TSETNX`/`TGET`/`TDEL`/`TKEYS`); the
//! per-key-field hash variants (`TH*`) belong to a different storage
//! engine and are out of scope for this crate.

mod command_tdel;
mod command_tget;
mod command_tkeys;
mod command_tset;
mod context;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use context::Context;

/// A standalone CLI over the double-array trie storage engine.
#[derive(Parser, Debug)]
#[command(name = "trietool")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and mutate a trie store from the command line", long_about = None)]
struct Cli {
    /// Backing store file (created on first TSET if missing).
    #[arg(short, long, global = true, default_value = "trie.store", env = "TRIETOOL_FILE")]
    file: PathBuf,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true, env = "TRIETOOL_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert or overwrite a key.
    Tset { key: String, value: String },
    /// Insert a key only if it does not already exist.
    Tsetnx { key: String, value: String },
    /// Look up a key's value.
    Tget { key: String },
    /// Delete any number of keys, printing the count actually removed.
    Tdel { keys: Vec<String> },
    /// Enumerate every key matching a `prefix*` pattern.
    Tkeys { pattern: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut context = match Context::load(&cli.file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("trietool: failed to load '{}': {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mutates = matches!(
        cli.command,
        Commands::Tset { .. } | Commands::Tsetnx { .. } | Commands::Tdel { .. }
    );

    match cli.command {
        Commands::Tset { key, value } => command_tset::tset(&mut context, &key, value),
        Commands::Tsetnx { key, value } => command_tset::tsetnx(&mut context, &key, value),
        Commands::Tget { key } => command_tget::tget(&context, &key),
        Commands::Tdel { keys } => command_tdel::tdel(&mut context, &keys),
        Commands::Tkeys { pattern } => command_tkeys::tkeys(&context, &pattern),
    }

    if mutates {
        if let Err(e) = context.save() {
            eprintln!("trietool: failed to save '{}': {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
