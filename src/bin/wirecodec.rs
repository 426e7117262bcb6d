// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Wirecodec CLI
//!
//! Command-line tool for decoding BER records and NetScaler traces.
//!
//! ## Usage
//!
//! ```sh
//! # Decode a record against a schema table
//! wirecodec ber decode --schema types.tt --pdu Message capture.ber
//!
//! # Dump any BER stream without a schema
//! wirecodec ber dump --all capture.ber
//!
//! # Compile a JSON type list into a binary table
//! wirecodec schema compile types.json types.tt
//!
//! # Summarize a NetScaler trace
//! wirecodec trace info nstrace1.cap
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use cmd::{BerCmd, SchemaCmd, TraceCmd};
use common::{load_config, Result};

/// Wirecodec - bounds-checked binary record decoder
#[derive(Parser, Clone)]
#[command(name = "wirecodec")]
#[command(about = "Decode BER records and NetScaler packet traces", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Decoder configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Decode BER data (schema-driven or untyped)
    #[command(subcommand)]
    Ber(BerCmd),

    /// Schema table operations (compile, show)
    #[command(subcommand)]
    Schema(SchemaCmd),

    /// NetScaler trace operations (info, records)
    #[command(subcommand)]
    Trace(TraceCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ber(cmd) => cmd.run(&config),
        Commands::Schema(cmd) => cmd.run(&config),
        Commands::Trace(cmd) => cmd.run(&config),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
