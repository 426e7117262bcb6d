// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BER command - decode records with or without a schema table.

use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::Subcommand;

use crate::common::{output_json_or, print_diagnostics, Result, TextRenderer};
use wirecodec::{
    load_schema, BerDecoder, DecodeOutcome, DecoderConfig, MmapArena, SchemaFormat, SchemaTable,
};

/// BER decoding.
#[derive(Subcommand, Clone, Debug)]
pub enum BerCmd {
    /// Decode records against a schema table
    Decode {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Schema table (binary, or JSON when the name ends in .json)
        #[arg(short, long, value_name = "TABLE")]
        schema: PathBuf,

        /// Top-level type to decode
        #[arg(short, long)]
        pdu: String,

        /// Byte offset of the first record
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Decode consecutive records until the end of the file
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Dump records by universal tag, without a schema
    Dump {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Byte offset of the first record
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Decode consecutive records until the end of the file
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl BerCmd {
    pub fn run(self, config: &DecoderConfig) -> Result<()> {
        match self {
            BerCmd::Decode {
                input,
                schema,
                pdu,
                offset,
                all,
                json,
            } => {
                let table = read_schema(&schema)?;
                let decoder = BerDecoder::with_config(&table, config.clone());
                cmd_decode(&input, offset, all, json, &decoder, Some(&pdu))
            }
            BerCmd::Dump {
                input,
                offset,
                all,
                json,
            } => {
                let decoder = BerDecoder::untyped(config.clone());
                cmd_decode(&input, offset, all, json, &decoder, None)
            }
        }
    }
}

/// Read a schema table, choosing the format from the file name.
pub fn read_schema(path: &Path) -> Result<SchemaTable> {
    let bytes = std::fs::read(path)?;
    Ok(load_schema(&bytes, SchemaFormat::from_path(path))?)
}

/// Cmd: Decode one record, or every record from `offset` on
fn cmd_decode(
    input: &Path,
    offset: usize,
    all: bool,
    json: bool,
    decoder: &BerDecoder<'_>,
    pdu: Option<&str>,
) -> Result<()> {
    let arena = MmapArena::open(input)?;
    let data = arena.data();
    if offset >= data.len() {
        bail!("offset {offset} is past the end of the input ({} bytes)", data.len());
    }

    let records = match pdu {
        Some(pdu) => decoder.records(data, offset, pdu),
        None => decoder.records_untyped(data, offset),
    };
    let limit = if all { usize::MAX } else { 1 };

    let mut outcomes = Vec::new();
    for result in records.take(limit) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(failure) => {
                print_outcomes(&outcomes, json)?;
                if let Some(partial) = &failure.partial {
                    eprintln!("Partial tree:");
                    eprint!("{}", TextRenderer::render(partial));
                }
                print_diagnostics(&failure.diagnostics);
                return Err(failure.into());
            }
        }
    }

    print_outcomes(&outcomes, json)
}

fn print_outcomes(outcomes: &[DecodeOutcome], json: bool) -> Result<()> {
    if outcomes.is_empty() {
        return Ok(());
    }
    output_json_or(json, outcomes, || {
        for outcome in outcomes {
            println!(
                "=== Record at {} ({} bytes) ===",
                outcome.offset, outcome.bytes_consumed
            );
            print!("{}", TextRenderer::render(&outcome.root));
            if !outcome.is_clean() {
                println!("{} parse anomalies", outcome.anomaly_count());
            }
            print_diagnostics(&outcome.diagnostics);
        }
        Ok(())
    })
}
