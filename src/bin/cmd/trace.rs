// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Trace command - summarize and list NetScaler trace records.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use crate::common::{format_duration, format_timestamp, output_json_or, print_diagnostics, Result};
use wirecodec::{DecoderConfig, Diagnostics, MmapArena, TraceReader, TraceRecord};

/// NetScaler trace inspection.
#[derive(Subcommand, Clone, Debug)]
pub enum TraceCmd {
    /// Show trace version, record counts and time span
    Info {
        /// Trace file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List records in file order
    Records {
        /// Trace file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl TraceCmd {
    pub fn run(self, config: &DecoderConfig) -> Result<()> {
        match self {
            TraceCmd::Info { input, json } => cmd_info(input, config, json),
            TraceCmd::Records { input, limit, json } => cmd_records(input, config, limit, json),
        }
    }
}

#[derive(Serialize)]
struct TraceSummary {
    version: &'static str,
    page_size: usize,
    pages: u64,
    records: usize,
    packets: usize,
    kinds: BTreeMap<String, usize>,
    start_ns: Option<u64>,
    end_ns: Option<u64>,
    diagnostics: Diagnostics,
}

/// Cmd: Show trace info
fn cmd_info(input: PathBuf, config: &DecoderConfig, json: bool) -> Result<()> {
    let arena = MmapArena::open(&input)?;
    let mut reader = TraceReader::new(Cursor::new(arena.data()), config)?;

    let mut records = 0;
    let mut packets = 0;
    let mut kinds = BTreeMap::new();
    let mut start_ns = None;
    let mut end_ns = None;

    while let Some(record) = reader.next_record()? {
        records += 1;
        *kinds.entry(record.kind.label()).or_insert(0) += 1;
        if record.kind.is_packet() {
            packets += 1;
            if let Some(ts) = record.timestamp_ns {
                start_ns = Some(start_ns.map_or(ts, |s: u64| s.min(ts)));
                end_ns = Some(end_ns.map_or(ts, |e: u64| e.max(ts)));
            }
        }
    }

    let page_size = reader.page_size();
    let summary = TraceSummary {
        version: reader.version().as_str(),
        page_size,
        pages: (arena.len() as u64).div_ceil(page_size as u64),
        records,
        packets,
        kinds,
        start_ns,
        end_ns,
        diagnostics: reader.take_diagnostics(),
    };

    output_json_or(json, &summary, || {
        println!("=== {} ===", input.display());
        println!("Version: {}", summary.version);
        println!("Pages: {} x {} bytes", summary.pages, summary.page_size);
        println!("Records: {}", summary.records);
        println!("Packets: {}", summary.packets);

        if let (Some(start), Some(end)) = (summary.start_ns, summary.end_ns) {
            println!("Start: {}", format_timestamp(start));
            println!("End: {}", format_timestamp(end));
            println!("Duration: {}", format_duration(end - start));
        }

        println!();
        println!("Record kinds:");
        for (label, count) in &summary.kinds {
            println!("  {label}: {count}");
        }
        print_diagnostics(&summary.diagnostics);
        Ok(())
    })
}

/// Cmd: List records
fn cmd_records(
    input: PathBuf,
    config: &DecoderConfig,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let arena = MmapArena::open(&input)?;
    let mut reader = TraceReader::new(Cursor::new(arena.data()), config)?;
    let limit = limit.unwrap_or(usize::MAX);

    let mut records: Vec<TraceRecord> = Vec::new();
    while records.len() < limit {
        match reader.next_record()? {
            Some(record) => records.push(record),
            None => break,
        }
    }

    output_json_or(json, &records, || {
        for record in &records {
            print_record(record);
        }
        Ok(())
    })?;
    print_diagnostics(reader.diagnostics());
    Ok(())
}

fn print_record(record: &TraceRecord) {
    let mut line = format!(
        "{:>10}  page {} +{:<5} {:<14} {:>5} bytes",
        record.file_offset,
        record.page_index,
        record.page_offset,
        record.kind.label(),
        record.size
    );
    if let Some(ts) = record.timestamp_ns {
        line.push_str(&format!("  {}", format_timestamp(ts)));
    }
    if record.kind.is_packet() {
        match record.orig_len {
            Some(orig) => line.push_str(&format!("  {}/{orig} captured", record.captured_len())),
            None => line.push_str(&format!("  {} captured", record.captured_len())),
        }
    }
    if let Some(text) = record.signature_text() {
        line.push_str(&format!("  \"{text}\""));
    }
    println!("{line}");
}
