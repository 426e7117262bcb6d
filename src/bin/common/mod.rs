// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use wirecodec::{
    Anomaly, DecodedNode, DecoderConfig, Diagnostics, DiagnosticsSink, NodeVisitor,
};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Load the decoder configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DecoderConfig> {
    match path {
        Some(path) => Ok(DecoderConfig::load(path)?),
        None => Ok(DecoderConfig::default()),
    }
}

/// Format a duration in nanoseconds to human-readable string.
pub fn format_duration(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let millis = (nanos % 1_000_000_000) / 1_000_000;

    if secs >= 3600 {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    } else if secs >= 60 {
        let minutes = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", minutes, remaining_secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

/// Format a timestamp in nanoseconds to human-readable string.
pub fn format_timestamp(nanos: u64) -> String {
    let (secs, subsec) = wirecodec::io::formats::netscaler::clock::split_ns(nanos);
    let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(secs, subsec);

    match datetime {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string(),
        None => format!("{} ns", nanos),
    }
}

/// Print `value` as pretty JSON, or run the human-readable printer.
pub fn output_json_or<T>(
    json: bool,
    value: &T,
    human_fn: impl FnOnce() -> Result<()>,
) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human_fn()?;
    }
    Ok(())
}

/// Indented text rendering of a decoded tree.
#[derive(Default)]
pub struct TextRenderer {
    out: String,
}

impl TextRenderer {
    pub fn render(root: &DecodedNode) -> String {
        let mut renderer = Self::default();
        root.walk(&mut renderer);
        renderer.out
    }
}

impl NodeVisitor for TextRenderer {
    fn enter(&mut self, node: &DecodedNode, depth: usize) {
        let indent = "  ".repeat(depth);
        let name = if node.name.is_empty() { "-" } else { &node.name };
        let _ = write!(self.out, "{indent}{name}: {}", node.type_name);
        if !node.value.is_none() {
            let _ = write!(self.out, " = {}", node.value);
        }
        if let Some(display) = &node.display {
            let _ = write!(self.out, " ({display})");
        }
        let (start, end) = node.byte_range;
        let _ = writeln!(self.out, " [{start}..{end}]");
    }
}

/// Diagnostics sink printing one line per anomaly to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticsSink for StderrSink {
    fn report(&mut self, diagnostics: &Diagnostics) {
        if diagnostics.is_clean() {
            return;
        }
        eprintln!("{} parse anomalies:", diagnostics.count());
        for Anomaly {
            kind,
            offset,
            depth,
            detail,
        } in diagnostics.anomalies()
        {
            eprintln!("  {} at offset {offset} (depth {depth}): {detail}", kind.as_str());
        }
    }
}

/// Print anomalies to stderr.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    StderrSink.report(diagnostics);
}
