// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual wirecodec binary against files written to a
//! temporary directory.

mod common;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use common::{encode_event, event_schema, temp_dir, TraceBuilder};

/// Run wirecodec with arguments
fn run(args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_wirecodec");
    Command::new(bin)
        .args(args)
        .output()
        .unwrap_or_else(|_| panic!("Failed to run {bin}"))
}

/// Run wirecodec and assert success; returns (stdout, stderr)
fn run_ok(args: &[&str]) -> (String, String) {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Run wirecodec and assert failure; returns stderr
fn run_err(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        !output.status.success(),
        "Command should have failed but succeeded: {:?}",
        args
    );
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let (stdout, _) = run_ok(&["--help"]);
    assert!(stdout.contains("Decode BER records and NetScaler packet traces"));
    assert!(stdout.contains("ber"));
    assert!(stdout.contains("schema"));
    assert!(stdout.contains("trace"));
}

#[test]
fn test_cli_missing_file() {
    let stderr = run_err(&["ber", "dump", "/nonexistent/capture.ber"]);
    assert!(stderr.contains("Error:"));
}

// ============================================================================
// Schema Commands
// ============================================================================

#[test]
fn test_schema_compile_and_show() {
    let (dir, _guard) = temp_dir("schema");
    let source = dir.join("event.json");
    let table = dir.join("event.tt");
    fs::write(&source, event_schema().to_json_string().unwrap()).unwrap();

    let (stdout, _) = run_ok(&["schema", "compile", path_str(&source), path_str(&table)]);
    assert!(stdout.contains("Compiled 2 types"));
    assert_eq!(fs::read(&table).unwrap(), event_schema().to_bytes().unwrap());

    let (stdout, _) = run_ok(&["schema", "show", path_str(&table)]);
    assert!(stdout.contains("[0] Event: SEQUENCE"));
    assert!(stdout.contains("severity: TypeRef [CONTEXT 0] IMPLICIT -> Severity OPTIONAL"));
    assert!(stdout.contains("warning(1)"));

    let (stdout, _) = run_ok(&["schema", "show", path_str(&table), "--type", "Severity", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["node"]["name"], "Severity");

    let stderr = run_err(&["schema", "show", path_str(&table), "--type", "Missing"]);
    assert!(stderr.contains("not found"));
}

// ============================================================================
// BER Commands
// ============================================================================

#[test]
fn test_ber_decode_with_schema() {
    let (dir, _guard) = temp_dir("decode");
    let table = dir.join("event.tt");
    let input = dir.join("events.ber");
    fs::write(&table, event_schema().to_bytes().unwrap()).unwrap();
    let mut data = encode_event(42, Some(1), "sensor", &["a"], 503);
    data.extend(encode_event(43, None, "sensor", &[], 7));
    fs::write(&input, &data).unwrap();

    let (stdout, _) = run_ok(&[
        "ber",
        "decode",
        "--schema",
        path_str(&table),
        "--pdu",
        "Event",
        path_str(&input),
    ]);
    assert!(stdout.contains("=== Record at 0"));
    assert!(stdout.contains("severity: Severity = 1 (warning)"));
    assert!(stdout.contains("code: INTEGER = 503"));
    assert!(!stdout.contains("= 43"));

    let (stdout, _) = run_ok(&[
        "ber",
        "decode",
        "--schema",
        path_str(&table),
        "--pdu",
        "Event",
        "--all",
        "--json",
        path_str(&input),
    ]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["root"]["type_name"], "Event");
    assert_eq!(
        records[1]["offset"].as_u64().unwrap() + records[1]["bytes_consumed"].as_u64().unwrap(),
        data.len() as u64
    );
}

#[test]
fn test_ber_decode_from_offset() {
    let (dir, _guard) = temp_dir("offset");
    let table = dir.join("event.tt");
    let input = dir.join("events.ber");
    fs::write(&table, event_schema().to_bytes().unwrap()).unwrap();
    let first = encode_event(1, None, "a", &[], 0);
    let mut data = first.clone();
    data.extend(encode_event(2, None, "b", &[], 0));
    data.extend(encode_event(3, None, "c", &[], 0));
    fs::write(&input, &data).unwrap();
    let second = first.len().to_string();

    let decode = |extra: &[&str]| {
        let mut args = vec![
            "ber",
            "decode",
            "--schema",
            path_str(&table),
            "--pdu",
            "Event",
            "--json",
            "--offset",
            &second,
        ];
        args.extend_from_slice(extra);
        args.push(path_str(&input));
        let (stdout, _) = run_ok(&args);
        serde_json::from_str::<serde_json::Value>(&stdout).unwrap()
    };

    let one = decode(&[]);
    assert_eq!(one.as_array().unwrap().len(), 1);
    assert_eq!(one[0]["offset"].as_u64(), Some(first.len() as u64));

    let rest = decode(&["--all"]);
    assert_eq!(rest.as_array().unwrap().len(), 2);

    let past_end = data.len().to_string();
    let stderr = run_err(&["ber", "dump", "--offset", &past_end, path_str(&input)]);
    assert!(stderr.contains("past the end"));
}

#[test]
fn test_ber_decode_truncated_shows_partial_tree() {
    let (dir, _guard) = temp_dir("partial");
    let table = dir.join("event.json");
    let input = dir.join("cut.ber");
    fs::write(&table, event_schema().to_json_string().unwrap()).unwrap();
    fs::write(&input, [0x30, 0x80, 0x02, 0x01, 0x05]).unwrap();

    let stderr = run_err(&[
        "ber",
        "decode",
        "--schema",
        path_str(&table),
        "--pdu",
        "Event",
        path_str(&input),
    ]);
    assert!(stderr.contains("Partial tree"));
    assert!(stderr.contains("id: INTEGER = 5"));
    assert!(stderr.contains("Error: decode aborted"));
}

#[test]
fn test_ber_dump_untyped() {
    let (dir, _guard) = temp_dir("dump");
    let input = dir.join("any.ber");
    fs::write(&input, [0x30, 0x06, 0x02, 0x01, 0x2A, 0x0C, 0x01, b'x']).unwrap();

    let (stdout, _) = run_ok(&["ber", "dump", path_str(&input)]);
    assert!(stdout.contains("-: SEQUENCE [0..8]"));
    assert!(stdout.contains("  -: INTEGER = 42 [2..5]"));
    assert!(stdout.contains("-: UTF8String = \"x\""));
}

#[test]
fn test_config_file_applies() {
    let (dir, _guard) = temp_dir("config");
    let input = dir.join("nested.ber");
    let config = dir.join("decoder.toml");
    fs::write(&input, [0x30, 0x04, 0x30, 0x02, 0x05, 0x00]).unwrap();
    fs::write(&config, "max_nesting_depth = 1\n").unwrap();

    let (_, stderr) = run_ok(&["ber", "dump", path_str(&input)]);
    assert!(!stderr.contains("nesting too deep"));

    let (_, stderr) = run_ok(&["--config", path_str(&config), "ber", "dump", path_str(&input)]);
    assert!(stderr.contains("nesting too deep"));

    fs::write(&config, "max_nesting_depth = 0\n").unwrap();
    let stderr = run_err(&["--config", path_str(&config), "ber", "dump", path_str(&input)]);
    assert!(stderr.contains("max_nesting_depth"));
}

// ============================================================================
// Trace Commands
// ============================================================================

fn write_trace(dir: &Path) -> std::path::PathBuf {
    let mut trace = TraceBuilder::v20();
    trace
        .abs_time(1_700_000_000, 0)
        .packet(0, b"first")
        .rel_time(2_000)
        .packet(0, b"second");
    let path = dir.join("nstrace1.cap");
    fs::write(&path, trace.build()).unwrap();
    path
}

#[test]
fn test_trace_info() {
    let (dir, _guard) = temp_dir("trace_info");
    let trace = write_trace(&dir);

    let (stdout, _) = run_ok(&["trace", "info", path_str(&trace)]);
    assert!(stdout.contains("Version: 2.0"));
    assert!(stdout.contains("Records: 5"));
    assert!(stdout.contains("Packets: 2"));
    assert!(stdout.contains("Start: 2023-11-14 22:13:20.000000 UTC"));
    assert!(stdout.contains("Duration: 2.000s"));

    let (stdout, _) = run_ok(&["trace", "info", "--json", path_str(&trace)]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["packets"], 2);
    assert_eq!(json["pages"], 1);
}

#[test]
fn test_trace_records() {
    let (dir, _guard) = temp_dir("trace_records");
    let trace = write_trace(&dir);

    let (stdout, _) = run_ok(&["trace", "records", "-n", "3", "--json", path_str(&trace)]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["data"], hex::encode(b"first"));

    let (stdout, _) = run_ok(&["trace", "records", path_str(&trace)]);
    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.contains("5/5 captured"));
}

#[test]
fn test_trace_rejects_non_trace() {
    let (dir, _guard) = temp_dir("not_trace");
    let input = dir.join("random.bin");
    fs::write(&input, [0xFFu8; 256]).unwrap();
    let stderr = run_err(&["trace", "info", path_str(&input)]);
    assert!(stderr.contains("signature"));
}
