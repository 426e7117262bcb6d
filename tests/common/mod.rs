// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use wirecodec::encoding::header::universal;
use wirecodec::io::formats::netscaler::constants::{
    ABSTIME_V10, ABSTIME_V20, RELTIME_V10, RELTIME_V20, SIGNATURE_SIZE_V10,
    SIGNATURE_TEXT_OFFSET_V10, SIGNATURE_TEXT_V10, SIGNATURE_TEXT_V20, SIGNATURE_TEXT_V30,
    SIGNATURE_V10, SIGNATURE_V20,
};
use wirecodec::{BerWriter, FormatVersion, SchemaNode, SchemaTable, Tag};

// ============================================================================
// Temporary files
// ============================================================================

/// Removes a temporary directory when dropped.
pub struct CleanupGuard(pub PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Create a fresh temporary directory for one test.
pub fn temp_dir(label: &str) -> (PathBuf, CleanupGuard) {
    let random = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let dir = std::env::temp_dir().join(format!(
        "wirecodec_{}_{}_{}",
        label,
        std::process::id(),
        random
    ));
    fs::create_dir_all(&dir).unwrap();
    (dir.clone(), CleanupGuard(dir))
}

// ============================================================================
// BER fixtures
// ============================================================================

/// Schema with one record type exercising most node kinds.
///
/// ```text
/// Event ::= SEQUENCE {
///     id       INTEGER,
///     severity [0] IMPLICIT Severity OPTIONAL,
///     source   UTF8String,
///     tags     SEQUENCE OF IA5String,
///     payload  CHOICE { raw [1] OCTET STRING, code [2] INTEGER }
/// }
/// Severity ::= ENUMERATED { info(0), warning(1), error(2) }
/// ```
pub fn event_schema() -> SchemaTable {
    SchemaTable::from_types(vec![
        SchemaNode::sequence(
            "Event",
            vec![
                SchemaNode::integer("id"),
                SchemaNode::type_ref("severity", 1)
                    .tagged(Tag::context(0))
                    .optional(),
                SchemaNode::char_string("source", universal::UTF8_STRING),
                SchemaNode::sequence_of(
                    "tags",
                    SchemaNode::char_string("tag", universal::IA5_STRING),
                ),
                SchemaNode::choice(
                    "payload",
                    vec![
                        SchemaNode::octet_string("raw").tagged(Tag::context(1)),
                        SchemaNode::integer("code").tagged(Tag::context(2)),
                    ],
                ),
            ],
        ),
        SchemaNode::enumerated("Severity").with_named_values(vec![
            (0, "info"),
            (1, "warning"),
            (2, "error"),
        ]),
    ])
    .unwrap()
}

/// Encode one `Event` record.
pub fn encode_event(
    id: i64,
    severity: Option<i64>,
    source: &str,
    tags: &[&str],
    code: i64,
) -> Vec<u8> {
    let mut w = BerWriter::new();
    w.write_sequence(|w| {
        w.write_integer(Tag::universal(universal::INTEGER), id);
        if let Some(severity) = severity {
            w.write_integer(Tag::context(0), severity);
        }
        w.write_str(Tag::universal(universal::UTF8_STRING), source);
        w.write_sequence(|w| {
            for tag in tags {
                w.write_str(Tag::universal(universal::IA5_STRING), tag);
            }
            Ok(())
        })?;
        w.write_integer(Tag::context(2), code);
        Ok(())
    })
    .unwrap();
    w.into_bytes()
}

/// Deterministic pseudo-random bytes (64-bit LCG).
pub fn lcg_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

// ============================================================================
// NetScaler trace fixtures
// ============================================================================

pub const PAGE_SIZE: usize = 8192;

/// Trace builder for all three generations.
///
/// Version 2.0 packets use the 2.0 full-receive layout and one-byte record
/// sizes, so `packet` sizes are exact.
pub struct TraceBuilder {
    pub version: FormatVersion,
    pub data: Vec<u8>,
}

impl TraceBuilder {
    fn with_version(version: FormatVersion) -> Self {
        Self {
            version,
            data: Vec::new(),
        }
    }

    /// Start a trace with a 1.0 signature record.
    pub fn v10() -> Self {
        let mut builder = Self::with_version(FormatVersion::V10);
        let mut content = vec![0u8; SIGNATURE_TEXT_OFFSET_V10 + SIGNATURE_SIZE_V10];
        content[SIGNATURE_TEXT_OFFSET_V10..][..SIGNATURE_TEXT_V10.len()]
            .copy_from_slice(SIGNATURE_TEXT_V10.as_bytes());
        builder.record(u32::from(SIGNATURE_V10), &content);
        builder
    }

    /// Start a trace with a 2.0 signature record.
    pub fn v20() -> Self {
        let mut builder = Self::with_version(FormatVersion::V20);
        builder.record(u32::from(SIGNATURE_V20), SIGNATURE_TEXT_V20.as_bytes());
        builder
    }

    /// Start a trace with a 3.0 signature record.
    pub fn v30() -> Self {
        let mut builder = Self::with_version(FormatVersion::V30);
        builder.record(u32::from(SIGNATURE_V20), SIGNATURE_TEXT_V30.as_bytes());
        builder
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Append one record with the header encoding of the trace version.
    pub fn record(&mut self, record_type: u32, content: &[u8]) -> &mut Self {
        match self.version {
            FormatVersion::V10 => {
                let size = 4 + content.len();
                self.data
                    .extend_from_slice(&(record_type as u16).to_le_bytes());
                self.data.extend_from_slice(&(size as u16).to_le_bytes());
            }
            FormatVersion::V20 | FormatVersion::V30 => {
                if 2 + content.len() < 0x80 {
                    self.data
                        .extend_from_slice(&[record_type as u8, (2 + content.len()) as u8]);
                } else {
                    let size = 3 + content.len();
                    assert!(size < 0x80 * 0x100);
                    self.data.extend_from_slice(&[
                        record_type as u8,
                        (size & 0x7F) as u8 | 0x80,
                        (size >> 7) as u8,
                    ]);
                }
            }
        }
        self.data.extend_from_slice(content);
        self
    }

    /// Absolute time record: seconds since the epoch plus a millisecond offset.
    pub fn abs_time(&mut self, secs: u32, millis: u16) -> &mut Self {
        let mut content = Vec::new();
        match self.version {
            FormatVersion::V10 => {
                content.extend_from_slice(&u32::from(millis).to_le_bytes());
                content.extend_from_slice(&secs.to_le_bytes());
                self.record(u32::from(ABSTIME_V10), &content)
            }
            FormatVersion::V20 | FormatVersion::V30 => {
                content.extend_from_slice(&millis.to_le_bytes());
                content.extend_from_slice(&secs.to_le_bytes());
                self.record(u32::from(ABSTIME_V20), &content)
            }
        }
    }

    /// Relative time record in milliseconds.
    pub fn rel_time(&mut self, millis: u32) -> &mut Self {
        let record_type = match self.version {
            FormatVersion::V10 => u32::from(RELTIME_V10),
            FormatVersion::V20 | FormatVersion::V30 => u32::from(RELTIME_V20),
        };
        self.record(record_type, &millis.to_le_bytes())
    }

    /// Full receive packet record (layout 2.0): device, relative µs, payload.
    pub fn packet(&mut self, micros: u32, payload: &[u8]) -> &mut Self {
        let size = 2 + 5 + payload.len();
        assert!(size < 0x80, "one-byte record size");
        let mut content = vec![1];
        content.extend_from_slice(&micros.to_le_bytes());
        content.extend_from_slice(payload);
        self.record(0xC2, &content)
    }

    /// Zero-fill to the next boundary of `page_size`.
    pub fn pad_to_page(&mut self, page_size: usize) -> &mut Self {
        let rest = self.len() % page_size;
        if rest != 0 {
            self.data.resize(self.len() + page_size - rest, 0);
        }
        self
    }

    /// Packet record of exactly `size` bytes with a patterned payload.
    pub fn packet_of_size(&mut self, size: usize, micros: u32) -> &mut Self {
        assert!(size >= 7);
        let payload: Vec<u8> = (0..size - 7).map(|i| i as u8).collect();
        self.packet(micros, &payload)
    }

    /// Append packet records until the trace is exactly `target` bytes long.
    pub fn fill_to(&mut self, target: usize) -> &mut Self {
        assert!(target >= self.len() + 7);
        while self.len() < target {
            let rest = target - self.len();
            let size = if rest <= 127 {
                rest
            } else if rest - 127 >= 7 {
                127
            } else {
                100
            };
            self.packet_of_size(size, 0);
        }
        self
    }

    /// Zero-fill to the next page boundary.
    pub fn pad_page(&mut self) -> &mut Self {
        self.pad_to_page(PAGE_SIZE)
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}
