// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Single-record decoding and version detection.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use super::constants::{SIGNATURE_TEXT_OFFSET_V10, SIGNATURE_V10, SIGNATURE_V20};
use super::layout::{classify, FormatVersion, RecordKind};
use crate::encoding::cursor::ByteCursor;
use crate::encoding::header::decode_header_with;
use crate::{CodecError, Result};

/// Clock change carried by a time record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockUpdate {
    Absolute { secs: u32, millis: u32 },
    Relative { millis: u32 },
    RelativeHr { micros: u32 },
}

/// One decoded trace record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub kind: RecordKind,
    /// Raw record type code
    pub record_type: u32,
    /// Absolute offset of the record header in the file
    pub file_offset: u64,
    /// Page the record starts in
    pub page_index: u64,
    /// Offset of the record header within its first page
    pub page_offset: usize,
    /// Declared record size, header included
    pub size: usize,
    /// Header length
    pub header_len: usize,
    /// Timestamp in nanoseconds since the Unix epoch, once known
    pub timestamp_ns: Option<u64>,
    /// High resolution relative time of a packet record, microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_time_us: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_no: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcb_dev_no: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l_pcb_dev_no: Option<u32>,
    /// Original packet length; equals the captured length for full records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_len: Option<usize>,
    /// Captured packet bytes, or the raw content of non-packet records
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

mod hex_bytes {
    pub fn serialize<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

impl TraceRecord {
    fn new(kind: RecordKind, record_type: u32, size: usize, header_len: usize) -> Self {
        Self {
            kind,
            record_type,
            file_offset: 0,
            page_index: 0,
            page_offset: 0,
            size,
            header_len,
            timestamp_ns: None,
            rel_time_us: None,
            clock: None,
            dev_no: None,
            pcb_dev_no: None,
            l_pcb_dev_no: None,
            orig_len: None,
            data: Vec::new(),
        }
    }

    /// Whether the record is too short for its packet layout.
    pub fn is_short(&self) -> bool {
        self.kind
            .layout()
            .is_some_and(|layout| self.size < self.header_len + layout.data)
    }

    /// Signature text of a signature record.
    pub fn signature_text(&self) -> Option<String> {
        if self.kind != RecordKind::Signature {
            return None;
        }
        let text = self.data.split(|b| *b == 0).next().unwrap_or(&[]);
        Some(String::from_utf8_lossy(text).into_owned())
    }

    /// Captured length of a packet record.
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }
}

fn read_u8(content: &[u8], offset: Option<usize>) -> Option<u8> {
    content.get(offset?).copied()
}

fn read_u16(content: &[u8], offset: Option<usize>) -> Option<u16> {
    let offset = offset?;
    content.get(offset..offset + 2).map(LittleEndian::read_u16)
}

fn read_u32(content: &[u8], offset: Option<usize>) -> Option<u32> {
    let offset = offset?;
    content.get(offset..offset + 4).map(LittleEndian::read_u32)
}

fn read_u64(content: &[u8], offset: Option<usize>) -> Option<u64> {
    let offset = offset?;
    content.get(offset..offset + 8).map(LittleEndian::read_u64)
}

/// Decode the record starting at `offset` of a contiguous buffer.
///
/// Returns the record and the number of bytes it occupies. The buffer must
/// hold the whole record; page reassembly is the caller's job. Position
/// fields (`file_offset`, `page_index`, `page_offset`) and timestamps that
/// depend on the running clock are left for the caller to fill.
pub fn decode_record(
    page: &[u8],
    offset: usize,
    version: FormatVersion,
) -> Result<(TraceRecord, usize)> {
    let mut cursor = ByteCursor::with_offset(page, offset)?;
    let header = decode_header_with(&mut cursor, version.header_encoding())?;
    let size = header.total_len().unwrap_or(header.header_len);
    let content = cursor.read_bytes(size - header.header_len)?;

    let kind = classify(version, header.tag);
    let mut record = TraceRecord::new(kind, header.tag, size, header.header_len);

    match kind {
        RecordKind::AbsTime => {
            // 1.0: u32 relative ms, u32 seconds; 2.0/3.0: u16 relative ms, u32 seconds
            let (millis, secs) = match version {
                FormatVersion::V10 => (read_u32(content, Some(0)), read_u32(content, Some(4))),
                _ => (
                    read_u16(content, Some(0)).map(u32::from),
                    read_u32(content, Some(2)),
                ),
            };
            if let (Some(millis), Some(secs)) = (millis, secs) {
                record.clock = Some(ClockUpdate::Absolute { secs, millis });
            }
        }
        RecordKind::RelTime => {
            record.clock =
                read_u32(content, Some(0)).map(|millis| ClockUpdate::Relative { millis });
        }
        RecordKind::RelTimeHr => {
            record.clock =
                read_u32(content, Some(0)).map(|micros| ClockUpdate::RelativeHr { micros });
        }
        RecordKind::SystemStart => {
            record.timestamp_ns =
                read_u32(content, Some(2)).map(|secs| u64::from(secs) * 1_000_000_000);
        }
        RecordKind::Packet { .. } => {
            if let Some(layout) = kind.layout() {
                record.dev_no = read_u8(content, layout.dev_no);
                record.rel_time_us = read_u32(content, layout.rel_time_hr);
                record.timestamp_ns = read_u64(content, layout.abs_time_hr);
                record.pcb_dev_no = read_u32(content, layout.pcb_dev_no);
                record.l_pcb_dev_no = read_u32(content, layout.l_pcb_dev_no);
                record.data = content.get(layout.data..).unwrap_or(&[]).to_vec();
                record.orig_len = match layout.orig_len {
                    Some(_) => read_u16(content, layout.orig_len).map(usize::from),
                    None => Some(record.data.len()),
                };
            }
            return Ok((record, size));
        }
        RecordKind::Signature => {
            let text_offset = match version {
                FormatVersion::V10 => SIGNATURE_TEXT_OFFSET_V10,
                _ => 0,
            };
            record.data = content.get(text_offset..).unwrap_or(&[]).to_vec();
            return Ok((record, size));
        }
        RecordKind::Unused | RecordKind::Unknown => {}
    }
    record.data = content.to_vec();
    Ok((record, size))
}

/// Detect the trace version from the first page.
pub fn detect_version(first_page: &[u8]) -> Result<FormatVersion> {
    if first_page.len() >= 4 && LittleEndian::read_u16(first_page) == SIGNATURE_V10 {
        if let Ok((record, _)) = decode_record(first_page, 0, FormatVersion::V10) {
            if signature_matches(&record, FormatVersion::V10) {
                return Ok(FormatVersion::V10);
            }
        }
    }

    if first_page.first() == Some(&SIGNATURE_V20) {
        for version in [FormatVersion::V20, FormatVersion::V30] {
            if let Ok((record, _)) = decode_record(first_page, 0, version) {
                if signature_matches(&record, version) {
                    return Ok(version);
                }
            }
        }
    }

    Err(CodecError::parse(
        "NetScaler",
        "first page does not start with a trace signature record",
    ))
}

fn signature_matches(record: &TraceRecord, version: FormatVersion) -> bool {
    record.kind == RecordKind::Signature
        && record.data.starts_with(version.signature_text().as_bytes())
}
