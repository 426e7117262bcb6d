// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Page-oriented NetScaler trace reader.
//!
//! The trace is read one fixed-size page at a time. A record whose declared
//! size crosses the end of its page is reassembled in a scratch buffer from
//! the tail of that page and the head of the following page(s). Every record
//! reports both its absolute file offset and its page-relative position.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wirecodec::io::formats::netscaler::TraceReader;
//! use wirecodec::DecoderConfig;
//!
//! let file = std::fs::File::open("trace.cap")?;
//! let mut reader = TraceReader::new(file, &DecoderConfig::default())?;
//! for record in reader.by_ref() {
//!     let record = record?;
//!     println!("{} @ {}", record.kind.label(), record.file_offset);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;

use super::clock::RunningClock;
use super::layout::{FormatVersion, RecordKind};
use super::record::{decode_record, detect_version, ClockUpdate, TraceRecord};
use crate::core::{AnomalyKind, DecoderConfig, Diagnostics};
use crate::encoding::cursor::ByteCursor;
use crate::encoding::header::{decode_header_with, Header};
use crate::{CodecError, Result};

/// Position and clock state of one packet record, for random access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub file_offset: u64,
    pub page_index: u64,
    pub page_offset: usize,
    pub record_type: u32,
    /// Clock state in effect for the record
    pub clock: RunningClock,
}

/// Sequential and indexed reader over a NetScaler trace.
pub struct TraceReader<R> {
    source: R,
    version: FormatVersion,
    page_size: usize,
    /// Valid bytes of the current page
    page: Vec<u8>,
    page_index: u64,
    page_offset: usize,
    scratch: Vec<u8>,
    clock: RunningClock,
    diagnostics: Diagnostics,
    failed: bool,
}

impl<R: Read + Seek> TraceReader<R> {
    /// Open a trace, detecting its version from the first page.
    pub fn new(source: R, config: &DecoderConfig) -> Result<Self> {
        let page_size = config.page_size as usize;
        let mut reader = Self {
            source,
            version: FormatVersion::V20,
            page_size,
            page: Vec::with_capacity(page_size),
            page_index: 0,
            page_offset: 0,
            scratch: Vec::new(),
            clock: RunningClock::new(),
            diagnostics: Diagnostics::new(),
            failed: false,
        };
        reader.load_page(0)?;
        reader.version = detect_version(&reader.page)?;
        tracing::debug!(
            context = "netscaler",
            version = reader.version.as_str(),
            page_size,
            "opened trace"
        );
        Ok(reader)
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Clock state after the records read so far.
    pub fn clock(&self) -> RunningClock {
        self.clock
    }

    /// Anomalies recorded so far.
    ///
    /// Every unknown, short or misplaced record adds one entry for the life of
    /// the reader. Callers streaming a long trace should drain them
    /// periodically with [`take_diagnostics`](Self::take_diagnostics).
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Take the recorded anomalies, leaving an empty set.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Return to the first record with a fresh clock.
    pub fn rewind(&mut self) -> Result<()> {
        self.load_page(0)?;
        self.clock = RunningClock::new();
        self.failed = false;
        Ok(())
    }

    /// Replay the whole trace once and record where each packet record lives
    /// together with the clock state it needs.
    ///
    /// The reader is rewound before and after the scan.
    pub fn build_index(&mut self) -> Result<Vec<IndexEntry>> {
        self.rewind()?;
        let mut index = Vec::new();
        while let Some(record) = self.next_record()? {
            if record.kind.is_packet() {
                index.push(IndexEntry {
                    file_offset: record.file_offset,
                    page_index: record.page_index,
                    page_offset: record.page_offset,
                    record_type: record.record_type,
                    clock: self.clock,
                });
            }
        }
        self.rewind()?;
        tracing::debug!(context = "netscaler", packets = index.len(), "built trace index");
        Ok(index)
    }

    /// Decode the record an index entry points at, without replaying earlier
    /// records. Sequential reading continues after that record.
    pub fn record_at(&mut self, entry: &IndexEntry) -> Result<TraceRecord> {
        self.load_page(entry.page_index)?;
        if entry.page_offset >= self.page.len() {
            return Err(CodecError::invalid_offset(
                entry.page_offset,
                self.page.len(),
            ));
        }
        self.page_offset = entry.page_offset;
        self.clock = entry.clock;
        self.failed = false;
        self.next_record()?
            .ok_or_else(|| CodecError::parse("NetScaler", "index entry points past the trace"))
    }

    /// Read the next record, or `None` at the end of the trace.
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>> {
        loop {
            if self.page.is_empty() {
                return Ok(None);
            }
            let rest = self.page.len() - self.page_offset;
            if rest == 0 || self.is_unused_tail() {
                self.load_page(self.page_index + 1)?;
                continue;
            }

            let page_index = self.page_index;
            let page_offset = self.page_offset;
            let file_offset = page_index * self.page_size as u64 + page_offset as u64;

            let header = peek_header(&self.page[page_offset..], self.version);
            let (mut record, consumed) = match header {
                Some(header) if total_len(&header) <= rest => {
                    let (record, consumed) =
                        decode_record(&self.page, page_offset, self.version)?;
                    self.page_offset += consumed;
                    (record, consumed)
                }
                _ => {
                    self.reassemble(header, file_offset)?;
                    decode_record(&self.scratch, 0, self.version)?
                }
            };

            record.file_offset = file_offset;
            record.page_index = page_index;
            record.page_offset = page_offset;
            self.apply_clock(&mut record);
            self.check(&record, consumed);
            return Ok(Some(record));
        }
    }

    /// Whether the rest of the current page is marked unused.
    fn is_unused_tail(&self) -> bool {
        let rest = &self.page[self.page_offset..];
        match self.version {
            FormatVersion::V10 => rest.iter().take(2).all(|b| *b == 0),
            FormatVersion::V20 | FormatVersion::V30 => rest[0] == 0,
        }
    }

    /// Copy a page-spanning record into the scratch buffer.
    ///
    /// Leaves the read position just after the record in the last page it
    /// touches.
    fn reassemble(&mut self, header: Option<Header>, file_offset: u64) -> Result<()> {
        self.scratch.clear();
        self.scratch
            .extend_from_slice(&self.page[self.page_offset..]);
        self.page_offset = self.page.len();

        let header = match header {
            Some(header) => header,
            None => loop {
                if let Some(header) = peek_header(&self.scratch, self.version) {
                    break header;
                }
                let want = self.scratch.len() + 1;
                self.pull(want, file_offset)?;
            },
        };
        let size = total_len(&header);
        self.pull(size, file_offset)?;
        tracing::debug!(
            context = "netscaler",
            file_offset,
            size,
            next_page = self.page_index,
            "reassembled page-spanning record"
        );
        Ok(())
    }

    /// Append bytes from the following pages until the scratch buffer holds `target` bytes.
    fn pull(&mut self, target: usize, file_offset: u64) -> Result<()> {
        while self.scratch.len() < target {
            if self.page_offset >= self.page.len() {
                self.load_page(self.page_index + 1)?;
                if self.page.is_empty() {
                    return Err(CodecError::truncated(
                        target,
                        self.scratch.len(),
                        file_offset as usize,
                    ));
                }
            }
            let take = (target - self.scratch.len()).min(self.page.len() - self.page_offset);
            let start = self.page_offset;
            self.scratch
                .extend_from_slice(&self.page[start..start + take]);
            self.page_offset += take;
        }
        Ok(())
    }

    fn apply_clock(&mut self, record: &mut TraceRecord) {
        match record.clock {
            Some(ClockUpdate::Absolute { secs, millis }) => self.clock.set_absolute(secs, millis),
            Some(ClockUpdate::Relative { millis }) => self.clock.advance_millis(millis),
            Some(ClockUpdate::RelativeHr { micros }) => self.clock.advance_millis(micros / 1000),
            None => {}
        }
        if record.kind.is_time() {
            record.timestamp_ns = Some(self.clock.now_ns());
        } else if record.timestamp_ns.is_none() {
            record.timestamp_ns = record.rel_time_us.map(|us| self.clock.packet_time_ns(us));
        }
    }

    fn check(&mut self, record: &TraceRecord, consumed: usize) {
        let offset = record.file_offset as usize;
        if record.kind == RecordKind::Unknown {
            self.diagnostics.record(
                AnomalyKind::UnknownRecord,
                offset,
                0,
                format!("record type {:#x}", record.record_type),
            );
        } else if record.is_short() || (record.kind.is_time() && record.clock.is_none()) {
            self.diagnostics.record(
                AnomalyKind::MalformedValue,
                offset,
                0,
                format!("{} record of {consumed} bytes is too short", record.kind.label()),
            );
        }
    }

    /// Load page `index`; an empty page means the end of the trace.
    fn load_page(&mut self, index: u64) -> Result<()> {
        self.page.clear();
        self.page.resize(self.page_size, 0);
        self.source
            .seek(SeekFrom::Start(index * self.page_size as u64))?;
        let mut filled = 0;
        while filled < self.page_size {
            let n = self.source.read(&mut self.page[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.page.truncate(filled);
        self.page_index = index;
        self.page_offset = 0;
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                tracing::warn!(context = "netscaler", error = %e, "trace read aborted");
                Some(Err(e))
            }
        }
    }
}

/// Decode a record header from the start of `bytes`, if enough bytes are present.
fn peek_header(bytes: &[u8], version: FormatVersion) -> Option<Header> {
    decode_header_with(&mut ByteCursor::new(bytes), version.header_encoding()).ok()
}

/// Total record size; a record never occupies less than its header.
fn total_len(header: &Header) -> usize {
    header.total_len().unwrap_or(header.header_len)
}
