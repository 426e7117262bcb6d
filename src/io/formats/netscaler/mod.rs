// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NetScaler packet trace format.
//!
//! Traces are sequences of fixed-size pages holding C-struct shaped records.
//! This module provides:
//! - Version detection from the signature record ([`detect_version`])
//! - One field-offset table per packet layout revision ([`RecordLayout`])
//! - Single-record decoding ([`decode_record`])
//! - A page-oriented reader with page-spanning reassembly, a running clock and
//!   an index for random access ([`TraceReader`])

pub mod clock;
pub mod constants;
pub mod layout;
pub mod reader;
pub mod record;

pub use clock::RunningClock;
pub use layout::{classify, Direction, FormatVersion, LayoutRevision, RecordKind, RecordLayout};
pub use reader::{IndexEntry, TraceReader};
pub use record::{decode_record, detect_version, ClockUpdate, TraceRecord};
