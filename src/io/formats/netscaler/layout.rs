// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format versions, record classification and packet field layouts.
//!
//! Packet records are C-struct shaped. Instead of one decode routine per
//! layout revision, each revision is described by a [`RecordLayout`] of field
//! offsets and a single routine reads whichever fields the layout has.

use serde::Serialize;

use super::constants::*;
use crate::encoding::header::HeaderEncoding;

/// Trace file generation, detected from the signature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatVersion {
    V10,
    V20,
    V30,
}

impl FormatVersion {
    /// Header encoding used by every record of this version.
    pub fn header_encoding(self) -> HeaderEncoding {
        match self {
            FormatVersion::V10 => HeaderEncoding::Fixed32,
            FormatVersion::V20 | FormatVersion::V30 => HeaderEncoding::Variable,
        }
    }

    /// Signature text identifying this version.
    pub fn signature_text(self) -> &'static str {
        match self {
            FormatVersion::V10 => SIGNATURE_TEXT_V10,
            FormatVersion::V20 => SIGNATURE_TEXT_V20,
            FormatVersion::V30 => SIGNATURE_TEXT_V30,
        }
    }

    /// Smallest possible record header.
    pub fn min_header_len(self) -> usize {
        match self {
            FormatVersion::V10 => 4,
            FormatVersion::V20 | FormatVersion::V30 => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatVersion::V10 => "1.0",
            FormatVersion::V20 => "2.0",
            FormatVersion::V30 => "3.0",
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetScaler {}", self.as_str())
    }
}

/// Packet direction and capture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Tx,
    TxBuffered,
    Rx,
    NewRx,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Tx => "TX",
            Direction::TxBuffered => "TXB",
            Direction::Rx => "RX",
            Direction::NewRx => "NEWRX",
        }
    }
}

/// Packet record layout revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayoutRevision {
    V10,
    V20,
    V21,
    V22,
    V23,
    V30,
}

impl LayoutRevision {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutRevision::V10 => "1.0",
            LayoutRevision::V20 => "2.0",
            LayoutRevision::V21 => "2.1",
            LayoutRevision::V22 => "2.2",
            LayoutRevision::V23 => "2.3",
            LayoutRevision::V30 => "3.0",
        }
    }
}

/// Field offsets of a packet record, relative to the end of the record header.
///
/// Integer fields are little-endian. `rel_time_hr` counts microseconds since
/// the running clock's current second; `abs_time_hr` is nanoseconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordLayout {
    pub revision: LayoutRevision,
    pub partial: bool,
    /// Network device number (u8)
    pub dev_no: Option<usize>,
    /// High resolution relative time (u32)
    pub rel_time_hr: Option<usize>,
    /// High resolution absolute time (u64)
    pub abs_time_hr: Option<usize>,
    /// Original packet length (u16)
    pub orig_len: Option<usize>,
    /// Protocol control block device number (u32)
    pub pcb_dev_no: Option<usize>,
    /// Linked protocol control block device number (u32)
    pub l_pcb_dev_no: Option<usize>,
    /// Start of the captured packet bytes
    pub data: usize,
}

const fn layout(
    revision: LayoutRevision,
    partial: bool,
    offsets: [Option<usize>; 6],
    data: usize,
) -> RecordLayout {
    RecordLayout {
        revision,
        partial,
        dev_no: offsets[0],
        rel_time_hr: offsets[1],
        abs_time_hr: offsets[2],
        orig_len: offsets[3],
        pcb_dev_no: offsets[4],
        l_pcb_dev_no: offsets[5],
        data,
    }
}

/// Packet field offsets, relative to the end of the record header.
#[rustfmt::skip]
mod table {
    use super::{layout, LayoutRevision, RecordLayout};

    // [dev_no, rel_time_hr, abs_time_hr, orig_len, pcb_dev_no, l_pcb_dev_no], data
    pub(super) const FULL_V10: RecordLayout = layout(LayoutRevision::V10, false, [None, Some(0), None, None, None, None], 4);
    pub(super) const PART_V10: RecordLayout = layout(LayoutRevision::V10, true, [None, Some(0), None, Some(4), None, None], 8);
    pub(super) const FULL_V20: RecordLayout = layout(LayoutRevision::V20, false, [Some(0), Some(1), None, None, None, None], 5);
    pub(super) const PART_V20: RecordLayout = layout(LayoutRevision::V20, true, [Some(0), Some(1), None, Some(5), None, None], 9);
    pub(super) const FULL_V21: RecordLayout = layout(LayoutRevision::V21, false, [Some(0), Some(1), None, None, Some(5), None], 9);
    pub(super) const PART_V21: RecordLayout = layout(LayoutRevision::V21, true, [Some(0), Some(1), None, Some(5), Some(9), None], 13);
    pub(super) const FULL_V22: RecordLayout = layout(LayoutRevision::V22, false, [Some(0), Some(1), None, None, Some(5), Some(9)], 13);
    pub(super) const PART_V22: RecordLayout = layout(LayoutRevision::V22, true, [Some(0), Some(1), None, Some(5), Some(9), Some(13)], 17);
    pub(super) const FULL_V23: RecordLayout = layout(LayoutRevision::V23, false, [Some(0), None, Some(1), None, Some(9), Some(13)], 17);
    pub(super) const PART_V23: RecordLayout = layout(LayoutRevision::V23, true, [Some(0), None, Some(1), Some(9), Some(13), Some(17)], 21);
    pub(super) const FULL_V30: RecordLayout = layout(LayoutRevision::V30, false, [Some(0), None, Some(1), Some(17), Some(9), Some(13)], 19);
}

impl RecordLayout {
    /// Layout of a revision's full or partial packet record.
    pub fn of(revision: LayoutRevision, partial: bool) -> &'static RecordLayout {
        match (revision, partial) {
            (LayoutRevision::V10, false) => &table::FULL_V10,
            (LayoutRevision::V10, true) => &table::PART_V10,
            (LayoutRevision::V20, false) => &table::FULL_V20,
            (LayoutRevision::V20, true) => &table::PART_V20,
            (LayoutRevision::V21, false) => &table::FULL_V21,
            (LayoutRevision::V21, true) => &table::PART_V21,
            (LayoutRevision::V22, false) => &table::FULL_V22,
            (LayoutRevision::V22, true) => &table::PART_V22,
            (LayoutRevision::V23, false) => &table::FULL_V23,
            (LayoutRevision::V23, true) => &table::PART_V23,
            // 3.0 records carry the original length and are never "partial" by type.
            (LayoutRevision::V30, _) => &table::FULL_V30,
        }
    }
}

/// What a record type denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    Signature,
    AbsTime,
    RelTime,
    RelTimeHr,
    SystemStart,
    Packet {
        direction: Direction,
        revision: LayoutRevision,
        partial: bool,
    },
    Unused,
    Unknown,
}

impl RecordKind {
    /// Field layout of a packet record.
    pub fn layout(&self) -> Option<&'static RecordLayout> {
        match *self {
            RecordKind::Packet {
                revision, partial, ..
            } => Some(RecordLayout::of(revision, partial)),
            _ => None,
        }
    }

    pub fn is_packet(&self) -> bool {
        matches!(self, RecordKind::Packet { .. })
    }

    /// Whether records of this kind update the running clock.
    pub fn is_time(&self) -> bool {
        matches!(
            self,
            RecordKind::AbsTime | RecordKind::RelTime | RecordKind::RelTimeHr
        )
    }

    /// Short label for listings.
    pub fn label(&self) -> String {
        match self {
            RecordKind::Signature => "SIGNATURE".to_string(),
            RecordKind::AbsTime => "ABSTIME".to_string(),
            RecordKind::RelTime => "RELTIME".to_string(),
            RecordKind::RelTimeHr => "RELTIMEHR".to_string(),
            RecordKind::SystemStart => "SYSTARTIME".to_string(),
            RecordKind::Packet {
                direction,
                revision,
                partial,
            } => format!(
                "{}{} v{}",
                if *partial { "PART" } else { "FULL" },
                direction.as_str(),
                revision.as_str()
            ),
            RecordKind::Unused => "UNUSED".to_string(),
            RecordKind::Unknown => "UNKNOWN".to_string(),
        }
    }
}

fn packet(direction: Direction, revision: LayoutRevision, partial: bool) -> RecordKind {
    RecordKind::Packet {
        direction,
        revision,
        partial,
    }
}

/// Classify a record type for the given trace version.
pub fn classify(version: FormatVersion, record_type: u32) -> RecordKind {
    match version {
        FormatVersion::V10 => classify_v10(record_type),
        FormatVersion::V20 | FormatVersion::V30 => match u8::try_from(record_type) {
            Ok(record_type) => classify_v20(version, record_type),
            Err(_) => RecordKind::Unknown,
        },
    }
}

fn classify_v10(record_type: u32) -> RecordKind {
    let Ok(record_type) = u16::try_from(record_type) else {
        return RecordKind::Unknown;
    };
    let v10 = LayoutRevision::V10;
    match record_type {
        SIGNATURE_V10 => RecordKind::Signature,
        ABSTIME_V10 => RecordKind::AbsTime,
        RELTIME_V10 => RecordKind::RelTime,
        FULLTX_V10 => packet(Direction::Tx, v10, false),
        FULLTXB_V10 => packet(Direction::TxBuffered, v10, false),
        FULLRX_V10 => packet(Direction::Rx, v10, false),
        PARTTX_V10 => packet(Direction::Tx, v10, true),
        PARTTXB_V10 => packet(Direction::TxBuffered, v10, true),
        PARTRX_V10 => packet(Direction::Rx, v10, true),
        UNUSED_V10 => RecordKind::Unused,
        _ => RecordKind::Unknown,
    }
}

fn classify_v20(version: FormatVersion, record_type: u8) -> RecordKind {
    match record_type {
        SIGNATURE_V20 => return RecordKind::Signature,
        ABSTIME_V20 => return RecordKind::AbsTime,
        RELTIME_V20 => return RecordKind::RelTime,
        RELTIMEHR_V20 => return RecordKind::RelTimeHr,
        SYSTARTIME_V20 => return RecordKind::SystemStart,
        UNUSED_V20 => return RecordKind::Unused,
        _ => {}
    }

    if version == FormatVersion::V30 {
        let Some(code) = record_type.checked_sub(PKTRACE_BASE_V30) else {
            return RecordKind::Unknown;
        };
        let direction = match code {
            packet_v30::FULLTX => Direction::Tx,
            packet_v30::FULLTXB => Direction::TxBuffered,
            packet_v30::FULLRX => Direction::Rx,
            packet_v30::FULLNEWRX => Direction::NewRx,
            _ => return RecordKind::Unknown,
        };
        return packet(direction, LayoutRevision::V30, false);
    }

    let (base, revision) = match record_type & 0xF0 {
        PKTRACE_BASE_V20 => (PKTRACE_BASE_V20, LayoutRevision::V20),
        PKTRACE_BASE_V21 => (PKTRACE_BASE_V21, LayoutRevision::V21),
        PKTRACE_BASE_V22 => (PKTRACE_BASE_V22, LayoutRevision::V22),
        PKTRACE_BASE_V23 => (PKTRACE_BASE_V23, LayoutRevision::V23),
        _ => return RecordKind::Unknown,
    };
    let (direction, partial) = match record_type - base {
        packet::FULLTX => (Direction::Tx, false),
        packet::FULLTXB => (Direction::TxBuffered, false),
        packet::FULLRX => (Direction::Rx, false),
        packet::PARTTX => (Direction::Tx, true),
        packet::PARTTXB => (Direction::TxBuffered, true),
        packet::PARTRX => (Direction::Rx, true),
        packet::FULLNEWRX => (Direction::NewRx, false),
        packet::PARTNEWRX => (Direction::NewRx, true),
        _ => return RecordKind::Unknown,
    };
    packet(direction, revision, partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_v10() {
        assert_eq!(classify(FormatVersion::V10, 0x0107), RecordKind::AbsTime);
        assert_eq!(
            classify(FormatVersion::V10, 0x0315),
            packet(Direction::TxBuffered, LayoutRevision::V10, true)
        );
        assert_eq!(classify(FormatVersion::V10, 0), RecordKind::Unused);
        assert_eq!(classify(FormatVersion::V10, 0x0999), RecordKind::Unknown);
    }

    #[test]
    fn test_classify_v20_families() {
        assert_eq!(
            classify(FormatVersion::V20, 0xC2),
            packet(Direction::Rx, LayoutRevision::V20, false)
        );
        assert_eq!(
            classify(FormatVersion::V20, 0xD3),
            packet(Direction::Tx, LayoutRevision::V21, true)
        );
        assert_eq!(
            classify(FormatVersion::V20, 0xE6),
            packet(Direction::NewRx, LayoutRevision::V22, false)
        );
        assert_eq!(
            classify(FormatVersion::V20, 0xF7),
            packet(Direction::NewRx, LayoutRevision::V23, true)
        );
        assert_eq!(classify(FormatVersion::V20, 0xC8), RecordKind::Unknown);
        // 3.0 packet types are not valid in a 2.0 trace
        assert_eq!(classify(FormatVersion::V20, 0xA0), RecordKind::Unknown);
        assert_eq!(classify(FormatVersion::V20, 0x1234), RecordKind::Unknown);
    }

    #[test]
    fn test_classify_v30() {
        assert_eq!(
            classify(FormatVersion::V30, 0xA3),
            packet(Direction::NewRx, LayoutRevision::V30, false)
        );
        assert_eq!(classify(FormatVersion::V30, 0xA4), RecordKind::Unknown);
        assert_eq!(classify(FormatVersion::V30, 0xC0), RecordKind::Unknown);
        assert_eq!(classify(FormatVersion::V30, 0x08), RecordKind::RelTime);
    }

    #[test]
    fn test_layouts_have_data_after_fields() {
        for revision in [
            LayoutRevision::V10,
            LayoutRevision::V20,
            LayoutRevision::V21,
            LayoutRevision::V22,
            LayoutRevision::V23,
            LayoutRevision::V30,
        ] {
            for partial in [false, true] {
                let layout = RecordLayout::of(revision, partial);
                let widths = [
                    (layout.dev_no, 1),
                    (layout.rel_time_hr, 4),
                    (layout.abs_time_hr, 8),
                    (layout.orig_len, 2),
                    (layout.pcb_dev_no, 4),
                    (layout.l_pcb_dev_no, 4),
                ];
                for (offset, width) in widths {
                    if let Some(offset) = offset {
                        assert!(offset + width <= layout.data, "{revision:?} {partial}");
                    }
                }
                assert!(layout.rel_time_hr.is_some() != layout.abs_time_hr.is_some());
            }
        }
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(
            packet(Direction::Rx, LayoutRevision::V22, true).label(),
            "PARTRX v2.2"
        );
        assert_eq!(RecordKind::AbsTime.label(), "ABSTIME");
    }
}
