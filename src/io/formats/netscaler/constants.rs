// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! NetScaler trace format constants.
//!
//! Record type codes, signature texts and fixed sizes for the three trace
//! generations. Version 1.0 records use a 4-byte little-endian header
//! (u16 type, u16 size); version 2.0 and 3.0 records use a 1-byte type and a
//! 1- or 2-byte size.

/// Signature text of a version 1.0 trace.
pub const SIGNATURE_TEXT_V10: &str = "NetScaler Performance Data";
/// Signature text of a version 2.0 trace.
pub const SIGNATURE_TEXT_V20: &str = "NetScaler V20 Performance Data";
/// Signature text of a version 3.0 trace.
pub const SIGNATURE_TEXT_V30: &str = "NetScaler V30 Performance Data";

/// Bytes reserved for the signature text in a version 1.0 signature record.
pub const SIGNATURE_SIZE_V10: usize = 56;
/// Bytes between the header and the signature text of a version 1.0 signature
/// record (endian type and two reserved words).
pub const SIGNATURE_TEXT_OFFSET_V10: usize = 12;

// Version 1.0 record types

/// Signature record.
pub const SIGNATURE_V10: u16 = 0x0101;
/// Absolute time record.
pub const ABSTIME_V10: u16 = 0x0107;
/// Relative time record.
pub const RELTIME_V10: u16 = 0x0108;
/// Full transmitted packet.
pub const FULLTX_V10: u16 = 0x0310;
/// Full transmitted packet, buffered.
pub const FULLTXB_V10: u16 = 0x0311;
/// Full received packet.
pub const FULLRX_V10: u16 = 0x0312;
/// Partial transmitted packet.
pub const PARTTX_V10: u16 = 0x0314;
/// Partial transmitted packet, buffered.
pub const PARTTXB_V10: u16 = 0x0315;
/// Partial received packet.
pub const PARTRX_V10: u16 = 0x0316;
/// Unused space up to the end of the page.
pub const UNUSED_V10: u16 = 0x0000;

// Version 2.0 and 3.0 record types

/// Signature record.
pub const SIGNATURE_V20: u8 = 0x01;
/// Absolute time record.
pub const ABSTIME_V20: u8 = 0x07;
/// Relative time record.
pub const RELTIME_V20: u8 = 0x08;
/// High resolution relative time record.
pub const RELTIMEHR_V20: u8 = 0x09;
/// System start time record.
pub const SYSTARTIME_V20: u8 = 0x0A;
/// Unused space up to the end of the page.
pub const UNUSED_V20: u8 = 0x00;

/// First packet record type of the 2.0 layout.
pub const PKTRACE_BASE_V20: u8 = 0xC0;
/// First packet record type of the 2.1 layout.
pub const PKTRACE_BASE_V21: u8 = 0xD0;
/// First packet record type of the 2.2 layout.
pub const PKTRACE_BASE_V22: u8 = 0xE0;
/// First packet record type of the 2.3 layout.
pub const PKTRACE_BASE_V23: u8 = 0xF0;
/// First packet record type of the 3.0 layout.
pub const PKTRACE_BASE_V30: u8 = 0xA0;

/// Packet record types per 2.x layout, as offsets from the layout base.
pub mod packet {
    /// Full transmitted packet.
    pub const FULLTX: u8 = 0;
    /// Full transmitted packet, buffered.
    pub const FULLTXB: u8 = 1;
    /// Full received packet.
    pub const FULLRX: u8 = 2;
    /// Partial transmitted packet.
    pub const PARTTX: u8 = 3;
    /// Partial transmitted packet, buffered.
    pub const PARTTXB: u8 = 4;
    /// Partial received packet.
    pub const PARTRX: u8 = 5;
    /// Full received packet, new receive path.
    pub const FULLNEWRX: u8 = 6;
    /// Partial received packet, new receive path.
    pub const PARTNEWRX: u8 = 7;
}

/// Packet record types of the 3.0 layout, as offsets from its base.
pub mod packet_v30 {
    /// Full transmitted packet.
    pub const FULLTX: u8 = 0;
    /// Full transmitted packet, buffered.
    pub const FULLTXB: u8 = 1;
    /// Full received packet.
    pub const FULLRX: u8 = 2;
    /// Full received packet, new receive path.
    pub const FULLNEWRX: u8 = 3;
}
