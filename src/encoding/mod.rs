// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Wire encodings.
//!
//! - [`cursor`] - Bounds-checked byte cursor
//! - [`header`] - Record header codec (BER and fixed trace layouts)
//! - [`ber`] - BER value decoding and encoding

pub mod ber;
pub mod cursor;
pub mod header;

pub use ber::{BerDecoder, BerWriter, DecodeOutcome};
pub use cursor::ByteCursor;
pub use header::{decode_header, decode_header_with, Header, HeaderEncoding, Tag, TagClass};
