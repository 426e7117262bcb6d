// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BER (Basic Encoding Rules) support.
//!
//! - [`decoder`] - Schema-driven and untyped decoding with an explicit stack
//! - [`primitive`] - Content-octet decoders for primitive types
//! - [`writer`] - Encoder used to build schema tables and test vectors

pub mod decoder;
mod frame;
pub mod primitive;
pub mod writer;

pub use decoder::{BerDecoder, DecodeOutcome, Records, UNKNOWN_NAME};
pub use frame::FrameMode;
pub use primitive::{Malformed, ValueResult};
pub use writer::{encode_integer, encode_oid, BerWriter};
