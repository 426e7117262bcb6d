// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Wirecodec
//!
//! Bounds-checked decoding of self-describing binary records.
//!
//! The library decodes BER-encoded data against a pluggable schema table into
//! a tree of named, typed nodes, and reads fixed-layout NetScaler packet traces
//! page by page:
//! - **BER decoding** in [`encoding::ber`], driven by an explicit frame stack
//! - **Schema tables** in [`schema`], loaded from a compiled binary table or JSON
//! - **NetScaler traces** in [`io::formats::netscaler`]
//!
//! ## Architecture
//!
//! - `core/` - Errors, diagnostics, configuration and the decoded output tree
//! - `encoding/` - Byte cursor, record header codec and BER decoder/writer
//! - `schema/` - Schema node model and the compiled type table
//! - `io/` - Memory-mapped input and page-oriented trace formats
//!
//! Malformed input never panics. Truncated input aborts a decode with a
//! [`DecodeFailure`] carrying the partial tree; every other anomaly is recorded
//! in [`Diagnostics`] and decoding continues.
//!
//! ## Example: Decoding a record
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wirecodec::encoding::BerDecoder;
//! use wirecodec::schema::{SchemaNode, SchemaTable};
//!
//! let table = SchemaTable::from_types(vec![SchemaNode::sequence(
//!     "Point",
//!     vec![SchemaNode::integer("x"), SchemaNode::integer("y")],
//! )])?;
//!
//! let data = [0x30, 0x06, 0x02, 0x01, 0x03, 0x02, 0x01, 0x04];
//! let outcome = BerDecoder::new(&table).decode(&data, "Point")?;
//! assert_eq!(outcome.root.find_path("y").and_then(|n| n.value.as_i64()), Some(4));
//! assert!(outcome.is_clean());
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    Anomaly, AnomalyKind, CodecError, DecodeFailure, DecodedNode, DecodedValue, DecoderConfig,
    Diagnostics, DiagnosticsSink, LengthClamps, NodeVisitor, Result,
};

// Cursor, headers and BER
pub mod encoding;

pub use encoding::{BerDecoder, BerWriter, ByteCursor, DecodeOutcome, Header, Tag, TagClass};

// Schema model and type tables
pub mod schema;

pub use schema::{load_schema, SchemaFormat, SchemaKind, SchemaNode, SchemaTable};

// File access and trace formats
pub mod io;

pub use io::formats::netscaler::{FormatVersion, TraceReader, TraceRecord};
pub use io::MmapArena;
