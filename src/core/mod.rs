// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout wirecodec.
//!
//! This module provides the foundational types for the library:
//! - [`CodecError`] - Fatal error handling
//! - [`Diagnostics`] - Recoverable anomaly accounting
//! - [`DecodedNode`] - Decoded output tree
//! - [`DecoderConfig`] - Decoder and trace reader options

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod value;

pub use config::{ConfigError, DecoderConfig, LengthClamps};
pub use diagnostics::{
    Anomaly, AnomalyKind, CollectingSink, Diagnostics, DiagnosticsSink, TracingSink,
};
pub use error::{CodecError, DecodeFailure, Result};
pub use value::{DecodedNode, DecodedValue, NodeVisitor};
