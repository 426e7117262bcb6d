// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for wirecodec.
//!
//! Two tiers of failure exist in this crate:
//! - [`CodecError`] is fatal for the call that produced it (truncated input,
//!   malformed schema tables, bad seek targets, configuration problems).
//! - Recoverable parse anomalies never surface here; they are collected in
//!   [`Diagnostics`](crate::core::diagnostics::Diagnostics) and decoding continues.
//!
//! [`DecodeFailure`] is what a top-level decode returns when a fatal error cuts a
//! decode short: the error plus everything that was recovered before it.

use std::fmt;

use super::diagnostics::Diagnostics;
use super::value::DecodedNode;

/// Errors that abort a decode, schema load or trace read.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Not enough bytes remain to satisfy a read
    TruncatedInput {
        /// Requested bytes
        requested: usize,
        /// Bytes that were available
        available: usize,
        /// Cursor position when the read was attempted
        offset: usize,
    },

    /// Seek target lies outside the buffer
    InvalidOffset {
        /// Requested position
        target: usize,
        /// Buffer length
        buffer_len: usize,
    },

    /// Malformed schema table
    SchemaLoad {
        /// What was being loaded
        context: String,
        /// Error message
        message: String,
    },

    /// Named type not present in the schema table
    TypeNotFound {
        /// Type name or id that was not found
        type_name: String,
    },

    /// Parse error in structured (non-recoverable) input such as a trace signature
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Unsupported format or feature
    Unsupported {
        /// What is not supported
        feature: String,
    },

    /// Configuration could not be loaded
    Config {
        /// Error message
        message: String,
    },

    /// Other error
    Other(String),
}

impl CodecError {
    /// Create a truncated input error.
    pub fn truncated(requested: usize, available: usize, offset: usize) -> Self {
        CodecError::TruncatedInput {
            requested,
            available,
            offset,
        }
    }

    /// Create an invalid offset error.
    pub fn invalid_offset(target: usize, buffer_len: usize) -> Self {
        CodecError::InvalidOffset { target, buffer_len }
    }

    /// Create a schema load error.
    pub fn schema_load(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::SchemaLoad {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a "type not found" error.
    pub fn type_not_found(type_name: impl Into<String>) -> Self {
        CodecError::TypeNotFound {
            type_name: type_name.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        CodecError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Whether this error reports input that ended too early.
    pub fn is_truncation(&self) -> bool {
        matches!(self, CodecError::TruncatedInput { .. })
    }

    /// Byte offset the error refers to, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodecError::TruncatedInput { offset, .. } => Some(*offset),
            CodecError::InvalidOffset { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CodecError::TruncatedInput {
                requested,
                available,
                offset,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("offset", offset.to_string()),
            ],
            CodecError::InvalidOffset { target, buffer_len } => vec![
                ("target", target.to_string()),
                ("buffer_len", buffer_len.to_string()),
            ],
            CodecError::SchemaLoad { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            CodecError::TypeNotFound { type_name } => vec![("type", type_name.clone())],
            CodecError::ParseError { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            CodecError::Unsupported { feature } => vec![("feature", feature.clone())],
            CodecError::Config { message } => vec![("message", message.clone())],
            CodecError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TruncatedInput {
                requested,
                available,
                offset,
            } => write!(
                f,
                "Truncated input at offset {offset}: requested {requested} bytes, but only {available} bytes available"
            ),
            CodecError::InvalidOffset { target, buffer_len } => write!(
                f,
                "Invalid offset {target} (buffer length: {buffer_len})"
            ),
            CodecError::SchemaLoad { context, message } => {
                write!(f, "Schema load error in {context}: {message}")
            }
            CodecError::TypeNotFound { type_name } => {
                write!(f, "Type not found: '{type_name}'")
            }
            CodecError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            CodecError::Unsupported { feature } => {
                write!(f, "Unsupported feature: '{feature}'")
            }
            CodecError::Config { message } => write!(f, "Configuration error: {message}"),
            CodecError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Other(format!("IO error: {err}"))
    }
}

/// Result type for wirecodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// A top-level decode that was cut short by a fatal error.
///
/// Carries the partial tree built up to the failure point so that a caller can
/// still display what was recovered.
#[derive(Debug, Clone)]
pub struct DecodeFailure {
    /// The fatal error
    pub error: CodecError,
    /// Byte offset of the failed read
    pub offset: usize,
    /// Number of frames on the decode stack when the error occurred
    pub depth: usize,
    /// Tree recovered before the failure, if any node was started
    pub partial: Option<DecodedNode>,
    /// Anomalies recorded before the failure
    pub diagnostics: Diagnostics,
}

impl DecodeFailure {
    /// Whether the failure was caused by truncated input.
    pub fn is_truncated(&self) -> bool {
        self.error.is_truncation()
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decode aborted at offset {} (depth {}): {}",
            self.offset, self.depth, self.error
        )
    }
}

impl std::error::Error for DecodeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<DecodeFailure> for CodecError {
    fn from(failure: DecodeFailure) -> Self {
        failure.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_error() {
        let err = CodecError::truncated(50, 10, 2);
        assert!(err.is_truncation());
        assert_eq!(err.offset(), Some(2));
        assert_eq!(
            err.to_string(),
            "Truncated input at offset 2: requested 50 bytes, but only 10 bytes available"
        );
    }

    #[test]
    fn test_invalid_offset_error() {
        let err = CodecError::invalid_offset(100, 10);
        assert!(!err.is_truncation());
        assert_eq!(err.offset(), Some(100));
        assert_eq!(err.to_string(), "Invalid offset 100 (buffer length: 10)");
    }

    #[test]
    fn test_schema_load_error() {
        let err = CodecError::schema_load("SchemaTable::load", "unexpected tag");
        assert_eq!(
            err.to_string(),
            "Schema load error in SchemaTable::load: unexpected tag"
        );
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_log_fields_truncated() {
        let err = CodecError::truncated(100, 50, 10);
        let fields = err.log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], ("requested", "100".to_string()));
        assert_eq!(fields[1], ("available", "50".to_string()));
        assert_eq!(fields[2], ("offset", "10".to_string()));
    }

    #[test]
    fn test_log_fields_type_not_found() {
        let err = CodecError::type_not_found("Pdu");
        assert_eq!(err.log_fields(), vec![("type", "Pdu".to_string())]);
        assert_eq!(err.to_string(), "Type not found: 'Pdu'");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CodecError = io_err.into();
        assert_eq!(err.to_string(), "Other error: IO error: file not found");
    }

    #[test]
    fn test_decode_failure_display() {
        let failure = DecodeFailure {
            error: CodecError::truncated(50, 10, 2),
            offset: 2,
            depth: 1,
            partial: None,
            diagnostics: Diagnostics::new(),
        };
        assert!(failure.is_truncated());
        assert!(failure.to_string().starts_with("decode aborted at offset 2 (depth 1)"));
        let err: CodecError = failure.into();
        assert!(err.is_truncation());
    }
}
