// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoder configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! max_reference_depth = 1
//! page_size = 8192
//!
//! [length_clamps]
//! boolean = 1
//! integer = 8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::CodecError;

/// Default bound on consecutive type-reference resolutions for one field.
pub const DEFAULT_MAX_REFERENCE_DEPTH: u32 = 1;
/// Default bound on nested choice alternatives explored for one tag match.
pub const DEFAULT_MAX_CHOICE_FANOUT_RECURSION: u32 = 8;
/// Default bound on constructed nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: u32 = 64;
/// Default trace page size.
pub const DEFAULT_PAGE_SIZE: u32 = 8192;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// TOML syntax or type error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Value out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl From<ConfigError> for CodecError {
    fn from(err: ConfigError) -> Self {
        CodecError::Config {
            message: err.to_string(),
        }
    }
}

/// Maximum plausible content length per primitive kind.
///
/// A declared length above the clamp is treated as corrupt: the decoder reads
/// only the clamped number of bytes and records a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthClamps {
    pub boolean: usize,
    pub integer: usize,
    pub enumerated: usize,
    pub null: usize,
    pub real: usize,
    pub object_id: usize,
    pub bit_string: usize,
    pub octet_string: usize,
    pub char_string: usize,
    /// SEQUENCE, SET and their repeated forms
    pub constructed: usize,
}

impl Default for LengthClamps {
    fn default() -> Self {
        Self {
            boolean: 1,
            integer: 8,
            enumerated: 8,
            null: 0,
            real: 64,
            object_id: 128,
            bit_string: 65536,
            octet_string: 65536,
            char_string: 65536,
            constructed: 65536,
        }
    }
}

/// Options recognized by the decoder and the trace reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Consecutive type references resolved for one field before giving up
    pub max_reference_depth: u32,
    /// Nested choices explored while matching one tag
    pub max_choice_fanout_recursion: u32,
    /// Constructed values nested deeper than this become opaque
    pub max_nesting_depth: u32,
    /// Per-kind length sanity clamps
    pub length_clamps: LengthClamps,
    /// Trace page size in bytes
    pub page_size: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            max_choice_fanout_recursion: DEFAULT_MAX_CHOICE_FANOUT_RECURSION,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            length_clamps: LengthClamps::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DecoderConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DecoderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid {
            field: "config",
            reason: e.to_string(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size < 64 {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: format!("{} is smaller than the 64-byte minimum", self.page_size),
            });
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_nesting_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_reference_depth, 1);
        assert_eq!(config.max_choice_fanout_recursion, 8);
        assert_eq!(config.page_size, 8192);
        assert_eq!(config.length_clamps.boolean, 1);
        assert_eq!(config.length_clamps.constructed, 65536);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            DecoderConfig::from_toml_str("").unwrap(),
            DecoderConfig::default()
        );
    }

    #[test]
    fn test_partial_toml() {
        let config = DecoderConfig::from_toml_str(
            "max_reference_depth = 3\n[length_clamps]\ninteger = 4\n",
        )
        .unwrap();
        assert_eq!(config.max_reference_depth, 3);
        assert_eq!(config.length_clamps.integer, 4);
        assert_eq!(config.length_clamps.boolean, 1);
        assert_eq!(config.page_size, 8192);
    }

    #[test]
    fn test_invalid_page_size() {
        let err = DecoderConfig::from_toml_str("page_size = 8").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "page_size", .. }));
        let codec: CodecError = err.into();
        assert!(codec.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_syntax_error() {
        let err = DecoderConfig::from_toml_str("page_size = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DecoderConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(DecoderConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DecoderConfig::load("/nonexistent/wirecodec.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
