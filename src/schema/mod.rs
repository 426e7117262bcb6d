// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema model for schema-driven BER decoding.
//!
//! - [`ast`] - Schema node tree and builder API
//! - [`table`] - Compiled type table: binary load/store, JSON source, lookups

pub mod ast;
pub mod table;

pub use ast::{SchemaKind, SchemaNode, TagMode};
pub use table::{SchemaTable, TypeDef};

/// Schema source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// Compiled binary table
    Binary,
    /// JSON type list
    Json,
}

impl SchemaFormat {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bin" | "binary" | "tt" => Some(SchemaFormat::Binary),
            "json" => Some(SchemaFormat::Json),
            _ => None,
        }
    }

    /// Guess the format from a file name extension; binary unless it ends in `.json`.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SchemaFormat::Json,
            _ => SchemaFormat::Binary,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Binary => "binary",
            SchemaFormat::Json => "json",
        }
    }
}

/// Load a schema table from bytes in the given format.
pub fn load_schema(bytes: &[u8], format: SchemaFormat) -> crate::Result<SchemaTable> {
    match format {
        SchemaFormat::Binary => SchemaTable::load(bytes),
        SchemaFormat::Json => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                crate::CodecError::schema_load("JSON schema source", e.to_string())
            })?;
            SchemaTable::from_json_str(text)
        }
    }
}
