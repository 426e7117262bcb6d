// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Compiled type table.
//!
//! The table is itself BER-encoded and is read with the same header codec the
//! data decoder uses. Layout (all lengths definite):
//!
//! ```text
//! [APPLICATION 0] {                      -- table
//!     [APPLICATION 1] {                  -- one per top-level type
//!         INTEGER id
//!         node
//!     } ...
//! }
//! node ::= [APPLICATION 2] {
//!     ENUMERATED kind
//!     UTF8String name
//!     INTEGER flags                      -- bit 0 optional, bit 1 implicit
//!     [0] INTEGER type-id           OPTIONAL
//!     [1] { ENUMERATED class, INTEGER number } OPTIONAL
//!     [2] { node ... }              OPTIONAL
//!     [3] { [APPLICATION 3] { INTEGER value, UTF8String name } ... } OPTIONAL
//! }
//! ```
//!
//! Loading is strict: any deviation from this layout is a fatal
//! [`CodecError::SchemaLoad`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ast::{SchemaKind, SchemaNode};
use crate::core::{CodecError, DecodedValue, Result};
use crate::encoding::ber::primitive::{decode_integer, decode_text};
use crate::encoding::ber::writer::BerWriter;
use crate::encoding::cursor::ByteCursor;
use crate::encoding::header::{decode_header, universal, Tag, TagClass};

const TABLE_TAG: Tag = Tag::application(0);
const ENTRY_TAG: Tag = Tag::application(1);
const NODE_TAG: Tag = Tag::application(2);
const NAMED_VALUE_TAG: Tag = Tag::application(3);
const TYPE_ID_TAG: Tag = Tag::context(0);
const DEFAULT_TAG_TAG: Tag = Tag::context(1);
const CHILDREN_TAG: Tag = Tag::context(2);
const NAMED_VALUES_TAG: Tag = Tag::context(3);

const FLAG_OPTIONAL: i64 = 0x01;
const FLAG_IMPLICIT: i64 = 0x02;

/// Nesting bound for schema nodes in a table.
const MAX_SCHEMA_DEPTH: usize = 128;

/// One top-level type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type id referenced by TypeRef nodes
    pub id: u32,
    /// Definition; its name is the type name
    pub node: SchemaNode,
}

/// JSON source entry: a schema node with an optional explicit id.
#[derive(Debug, Deserialize)]
struct JsonTypeDef {
    #[serde(default)]
    id: Option<u32>,
    #[serde(flatten)]
    node: SchemaNode,
}

/// Read-only table of top-level type definitions.
///
/// Built once, then shared by reference across any number of decode calls.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    types: Vec<TypeDef>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,
}

impl PartialEq for SchemaTable {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl SchemaTable {
    /// Build a table from definitions, numbering them from zero.
    pub fn from_types(types: Vec<SchemaNode>) -> Result<Self> {
        let defs = types
            .into_iter()
            .enumerate()
            .map(|(i, node)| TypeDef { id: i as u32, node })
            .collect();
        Self::from_defs(defs)
    }

    /// Build a table from definitions with explicit ids.
    pub fn from_defs(types: Vec<TypeDef>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(types.len());
        let mut by_id = HashMap::with_capacity(types.len());
        for (index, def) in types.iter().enumerate() {
            if def.node.name.is_empty() {
                return Err(CodecError::schema_load(
                    "SchemaTable",
                    format!("type {} has no name", def.id),
                ));
            }
            if by_id.insert(def.id, index).is_some() {
                return Err(CodecError::schema_load(
                    "SchemaTable",
                    format!("duplicate type id {}", def.id),
                ));
            }
            if by_name.insert(def.node.name.clone(), index).is_some() {
                return Err(CodecError::schema_load(
                    "SchemaTable",
                    format!("duplicate type name '{}'", def.node.name),
                ));
            }
        }

        let table = Self {
            types,
            by_name,
            by_id,
        };
        for def in &table.types {
            table.validate(&def.node, &def.node.name)?;
        }
        Ok(table)
    }

    fn validate(&self, root: &SchemaNode, type_name: &str) -> Result<()> {
        let mut problem = None;
        root.for_each(&mut |node| {
            if problem.is_some() {
                return;
            }
            match node.kind {
                SchemaKind::TypeRef => match node.type_id {
                    Some(id) if self.by_id.contains_key(&id) => {}
                    Some(id) => {
                        problem = Some(format!(
                            "'{}' references unknown type id {id}",
                            node.name
                        ))
                    }
                    None => {
                        problem = Some(format!("'{}' is a reference without a type id", node.name))
                    }
                },
                SchemaKind::SequenceOf | SchemaKind::SetOf if node.children.len() != 1 => {
                    problem = Some(format!(
                        "'{}' must have exactly one element schema, has {}",
                        node.name,
                        node.children.len()
                    ))
                }
                SchemaKind::Choice if node.children.is_empty() => {
                    problem = Some(format!("choice '{}' has no alternatives", node.name))
                }
                _ => {}
            }
        });
        match problem {
            Some(message) => Err(CodecError::schema_load(
                format!("type '{type_name}'"),
                message,
            )),
            None => Ok(()),
        }
    }

    /// Load a compiled binary table.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut reader = TableReader {
            cursor: ByteCursor::new(bytes),
        };
        let table_end = reader.expect(TABLE_TAG, true, bytes.len())?;
        let mut defs = Vec::new();
        while reader.cursor.tell() < table_end {
            let entry_end = reader.expect(ENTRY_TAG, true, table_end)?;
            let id = reader.read_integer(universal::INTEGER, entry_end)?;
            let id = u32::try_from(id)
                .map_err(|_| reader.error(format!("type id {id} out of range")))?;
            let node = reader.read_node(entry_end, 0)?;
            reader.expect_end(entry_end)?;
            defs.push(TypeDef { id, node });
        }
        reader.expect_end(bytes.len())?;
        let table = Self::from_defs(defs)?;
        tracing::debug!(
            context = "schema",
            types = table.len(),
            bytes = bytes.len(),
            "loaded schema table"
        );
        Ok(table)
    }

    /// Serialize to the compiled binary table format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BerWriter::new();
        writer.write_constructed(TABLE_TAG, |w| {
            for def in &self.types {
                w.write_constructed(ENTRY_TAG, |w| {
                    w.write_integer(Tag::universal(universal::INTEGER), i64::from(def.id));
                    write_node(w, &def.node)
                })?;
            }
            Ok(())
        })?;
        Ok(writer.into_bytes())
    }

    /// Read a JSON type list: an array of schema nodes, each with an optional `id`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let entries: Vec<JsonTypeDef> = serde_json::from_str(text)
            .map_err(|e| CodecError::schema_load("JSON schema source", e.to_string()))?;
        let defs = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| TypeDef {
                id: entry.id.unwrap_or(i as u32),
                node: entry.node,
            })
            .collect();
        Self::from_defs(defs)
    }

    /// Render as the JSON type list accepted by [`from_json_str`](Self::from_json_str).
    pub fn to_json_string(&self) -> Result<String> {
        let values: Vec<serde_json::Value> = self
            .types
            .iter()
            .map(|def| -> std::result::Result<serde_json::Value, serde_json::Error> {
                let mut value = serde_json::to_value(&def.node)?;
                if let serde_json::Value::Object(map) = &mut value {
                    map.insert("id".to_string(), serde_json::Value::from(def.id));
                }
                Ok(value)
            })
            .collect::<std::result::Result<_, serde_json::Error>>()
            .map_err(|e| CodecError::Other(format!("JSON encoding failed: {e}")))?;
        serde_json::to_string_pretty(&values)
            .map_err(|e| CodecError::Other(format!("JSON encoding failed: {e}")))
    }

    /// Top-level definition by type name.
    pub fn lookup_top_level(&self, pdu_name: &str) -> Option<&SchemaNode> {
        self.by_name.get(pdu_name).map(|&i| &self.types[i].node)
    }

    /// Top-level definition by type id.
    pub fn resolve_type_ref(&self, type_id: u32) -> Option<&SchemaNode> {
        self.by_id.get(&type_id).map(|&i| &self.types[i].node)
    }

    /// Type id of a named top-level definition.
    pub fn type_id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|&i| self.types[i].id)
    }

    /// Label of `value` in the named numbers of type `type_id`.
    ///
    /// References are followed to the defining type.
    pub fn lookup_named_value(&self, type_id: u32, value: i64) -> Option<&str> {
        let mut node = self.resolve_type_ref(type_id)?;
        for _ in 0..self.types.len() {
            if node.kind != SchemaKind::TypeRef {
                return node.named_value(value);
            }
            node = self.resolve_type_ref(node.type_id?)?;
        }
        None
    }

    /// All definitions in table order.
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Number of top-level definitions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table has no definitions.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn write_node(w: &mut BerWriter, node: &SchemaNode) -> Result<()> {
    w.write_constructed(NODE_TAG, |w| {
        w.write_integer(Tag::universal(universal::ENUMERATED), node.kind.code());
        w.write_str(Tag::universal(universal::UTF8_STRING), &node.name);
        let mut flags = 0;
        if node.optional {
            flags |= FLAG_OPTIONAL;
        }
        if node.implicit {
            flags |= FLAG_IMPLICIT;
        }
        w.write_integer(Tag::universal(universal::INTEGER), flags);
        if let Some(id) = node.type_id {
            w.write_integer(TYPE_ID_TAG, i64::from(id));
        }
        if let Some(tag) = node.default_tag {
            w.write_constructed(DEFAULT_TAG_TAG, |w| {
                w.write_integer(
                    Tag::universal(universal::ENUMERATED),
                    i64::from(tag.class.bits()),
                );
                w.write_integer(Tag::universal(universal::INTEGER), i64::from(tag.number));
                Ok(())
            })?;
        }
        if !node.children.is_empty() {
            w.write_constructed(CHILDREN_TAG, |w| {
                node.children.iter().try_for_each(|child| write_node(w, child))
            })?;
        }
        if !node.named_values.is_empty() {
            w.write_constructed(NAMED_VALUES_TAG, |w| {
                for (value, name) in &node.named_values {
                    w.write_constructed(NAMED_VALUE_TAG, |w| {
                        w.write_integer(Tag::universal(universal::INTEGER), *value);
                        w.write_str(Tag::universal(universal::UTF8_STRING), name);
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// Strict reader over the binary table.
struct TableReader<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> TableReader<'a> {
    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::schema_load(
            format!("schema table at offset {}", self.cursor.tell()),
            message,
        )
    }

    /// Read a header that must carry `tag`; returns the content end.
    fn expect(&mut self, tag: Tag, constructed: bool, limit: usize) -> Result<usize> {
        let end = self.try_expect(tag, constructed, limit)?;
        end.ok_or_else(|| self.error(format!("expected {tag}")))
    }

    /// Like [`expect`](Self::expect), but `None` when the next element has another tag
    /// or the enclosing value is exhausted.
    fn try_expect(&mut self, tag: Tag, constructed: bool, limit: usize) -> Result<Option<usize>> {
        if self.cursor.tell() >= limit {
            return Ok(None);
        }
        let start = self.cursor.tell();
        let header = decode_header(&mut self.cursor).map_err(|e| self.error(e.to_string()))?;
        if header.as_tag() != tag {
            self.cursor.seek_to(start)?;
            return Ok(None);
        }
        if header.constructed != constructed {
            return Err(self.error(format!(
                "{tag} must be {}",
                if constructed { "constructed" } else { "primitive" }
            )));
        }
        let end = header
            .content_end(start)
            .ok_or_else(|| self.error("indefinite length is not allowed"))?;
        if end > limit {
            return Err(self.error(format!(
                "{tag} ends at {end}, past its enclosing value at {limit}"
            )));
        }
        Ok(Some(end))
    }

    fn expect_end(&self, end: usize) -> Result<()> {
        if self.cursor.tell() == end {
            Ok(())
        } else {
            let trailing = end.saturating_sub(self.cursor.tell());
            Err(self.error(format!("{trailing} unexpected trailing bytes")))
        }
    }

    fn content(&mut self, end: usize) -> Result<&'a [u8]> {
        let len = end - self.cursor.tell();
        self.cursor.read_bytes(len)
    }

    fn read_integer(&mut self, universal_tag: u32, limit: usize) -> Result<i64> {
        self.read_integer_tagged(Tag::universal(universal_tag), limit)
    }

    fn read_integer_tagged(&mut self, tag: Tag, limit: usize) -> Result<i64> {
        let end = self.expect(tag, false, limit)?;
        let content = self.content(end)?;
        match decode_integer(content) {
            Ok(DecodedValue::Int(v)) => Ok(v),
            Ok(_) => Err(self.error("integer expected")),
            Err(e) => Err(self.error(e.to_string())),
        }
    }

    fn read_string(&mut self, limit: usize) -> Result<String> {
        let end = self.expect(Tag::universal(universal::UTF8_STRING), false, limit)?;
        let content = self.content(end)?;
        match decode_text(universal::UTF8_STRING, content) {
            Ok(DecodedValue::Text(s)) => Ok(s),
            Ok(_) => Err(self.error("string expected")),
            Err(e) => Err(self.error(e.to_string())),
        }
    }

    fn read_node(&mut self, limit: usize, depth: usize) -> Result<SchemaNode> {
        if depth >= MAX_SCHEMA_DEPTH {
            return Err(self.error("schema nesting too deep"));
        }
        let end = self.expect(NODE_TAG, true, limit)?;

        let code = self.read_integer(universal::ENUMERATED, end)?;
        let kind =
            SchemaKind::from_code(code).ok_or_else(|| self.error(format!("unknown kind {code}")))?;
        let name = self.read_string(end)?;
        let flags = self.read_integer(universal::INTEGER, end)?;
        if flags & !(FLAG_OPTIONAL | FLAG_IMPLICIT) != 0 {
            return Err(self.error(format!("unknown flags {flags:#x}")));
        }

        let mut node = SchemaNode::new(kind, name);
        node.optional = flags & FLAG_OPTIONAL != 0;
        node.implicit = flags & FLAG_IMPLICIT != 0;

        let start = self.cursor.tell();
        if self.try_expect(TYPE_ID_TAG, false, end)?.is_some() {
            self.cursor.seek_to(start)?;
            let id = self.read_integer_tagged(TYPE_ID_TAG, end)?;
            node.type_id = Some(
                u32::try_from(id).map_err(|_| self.error(format!("type id {id} out of range")))?,
            );
        }

        if let Some(tag_end) = self.try_expect(DEFAULT_TAG_TAG, true, end)? {
            let class = self.read_integer(universal::ENUMERATED, tag_end)?;
            let number = self.read_integer(universal::INTEGER, tag_end)?;
            self.expect_end(tag_end)?;
            let class = u8::try_from(class)
                .ok()
                .filter(|c| *c <= 3)
                .ok_or_else(|| self.error(format!("invalid tag class {class}")))?;
            let number = u32::try_from(number)
                .map_err(|_| self.error(format!("invalid tag number {number}")))?;
            node.default_tag = Some(Tag::new(TagClass::from_bits(class), number));
        }

        if let Some(children_end) = self.try_expect(CHILDREN_TAG, true, end)? {
            while self.cursor.tell() < children_end {
                node.children.push(self.read_node(children_end, depth + 1)?);
            }
        }

        if let Some(values_end) = self.try_expect(NAMED_VALUES_TAG, true, end)? {
            while self.cursor.tell() < values_end {
                let entry_end = self.expect(NAMED_VALUE_TAG, true, values_end)?;
                let value = self.read_integer(universal::INTEGER, entry_end)?;
                let label = self.read_string(entry_end)?;
                self.expect_end(entry_end)?;
                node.named_values.push((value, label));
            }
        }

        self.expect_end(end)?;
        Ok(node)
    }
}
