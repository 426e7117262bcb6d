// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded node tree.
//!
//! A decode produces one [`DecodedNode`] tree owned entirely by the caller.
//! Constructed values carry [`DecodedValue::None`] and their members in
//! `children`; primitive values carry their decoded value and no children.

use std::fmt;

use serde::Serialize;

use crate::encoding::header::Header;

/// Value of a decoded leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodedValue {
    /// BOOLEAN
    Bool(bool),
    /// INTEGER or ENUMERATED
    Int(i64),
    /// REAL
    Real(f64),
    /// OCTET STRING, opaque and unknown content
    Bytes(Vec<u8>),
    /// Character strings and times
    Text(String),
    /// BIT STRING
    BitString {
        /// Packed bits, first bit in the high bit of the first byte
        bits: Vec<u8>,
        /// Number of unused bits in the last byte
        unused_trailing: u8,
    },
    /// OBJECT IDENTIFIER arcs
    ObjectId(Vec<u64>),
    /// Constructed value or NULL
    None,
}

impl DecodedValue {
    /// Check if this value is a container/NULL placeholder.
    pub fn is_none(&self) -> bool {
        matches!(self, DecodedValue::None)
    }

    /// Try to get the boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get the real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get the raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DecodedValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get the text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the object identifier arcs.
    pub fn as_oid(&self) -> Option<&[u64]> {
        match self {
            DecodedValue::ObjectId(arcs) => Some(arcs),
            _ => None,
        }
    }

    /// Number of significant bits of a bit string.
    pub fn bit_len(&self) -> Option<usize> {
        match self {
            DecodedValue::BitString {
                bits,
                unused_trailing,
            } => Some((bits.len() * 8).saturating_sub(usize::from(*unused_trailing))),
            _ => None,
        }
    }

    /// Whether bit `index` of a bit string is set.
    pub fn bit(&self, index: usize) -> Option<bool> {
        let len = self.bit_len()?;
        if index >= len {
            return Some(false);
        }
        match self {
            DecodedValue::BitString { bits, .. } => {
                Some(bits[index / 8] & (0x80 >> (index % 8)) != 0)
            }
            _ => None,
        }
    }

    /// Variant name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedValue::Bool(_) => "bool",
            DecodedValue::Int(_) => "int",
            DecodedValue::Real(_) => "real",
            DecodedValue::Bytes(_) => "bytes",
            DecodedValue::Text(_) => "text",
            DecodedValue::BitString { .. } => "bitstring",
            DecodedValue::ObjectId(_) => "oid",
            DecodedValue::None => "none",
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            DecodedValue::Int(v) => write!(f, "{v}"),
            DecodedValue::Real(v) => write!(f, "{v}"),
            DecodedValue::Bytes(b) => write!(f, "{}", hex::encode(b)),
            DecodedValue::Text(s) => write!(f, "{s:?}"),
            DecodedValue::BitString {
                bits,
                unused_trailing,
            } => write!(f, "{} (unused {unused_trailing})", hex::encode(bits)),
            DecodedValue::ObjectId(arcs) => {
                let dotted: Vec<String> = arcs.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", dotted.join("."))
            }
            DecodedValue::None => Ok(()),
        }
    }
}

/// One node of the decoded output tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedNode {
    /// Header the node was decoded from
    pub header: Header,
    /// Field name from the referring schema context
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Leaf value, `None` for containers
    pub value: DecodedValue,
    /// Named-number or named-bit label, when the schema has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Members of a constructed value
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DecodedNode>,
    /// Half-open byte range `(start, end)` covering header and content
    pub byte_range: (usize, usize),
}

impl DecodedNode {
    /// Create a node with no value and no children.
    pub fn new(
        header: Header,
        name: impl Into<String>,
        type_name: impl Into<String>,
        start: usize,
    ) -> Self {
        let end = header.content_end(start).unwrap_or(start + header.header_len);
        Self {
            header,
            name: name.into(),
            type_name: type_name.into(),
            value: DecodedValue::None,
            display: None,
            children: Vec::new(),
            byte_range: (start, end),
        }
    }

    /// Builder-style value setter.
    pub fn with_value(mut self, value: DecodedValue) -> Self {
        self.value = value;
        self
    }

    /// Whether this node is a constructed container.
    pub fn is_container(&self) -> bool {
        self.header.constructed && self.value.is_none()
    }

    /// Number of bytes covered by the node.
    pub fn byte_len(&self) -> usize {
        self.byte_range.1.saturating_sub(self.byte_range.0)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&DecodedNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a dot-separated path of child names.
    pub fn find_path(&self, path: &str) -> Option<&DecodedNode> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Depth-first walk of the subtree.
    pub fn walk<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) {
        self.walk_at(visitor, 0);
    }

    fn walk_at<V: NodeVisitor + ?Sized>(&self, visitor: &mut V, depth: usize) {
        visitor.enter(self, depth);
        for child in &self.children {
            child.walk_at(visitor, depth + 1);
        }
        visitor.leave(self, depth);
    }
}

/// Visitor used by tree renderers.
pub trait NodeVisitor {
    /// Called before the children of `node` are visited.
    fn enter(&mut self, node: &DecodedNode, depth: usize);

    /// Called after the children of `node` were visited.
    fn leave(&mut self, _node: &DecodedNode, _depth: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::header::TagClass;

    fn header(tag: u32, constructed: bool, len: usize) -> Header {
        Header {
            class: TagClass::Universal,
            tag,
            constructed,
            length: Some(len),
            header_len: 2,
        }
    }

    fn sample_tree() -> DecodedNode {
        let mut root = DecodedNode::new(header(16, true, 6), "msg", "Msg", 0);
        let mut inner = DecodedNode::new(header(16, true, 3), "inner", "Inner", 2);
        inner.children.push(
            DecodedNode::new(header(2, false, 1), "id", "INTEGER", 4)
                .with_value(DecodedValue::Int(5)),
        );
        root.children.push(inner);
        root
    }

    #[test]
    fn test_byte_range_from_header() {
        let node = DecodedNode::new(header(2, false, 3), "x", "INTEGER", 10);
        assert_eq!(node.byte_range, (10, 15));
        assert_eq!(node.byte_len(), 5);
    }

    #[test]
    fn test_find_path() {
        let root = sample_tree();
        assert!(root.is_container());
        let id = root.find_path("inner.id").unwrap();
        assert_eq!(id.value.as_i64(), Some(5));
        assert!(root.find_path("inner.missing").is_none());
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_walk_order() {
        struct Names(Vec<(String, usize)>);
        impl NodeVisitor for Names {
            fn enter(&mut self, node: &DecodedNode, depth: usize) {
                self.0.push((node.name.clone(), depth));
            }
        }
        let mut names = Names(Vec::new());
        sample_tree().walk(&mut names);
        assert_eq!(
            names.0,
            vec![
                ("msg".to_string(), 0),
                ("inner".to_string(), 1),
                ("id".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_bit_access() {
        let value = DecodedValue::BitString {
            bits: vec![0b1010_0000],
            unused_trailing: 4,
        };
        assert_eq!(value.bit_len(), Some(4));
        assert_eq!(value.bit(0), Some(true));
        assert_eq!(value.bit(1), Some(false));
        assert_eq!(value.bit(2), Some(true));
        assert_eq!(value.bit(6), Some(false));
        assert_eq!(DecodedValue::Int(1).bit(0), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(DecodedValue::ObjectId(vec![1, 2, 840]).to_string(), "1.2.840");
        assert_eq!(DecodedValue::Bytes(vec![0xDE, 0xAD]).to_string(), "dead");
        assert_eq!(DecodedValue::Bool(true).to_string(), "TRUE");
    }
}
