// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema model types.
//!
//! A [`SchemaNode`] tree mirrors one compiled ASN.1 type definition. Nodes are
//! plain owned values; type references point to other top-level definitions by
//! numeric id and are resolved through the owning
//! [`SchemaTable`](super::table::SchemaTable), never by pointer.

use serde::{Deserialize, Serialize};

use crate::encoding::header::{universal, Tag, TagClass};

/// Kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    /// BOOLEAN
    Boolean,
    /// INTEGER
    Integer,
    /// BIT STRING
    BitString,
    /// OCTET STRING
    OctetString,
    /// NULL
    Null,
    /// OBJECT IDENTIFIER
    ObjectId,
    /// REAL
    Real,
    /// ENUMERATED
    Enumerated,
    /// Any restricted character string or time type
    CharString,
    /// SEQUENCE
    Sequence,
    /// SET
    Set,
    /// SEQUENCE OF
    SequenceOf,
    /// SET OF
    SetOf,
    /// CHOICE
    Choice,
    /// Reference to another top-level type
    TypeRef,
}

impl SchemaKind {
    /// All kinds, in table code order.
    pub const ALL: [SchemaKind; 15] = [
        SchemaKind::Boolean,
        SchemaKind::Integer,
        SchemaKind::BitString,
        SchemaKind::OctetString,
        SchemaKind::Null,
        SchemaKind::ObjectId,
        SchemaKind::Real,
        SchemaKind::Enumerated,
        SchemaKind::CharString,
        SchemaKind::Sequence,
        SchemaKind::Set,
        SchemaKind::SequenceOf,
        SchemaKind::SetOf,
        SchemaKind::Choice,
        SchemaKind::TypeRef,
    ];

    /// Numeric code used in the binary schema table.
    pub fn code(self) -> i64 {
        match self {
            SchemaKind::Boolean => 1,
            SchemaKind::Integer => 2,
            SchemaKind::BitString => 3,
            SchemaKind::OctetString => 4,
            SchemaKind::Null => 5,
            SchemaKind::ObjectId => 6,
            SchemaKind::Real => 9,
            SchemaKind::Enumerated => 10,
            SchemaKind::CharString => 12,
            SchemaKind::Sequence => 16,
            SchemaKind::Set => 17,
            SchemaKind::SequenceOf => 48,
            SchemaKind::SetOf => 49,
            SchemaKind::Choice => 64,
            SchemaKind::TypeRef => 65,
        }
    }

    /// Kind for a table code.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// ASN.1 name used as the type name of anonymous values.
    pub fn asn1_name(self) -> &'static str {
        match self {
            SchemaKind::Boolean => "BOOLEAN",
            SchemaKind::Integer => "INTEGER",
            SchemaKind::BitString => "BIT STRING",
            SchemaKind::OctetString => "OCTET STRING",
            SchemaKind::Null => "NULL",
            SchemaKind::ObjectId => "OBJECT IDENTIFIER",
            SchemaKind::Real => "REAL",
            SchemaKind::Enumerated => "ENUMERATED",
            SchemaKind::CharString => "CharString",
            SchemaKind::Sequence => "SEQUENCE",
            SchemaKind::Set => "SET",
            SchemaKind::SequenceOf => "SEQUENCE OF",
            SchemaKind::SetOf => "SET OF",
            SchemaKind::Choice => "CHOICE",
            SchemaKind::TypeRef => "TypeRef",
        }
    }

    /// Universal tag the kind carries when it is not re-tagged.
    ///
    /// `None` for kinds whose tag comes from elsewhere (choices, references,
    /// character strings).
    pub fn natural_tag(self) -> Option<Tag> {
        let number = match self {
            SchemaKind::Boolean => universal::BOOLEAN,
            SchemaKind::Integer => universal::INTEGER,
            SchemaKind::BitString => universal::BIT_STRING,
            SchemaKind::OctetString => universal::OCTET_STRING,
            SchemaKind::Null => universal::NULL,
            SchemaKind::ObjectId => universal::OBJECT_IDENTIFIER,
            SchemaKind::Real => universal::REAL,
            SchemaKind::Enumerated => universal::ENUMERATED,
            SchemaKind::Sequence | SchemaKind::SequenceOf => universal::SEQUENCE,
            SchemaKind::Set | SchemaKind::SetOf => universal::SET,
            SchemaKind::CharString | SchemaKind::Choice | SchemaKind::TypeRef => return None,
        };
        Some(Tag::universal(number))
    }

    /// Whether values of this kind are encoded constructed.
    pub fn is_constructed(self) -> bool {
        matches!(
            self,
            SchemaKind::Sequence | SchemaKind::Set | SchemaKind::SequenceOf | SchemaKind::SetOf
        )
    }

    /// Whether this kind repeats a single element schema.
    pub fn is_repeated(self) -> bool {
        matches!(self, SchemaKind::SequenceOf | SchemaKind::SetOf)
    }

    /// Whether values of this kind may use the constructed string form.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            SchemaKind::OctetString | SchemaKind::BitString | SchemaKind::CharString
        )
    }
}

/// How a node's declared tag appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// No declared tag; the kind's own tag applies
    Natural,
    /// Declared tag replaces the kind's tag
    Implicit(Tag),
    /// Declared tag wraps the kind's own encoding
    Explicit(Tag),
}

/// One node of a schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Node kind
    pub kind: SchemaKind,
    /// Field or type name
    pub name: String,
    /// Referenced top-level type id (TypeRef only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u32>,
    /// Declared tag; `None` means the kind's natural tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tag: Option<Tag>,
    /// Field may be absent
    #[serde(default)]
    pub optional: bool,
    /// Declared tag replaces rather than wraps
    #[serde(default)]
    pub implicit: bool,
    /// Members (Sequence/Set), element (SequenceOf/SetOf) or alternatives (Choice)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaNode>,
    /// Named numbers (Integer/Enumerated) or named bits (BitString)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_values: Vec<(i64, String)>,
}

impl SchemaNode {
    /// Create an untagged, required node.
    pub fn new(kind: SchemaKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            type_id: None,
            default_tag: None,
            optional: false,
            implicit: false,
            children: Vec::new(),
            named_values: Vec::new(),
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Boolean, name)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Integer, name)
    }

    pub fn enumerated(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Enumerated, name)
    }

    pub fn bit_string(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::BitString, name)
    }

    pub fn octet_string(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::OctetString, name)
    }

    pub fn null(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Null, name)
    }

    pub fn object_id(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::ObjectId, name)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Real, name)
    }

    /// Character string carried under the given universal tag number.
    pub fn char_string(name: impl Into<String>, universal_tag: u32) -> Self {
        let mut node = Self::new(SchemaKind::CharString, name);
        node.default_tag = Some(Tag::universal(universal_tag));
        node.implicit = true;
        node
    }

    pub fn sequence(name: impl Into<String>, members: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Sequence, name).with_children(members)
    }

    pub fn set(name: impl Into<String>, members: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Set, name).with_children(members)
    }

    pub fn sequence_of(name: impl Into<String>, element: SchemaNode) -> Self {
        Self::new(SchemaKind::SequenceOf, name).with_children(vec![element])
    }

    pub fn set_of(name: impl Into<String>, element: SchemaNode) -> Self {
        Self::new(SchemaKind::SetOf, name).with_children(vec![element])
    }

    pub fn choice(name: impl Into<String>, alternatives: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Choice, name).with_children(alternatives)
    }

    /// Field whose type is the top-level definition `type_id`.
    pub fn type_ref(name: impl Into<String>, type_id: u32) -> Self {
        let mut node = Self::new(SchemaKind::TypeRef, name);
        node.type_id = Some(type_id);
        node
    }

    /// Tag the node implicitly.
    pub fn tagged(mut self, tag: Tag) -> Self {
        self.default_tag = Some(tag);
        self.implicit = true;
        self
    }

    /// Tag the node explicitly.
    pub fn explicit(mut self, tag: Tag) -> Self {
        self.default_tag = Some(tag);
        self.implicit = false;
        self
    }

    /// Mark the node optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_children(mut self, children: Vec<SchemaNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_named_values<S: Into<String>>(mut self, values: Vec<(i64, S)>) -> Self {
        self.named_values = values.into_iter().map(|(v, n)| (v, n.into())).collect();
        self
    }

    /// How the declared tag appears on the wire.
    ///
    /// Universal declared tags are always the value's own tag. Choices cannot
    /// be tagged implicitly, so a tagged choice is always explicit.
    pub fn tag_mode(&self) -> TagMode {
        match self.default_tag {
            None => TagMode::Natural,
            Some(tag) if tag.class == TagClass::Universal => TagMode::Implicit(tag),
            Some(tag) if self.implicit && self.kind != SchemaKind::Choice => {
                TagMode::Implicit(tag)
            }
            Some(tag) => TagMode::Explicit(tag),
        }
    }

    /// Element schema of a SequenceOf/SetOf.
    pub fn element(&self) -> Option<&SchemaNode> {
        if self.kind.is_repeated() {
            self.children.first()
        } else {
            None
        }
    }

    /// Label for a named number.
    pub fn named_value(&self, value: i64) -> Option<&str> {
        self.named_values
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| name.as_str())
    }

    /// Depth-first visit of this node and all nested nodes.
    pub fn for_each<F: FnMut(&SchemaNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.for_each(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in SchemaKind::ALL {
            assert_eq!(SchemaKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SchemaKind::from_code(99), None);
    }

    #[test]
    fn test_tag_modes() {
        assert_eq!(SchemaNode::integer("a").tag_mode(), TagMode::Natural);
        assert_eq!(
            SchemaNode::integer("a").tagged(Tag::context(0)).tag_mode(),
            TagMode::Implicit(Tag::context(0))
        );
        assert_eq!(
            SchemaNode::integer("a").explicit(Tag::context(1)).tag_mode(),
            TagMode::Explicit(Tag::context(1))
        );
        assert_eq!(
            SchemaNode::choice("c", vec![]).tagged(Tag::context(2)).tag_mode(),
            TagMode::Explicit(Tag::context(2))
        );
        assert_eq!(
            SchemaNode::char_string("s", universal::PRINTABLE_STRING).tag_mode(),
            TagMode::Implicit(Tag::universal(universal::PRINTABLE_STRING))
        );
    }

    #[test]
    fn test_builder() {
        let node = SchemaNode::sequence(
            "Msg",
            vec![
                SchemaNode::integer("id"),
                SchemaNode::enumerated("state")
                    .with_named_values(vec![(0, "idle"), (1, "busy")])
                    .optional(),
            ],
        );
        assert_eq!(node.children.len(), 2);
        assert!(node.children[1].optional);
        assert_eq!(node.children[1].named_value(1), Some("busy"));
        assert_eq!(node.element(), None);

        let list = SchemaNode::sequence_of("ids", SchemaNode::integer("id"));
        assert_eq!(list.element().map(|e| e.name.as_str()), Some("id"));

        let mut count = 0;
        node.for_each(&mut |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_natural_tags() {
        assert_eq!(SchemaKind::SequenceOf.natural_tag(), Some(Tag::universal(16)));
        assert_eq!(SchemaKind::Choice.natural_tag(), None);
        assert!(SchemaKind::Set.is_constructed());
        assert!(SchemaKind::BitString.is_string());
    }
}
