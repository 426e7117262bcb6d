// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decode stack frames.

use serde::Serialize;

use crate::core::DecodedNode;
use crate::schema::{SchemaKind, SchemaNode};

/// State of one nesting level of the decode stack.
///
/// The mode selects how the next element of the frame is matched; the
/// [`FrameSchema`] only supplies the data for that match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FrameMode {
    /// Matching the next element against the member list
    #[default]
    ExpectChild,
    /// Matching the next element against the repeated element schema
    InRepeat,
    /// The current element resolved through a choice and is still being
    /// decoded; no new element may start until it completes
    InChoice,
    /// Schema exhausted; only the end-of-contents marker is expected
    AwaitEndOfContents,
    /// Inside an explicit tag (usually an explicitly tagged reference),
    /// expecting the single tagged element
    ReferencePending,
}

/// What the decoder expects for one element: the declaring schema node and
/// the names it was reached under.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<'s> {
    /// Schema node describing the element
    pub node: &'s SchemaNode,
    /// Output name (the referring field's name)
    pub name: &'s str,
    /// Name of the referenced type, once a reference was followed
    pub type_name: Option<&'s str>,
    /// The node's own declared tag was already matched by an outer header
    pub tag_consumed: bool,
}

impl<'s> Slot<'s> {
    /// Slot for a member, element or alternative.
    pub fn field(node: &'s SchemaNode) -> Self {
        Self {
            node,
            name: &node.name,
            type_name: None,
            tag_consumed: false,
        }
    }

    /// Slot for a top-level type decoded as a PDU.
    pub fn top_level(node: &'s SchemaNode) -> Self {
        Self {
            node,
            name: &node.name,
            type_name: Some(node.name.as_str()),
            tag_consumed: false,
        }
    }
}

/// Schema driving a frame.
#[derive(Debug, Clone)]
pub(crate) enum FrameSchema<'s> {
    /// Synthetic frame holding the single top-level element
    Root { slot: Option<Slot<'s>> },
    /// SEQUENCE (ordered) or SET (any order) members
    Fields {
        node: &'s SchemaNode,
        index: usize,
        seen: Vec<bool>,
    },
    /// SEQUENCE OF / SET OF element
    Repeat { element: &'s SchemaNode },
    /// Explicit tag wrapping one element
    Explicit { inner: Slot<'s>, matched: bool },
    /// Constructed string segments to reassemble
    Segments {
        kind: SchemaKind,
        node: Option<&'s SchemaNode>,
    },
    /// No schema: decode by universal tag
    Untyped,
}

impl FrameSchema<'_> {
    /// Whether unknown elements are expected here and need no diagnostic.
    pub fn tolerates_unknown(&self) -> bool {
        matches!(
            self,
            FrameSchema::Untyped | FrameSchema::Segments { .. } | FrameSchema::Root { slot: None }
        )
    }

    /// Whether every member the schema describes has been seen.
    pub fn is_exhausted(&self) -> bool {
        match self {
            FrameSchema::Fields { node, index, seen } => {
                if node.kind == SchemaKind::Set {
                    seen.iter().all(|s| *s)
                } else {
                    *index >= node.children.len()
                }
            }
            FrameSchema::Explicit { matched, .. } => *matched,
            _ => false,
        }
    }
}

/// One entry of the explicit decode stack.
#[derive(Debug, Clone)]
pub(crate) struct DecodeFrame<'s> {
    pub schema: FrameSchema<'s>,
    pub mode: FrameMode,
    /// Mode restored once a choice element completes
    pub base_mode: FrameMode,
    /// Content end, `None` for indefinite length
    pub end: Option<usize>,
    /// Nearest definite end at or below this frame
    pub limit: usize,
    /// Node under construction
    pub node: DecodedNode,
    /// Elements started in this frame
    pub accepted: usize,
    /// Popping this frame completes a choice element of the parent
    pub resolves_choice: bool,
}

impl<'s> DecodeFrame<'s> {
    pub fn new(
        schema: FrameSchema<'s>,
        mode: FrameMode,
        node: DecodedNode,
        end: Option<usize>,
        limit: usize,
    ) -> Self {
        Self {
            schema,
            mode,
            base_mode: mode,
            end,
            limit,
            node,
            accepted: 0,
            resolves_choice: false,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        self.end.is_none()
    }
}
