// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-driven BER decoder.
//!
//! The decoder walks the input with an explicit stack of [`DecodeFrame`]s
//! instead of native recursion, so nesting depth is bounded by configuration
//! and a fatal error can still hand back the partially built tree.
//!
//! Each step reads one header and then either
//! - pops the current frame (end-of-contents marker or definite end reached),
//! - matches the header against the current frame's schema and decodes a
//!   primitive value in place or pushes a frame for a constructed one, or
//! - emits an opaque placeholder for an element the schema does not expect.
//!
//! Only truncated input is fatal. Everything else is recorded in
//! [`Diagnostics`] and decoding continues.

use serde::Serialize;

use super::frame::{DecodeFrame, FrameMode, FrameSchema, Slot};
use super::primitive::{
    decode_bit_string, decode_boolean, decode_integer, decode_null, decode_object_id,
    decode_real, decode_relative_oid, decode_text, named_bits, named_label, Malformed,
};
use crate::core::{
    AnomalyKind, CodecError, DecodeFailure, DecodedNode, DecodedValue, DecoderConfig,
    Diagnostics, LengthClamps, Result,
};
use crate::encoding::cursor::ByteCursor;
use crate::encoding::header::{decode_header, universal, Header, Tag, TagClass};
use crate::schema::{SchemaKind, SchemaNode, SchemaTable, TagMode};

/// Name given to elements the schema does not describe.
pub const UNKNOWN_NAME: &str = "unknown";

/// Result of a completed top-level decode.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeOutcome {
    /// Decoded top-level element
    pub root: DecodedNode,
    /// Anomalies tolerated during the decode
    pub diagnostics: Diagnostics,
    /// Offset the decode started at
    pub offset: usize,
    /// Bytes consumed from `offset`
    pub bytes_consumed: usize,
}

impl DecodeOutcome {
    /// Number of recorded anomalies.
    pub fn anomaly_count(&self) -> u32 {
        self.diagnostics.count()
    }

    /// Whether the decode finished without anomalies.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_clean()
    }

    /// Offset one past the decoded element.
    pub fn end_offset(&self) -> usize {
        self.offset + self.bytes_consumed
    }
}

/// BER decoder bound to a schema table.
///
/// The table is borrowed read-only, so one table can back any number of
/// decoders and concurrent decode calls.
#[derive(Debug, Clone)]
pub struct BerDecoder<'s> {
    schema: Option<&'s SchemaTable>,
    config: DecoderConfig,
}

impl<'s> BerDecoder<'s> {
    /// Create a decoder with the default configuration.
    pub fn new(schema: &'s SchemaTable) -> Self {
        Self::with_config(schema, DecoderConfig::default())
    }

    /// Create a decoder with an explicit configuration.
    pub fn with_config(schema: &'s SchemaTable, config: DecoderConfig) -> Self {
        Self {
            schema: Some(schema),
            config,
        }
    }

    /// Create a schema-less decoder; only [`decode_untyped`](Self::decode_untyped) is useful.
    pub fn untyped(config: DecoderConfig) -> Self {
        Self {
            schema: None,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one `pdu` value at the start of `data`.
    pub fn decode(
        &self,
        data: &[u8],
        pdu: &str,
    ) -> std::result::Result<DecodeOutcome, DecodeFailure> {
        self.decode_at(data, 0, pdu)
    }

    /// Decode one `pdu` value starting at `offset`.
    pub fn decode_at(
        &self,
        data: &[u8],
        offset: usize,
        pdu: &str,
    ) -> std::result::Result<DecodeOutcome, DecodeFailure> {
        let node = self
            .schema
            .and_then(|schema| schema.lookup_top_level(pdu))
            .ok_or_else(|| early_failure(CodecError::type_not_found(pdu), offset))?;
        self.run(data, offset, Some(Slot::top_level(node)))
    }

    /// Decode one value starting at `offset` without a schema.
    pub fn decode_untyped(
        &self,
        data: &[u8],
        offset: usize,
    ) -> std::result::Result<DecodeOutcome, DecodeFailure> {
        self.run(data, offset, None)
    }

    /// Iterate over consecutive `pdu` values from `offset` until the data or
    /// the first fatal error ends.
    pub fn records<'d>(&'d self, data: &'d [u8], offset: usize, pdu: &'d str) -> Records<'d, 's> {
        Records {
            decoder: self,
            data,
            pdu: Some(pdu),
            offset,
            done: false,
        }
    }

    /// Iterate over consecutive values from `offset` without a schema.
    pub fn records_untyped<'d>(&'d self, data: &'d [u8], offset: usize) -> Records<'d, 's> {
        Records {
            decoder: self,
            data,
            pdu: None,
            offset,
            done: false,
        }
    }

    fn run(
        &self,
        data: &[u8],
        offset: usize,
        slot: Option<Slot<'s>>,
    ) -> std::result::Result<DecodeOutcome, DecodeFailure> {
        let mut cursor = ByteCursor::new(data);
        cursor
            .seek_to(offset)
            .map_err(|error| early_failure(error, offset))?;

        let mut run = DecodeRun {
            matcher: Matcher {
                schema: self.schema,
                max_references: self.config.max_reference_depth,
                max_choices: self.config.max_choice_fanout_recursion,
            },
            config: &self.config,
            cursor,
            stack: Vec::new(),
            diagnostics: Diagnostics::new(),
        };
        run.push_root(slot, offset);

        match run.drive() {
            Ok(()) => run.finish(offset),
            Err(error) => Err(run.abort(error)),
        }
    }
}

fn early_failure(error: CodecError, offset: usize) -> DecodeFailure {
    DecodeFailure {
        error,
        offset,
        depth: 0,
        partial: None,
        diagnostics: Diagnostics::new(),
    }
}

/// Iterator over consecutive top-level values.
pub struct Records<'d, 's> {
    decoder: &'d BerDecoder<'s>,
    data: &'d [u8],
    pdu: Option<&'d str>,
    offset: usize,
    done: bool,
}

impl Iterator for Records<'_, '_> {
    type Item = std::result::Result<DecodeOutcome, DecodeFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }
        let result = match self.pdu {
            Some(pdu) => self.decoder.decode_at(self.data, self.offset, pdu),
            None => self.decoder.decode_untyped(self.data, self.offset),
        };
        match &result {
            Ok(outcome) if outcome.bytes_consumed > 0 => self.offset = outcome.end_offset(),
            _ => self.done = true,
        }
        Some(result)
    }
}

/// Result of resolving a matched slot down to something decodable.
enum Resolved<'s> {
    /// The slot's explicit tag wraps `inner`
    Explicit { outer: Slot<'s>, inner: Slot<'s> },
    /// A value of `slot.node.kind`
    Value(Slot<'s>),
    /// Resolution gave up; emit an opaque placeholder
    Opaque {
        slot: Slot<'s>,
        kind: AnomalyKind,
        detail: String,
    },
}

/// Tag matching against schema nodes, bounded by the reference and choice limits.
#[derive(Clone, Copy)]
struct Matcher<'s> {
    schema: Option<&'s SchemaTable>,
    max_references: u32,
    max_choices: u32,
}

impl<'s> Matcher<'s> {
    fn target(&self, node: &SchemaNode) -> Option<&'s SchemaNode> {
        let schema = self.schema?;
        schema.resolve_type_ref(node.type_id?)
    }

    /// Whether an element tagged `tag` can start a value for `slot`.
    fn expects(&self, slot: Slot<'s>, tag: Tag) -> bool {
        self.expects_within(slot.node, slot.tag_consumed, tag, self.max_choices, 0)
    }

    fn expects_within(
        &self,
        node: &'s SchemaNode,
        tag_consumed: bool,
        tag: Tag,
        choice_budget: u32,
        references: u32,
    ) -> bool {
        if !tag_consumed {
            match node.tag_mode() {
                TagMode::Implicit(declared) | TagMode::Explicit(declared) => return declared == tag,
                TagMode::Natural => {}
            }
        }
        match node.kind {
            SchemaKind::Choice => {
                choice_budget > 0
                    && node.children.iter().any(|alternative| {
                        self.expects_within(alternative, false, tag, choice_budget - 1, references)
                    })
            }
            SchemaKind::TypeRef => {
                if references >= self.max_references {
                    // Resolution will stop here and report the depth overrun.
                    return true;
                }
                match self.target(node) {
                    Some(target) => {
                        self.expects_within(target, false, tag, choice_budget, references + 1)
                    }
                    None => false,
                }
            }
            SchemaKind::CharString => {
                tag.class == TagClass::Universal && universal::is_text(tag.number)
            }
            kind => kind.natural_tag() == Some(tag),
        }
    }

    /// Follow references and untagged choices from `slot` for an element tagged `tag`.
    ///
    /// Returns the resolution and whether a choice was passed on the way.
    fn resolve(&self, slot: Slot<'s>, tag: Tag) -> (Resolved<'s>, bool) {
        let mut slot = slot;
        let mut references = 0u32;
        let mut choices = 0u32;
        let mut via_choice = false;

        loop {
            let node = slot.node;
            let mode = node.tag_mode();
            if !slot.tag_consumed {
                if let TagMode::Explicit(_) = mode {
                    let inner = Slot {
                        tag_consumed: true,
                        ..slot
                    };
                    return (Resolved::Explicit { outer: slot, inner }, via_choice);
                }
            }

            match node.kind {
                SchemaKind::TypeRef => {
                    references += 1;
                    if references > self.max_references {
                        let detail = format!(
                            "'{}' exceeds reference depth {}",
                            slot.name, self.max_references
                        );
                        return (
                            Resolved::Opaque {
                                slot,
                                kind: AnomalyKind::ReferenceDepthExceeded,
                                detail,
                            },
                            via_choice,
                        );
                    }
                    let Some(target) = self.target(node) else {
                        let detail = format!("'{}' references an unknown type", slot.name);
                        return (
                            Resolved::Opaque {
                                slot,
                                kind: AnomalyKind::MalformedValue,
                                detail,
                            },
                            via_choice,
                        );
                    };
                    // An implicit tag replaces the target's own tag; an explicit one
                    // (already unwrapped) leaves the target's tag in place.
                    let tag_consumed = match (slot.tag_consumed, mode) {
                        (_, TagMode::Explicit(_)) => false,
                        (true, _) => true,
                        (false, TagMode::Implicit(_)) => true,
                        (false, TagMode::Natural) => false,
                    };
                    slot = Slot {
                        node: target,
                        name: slot.name,
                        type_name: Some(target.name.as_str()),
                        tag_consumed,
                    };
                }
                SchemaKind::Choice => {
                    choices += 1;
                    via_choice = true;
                    let alternative = if choices > self.max_choices {
                        None
                    } else {
                        node.children
                            .iter()
                            .find(|alternative| self.expects(Slot::field(alternative), tag))
                    };
                    match alternative {
                        Some(alternative) => slot = Slot::field(alternative),
                        None => {
                            let detail =
                                format!("no alternative of '{}' matches {tag}", slot.name);
                            return (
                                Resolved::Opaque {
                                    slot,
                                    kind: AnomalyKind::ChoiceExhausted,
                                    detail,
                                },
                                via_choice,
                            );
                        }
                    }
                }
                _ => return (Resolved::Value(slot), via_choice),
            }
        }
    }
}

/// Maximum plausible content length for a kind.
fn clamp_for(clamps: &LengthClamps, kind: SchemaKind) -> Option<usize> {
    Some(match kind {
        SchemaKind::Boolean => clamps.boolean,
        SchemaKind::Integer => clamps.integer,
        SchemaKind::Enumerated => clamps.enumerated,
        SchemaKind::Null => clamps.null,
        SchemaKind::Real => clamps.real,
        SchemaKind::ObjectId => clamps.object_id,
        SchemaKind::BitString => clamps.bit_string,
        SchemaKind::OctetString => clamps.octet_string,
        SchemaKind::CharString => clamps.char_string,
        SchemaKind::Sequence | SchemaKind::Set | SchemaKind::SequenceOf | SchemaKind::SetOf => {
            clamps.constructed
        }
        SchemaKind::Choice | SchemaKind::TypeRef => return None,
    })
}

/// Kind used to decode a universal-class element without a schema.
fn untyped_kind(header: &Header) -> SchemaKind {
    if header.class != TagClass::Universal {
        return SchemaKind::OctetString;
    }
    match header.tag {
        universal::BOOLEAN => SchemaKind::Boolean,
        universal::INTEGER => SchemaKind::Integer,
        universal::BIT_STRING => SchemaKind::BitString,
        universal::NULL => SchemaKind::Null,
        universal::OBJECT_IDENTIFIER | universal::RELATIVE_OID => SchemaKind::ObjectId,
        universal::REAL => SchemaKind::Real,
        universal::ENUMERATED => SchemaKind::Enumerated,
        universal::SEQUENCE => SchemaKind::Sequence,
        universal::SET => SchemaKind::Set,
        tag if universal::is_text(tag) => SchemaKind::CharString,
        _ => SchemaKind::OctetString,
    }
}

/// Universal string tag to decode character content with.
fn text_tag(header: &Header) -> u32 {
    if header.class == TagClass::Universal && universal::is_text(header.tag) {
        header.tag
    } else {
        universal::UTF8_STRING
    }
}

fn type_name_for(kind: SchemaKind, header: &Header) -> String {
    match kind {
        SchemaKind::CharString => universal::name(text_tag(header))
            .unwrap_or(kind.asn1_name())
            .to_string(),
        _ => kind.asn1_name().to_string(),
    }
}

/// State of one decode call.
struct DecodeRun<'d, 's> {
    matcher: Matcher<'s>,
    config: &'d DecoderConfig,
    cursor: ByteCursor<'d>,
    stack: Vec<DecodeFrame<'s>>,
    diagnostics: Diagnostics,
}

impl<'d, 's> DecodeRun<'d, 's> {
    fn data_len(&self) -> usize {
        self.cursor.data().len()
    }

    fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    fn record(&mut self, kind: AnomalyKind, offset: usize, detail: impl Into<String>) {
        let depth = self.depth();
        self.diagnostics.record(kind, offset, depth, detail);
    }

    fn push_root(&mut self, slot: Option<Slot<'s>>, offset: usize) {
        let data_len = self.data_len();
        let header = Header {
            class: TagClass::Universal,
            tag: universal::END_OF_CONTENTS,
            constructed: true,
            length: Some(data_len - offset),
            header_len: 0,
        };
        let node = DecodedNode::new(header, "", "", offset);
        self.stack.push(DecodeFrame::new(
            FrameSchema::Root { slot },
            FrameMode::ExpectChild,
            node,
            Some(data_len),
            data_len,
        ));
    }

    /// Run steps until the root element is complete.
    fn drive(&mut self) -> Result<()> {
        loop {
            let tell = self.cursor.tell();
            let data_len = self.data_len();
            let Some(top) = self.stack.last() else {
                return Ok(());
            };
            let is_root = matches!(top.schema, FrameSchema::Root { .. });
            let (accepted, end, limit) = (top.accepted, top.end, top.limit);

            if is_root {
                if accepted > 0 {
                    return Ok(());
                }
            } else {
                match end {
                    Some(end) if tell >= end => {
                        self.pop_frame();
                        continue;
                    }
                    None if tell >= limit => {
                        if limit >= data_len {
                            return Err(CodecError::truncated(2, 0, tell));
                        }
                        let name = top.node.name.clone();
                        self.record(
                            AnomalyKind::MalformedValue,
                            tell,
                            format!("'{name}' has no end-of-contents marker"),
                        );
                        self.pop_frame();
                        continue;
                    }
                    _ => {}
                }
            }

            self.step()?;
        }
    }

    fn step(&mut self) -> Result<()> {
        let start = self.cursor.tell();
        let header = decode_header(&mut self.cursor)?;
        let content_start = self.cursor.tell();

        let limit = self.top_limit();
        if content_start > limit {
            self.record(
                AnomalyKind::MalformedValue,
                start,
                "element header crosses the end of its enclosing value",
            );
            self.cursor.seek_to(limit)?;
            return Ok(());
        }

        if header.is_end_of_contents() {
            let closes_frame = self.stack.last().is_some_and(|f| {
                f.is_indefinite() && !matches!(f.schema, FrameSchema::Root { .. })
            });
            if closes_frame {
                self.pop_frame();
            } else {
                self.record(
                    AnomalyKind::StackUnderflow,
                    start,
                    "end-of-contents marker outside an indefinite-length value",
                );
            }
            return Ok(());
        }

        if let Some(FrameSchema::Segments { kind, node }) = self.stack.last().map(|f| &f.schema) {
            let (kind, node) = (*kind, *node);
            return self.decode_segment(kind, node, header, start);
        }

        match self.match_element(header.as_tag()) {
            Some(slot) => self.decode_slot(slot, header, start),
            None => self.decode_unknown(header, start),
        }
    }

    fn top_limit(&self) -> usize {
        self.stack
            .last()
            .map_or_else(|| self.data_len(), |frame| frame.limit)
    }

    /// Match the next element against the current frame and update its bookkeeping.
    fn match_element(&mut self, tag: Tag) -> Option<Slot<'s>> {
        let matcher = self.matcher;
        let mut missing: Vec<&'s str> = Vec::new();
        let frame = self.stack.last_mut()?;

        let slot = match (frame.mode, &mut frame.schema) {
            (FrameMode::ExpectChild, FrameSchema::Root { slot }) => {
                frame.accepted += 1;
                slot.filter(|slot| matcher.expects(*slot, tag))
            }
            (FrameMode::ExpectChild, FrameSchema::Fields { node, index, seen }) => {
                let node: &'s SchemaNode = *node;
                let found = if node.kind == SchemaKind::Set {
                    (0..node.children.len())
                        .find(|&j| !seen[j] && matcher.expects(Slot::field(&node.children[j]), tag))
                } else {
                    (*index..node.children.len())
                        .find(|&j| matcher.expects(Slot::field(&node.children[j]), tag))
                };
                found.map(|j| {
                    if node.kind == SchemaKind::Set {
                        seen[j] = true;
                    } else {
                        missing.extend(
                            node.children[*index..j]
                                .iter()
                                .filter(|child| !child.optional)
                                .map(|child| child.name.as_str()),
                        );
                        *index = j + 1;
                    }
                    Slot::field(&node.children[j])
                })
            }
            (FrameMode::InRepeat, FrameSchema::Repeat { element }) => {
                let slot = Slot::field(*element);
                matcher.expects(slot, tag).then_some(slot)
            }
            (FrameMode::ReferencePending, FrameSchema::Explicit { inner, matched }) => {
                frame.accepted += 1;
                if frame.accepted == 1 && matcher.expects(*inner, tag) {
                    *matched = true;
                    Some(*inner)
                } else {
                    None
                }
            }
            // InChoice: a choice element of this frame is still open.
            // AwaitEndOfContents: the schema is used up.
            _ => None,
        };

        if slot.is_some() && frame.is_indefinite() && frame.schema.is_exhausted() {
            frame.mode = FrameMode::AwaitEndOfContents;
            frame.base_mode = FrameMode::AwaitEndOfContents;
        }

        if !missing.is_empty() {
            let parent = frame.node.name.clone();
            let offset = self.cursor.tell();
            for name in missing {
                self.record(
                    AnomalyKind::MissingField,
                    offset,
                    format!("'{name}' missing from '{parent}'"),
                );
            }
        }
        slot
    }

    fn decode_slot(&mut self, slot: Slot<'s>, header: Header, start: usize) -> Result<()> {
        let (resolved, via_choice) = self.matcher.resolve(slot, header.as_tag());
        let frames_before = self.stack.len();
        if via_choice {
            if let Some(frame) = self.stack.last_mut() {
                frame.mode = FrameMode::InChoice;
            }
        }

        match resolved {
            Resolved::Explicit { outer, inner } => {
                let type_name = outer
                    .type_name
                    .map_or_else(|| header.as_tag().type_label(), str::to_string);
                if !header.constructed {
                    self.record(
                        AnomalyKind::MalformedValue,
                        start,
                        format!("explicit tag of '{}' is not constructed", outer.name),
                    );
                    self.emit_opaque(outer.name, type_name, header, start)?;
                } else {
                    let schema = FrameSchema::Explicit {
                        inner,
                        matched: false,
                    };
                    let clamp = self.config.length_clamps.constructed;
                    self.push_frame(
                        schema,
                        FrameMode::ReferencePending,
                        header,
                        start,
                        outer.name,
                        type_name,
                        Some(clamp),
                    )?;
                }
            }
            Resolved::Value(slot) => self.decode_value(slot, header, start)?,
            Resolved::Opaque { slot, kind, detail } => {
                self.record(kind, start, detail);
                let type_name = slot
                    .type_name
                    .map_or_else(|| header.as_tag().type_label(), str::to_string);
                self.emit_opaque(slot.name, type_name, header, start)?;
            }
        }

        if via_choice {
            if self.stack.len() > frames_before {
                if let Some(child) = self.stack.last_mut() {
                    child.resolves_choice = true;
                }
            } else if let Some(frame) = self.stack.last_mut() {
                frame.mode = frame.base_mode;
            }
        }
        Ok(())
    }

    fn decode_value(&mut self, slot: Slot<'s>, header: Header, start: usize) -> Result<()> {
        let node = slot.node;
        let kind = node.kind;
        let type_name = slot
            .type_name
            .map_or_else(|| type_name_for(kind, &header), str::to_string);
        let clamp = clamp_for(&self.config.length_clamps, kind);

        if kind.is_constructed() {
            if !header.constructed {
                self.record(
                    AnomalyKind::MalformedValue,
                    start,
                    format!("'{}' ({}) is encoded primitive", slot.name, kind.asn1_name()),
                );
                return self.emit_opaque(slot.name, type_name, header, start);
            }
            let (schema, mode) = if kind.is_repeated() {
                match node.element() {
                    Some(element) => (FrameSchema::Repeat { element }, FrameMode::InRepeat),
                    None => {
                        self.record(
                            AnomalyKind::MalformedValue,
                            start,
                            format!("'{}' has no element schema", slot.name),
                        );
                        return self.emit_opaque(slot.name, type_name, header, start);
                    }
                }
            } else {
                (
                    FrameSchema::Fields {
                        node,
                        index: 0,
                        seen: vec![false; node.children.len()],
                    },
                    FrameMode::ExpectChild,
                )
            };
            return self.push_frame(schema, mode, header, start, slot.name, type_name, clamp);
        }

        if header.constructed {
            if kind.is_string() {
                let schema = FrameSchema::Segments {
                    kind,
                    node: Some(node),
                };
                return self.push_frame(
                    schema,
                    FrameMode::ExpectChild,
                    header,
                    start,
                    slot.name,
                    type_name,
                    clamp,
                );
            }
            self.record(
                AnomalyKind::MalformedValue,
                start,
                format!("'{}' ({}) is encoded constructed", slot.name, kind.asn1_name()),
            );
            return self.emit_opaque(slot.name, type_name, header, start);
        }

        self.decode_primitive(kind, Some(node), slot.name, type_name, header, start, clamp)
    }

    /// Decode an element no schema slot describes.
    fn decode_unknown(&mut self, header: Header, start: usize) -> Result<()> {
        let tolerant = self
            .stack
            .last()
            .is_some_and(|frame| frame.schema.tolerates_unknown());
        if tolerant {
            return self.decode_untyped_element(header, start);
        }

        let (parent, mode) = self
            .stack
            .last()
            .map(|frame| (frame.node.name.clone(), frame.mode))
            .unwrap_or_default();
        let detail = match mode {
            FrameMode::AwaitEndOfContents => {
                format!("{} after the last member of '{parent}'", header.as_tag())
            }
            FrameMode::InChoice => {
                format!("{} while a choice of '{parent}' is unresolved", header.as_tag())
            }
            _ => format!("unexpected {} in '{parent}'", header.as_tag()),
        };
        self.record(AnomalyKind::TagMismatch, start, detail);
        let type_name = header.as_tag().type_label();
        if header.is_indefinite() {
            let clamp = self.config.length_clamps.constructed;
            return self.push_frame(
                FrameSchema::Untyped,
                FrameMode::AwaitEndOfContents,
                header,
                start,
                UNKNOWN_NAME,
                type_name,
                Some(clamp),
            );
        }
        self.emit_opaque(UNKNOWN_NAME, type_name, header, start)
    }

    /// Decode an element by its universal tag.
    fn decode_untyped_element(&mut self, header: Header, start: usize) -> Result<()> {
        let kind = untyped_kind(&header);
        let type_name = header.as_tag().type_label();
        let clamp = clamp_for(&self.config.length_clamps, kind);

        if header.constructed {
            let universal_string = header.class == TagClass::Universal && kind.is_string();
            let (schema, mode) = if universal_string {
                (FrameSchema::Segments { kind, node: None }, FrameMode::ExpectChild)
            } else if header.is_indefinite() {
                (FrameSchema::Untyped, FrameMode::AwaitEndOfContents)
            } else {
                (FrameSchema::Untyped, FrameMode::ExpectChild)
            };
            let clamp = if universal_string {
                clamp
            } else {
                Some(self.config.length_clamps.constructed)
            };
            return self.push_frame(schema, mode, header, start, "", type_name, clamp);
        }

        if kind.is_constructed() {
            self.record(
                AnomalyKind::MalformedValue,
                start,
                format!("{type_name} is encoded primitive"),
            );
            return self.emit_opaque("", type_name, header, start);
        }
        self.decode_primitive(kind, None, "", type_name, header, start, clamp)
    }

    /// Decode one segment of a constructed string.
    fn decode_segment(
        &mut self,
        kind: SchemaKind,
        node: Option<&'s SchemaNode>,
        header: Header,
        start: usize,
    ) -> Result<()> {
        let type_name = header.as_tag().type_label();
        if header.constructed {
            let clamp = clamp_for(&self.config.length_clamps, kind);
            return self.push_frame(
                FrameSchema::Segments { kind, node },
                FrameMode::ExpectChild,
                header,
                start,
                "",
                type_name,
                clamp,
            );
        }
        let Some(length) = header.length else {
            self.record(
                AnomalyKind::MalformedValue,
                start,
                "primitive string segment with indefinite length",
            );
            return self.push_frame(
                FrameSchema::Untyped,
                FrameMode::AwaitEndOfContents,
                header,
                start,
                "",
                type_name,
                None,
            );
        };
        let content_start = start + header.header_len;
        let end = self.bounded_end(length, None, content_start, "string segment")?;
        let content = self.cursor.read_bytes(end - content_start)?;
        let value = if kind == SchemaKind::BitString {
            decode_bit_string(content).unwrap_or_else(|_| DecodedValue::Bytes(content.to_vec()))
        } else {
            DecodedValue::Bytes(content.to_vec())
        };
        let mut segment = DecodedNode::new(header, "", type_name, start).with_value(value);
        segment.byte_range = (start, end);
        self.attach(segment);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_primitive(
        &mut self,
        kind: SchemaKind,
        node: Option<&'s SchemaNode>,
        name: &str,
        type_name: String,
        header: Header,
        start: usize,
        clamp: Option<usize>,
    ) -> Result<()> {
        let Some(length) = header.length else {
            self.record(
                AnomalyKind::MalformedValue,
                start,
                format!("primitive '{name}' with indefinite length"),
            );
            return self.push_frame(
                FrameSchema::Untyped,
                FrameMode::AwaitEndOfContents,
                header,
                start,
                name,
                type_name,
                None,
            );
        };

        let content_start = start + header.header_len;
        let label = if name.is_empty() { type_name.as_str() } else { name };
        let label = label.to_string();
        let end = self.bounded_end(length, clamp, content_start, &label)?;
        let content = self.cursor.read_bytes(end - content_start)?;

        let decoded = match kind {
            SchemaKind::Boolean => decode_boolean(content),
            SchemaKind::Integer | SchemaKind::Enumerated => decode_integer(content),
            SchemaKind::BitString => decode_bit_string(content),
            SchemaKind::Null => decode_null(content),
            SchemaKind::ObjectId
                if header.class == TagClass::Universal && header.tag == universal::RELATIVE_OID =>
            {
                decode_relative_oid(content)
            }
            SchemaKind::ObjectId => decode_object_id(content),
            SchemaKind::Real => decode_real(content),
            SchemaKind::CharString => decode_text(text_tag(&header), content),
            _ => Ok(DecodedValue::Bytes(content.to_vec())),
        };

        let value = match decoded {
            Ok(value) => value,
            Err(Malformed(message)) => {
                self.record(AnomalyKind::MalformedValue, start, format!("'{label}': {message}"));
                DecodedValue::Bytes(content.to_vec())
            }
        };

        let display = match node {
            Some(node) if !node.named_values.is_empty() => {
                self.named_display(node, &value, &label, start)
            }
            _ => None,
        };

        let mut decoded = DecodedNode::new(header, name, type_name, start).with_value(value);
        decoded.display = display;
        decoded.byte_range = (start, end);
        self.attach(decoded);
        Ok(())
    }

    fn named_display(
        &mut self,
        node: &SchemaNode,
        value: &DecodedValue,
        label: &str,
        start: usize,
    ) -> Option<String> {
        match value {
            DecodedValue::Int(v) => {
                let display = named_label(*v, &node.named_values);
                if display.is_none() {
                    self.record(
                        AnomalyKind::NamedValueMissing,
                        start,
                        format!("'{label}' has no name for value {v}"),
                    );
                }
                display
            }
            DecodedValue::BitString { .. } => named_bits(value, &node.named_values),
            _ => None,
        }
    }

    /// Content end for a definite length, applying the sanity clamp and the
    /// enclosing frame's bound.
    fn bounded_end(
        &mut self,
        length: usize,
        clamp: Option<usize>,
        content_start: usize,
        label: &str,
    ) -> Result<usize> {
        let mut length = length;
        if let Some(max) = clamp {
            if length > max {
                self.record(
                    AnomalyKind::LengthClamped,
                    content_start,
                    format!("'{label}': length {length} clamped to {max}"),
                );
                length = max;
            }
        }

        let limit = self.top_limit();
        let data_len = self.data_len();
        let end = content_start.saturating_add(length);
        if end <= limit {
            return Ok(end);
        }
        if limit >= data_len {
            return Err(CodecError::truncated(
                length,
                data_len.saturating_sub(content_start),
                content_start,
            ));
        }
        self.record(
            AnomalyKind::LengthClamped,
            content_start,
            format!("'{label}': length {length} runs past the enclosing end at {limit}"),
        );
        Ok(limit)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_frame(
        &mut self,
        schema: FrameSchema<'s>,
        mode: FrameMode,
        header: Header,
        start: usize,
        name: &str,
        type_name: String,
        clamp: Option<usize>,
    ) -> Result<()> {
        if self.stack.len() > self.config.max_nesting_depth as usize {
            self.record(
                AnomalyKind::NestingTooDeep,
                start,
                format!(
                    "'{name}' nests deeper than {} levels",
                    self.config.max_nesting_depth
                ),
            );
            return self.emit_opaque(name, type_name, header, start);
        }

        let content_start = start + header.header_len;
        let end = match header.length {
            Some(length) => {
                let label = if name.is_empty() { type_name.as_str() } else { name };
                let label = label.to_string();
                Some(self.bounded_end(length, clamp, content_start, &label)?)
            }
            None => None,
        };
        let parent_limit = self.top_limit();
        let limit = end.unwrap_or(parent_limit);
        debug_assert!(limit <= parent_limit);

        let mut node = DecodedNode::new(header, name, type_name, start);
        if let Some(end) = end {
            node.byte_range.1 = end;
        }
        self.stack
            .push(DecodeFrame::new(schema, mode, node, end, limit));
        Ok(())
    }

    /// Emit an opaque node spanning the element and move past it.
    fn emit_opaque(
        &mut self,
        name: &str,
        type_name: String,
        header: Header,
        start: usize,
    ) -> Result<()> {
        let content_start = start + header.header_len;
        let end = match header.length {
            Some(length) => {
                let label = if name.is_empty() { type_name.as_str() } else { name };
                let label = label.to_string();
                let end = self.bounded_end(length, None, content_start, &label)?;
                self.cursor.seek_to(end)?;
                end
            }
            None => self.skip_indefinite()?,
        };
        let content = self.cursor.data()[content_start..end].to_vec();
        let mut node = DecodedNode::new(header, name, type_name, start)
            .with_value(DecodedValue::Bytes(content));
        node.byte_range = (start, end);
        self.attach(node);
        Ok(())
    }

    /// Move past the content of an indefinite-length element; returns the end offset.
    fn skip_indefinite(&mut self) -> Result<usize> {
        let limit = self.top_limit();
        let data_len = self.data_len();
        let mut open = 1usize;
        while open > 0 {
            let tell = self.cursor.tell();
            if tell >= limit {
                if limit >= data_len {
                    return Err(CodecError::truncated(2, 0, tell));
                }
                self.record(
                    AnomalyKind::MalformedValue,
                    tell,
                    "skipped value has no end-of-contents marker",
                );
                return Ok(limit);
            }
            let header = decode_header(&mut self.cursor)?;
            if header.is_end_of_contents() {
                open -= 1;
                continue;
            }
            match header.length {
                None => open += 1,
                Some(length) => {
                    let end = self.cursor.tell().saturating_add(length);
                    if end > limit {
                        if limit >= data_len {
                            return Err(CodecError::truncated(
                                length,
                                data_len.saturating_sub(self.cursor.tell()),
                                self.cursor.tell(),
                            ));
                        }
                        self.cursor.seek_to(limit)?;
                    } else {
                        self.cursor.seek_to(end)?;
                    }
                }
            }
        }
        Ok(self.cursor.tell())
    }

    fn attach(&mut self, node: DecodedNode) {
        if let Some(frame) = self.stack.last_mut() {
            frame.node.children.push(node);
        }
    }

    /// Close the top frame and attach its node to the parent.
    fn pop_frame(&mut self) {
        let Some(mut frame) = self.stack.pop() else {
            return;
        };
        let tell = self.cursor.tell();
        frame.node.byte_range.1 = tell;

        let node = match frame.schema {
            FrameSchema::Fields { node, index, seen } => {
                let missing: Vec<&str> = if node.kind == SchemaKind::Set {
                    node.children
                        .iter()
                        .zip(&seen)
                        .filter(|(child, seen)| !**seen && !child.optional)
                        .map(|(child, _)| child.name.as_str())
                        .collect()
                } else {
                    node.children[index.min(node.children.len())..]
                        .iter()
                        .filter(|child| !child.optional)
                        .map(|child| child.name.as_str())
                        .collect()
                };
                for name in missing {
                    self.diagnostics.record(
                        AnomalyKind::MissingField,
                        tell,
                        self.stack.len(),
                        format!("'{name}' missing from '{}'", frame.node.name),
                    );
                }
                frame.node
            }
            FrameSchema::Explicit { matched, .. } => {
                if frame.accepted == 0 {
                    self.diagnostics.record(
                        AnomalyKind::MissingField,
                        tell,
                        self.stack.len(),
                        format!("explicit tag of '{}' is empty", frame.node.name),
                    );
                }
                if matched && frame.node.children.len() == 1 {
                    frame.node.children.remove(0)
                } else {
                    frame.node
                }
            }
            FrameSchema::Segments { kind, node } => {
                let mut assembled = frame.node;
                match reassemble(kind, &mut assembled) {
                    Ok(()) => {
                        if let Some(node) = node.filter(|n| !n.named_values.is_empty()) {
                            assembled.display = named_bits(&assembled.value, &node.named_values);
                        }
                    }
                    Err(message) => {
                        let offset = assembled.byte_range.0;
                        self.diagnostics.record(
                            AnomalyKind::MalformedValue,
                            offset,
                            self.stack.len(),
                            format!("'{}': {message}", assembled.name),
                        );
                    }
                }
                assembled
            }
            FrameSchema::Root { .. } | FrameSchema::Repeat { .. } | FrameSchema::Untyped => {
                frame.node
            }
        };

        if let Some(parent) = self.stack.last_mut() {
            parent.node.children.push(node);
            if frame.resolves_choice {
                parent.mode = parent.base_mode;
            }
        }
    }

    fn finish(mut self, offset: usize) -> std::result::Result<DecodeOutcome, DecodeFailure> {
        let tell = self.cursor.tell();
        let root = self.stack.pop().and_then(|mut root| root.node.children.pop());
        let Some(root) = root else {
            return Err(self.abort(CodecError::Other("decode produced no value".to_string())));
        };
        tracing::debug!(
            context = "decode",
            offset,
            bytes = tell - offset,
            anomalies = self.diagnostics.count(),
            "decoded {}",
            root.type_name
        );
        Ok(DecodeOutcome {
            root,
            diagnostics: self.diagnostics,
            offset,
            bytes_consumed: tell - offset,
        })
    }

    /// Unwind after a fatal error, keeping what was built so far.
    fn abort(mut self, error: CodecError) -> DecodeFailure {
        let offset = error.offset().unwrap_or(self.cursor.tell());
        let depth = self.depth();
        let tell = self.cursor.tell();
        while self.stack.len() > 1 {
            if let Some(mut frame) = self.stack.pop() {
                frame.node.byte_range.1 = tell;
                self.attach(frame.node);
            }
        }
        let partial = self.stack.pop().and_then(|mut root| root.node.children.pop());
        tracing::warn!(
            context = "decode",
            offset,
            depth,
            error = %error,
            "decode aborted"
        );
        DecodeFailure {
            error,
            offset,
            depth,
            partial,
            diagnostics: self.diagnostics,
        }
    }
}

/// Concatenate the segments of a constructed string into one value.
fn reassemble(kind: SchemaKind, node: &mut DecodedNode) -> std::result::Result<(), String> {
    let value = match kind {
        SchemaKind::BitString => {
            let mut bits = Vec::new();
            let mut unused = 0u8;
            let count = node.children.len();
            for (i, segment) in node.children.iter().enumerate() {
                match &segment.value {
                    DecodedValue::BitString {
                        bits: part,
                        unused_trailing,
                    } => {
                        if *unused_trailing != 0 && i + 1 != count {
                            return Err("only the last bit string segment may have unused bits"
                                .to_string());
                        }
                        bits.extend_from_slice(part);
                        unused = *unused_trailing;
                    }
                    _ => return Err(format!("segment {i} is not a bit string")),
                }
            }
            DecodedValue::BitString {
                bits,
                unused_trailing: unused,
            }
        }
        _ => {
            let mut bytes = Vec::new();
            for (i, segment) in node.children.iter().enumerate() {
                match &segment.value {
                    DecodedValue::Bytes(part) => bytes.extend_from_slice(part),
                    _ => return Err(format!("segment {i} is not an octet string")),
                }
            }
            if kind == SchemaKind::CharString {
                decode_text(text_tag(&node.header), &bytes).map_err(|e| e.0)?
            } else {
                DecodedValue::Bytes(bytes)
            }
        }
    };
    node.value = value;
    node.children.clear();
    Ok(())
}
