// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BER decoder integration tests.
//!
//! Schema-driven decoding of hand-built and writer-built records, plus the
//! recovery paths for malformed input.

mod common;

use common::{encode_event, event_schema, lcg_bytes};
use wirecodec::{
    AnomalyKind, BerDecoder, CodecError, DecodedNode, DecodedValue, DecoderConfig, SchemaNode,
    SchemaTable, Tag,
};

fn table(types: Vec<SchemaNode>) -> SchemaTable {
    SchemaTable::from_types(types).unwrap()
}

/// Assert that every child lies inside its parent and siblings do not overlap.
fn assert_ranges_nested(node: &DecodedNode, data_len: usize) {
    let (start, end) = node.byte_range;
    assert!(start <= end && end <= data_len, "{:?}", node.byte_range);
    let mut previous_end = start;
    for child in &node.children {
        let (child_start, child_end) = child.byte_range;
        assert!(child_start >= previous_end, "{} overlaps its sibling", child.name);
        assert!(child_end <= end, "{} overruns its parent", child.name);
        previous_end = child_end;
        assert_ranges_nested(child, data_len);
    }
}

// ============================================================================
// Schema-driven decoding
// ============================================================================

#[test]
fn test_event_record() {
    let schema = event_schema();
    let data = encode_event(42, Some(1), "sensor-7", &["rack1", "zone-b"], 503);
    let outcome = BerDecoder::new(&schema).decode(&data, "Event").unwrap();

    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.bytes_consumed, data.len());

    let root = &outcome.root;
    assert_eq!(root.type_name, "Event");
    assert_eq!(root.find_path("id").unwrap().value.as_i64(), Some(42));

    let severity = root.child("severity").unwrap();
    assert_eq!(severity.type_name, "Severity");
    assert_eq!(severity.display.as_deref(), Some("warning"));

    let source = root.child("source").unwrap();
    assert_eq!(source.type_name, "UTF8String");
    assert_eq!(source.value.as_str(), Some("sensor-7"));

    let tags = root.child("tags").unwrap();
    assert_eq!(tags.type_name, "SEQUENCE OF");
    let names: Vec<_> = tags.children.iter().filter_map(|t| t.value.as_str()).collect();
    assert_eq!(names, vec!["rack1", "zone-b"]);
    assert!(tags.children.iter().all(|t| t.name == "tag"));

    // The chosen alternative appears in place of the untagged choice.
    assert_eq!(root.child("code").unwrap().value.as_i64(), Some(503));
    assert!(root.child("payload").is_none());

    assert_ranges_nested(root, data.len());
}

#[test]
fn test_optional_field_absent() {
    let schema = event_schema();
    let data = encode_event(1, None, "s", &[], 0);
    let outcome = BerDecoder::new(&schema).decode(&data, "Event").unwrap();
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    assert!(outcome.root.child("severity").is_none());
    assert!(outcome.root.child("tags").unwrap().children.is_empty());
}

#[test]
fn test_choice_inside_repeat() {
    let schema = table(vec![SchemaNode::sequence_of(
        "Items",
        SchemaNode::choice(
            "item",
            vec![
                SchemaNode::integer("a").tagged(Tag::context(0)),
                SchemaNode::octet_string("b").tagged(Tag::context(1)),
            ],
        ),
    )]);
    let data = [
        0x30, 0x0A, 0x80, 0x01, 0x05, 0x81, 0x02, 0x68, 0x69, 0x80, 0x01, 0x07,
    ];
    let outcome = BerDecoder::new(&schema).decode(&data, "Items").unwrap();
    assert_eq!(outcome.anomaly_count(), 0);

    let children = &outcome.root.children;
    let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "a"]);
    let types: Vec<_> = children.iter().map(|c| c.type_name.as_str()).collect();
    assert_eq!(types, vec!["INTEGER", "OCTET STRING", "INTEGER"]);
    assert_eq!(children[0].value, DecodedValue::Int(5));
    assert_eq!(children[1].value.as_bytes(), Some(&b"hi"[..]));
    assert_eq!(children[2].value, DecodedValue::Int(7));
}

#[test]
fn test_shared_table_across_threads() {
    let schema = event_schema();
    let data = encode_event(9, Some(2), "edge", &["x"], 1);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let outcome = BerDecoder::new(&schema).decode(&data, "Event").unwrap();
                assert_eq!(
                    outcome.root.child("severity").unwrap().display.as_deref(),
                    Some("error")
                );
            });
        }
    });
}

// ============================================================================
// Recovery
// ============================================================================

#[test]
fn test_boolean_length_clamp() {
    let schema = table(vec![SchemaNode::sequence(
        "Msg",
        vec![SchemaNode::boolean("flag"), SchemaNode::integer("n")],
    )]);
    // BOOLEAN declares 200 content bytes; only one is plausible.
    let data = [0x30, 0x07, 0x01, 0x81, 0xC8, 0xFF, 0x02, 0x01, 0x05];
    let outcome = BerDecoder::new(&schema).decode(&data, "Msg").unwrap();

    assert_eq!(outcome.diagnostics.count_of(AnomalyKind::LengthClamped), 1);
    assert_eq!(outcome.anomaly_count(), 1);
    let flag = outcome.root.child("flag").unwrap();
    assert_eq!(flag.value.as_bool(), Some(true));
    assert_eq!(flag.byte_range, (2, 6));
    assert_eq!(outcome.root.child("n").unwrap().value.as_i64(), Some(5));
}

#[test]
fn test_truncated_octet_string() {
    let schema = table(vec![SchemaNode::octet_string("Blob")]);
    let mut data = vec![0x04, 0x32];
    data.extend_from_slice(&[0xAA; 10]);
    let failure = BerDecoder::new(&schema).decode(&data, "Blob").unwrap_err();

    assert!(failure.is_truncated());
    assert_eq!(failure.offset, 2);
    match failure.error {
        CodecError::TruncatedInput {
            requested,
            available,
            offset,
        } => {
            assert_eq!((requested, available, offset), (50, 10, 2));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_reference_cycle_is_bounded() {
    let schema = table(vec![SchemaNode::type_ref("A", 1), SchemaNode::type_ref("B", 0)]);
    let outcome = BerDecoder::new(&schema)
        .decode(&[0x02, 0x01, 0x05], "A")
        .unwrap();

    assert_eq!(
        outcome.diagnostics.count_of(AnomalyKind::ReferenceDepthExceeded),
        1
    );
    assert_eq!(outcome.root.name, "A");
    assert_eq!(outcome.root.type_name, "B");
    assert_eq!(outcome.root.value.as_bytes(), Some(&[0x05][..]));
    assert_eq!(outcome.bytes_consumed, 3);
}

#[test]
fn test_records_stop_at_first_failure() {
    let schema = event_schema();
    let mut data = encode_event(1, None, "a", &[], 0);
    data.extend(encode_event(2, Some(0), "b", &["t"], 0));
    data.extend_from_slice(&[0x30, 0x20, 0x02]);

    let decoder = BerDecoder::new(&schema);
    let results: Vec<_> = decoder.records(&data, 0, "Event").collect();
    assert_eq!(results.len(), 3);
    let ids: Vec<_> = results[..2]
        .iter()
        .map(|r| r.as_ref().unwrap().root.child("id").unwrap().value.as_i64())
        .collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
    assert!(results[2].as_ref().unwrap_err().is_truncated());
}

#[test]
fn test_random_input_never_panics() {
    let schema = event_schema();
    let typed = BerDecoder::new(&schema);
    let untyped = BerDecoder::untyped(DecoderConfig::default());

    for seed in 0..500u64 {
        let data = lcg_bytes(seed, 1 + (seed as usize % 96));
        for result in [typed.decode(&data, "Event"), untyped.decode_untyped(&data, 0)] {
            match result {
                Ok(outcome) => {
                    assert!(outcome.bytes_consumed <= data.len());
                    assert_ranges_nested(&outcome.root, data.len());
                }
                Err(failure) => assert!(failure.offset <= data.len() + 2),
            }
        }
    }
}

#[test]
fn test_mutated_records_never_panic() {
    let schema = event_schema();
    let decoder = BerDecoder::new(&schema);
    let original = encode_event(77, Some(2), "mutation", &["a", "bb", "ccc"], -4);

    for (i, noise) in lcg_bytes(7, original.len() * 3).into_iter().enumerate() {
        let mut data = original.clone();
        let at = i % data.len();
        data[at] ^= noise | 1;
        if let Ok(outcome) = decoder.decode(&data, "Event") {
            assert!(outcome.end_offset() <= data.len());
            assert_ranges_nested(&outcome.root, data.len());
        }
    }
}
