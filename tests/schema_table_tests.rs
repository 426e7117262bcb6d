// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema table loading tests.

mod common;

use common::{encode_event, event_schema};
use wirecodec::{load_schema, BerDecoder, CodecError, SchemaFormat, SchemaKind, SchemaTable};

const EVENT_JSON: &str = r#"[
  {
    "id": 0,
    "kind": "Sequence",
    "name": "Event",
    "children": [
      { "kind": "Integer", "name": "id" },
      {
        "kind": "TypeRef",
        "name": "severity",
        "type_id": 1,
        "default_tag": { "class": "Context", "number": 0 },
        "implicit": true,
        "optional": true
      },
      {
        "kind": "CharString",
        "name": "source",
        "default_tag": { "class": "Universal", "number": 12 },
        "implicit": true
      },
      {
        "kind": "SequenceOf",
        "name": "tags",
        "children": [
          {
            "kind": "CharString",
            "name": "tag",
            "default_tag": { "class": "Universal", "number": 22 },
            "implicit": true
          }
        ]
      },
      {
        "kind": "Choice",
        "name": "payload",
        "children": [
          {
            "kind": "OctetString",
            "name": "raw",
            "default_tag": { "class": "Context", "number": 1 },
            "implicit": true
          },
          {
            "kind": "Integer",
            "name": "code",
            "default_tag": { "class": "Context", "number": 2 },
            "implicit": true
          }
        ]
      }
    ]
  },
  {
    "id": 1,
    "kind": "Enumerated",
    "name": "Severity",
    "named_values": [[0, "info"], [1, "warning"], [2, "error"]]
  }
]"#;

#[test]
fn test_json_source_matches_builder() {
    let from_json = load_schema(EVENT_JSON.as_bytes(), SchemaFormat::Json).unwrap();
    assert_eq!(from_json, event_schema());
}

#[test]
fn test_binary_load_is_idempotent() {
    let bytes = event_schema().to_bytes().unwrap();
    let first = load_schema(&bytes, SchemaFormat::Binary).unwrap();
    let second = SchemaTable::load(&bytes).unwrap();
    assert_eq!(first, second);
    assert_eq!(second.to_bytes().unwrap(), bytes);
}

#[test]
fn test_loaded_table_decodes_like_built_table() {
    let built = event_schema();
    let loaded = SchemaTable::load(&built.to_bytes().unwrap()).unwrap();
    let data = encode_event(5, Some(2), "loaded", &["one"], 12);

    let expected = BerDecoder::new(&built).decode(&data, "Event").unwrap();
    let actual = BerDecoder::new(&loaded).decode(&data, "Event").unwrap();
    assert_eq!(actual.root, expected.root);
    assert!(actual.is_clean());
}

#[test]
fn test_lookups() {
    let table = event_schema();
    assert_eq!(table.len(), 2);
    assert_eq!(table.type_id_of("Severity"), Some(1));
    assert_eq!(
        table.resolve_type_ref(1).map(|node| node.kind),
        Some(SchemaKind::Enumerated)
    );
    assert_eq!(table.lookup_named_value(1, 2), Some("error"));
    assert_eq!(table.lookup_named_value(1, 9), None);
    assert!(table.lookup_top_level("Missing").is_none());
}

#[test]
fn test_malformed_sources_rejected() {
    let err = load_schema(b"[{\"kind\": \"Sequence\"", SchemaFormat::Json).unwrap_err();
    assert!(matches!(err, CodecError::SchemaLoad { .. }));

    let mut bytes = event_schema().to_bytes().unwrap();
    bytes.truncate(bytes.len() / 2);
    assert!(SchemaTable::load(&bytes).is_err());

    assert!(load_schema(&[0xFF, 0x00], SchemaFormat::Binary).is_err());
}
