//! Scene document parser tests
//!
//! Tests for:
//! - Whitespace stripping outside quoted strings
//! - Bracket-balanced recursive splitting
//! - Round-trip: parse -> serialize -> parse is structurally identity
//! - Error reporting for malformed documents
//! - Document magic check and element access

use helios::s72::{self, value, Document, Value};

// ============================================================================
// Value parsing
// ============================================================================

#[test]
fn parses_numbers_and_strings() {
    assert_eq!(value::parse("42").unwrap(), Value::Number(42.0));
    assert_eq!(value::parse("-1.5").unwrap(), Value::Number(-1.5));
    assert_eq!(
        value::parse("\"hello\"").unwrap(),
        Value::String("hello".into())
    );
}

#[test]
fn strings_keep_internal_whitespace() {
    let v = value::parse("\"two  words\"").unwrap();
    assert_eq!(v, Value::String("two  words".into()));
}

#[test]
fn parses_nested_arrays() {
    let v = value::parse("[1, [2, 3], [[4]]]").unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_number(), Some(1.0));
    assert_eq!(items[1].as_array().unwrap().len(), 2);
    assert_eq!(items[2].as_array().unwrap()[0].as_array().unwrap().len(), 1);
}

#[test]
fn parses_maps_with_mixed_values() {
    let v = value::parse(r#"{"name":"box", "count": 3, "roots":[1, 2]}"#).unwrap();
    assert_eq!(v.get("name").and_then(Value::as_str), Some("box"));
    assert_eq!(v.get("count").and_then(Value::as_number), Some(3.0));
    assert_eq!(v.get("roots").and_then(Value::as_array).unwrap().len(), 2);
}

#[test]
fn whitespace_everywhere_is_ignored() {
    let v = value::parse(" [ 1 ,\n\t{ \"a\" : 2 } ] ").unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].get("a").and_then(Value::as_number), Some(2.0));
}

#[test]
fn empty_array_and_map() {
    assert_eq!(value::parse("[]").unwrap(), Value::Array(vec![]));
    assert!(value::parse("{}").unwrap().as_map().unwrap().is_empty());
}

// ============================================================================
// Round trip (parse . serialize . parse == parse)
// ============================================================================

#[test]
fn round_trip_is_structural_identity() {
    let text = r#"["s72-v1",
        {"type":"SCENE", "name":"demo scene", "roots":[2, 3]},
        {"type":"NODE", "name":"a", "translation":[1, 0, -2.5],
         "rotation":[0, 0, 0, 1], "scale":[1, 1, 1], "children":[3]},
        {"type":"NODE", "name":"b"}]"#;

    let first = value::parse(text).unwrap();
    let serialized = first.serialize();
    let second = value::parse(&serialized).unwrap();
    assert_eq!(first, second);

    // A second cycle is a fixed point.
    assert_eq!(second.serialize(), serialized);
}

#[test]
fn round_trip_escaped_quotes() {
    let v = Value::String("say \"hi\"".into());
    let reparsed = value::parse(&v.serialize()).unwrap();
    assert_eq!(v, reparsed);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn bracket_mismatch_is_an_error() {
    assert!(value::parse("[1, 2").is_err());
    assert!(value::parse("[1, 2]]").is_err());
    assert!(value::parse("{\"a\": [1}").is_err());
}

#[test]
fn bare_words_are_errors() {
    assert!(value::parse("hello").is_err());
}

// ============================================================================
// Document
// ============================================================================

#[test]
fn document_requires_magic() {
    let err = Document::from_text("[\"wrong\"]", ".".into());
    assert!(err.is_err());

    let ok = Document::from_text("[\"s72-v1\"]", ".".into());
    assert!(ok.is_ok());
}

#[test]
fn document_element_range_is_checked() {
    let doc = Document::from_text("[\"s72-v1\", {\"type\":\"SCENE\"}]", ".".into()).unwrap();
    assert!(doc.element(1).is_ok());
    assert!(doc.element(5).is_err());
}

#[test]
fn typed_accessors_report_missing_keys() {
    let v = value::parse(r#"{"name":"x"}"#).unwrap();
    assert!(s72::require_str(&v, "name", "TEST").is_ok());
    assert!(s72::require_str(&v, "absent", "TEST").is_err());
    assert!(s72::require_number(&v, "name", "TEST").is_err());
}
