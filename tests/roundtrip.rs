//! Integration tests covering the concrete scenario table (spec §8): for
//! each Tibs text `t`, `nibs_encode(tibs_decode(t))` must equal the listed
//! bytes exactly.

use nibs::{hex, nibs_decode, nibs_encode, nibs_is_container, tibs_decode, tibs_encode, Value};

fn interop_case(text: &str, expected_hex: &str) {
    let value = tibs_decode(text).unwrap_or_else(|e| panic!("failed to parse {text:?}: {e}"));
    let bytes = nibs_encode(&value).unwrap_or_else(|e| panic!("failed to encode {text:?}: {e}"));
    assert_eq!(
        hex::bytes_to_hex(&bytes),
        expected_hex.replace(' ', ""),
        "mismatch encoding {text:?}"
    );
}

#[test]
fn spec_concrete_scenarios() {
    interop_case("0", "00");
    interop_case("-1", "01");
    interop_case("42", "0c 54");
    interop_case("500", "0d e8 03");
    interop_case("-500", "0d e7 03");
    interop_case("3.141592653589793", "1f 18 2d 44 54 fb 21 09 40");
    interop_case("true", "21");
    interop_case("false", "20");
    interop_case("null", "22");
    interop_case("\"Hello\"", "95 48 65 6c 6c 6f");
    interop_case("[1,2,3]", "a3 02 04 06");
    interop_case("{\"name\":\"Tim\"}", "b9 94 6e 61 6d 65 93 54 69 6d");
    interop_case("<010203>", "83 01 02 03");
}

#[test]
fn tibs_round_trips_through_value_and_back_to_text() {
    let samples = [
        "null",
        "true",
        "false",
        "0",
        "-500",
        "3.5",
        "\"hi there\"",
        "<0102ff>",
        "[1,2,3]",
        "{\"a\":1,\"b\":2}",
    ];
    for text in samples {
        let value = tibs_decode(text).unwrap();
        let rendered = tibs_encode(&value);
        let reparsed = tibs_decode(&rendered).unwrap();
        assert_eq!(value, reparsed, "round trip mismatch for {text:?}");
    }
}

#[test]
fn integer_valued_float_stays_a_float_through_tibs() {
    let rendered = tibs_encode(&Value::Float(1.0));
    assert_ne!(rendered, "1", "an integer-valued float must not render as a bare integer literal");
    let reparsed = tibs_decode(&rendered).unwrap();
    assert_eq!(reparsed, Value::Float(1.0));
    assert_ne!(reparsed, Value::Int(1));
}

#[test]
fn nibs_round_trips_a_nested_document() {
    let mut inner = nibs::Map::new();
    inner.insert(Value::String("x".to_string()), Value::Int(1));
    inner.insert(Value::String("y".to_string()), Value::Float(2.5));
    let value = Value::List(vec![
        Value::Null,
        Value::Bool(true),
        Value::Map(inner),
        Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]),
    ]);
    let bytes = nibs_encode(&value).unwrap();
    let (decoded, consumed) = nibs_decode(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded.into_owned().unwrap(), value);
}

#[test]
fn lazy_decode_matches_materialized_decode() {
    let value = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let bytes = nibs_encode(&value).unwrap();
    let (decoded, _) = nibs_decode(&bytes).unwrap();
    assert!(nibs_is_container(&decoded));
    assert_eq!(decoded.into_owned().unwrap(), value);
}
