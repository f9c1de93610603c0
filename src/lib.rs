//! Nibs and Tibs: a self-describing binary serialization format and its
//! human-readable textual superset of JSON.
//!
//! [`nibs`] is the binary codec: a compact byte-tagged wire format with a
//! lazy, pointer-walking decoder over composite containers. [`tibs`] is the
//! textual codec: a recursive-descent parser/encoder for a JSON superset
//! that adds byte literals, references, scopes, and indexed containers.
//! Both share the [`value::Value`] model defined here, and the hex helpers
//! in [`hex`].

pub mod error;
pub mod hex;
pub mod nibs;
pub mod options;
pub mod tibs;
pub mod value;

pub use error::{NibsError, TibsError};
pub use options::{NibsOptions, RefTable, TibsOptions};
pub use value::{Map, Value};

/// Parses a full Tibs document (§6 `tibs_decode`).
pub fn tibs_decode(text: &str) -> Result<Value, TibsError> {
    tibs::parse(text)
}

/// Serializes `value` to Tibs text (§6 `tibs_encode`).
pub fn tibs_encode(value: &Value) -> String {
    tibs::encode(value)
}

/// Encodes `value` to a Nibs byte buffer (§6 `nibs_encode`).
pub fn nibs_encode(value: &Value) -> Result<Vec<u8>, NibsError> {
    nibs::encode(value)
}

/// Decodes a single Nibs value from `bytes`, returning it (materialized or
/// as a lazy handle) and the number of bytes consumed (§6 `nibs_decode`).
pub fn nibs_decode(bytes: &[u8]) -> Result<(nibs::Decoded<'_>, usize), NibsError> {
    nibs::decode(bytes, 0)
}

/// True if `decoded` is a lazy container handle rather than a materialized
/// scalar (§6 `nibs_is_container`).
pub fn nibs_is_container(decoded: &nibs::Decoded) -> bool {
    nibs::is_container(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tibs_to_nibs_interop_smoke_test() {
        let value = tibs_decode("{\"name\":\"Tim\"}").unwrap();
        let bytes = nibs_encode(&value).unwrap();
        assert_eq!(crate::hex::bytes_to_hex(&bytes), "b9946e616d659354696d");
    }

    #[test]
    fn nibs_round_trip_through_value() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let bytes = nibs_encode(&value).unwrap();
        let (decoded, consumed) = nibs_decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(nibs_is_container(&decoded));
        assert_eq!(decoded.into_owned().unwrap(), value);
    }
}
