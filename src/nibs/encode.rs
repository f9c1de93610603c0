//! The Nibs encoder: a size pass followed by a write pass over a recursive
//! tree of write records (§4.3), the same two-step shape as hematite's
//! `NbtValue::len()` / `NbtValue::write()` pair.

use super::head::{self, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, TAG_BYTE, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_REF, TAG_SIMPLE, TAG_STRING, TAG_TUPLE};
use crate::error::NibsError;
use crate::options::NibsOptions;
use crate::value::Value;

/// Encodes `value` into a single contiguous Nibs buffer (§4.3), using the
/// default [`NibsOptions`].
pub fn encode(value: &Value) -> Result<Vec<u8>, NibsError> {
    encode_with(value, &NibsOptions::default())
}

/// Encodes `value` with explicit `options`, applying the §9 open-question
/// decisions they carry.
pub fn encode_with(value: &Value, options: &NibsOptions) -> Result<Vec<u8>, NibsError> {
    let total = size_of(value, options)?;
    let mut out = Vec::with_capacity(total);
    write_value(&mut out, value, options)?;
    debug_assert_eq!(out.len(), total, "write pass produced a different length than the size pass computed");
    Ok(out)
}

fn bigint_as_i64(digits: &str) -> Result<i64, NibsError> {
    digits.parse::<i64>().map_err(|_| {
        log::warn!("nibs: BigInt {digits:?} out of i64 range for encoding");
        NibsError::IntegerTooLarge {
            digits: digits.to_string(),
        }
    })
}

fn size_of(value: &Value, options: &NibsOptions) -> Result<usize, NibsError> {
    Ok(match value {
        Value::Null | Value::Bool(_) => 1, // SIMPLE subtype codes (0/1/2) always fit the 1-byte head form
        Value::Int(n) => head::encoded_len(head::zigzag_encode(*n)),
        Value::BigInt(digits) => head::encoded_len(head::zigzag_encode(bigint_as_i64(digits)?)),
        Value::Float(x) => head::encoded_len(x.to_bits()),
        Value::Ref(n) => head::encoded_len(*n),
        Value::String(s) => head::encoded_len(s.len() as u64) + s.len(),
        Value::Bytes(b) => head::encoded_len(b.len() as u64) + b.len(),
        Value::List(items) => list_size(items, options)?,
        Value::Array(items) => {
            require_cosmetic(options)?;
            list_size(items, options)?
        }
        Value::Map(pairs) => map_size(pairs, options)?,
        Value::Trie(pairs) => {
            require_cosmetic(options)?;
            map_size(pairs, options)?
        }
        Value::Scope(_, _) => {
            log::warn!("nibs: attempted to encode a Scope, which has no Nibs wire representation");
            return Err(NibsError::UnsupportedValue {
                kind: "Scope has no Nibs wire representation".to_string(),
            });
        }
    })
}

fn require_cosmetic(options: &NibsOptions) -> Result<(), NibsError> {
    if options.indexed_containers_are_cosmetic {
        Ok(())
    } else {
        log::warn!("nibs: non-cosmetic indexed container encoding requested but not implemented");
        Err(NibsError::UnsupportedValue {
            kind: "indexed container encoding (non-cosmetic) is not implemented".to_string(),
        })
    }
}

fn list_size(items: &[Value], options: &NibsOptions) -> Result<usize, NibsError> {
    let mut body = 0usize;
    for item in items {
        body += size_of(item, options)?;
    }
    Ok(head::encoded_len(body as u64) + body)
}

fn map_size(pairs: &crate::value::Map, options: &NibsOptions) -> Result<usize, NibsError> {
    let mut body = 0usize;
    for (k, v) in pairs.iter() {
        body += size_of(k, options)?;
        body += size_of(v, options)?;
    }
    Ok(head::encoded_len(body as u64) + body)
}

fn write_value(out: &mut Vec<u8>, value: &Value, options: &NibsOptions) -> Result<(), NibsError> {
    match value {
        Value::Null => head::write_head(out, TAG_SIMPLE, SIMPLE_NULL),
        Value::Bool(false) => head::write_head(out, TAG_SIMPLE, SIMPLE_FALSE),
        Value::Bool(true) => head::write_head(out, TAG_SIMPLE, SIMPLE_TRUE),
        Value::Int(n) => head::write_head(out, TAG_INT, head::zigzag_encode(*n)),
        Value::BigInt(digits) => {
            head::write_head(out, TAG_INT, head::zigzag_encode(bigint_as_i64(digits)?))
        }
        Value::Float(x) => head::write_head(out, TAG_FLOAT, x.to_bits()),
        Value::Ref(n) => head::write_head(out, TAG_REF, *n),
        Value::String(s) => {
            head::write_head(out, TAG_STRING, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            head::write_head(out, TAG_BYTE, b.len() as u64);
            out.extend_from_slice(b);
        }
        Value::List(items) => write_list(out, items, options)?,
        Value::Array(items) => {
            require_cosmetic(options)?;
            write_list(out, items, options)?
        }
        Value::Map(pairs) => write_map(out, pairs, options)?,
        Value::Trie(pairs) => {
            require_cosmetic(options)?;
            write_map(out, pairs, options)?
        }
        Value::Scope(_, _) => {
            log::warn!("nibs: attempted to encode a Scope, which has no Nibs wire representation");
            return Err(NibsError::UnsupportedValue {
                kind: "Scope has no Nibs wire representation".to_string(),
            });
        }
    }
    Ok(())
}

fn write_list(out: &mut Vec<u8>, items: &[Value], options: &NibsOptions) -> Result<(), NibsError> {
    let mut body = Vec::new();
    for item in items {
        write_value(&mut body, item, options)?;
    }
    head::write_head(out, TAG_TUPLE, body.len() as u64);
    out.extend_from_slice(&body);
    Ok(())
}

fn write_map(out: &mut Vec<u8>, pairs: &crate::value::Map, options: &NibsOptions) -> Result<(), NibsError> {
    let mut body = Vec::new();
    for (k, v) in pairs.iter() {
        write_value(&mut body, k, options)?;
        write_value(&mut body, v, options)?;
    }
    head::write_head(out, TAG_MAP, body.len() as u64);
    out.extend_from_slice(&body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;

    fn hex(bytes: &[u8]) -> String {
        crate::hex::bytes_to_hex(bytes)
    }

    #[test]
    fn scalars_match_spec_table() {
        assert_eq!(hex(&encode(&Value::Int(0)).unwrap()), "00");
        assert_eq!(hex(&encode(&Value::Int(-1)).unwrap()), "01");
        assert_eq!(hex(&encode(&Value::Int(42)).unwrap()), "0c54");
        assert_eq!(hex(&encode(&Value::Int(500)).unwrap()), "0de803");
        assert_eq!(hex(&encode(&Value::Int(-500)).unwrap()), "0de703");
        assert_eq!(hex(&encode(&Value::Bool(true)).unwrap()), "21");
        assert_eq!(hex(&encode(&Value::Bool(false)).unwrap()), "20");
        assert_eq!(hex(&encode(&Value::Null).unwrap()), "22");
        assert_eq!(
            hex(&encode(&Value::Float(std::f64::consts::PI)).unwrap()),
            "1f182d4454fb210940"
        );
    }

    #[test]
    fn string_matches_spec_table() {
        assert_eq!(
            hex(&encode(&Value::String("Hello".to_string())).unwrap()),
            "9548656c6c6f"
        );
    }

    #[test]
    fn bytes_match_spec_table() {
        assert_eq!(
            hex(&encode(&Value::Bytes(vec![1, 2, 3])).unwrap()),
            "83010203"
        );
    }

    #[test]
    fn list_matches_spec_table() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(hex(&encode(&list).unwrap()), "a3020406");
    }

    #[test]
    fn map_matches_spec_table() {
        let mut map = Map::new();
        map.insert(Value::String("name".to_string()), Value::String("Tim".to_string()));
        assert_eq!(hex(&encode(&Value::Map(map)).unwrap()), "b9946e616d659354696d");
    }

    #[test]
    fn scope_is_unsupported_on_the_wire() {
        let scope = Value::Scope(Box::new(Value::Int(1)), vec![]);
        assert!(encode(&scope).is_err());
    }

    #[test]
    fn bigint_out_of_i64_range_is_an_error() {
        let too_big = Value::BigInt("99999999999999999999999999".to_string());
        assert!(matches!(encode(&too_big), Err(NibsError::IntegerTooLarge { .. })));
    }
}
