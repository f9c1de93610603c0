//! The Nibs decoder: reads a materialized scalar or a lazy container handle
//! from a borrowed byte buffer (§4.4), bounds-checking every read.

use super::head::{self, read_head, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, TAG_BYTE, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_REF, TAG_SIMPLE, TAG_STRING, TAG_TAG, TAG_TUPLE};
use crate::error::NibsError;
use crate::options::NibsOptions;
use crate::value::{Map, Value};

/// A decoded value: either a materialized scalar/string/bytes/Value, or a
/// lazy handle onto a still-encoded container (§4.4).
#[derive(Debug)]
pub enum Decoded<'a> {
    /// A fully materialized value (everything except tuples and maps).
    Value(Value),
    /// A lazy view onto an encoded `List`/`Array` body.
    Tuple(TupleHandle<'a>),
    /// A lazy view onto an encoded `Map`/`Trie` body.
    Map(MapHandle<'a>),
}

impl<'a> Decoded<'a> {
    /// Materializes this decoded value into an owned [`Value`], recursively
    /// walking any lazy container.
    pub fn into_owned(self) -> Result<Value, NibsError> {
        match self {
            Decoded::Value(v) => Ok(v),
            Decoded::Tuple(handle) => {
                let mut items = Vec::new();
                for result in handle.iter() {
                    let (_, v) = result?;
                    items.push(v.into_owned()?);
                }
                Ok(Value::List(items))
            }
            Decoded::Map(handle) => {
                let mut map = Map::new();
                for result in handle.iter() {
                    let (k, v) = result?;
                    map.insert(k.into_owned()?, v.into_owned()?);
                }
                Ok(Value::Map(map))
            }
        }
    }
}

/// True if `decoded` is a lazy container handle (`Tuple` or `Map`), per §6
/// `nibs_is_container`.
pub fn is_container(decoded: &Decoded) -> bool {
    matches!(decoded, Decoded::Tuple(_) | Decoded::Map(_))
}

/// A lazy view onto an encoded `List`/`Array` body: `[first, last)` bounds
/// the element span, and every operation walks from `first` without
/// allocating a container-sized temporary (§4.4, §5).
#[derive(Clone, Copy, Debug)]
pub struct TupleHandle<'a> {
    input: &'a [u8],
    first: usize,
    last: usize,
}

impl<'a> TupleHandle<'a> {
    /// Counts elements by walking `skip` from `first` to `last`; O(n).
    pub fn len(&self) -> Result<usize, NibsError> {
        let mut pos = self.first;
        let mut count = 0;
        while pos < self.last {
            pos += skip(self.input, pos)?;
            count += 1;
        }
        Ok(count)
    }

    /// True if the tuple has no elements.
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    /// Gets the `i`-th element, 1-based, by skipping `i - 1` elements then
    /// decoding the next; O(i).
    pub fn get(&self, i: usize) -> Result<Decoded<'a>, NibsError> {
        if i == 0 {
            log::warn!("nibs: tuple index 0 requested, but indices are 1-based");
            return Err(NibsError::UnsupportedValue {
                kind: "tuple indices are 1-based; 0 is not a valid index".to_string(),
            });
        }
        let mut pos = self.first;
        for _ in 0..(i - 1) {
            if pos >= self.last {
                log::warn!("nibs: tuple index {i} out of range at offset {pos}");
                return Err(NibsError::Truncated {
                    needed: 1,
                    available: 0,
                    offset: pos,
                });
            }
            pos += skip(self.input, pos)?;
        }
        if pos >= self.last {
            log::warn!("nibs: tuple index {i} out of range at offset {pos}");
            return Err(NibsError::Truncated {
                needed: 1,
                available: 0,
                offset: pos,
            });
        }
        let (value, _) = decode(self.input, pos)?;
        Ok(value)
    }

    /// Iterates `(1-based index, value)` pairs in insertion order.
    pub fn iter(&self) -> TupleIter<'a> {
        TupleIter {
            input: self.input,
            pos: self.first,
            last: self.last,
            index: 0,
        }
    }
}

/// Iterator over a [`TupleHandle`]'s elements.
pub struct TupleIter<'a> {
    input: &'a [u8],
    pos: usize,
    last: usize,
    index: usize,
}

impl<'a> Iterator for TupleIter<'a> {
    type Item = Result<(usize, Decoded<'a>), NibsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.last {
            return None;
        }
        self.index += 1;
        match decode(self.input, self.pos) {
            Ok((value, consumed)) => {
                self.pos += consumed;
                Some(Ok((self.index, value)))
            }
            Err(e) => {
                self.pos = self.last; // stop iterating after an error
                Some(Err(e))
            }
        }
    }
}

/// A lazy view onto an encoded `Map`/`Trie` body (§4.4).
#[derive(Clone, Copy, Debug)]
pub struct MapHandle<'a> {
    input: &'a [u8],
    first: usize,
    last: usize,
    options: NibsOptions,
}

impl<'a> MapHandle<'a> {
    /// The number of key/value pairs. Counts pairs by walking the body
    /// when `options.map_handle_len_counts_pairs` (the default); returns
    /// `0` otherwise (§9).
    pub fn len(&self) -> Result<usize, NibsError> {
        if !self.options.map_handle_len_counts_pairs {
            return Ok(0);
        }
        let mut pos = self.first;
        let mut count = 0;
        while pos < self.last {
            pos += skip(self.input, pos)?;
            pos += skip(self.input, pos)?;
            count += 1;
        }
        Ok(count)
    }

    /// True if the map has no pairs.
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    /// Looks up `key` by decoding keys in order and comparing by value,
    /// skipping the paired value when a key does not match (§4.4).
    pub fn get(&self, key: &Value) -> Result<Option<Decoded<'a>>, NibsError> {
        let mut pos = self.first;
        while pos < self.last {
            let (decoded_key, consumed) = decode(self.input, pos)?;
            pos += consumed;
            let matches = match &decoded_key {
                Decoded::Value(v) => v == key,
                // Composite keys never compare equal to a scalar lookup key
                // (§4.4: "Keys may be any scalar variant").
                Decoded::Tuple(_) | Decoded::Map(_) => false,
            };
            if matches {
                let (value, _) = decode(self.input, pos)?;
                return Ok(Some(value));
            }
            pos += skip(self.input, pos)?;
        }
        Ok(None)
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> MapIter<'a> {
        MapIter {
            input: self.input,
            pos: self.first,
            last: self.last,
        }
    }
}

/// Iterator over a [`MapHandle`]'s pairs.
pub struct MapIter<'a> {
    input: &'a [u8],
    pos: usize,
    last: usize,
}

impl<'a> Iterator for MapIter<'a> {
    type Item = Result<(Decoded<'a>, Decoded<'a>), NibsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.last {
            return None;
        }
        let (key, key_len) = match decode(self.input, self.pos) {
            Ok(v) => v,
            Err(e) => {
                self.pos = self.last;
                return Some(Err(e));
            }
        };
        self.pos += key_len;
        let (value, value_len) = match decode(self.input, self.pos) {
            Ok(v) => v,
            Err(e) => {
                self.pos = self.last;
                return Some(Err(e));
            }
        };
        self.pos += value_len;
        Some(Ok((key, value)))
    }
}

/// Decodes a single value at `input[offset..]`, returning it and the
/// number of bytes consumed (§4.4), using the default [`NibsOptions`].
pub fn decode(input: &[u8], offset: usize) -> Result<(Decoded<'_>, usize), NibsError> {
    decode_with(input, offset, &NibsOptions::default())
}

/// Decodes with explicit `options`.
pub fn decode_with<'a>(
    input: &'a [u8],
    offset: usize,
    options: &NibsOptions,
) -> Result<(Decoded<'a>, usize), NibsError> {
    log::trace!("nibs: decoding head at offset {offset}");
    let head = read_head(input, offset)?;
    let body_start = offset + head.len;

    match head.tag {
        TAG_INT => Ok((Decoded::Value(Value::Int(head::zigzag_decode(head.big))), head.len)),
        TAG_FLOAT => Ok((Decoded::Value(Value::Float(f64::from_bits(head.big))), head.len)),
        TAG_SIMPLE => {
            let v = match head.big {
                SIMPLE_FALSE => Value::Bool(false),
                SIMPLE_TRUE => Value::Bool(true),
                SIMPLE_NULL => Value::Null,
                other => {
                    log::warn!("nibs: unknown SIMPLE subtype {other} at offset {offset}");
                    return Err(NibsError::UnknownTag {
                        tag: other as u8,
                        offset,
                    });
                }
            };
            Ok((Decoded::Value(v), head.len))
        }
        TAG_REF => Ok((Decoded::Value(Value::Ref(head.big)), head.len)),
        TAG_BYTE => {
            let body = bounded_slice(input, body_start, head.big as usize, offset)?;
            Ok((Decoded::Value(Value::Bytes(body.to_vec())), head.len + body.len()))
        }
        TAG_STRING => {
            let body = bounded_slice(input, body_start, head.big as usize, offset)?;
            let s = std::str::from_utf8(body).map_err(|source| {
                log::warn!("nibs: invalid UTF-8 in string at offset {body_start}");
                NibsError::InvalidUtf8 {
                    offset: body_start,
                    source,
                }
            })?;
            Ok((Decoded::Value(Value::String(s.to_string())), head.len + body.len()))
        }
        TAG_TUPLE | super::head::TAG_ARRAY => {
            let last = checked_end(body_start, head.big as usize, input.len(), offset)?;
            log::debug!("nibs: tuple handle body_len={}", head.big);
            Ok((
                Decoded::Tuple(TupleHandle {
                    input,
                    first: body_start,
                    last,
                }),
                head.len + head.big as usize,
            ))
        }
        TAG_MAP => {
            let last = checked_end(body_start, head.big as usize, input.len(), offset)?;
            log::debug!("nibs: map handle body_len={}", head.big);
            Ok((
                Decoded::Map(MapHandle {
                    input,
                    first: body_start,
                    last,
                    options: options.clone(),
                }),
                head.len + head.big as usize,
            ))
        }
        TAG_TAG => {
            // The tag number itself (`head.big`) is discarded at this
            // level (§4.4); the logical value is whatever follows.
            let (inner, inner_len) = decode_with(input, body_start, options)?;
            Ok((inner, head.len + inner_len))
        }
        other => {
            log::warn!("nibs: unknown small tag {other} at offset {offset}");
            Err(NibsError::UnknownTag { tag: other, offset })
        }
    }
}

fn bounded_slice<'a>(
    input: &'a [u8],
    start: usize,
    len: usize,
    head_offset: usize,
) -> Result<&'a [u8], NibsError> {
    let end = checked_end(start, len, input.len(), head_offset)?;
    Ok(&input[start..end])
}

fn checked_end(start: usize, len: usize, input_len: usize, head_offset: usize) -> Result<usize, NibsError> {
    let end = start.checked_add(len).ok_or_else(|| {
        log::warn!("nibs: body length overflow at offset {head_offset}");
        NibsError::Truncated {
            needed: len,
            available: input_len.saturating_sub(start),
            offset: head_offset,
        }
    })?;
    if end > input_len {
        log::warn!("nibs: truncated body at offset {head_offset}");
        return Err(NibsError::Truncated {
            needed: len,
            available: input_len.saturating_sub(start),
            offset: head_offset,
        });
    }
    Ok(end)
}

/// Advances past a value at `input[offset..]` without decoding it,
/// returning the number of bytes consumed (§4.4).
pub fn skip(input: &[u8], offset: usize) -> Result<usize, NibsError> {
    let head = read_head(input, offset)?;
    match head.tag {
        TAG_INT | TAG_FLOAT | TAG_SIMPLE | TAG_REF => Ok(head.len),
        TAG_BYTE | TAG_STRING | TAG_TUPLE | TAG_MAP | super::head::TAG_ARRAY => {
            let body_start = offset + head.len;
            let _ = checked_end(body_start, head.big as usize, input.len(), offset)?;
            Ok(head.len + head.big as usize)
        }
        TAG_TAG => {
            let body_start = offset + head.len;
            Ok(head.len + skip(input, body_start)?)
        }
        other => {
            log::warn!("nibs: unknown small tag {other} at offset {offset}");
            Err(NibsError::UnknownTag { tag: other, offset })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nibs::encode::encode;

    #[test]
    fn decodes_scalars_from_spec_table() {
        let (decoded, len) = decode(&[0x00], 0).unwrap();
        assert!(matches!(decoded, Decoded::Value(Value::Int(0))));
        assert_eq!(len, 1);

        let (decoded, _) = decode(&[0x21], 0).unwrap();
        assert!(matches!(decoded, Decoded::Value(Value::Bool(true))));

        let (decoded, _) = decode(&[0x22], 0).unwrap();
        assert!(matches!(decoded, Decoded::Value(Value::Null)));
    }

    #[test]
    fn tuple_handle_iter_matches_repeated_get() {
        let bytes = encode(&Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)])).unwrap();
        let (decoded, _) = decode(&bytes, 0).unwrap();
        let handle = match decoded {
            Decoded::Tuple(h) => h,
            _ => panic!("expected tuple"),
        };
        assert_eq!(handle.len().unwrap(), 3);

        let via_iter: Vec<Value> = handle
            .iter()
            .map(|r| r.unwrap().1.into_owned().unwrap())
            .collect();
        let via_get: Vec<Value> = (1..=3)
            .map(|i| handle.get(i).unwrap().into_owned().unwrap())
            .collect();
        assert_eq!(via_iter, via_get);
        assert_eq!(via_iter, vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
    }

    #[test]
    fn map_handle_get_and_iter() {
        let mut map = Map::new();
        map.insert(Value::String("a".to_string()), Value::Int(1));
        map.insert(Value::String("b".to_string()), Value::Int(2));
        let bytes = encode(&Value::Map(map)).unwrap();
        let (decoded, _) = decode(&bytes, 0).unwrap();
        let handle = match decoded {
            Decoded::Map(h) => h,
            _ => panic!("expected map"),
        };
        assert_eq!(handle.len().unwrap(), 2);
        let value = handle.get(&Value::String("b".to_string())).unwrap().unwrap();
        assert_eq!(value.into_owned().unwrap(), Value::Int(2));
        assert!(handle.get(&Value::String("z".to_string())).unwrap().is_none());

        let pairs: Vec<(Value, Value)> = handle
            .iter()
            .map(|r| {
                let (k, v) = r.unwrap();
                (k.into_owned().unwrap(), v.into_owned().unwrap())
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Value::String("a".to_string()), Value::Int(1)),
                (Value::String("b".to_string()), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn skip_advances_exactly_one_encoded_value() {
        let bytes = encode(&Value::Int(500)).unwrap();
        let mut two = bytes.clone();
        two.extend_from_slice(&bytes);
        let consumed = skip(&two, 0).unwrap();
        assert_eq!(consumed, bytes.len());
        let (decoded, consumed2) = decode(&two, consumed).unwrap();
        assert_eq!(consumed2, bytes.len());
        assert_eq!(decoded.into_owned().unwrap(), Value::Int(500));
    }

    #[test]
    fn truncated_body_is_an_error_not_a_panic() {
        // STRING head claiming 5 bytes but only 2 are present.
        let bytes = [0x95, 0x48, 0x65];
        assert!(decode(&bytes, 0).is_err());
        assert!(skip(&bytes, 0).is_err());
    }

    #[test]
    fn unknown_tag_is_an_error() {
        // Tag nibble 4 is not assigned in §4.2.
        let bytes = [0x40];
        assert!(matches!(decode(&bytes, 0), Err(NibsError::UnknownTag { .. })));
    }

    #[test]
    fn tag_wrapper_is_transparent_on_decode() {
        // TAG(7) with tag-number 9, wrapping Int(1): head (0x79) + inner Int(1) (0x02).
        let bytes = [0x79, 0x02];
        let (decoded, consumed) = decode(&bytes, 0).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(decoded.into_owned().unwrap(), Value::Int(1));
        assert_eq!(skip(&bytes, 0).unwrap(), 2);
    }
}
