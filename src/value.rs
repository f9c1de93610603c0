//! The tagged-union value type shared by the Nibs binary codec and the Tibs
//! text codec.

use std::fmt;

/// An insertion-order-preserving association of `Value` keys to `Value`s.
///
/// Nibs maps do not sort their keys (§3, §5 ordering guarantees), so this is
/// a plain `Vec` of pairs rather than a `HashMap`/`BTreeMap`: iteration order
/// is exactly encode order, and lookups are a linear scan. Values held by
/// this format are small enough in practice that this is the right trade.
#[derive(Clone, Debug, Default)]
pub struct Map(Vec<(Value, Value)>);

impl Map {
    /// An empty map.
    pub fn new() -> Map {
        Map(Vec::new())
    }

    /// Inserts `key` / `value`. If `key` is already present its value is
    /// replaced in place (last-write-wins, invariant 1 of §3) without
    /// disturbing its position in iteration order.
    pub fn insert(&mut self, key: Value, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Looks up `key`, returning its value if present.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The number of key/value pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.0.iter()
    }

    /// Builds a `Map` from pairs already known to have distinct keys, such
    /// as pairs produced by a decoder walking a Nibs MAP body. Later
    /// duplicates still win, matching `insert`.
    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Map {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        map
    }

    /// Consumes the map, returning its pairs in insertion order.
    pub fn into_pairs(self) -> Vec<(Value, Value)> {
        self.0
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Map) -> bool {
        self.0 == other.0
    }
}

impl FromIterator<(Value, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Map {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A value representable by both the Nibs binary codec and the Tibs text
/// codec (§3).
#[derive(Clone, Debug)]
pub enum Value {
    /// The absence marker.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// A signed integer that fits the host's 64-bit fast path.
    Int(i64),
    /// A signed integer whose magnitude does not fit in 64 bits, kept as
    /// decimal digits (optionally `-`-prefixed). Only reachable by parsing
    /// an oversized Tibs integer literal; Nibs has no wire representation
    /// wide enough to carry it (§4.2's zigzag payload spans exactly the
    /// `i64` range), so encoding one is an error (§7 `EncodeError`).
    BigInt(String),
    /// An IEEE-754 double. May hold NaN or infinities.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An opaque byte sequence.
    Bytes(Vec<u8>),
    /// A dense, insertion-ordered sequence.
    List(Vec<Value>),
    /// Same payload as `List`, flagged for indexed encoding (§9).
    Array(Vec<Value>),
    /// An insertion-order-preserving mapping.
    Map(Map),
    /// Same payload as `Map`, flagged for indexed encoding (§9).
    Trie(Map),
    /// A reference into an ambient table, by index.
    Ref(u64),
    /// A value paired with its local reference table.
    Scope(Box<Value>, Vec<Value>),
}

impl Value {
    /// True if this value is a container kind (`List`, `Array`, `Map`,
    /// `Trie`, or `Scope`).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Array(_) | Value::Map(_) | Value::Trie(_) | Value::Scope(_, _)
        )
    }

    /// True if this value carries the `indexed` flag (`Array` or `Trie`).
    pub fn is_indexed(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Trie(_))
    }

    fn numeric_key(&self) -> Option<NumericKey<'_>> {
        match self {
            Value::Int(n) => Some(NumericKey::Int(*n)),
            Value::BigInt(s) => Some(NumericKey::BigInt(s)),
            _ => None,
        }
    }
}

/// Helper used only to let `Int` and `BigInt` compare equal by numeric
/// value (§3: "Equality compares numeric value"), without pulling in a
/// bignum crate for a comparison that's needed only at this one seam.
enum NumericKey<'a> {
    Int(i64),
    BigInt(&'a str),
}

fn bigint_eq_i64(digits: &str, n: i64) -> bool {
    // Normalize the i64 side to the same textual form and compare digit
    // strings directly; avoids parsing the (possibly overflowing) BigInt
    // side as an integer.
    let mut buf = n.to_string();
    normalize_digits(&mut buf);
    let mut other = digits.to_string();
    normalize_digits(&mut other);
    buf == other
}

fn normalize_digits(s: &mut String) {
    let neg = s.starts_with('-');
    let body = if neg { &s[1..] } else { &s[..] };
    let trimmed = body.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    *s = if neg && trimmed != "0" {
        format!("-{trimmed}")
    } else {
        trimmed.to_string()
    };
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Trie(a), Trie(b)) => a == b,
            (Ref(a), Ref(b)) => a == b,
            (Scope(a, ar), Scope(b, br)) => a == b && ar == br,
            _ => match (self.numeric_key(), other.numeric_key()) {
                (Some(NumericKey::Int(a)), Some(NumericKey::Int(b))) => a == b,
                (Some(NumericKey::BigInt(a)), Some(NumericKey::BigInt(b))) => {
                    let mut da = a.to_string();
                    let mut db = b.to_string();
                    normalize_digits(&mut da);
                    normalize_digits(&mut db);
                    da == db
                }
                (Some(NumericKey::Int(a)), Some(NumericKey::BigInt(b))) => bigint_eq_i64(b, a),
                (Some(NumericKey::BigInt(a)), Some(NumericKey::Int(b))) => bigint_eq_i64(a, b),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::BigInt(s) => write!(f, "{s}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(v) | Value::Array(v) => write!(f, "{} entries", v.len()),
            Value::Map(m) | Value::Trie(m) => write!(f, "{} entries", m.len()),
            Value::Ref(n) => write!(f, "&{n}"),
            Value::Scope(_, refs) => write!(f, "scope with {} refs", refs.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Value {
        Value::Bytes(b)
    }
}
