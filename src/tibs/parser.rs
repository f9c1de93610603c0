//! The Tibs text parser: a recursive-descent scanner over UTF-8 bytes
//! (§4.5).

use crate::error::TibsError;
use crate::hex::hex_to_bytes;
use crate::value::{Map, Value};

/// Parses a full Tibs document from `text`, requiring the entire input
/// (after trailing whitespace) to be consumed (§4.5 "Top-level rule").
pub fn parse(text: &str) -> Result<Value, TibsError> {
    parse_bytes(text.as_bytes())
}

/// Parses a full Tibs document from raw bytes. The parser operates on raw
/// bytes by convention, not requiring `input` to already be valid UTF-8
/// outside of string/number literals (§6).
pub fn parse_bytes(input: &[u8]) -> Result<Value, TibsError> {
    let mut parser = Parser { input, pos: 0 };
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        let byte = parser.input[parser.pos];
        let err = TibsError::unexpected_byte(parser.input, parser.pos, byte);
        log::warn!("tibs: trailing garbage after top-level value: {err}");
        return Err(err);
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\r' | b' ')
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && is_ws(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn err_here(&self) -> TibsError {
        let err = match self.peek() {
            Some(b) => TibsError::unexpected_byte(self.input, self.pos, b),
            None => TibsError::unexpected_eos(self.input, self.pos),
        };
        log::warn!("tibs: {err}");
        err
    }

    /// Builds (and logs) an "unexpected EOS" error at the current position,
    /// for the handful of call sites that know they need EOS specifically
    /// rather than whatever `err_here` would infer from `peek()`.
    fn eos_error(&self) -> TibsError {
        let err = TibsError::unexpected_eos(self.input, self.pos);
        log::warn!("tibs: {err}");
        err
    }

    fn expect(&mut self, byte: u8) -> Result<(), TibsError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err_here())
        }
    }

    fn starts_with(&self, literal: &[u8]) -> bool {
        self.input[self.pos..].starts_with(literal)
    }

    fn parse_value(&mut self) -> Result<Value, TibsError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.eos_error()),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'<') => self.parse_bytes_literal(),
            Some(b'&') => self.parse_ref(),
            Some(b'(') => self.parse_scope(),
            Some(b'[') => self.parse_list(),
            Some(b'{') => self.parse_map(),
            Some(b't') if self.starts_with(b"true") => {
                self.pos += 4;
                Ok(Value::Bool(true))
            }
            Some(b'f') if self.starts_with(b"false") => {
                self.pos += 5;
                Ok(Value::Bool(false))
            }
            Some(b'n') if self.starts_with(b"null") => {
                self.pos += 4;
                Ok(Value::Null)
            }
            Some(b'n') if self.starts_with(b"nan") => {
                self.pos += 3;
                Ok(Value::Float(f64::NAN))
            }
            Some(b'i') if self.starts_with(b"inf") => {
                self.pos += 3;
                Ok(Value::Float(f64::INFINITY))
            }
            Some(b'-') if self.starts_with(b"-inf") => {
                self.pos += 4;
                Ok(Value::Float(f64::NEG_INFINITY))
            }
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(self.err_here()),
        }
    }

    fn parse_number(&mut self) -> Result<Value, TibsError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        if !matches!(self.peek(), Some(b'0'..=b'9')) {
            return Err(self.err_here());
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.err_here());
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.err_here());
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        // SAFETY-free: digits, '-', '.', 'e'/'E', '+' are all ASCII, so this
        // slice is valid UTF-8 whenever `input` is ASCII in this range.
        let text = std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.err_here())?;
        if is_float {
            text.parse::<f64>().map(Value::Float).map_err(|_| self.err_here())
        } else {
            match text.parse::<i64>() {
                Ok(n) => Ok(Value::Int(n)),
                Err(_) => Ok(Value::BigInt(text.to_string())),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, TibsError> {
        self.expect(b'"')?;
        let mut out = String::new();
        let mut pending_high_surrogate: Option<u16> = None;
        loop {
            let byte = self.peek().ok_or_else(|| self.eos_error())?;
            match byte {
                b'"' => {
                    self.pos += 1;
                    if pending_high_surrogate.take().is_some() {
                        out.push('?');
                    }
                    return Ok(out);
                }
                b'\\' => {
                    self.pos += 1;
                    let esc = self.peek().ok_or_else(|| self.eos_error())?;
                    match esc {
                        b'"' | b'\\' | b'/' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push(esc as char);
                            self.pos += 1;
                        }
                        b'b' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push('\u{8}');
                            self.pos += 1;
                        }
                        b'f' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push('\u{c}');
                            self.pos += 1;
                        }
                        b'n' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push('\n');
                            self.pos += 1;
                        }
                        b'r' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push('\r');
                            self.pos += 1;
                        }
                        b't' => {
                            self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                            out.push('\t');
                            self.pos += 1;
                        }
                        b'u' => {
                            self.pos += 1;
                            let unit = self.parse_hex4()?;
                            self.apply_unicode_escape(unit, &mut pending_high_surrogate, &mut out)?;
                        }
                        _ => return Err(self.err_here()),
                    }
                }
                0x00..=0x1f => return Err(self.err_here()),
                _ => {
                    self.flush_pending_surrogate(&mut pending_high_surrogate, &mut out);
                    let start = self.pos;
                    let len = utf8_char_len(byte);
                    let end = start + len;
                    let slice = self
                        .input
                        .get(start..end)
                        .ok_or_else(|| self.eos_error())?;
                    let s = std::str::from_utf8(slice).map_err(|_| self.err_here())?;
                    out.push_str(s);
                    self.pos = end;
                }
            }
        }
    }

    fn flush_pending_surrogate(&self, pending: &mut Option<u16>, out: &mut String) {
        if pending.take().is_some() {
            out.push('?');
        }
    }

    fn parse_hex4(&mut self) -> Result<u16, TibsError> {
        let slice = self
            .input
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.eos_error())?;
        let text = std::str::from_utf8(slice).map_err(|_| self.err_here())?;
        let unit = u16::from_str_radix(text, 16).map_err(|_| self.err_here())?;
        self.pos += 4;
        Ok(unit)
    }

    /// Applies one `\uXXXX` escape, combining a pending high surrogate with
    /// a following low surrogate into a single code point (§4.5, §9).
    fn apply_unicode_escape(
        &mut self,
        unit: u16,
        pending: &mut Option<u16>,
        out: &mut String,
    ) -> Result<(), TibsError> {
        const HIGH_LO: u16 = 0xd800;
        const HIGH_HI: u16 = 0xdbff;
        const LOW_LO: u16 = 0xdc00;
        const LOW_HI: u16 = 0xdfff;

        if let Some(high) = pending.take() {
            if (LOW_LO..=LOW_HI).contains(&unit) {
                let high_bits = (high - HIGH_LO) as u32;
                let low_bits = (unit - LOW_LO) as u32;
                let codepoint = 0x10000 + (high_bits << 10) + low_bits;
                let ch = char::from_u32(codepoint).ok_or_else(|| {
                    log::warn!("tibs: invalid Unicode code point {codepoint:#x} from surrogate pair");
                    TibsError::InvalidCodepoint(codepoint)
                })?;
                out.push(ch);
                return Ok(());
            }
            // The pending high surrogate had no low-surrogate partner.
            out.push('?');
            // fall through to handle `unit` fresh, below
        }

        if (HIGH_LO..=HIGH_HI).contains(&unit) {
            *pending = Some(unit);
            return Ok(());
        }
        if (LOW_LO..=LOW_HI).contains(&unit) {
            // A lone low surrogate with no preceding high surrogate.
            out.push('?');
            return Ok(());
        }
        let ch = char::from_u32(unit as u32).ok_or_else(|| {
            log::warn!("tibs: invalid Unicode code point {:#x}", unit as u32);
            TibsError::InvalidCodepoint(unit as u32)
        })?;
        out.push(ch);
        Ok(())
    }

    fn parse_bytes_literal(&mut self) -> Result<Value, TibsError> {
        self.expect(b'<')?;
        let start = self.pos;
        while self.peek() != Some(b'>') {
            if self.peek().is_none() {
                return Err(self.eos_error());
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.err_here())?;
        let bytes = hex_to_bytes(text)?;
        self.pos += 1; // consume '>'
        Ok(Value::Bytes(bytes))
    }

    fn parse_ref(&mut self) -> Result<Value, TibsError> {
        self.expect(b'&')?;
        let start = self.pos;
        if !matches!(self.peek(), Some(b'0'..=b'9')) {
            return Err(self.err_here());
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| self.err_here())?;
        let n: u64 = text.parse().map_err(|_| self.err_here())?;
        Ok(Value::Ref(n))
    }

    fn parse_scope(&mut self) -> Result<Value, TibsError> {
        self.expect(b'(')?;
        let child = self.parse_value()?;
        let mut refs = Vec::new();
        self.skip_ws();
        while self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_ws();
            if self.peek() == Some(b')') {
                break; // trailing comma
            }
            refs.push(self.parse_value()?);
            self.skip_ws();
        }
        self.expect(b')')?;
        Ok(Value::Scope(Box::new(child), refs))
    }

    fn parse_list(&mut self) -> Result<Value, TibsError> {
        self.expect(b'[')?;
        let indexed = self.consume_index_marker();
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(make_list(items, indexed));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek() == Some(b']') {
                        break; // trailing comma
                    }
                }
                Some(b']') => break,
                _ => return Err(self.err_here()),
            }
        }
        self.expect(b']')?;
        Ok(make_list(items, indexed))
    }

    fn parse_map(&mut self) -> Result<Value, TibsError> {
        self.expect(b'{')?;
        let indexed = self.consume_index_marker();
        let mut map = Map::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(make_map(map, indexed));
        }
        loop {
            let key = self.parse_value()?;
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek() == Some(b'}') {
                        break; // trailing comma
                    }
                }
                Some(b'}') => break,
                _ => return Err(self.err_here()),
            }
        }
        self.expect(b'}')?;
        Ok(make_map(map, indexed))
    }

    /// Consumes a leading `#` marking this container as indexed (Array /
    /// Trie), if present (§4.5).
    fn consume_index_marker(&mut self) -> bool {
        if self.peek() == Some(b'#') {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

fn make_list(items: Vec<Value>, indexed: bool) -> Value {
    if indexed {
        Value::Array(items)
    } else {
        Value::List(items)
    }
}

fn make_map(map: Map, indexed: bool) -> Value {
    if indexed {
        Value::Trie(map)
    } else {
        Value::Map(map)
    }
}

/// The byte length of a UTF-8 sequence starting with `lead`.
fn utf8_char_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xe0 == 0xc0 {
        2
    } else if lead & 0xf0 == 0xe0 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comma_accepted_in_list() {
        let value = parse("  [1, 2, 3,]").unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn basic_unicode_escape() {
        let value = parse("\"a\\u00e9b\"").unwrap();
        assert_eq!(value, Value::String("a\u{e9}b".to_string()));
    }

    #[test]
    fn surrogate_pair_escape() {
        let value = parse("\"\\uD83D\\uDE00\"").unwrap();
        assert_eq!(value, Value::String("\u{1F600}".to_string()));
    }

    #[test]
    fn scope_with_one_ref() {
        let value = parse("(1,&0)").unwrap();
        assert_eq!(value, Value::Scope(Box::new(Value::Int(1)), vec![Value::Ref(0)]));
    }

    #[test]
    fn trailing_garbage_is_an_error_at_the_right_offset() {
        let err = parse("12 34").unwrap_err();
        match err {
            TibsError::Syntax { index, row, col, .. } => {
                assert_eq!(index, 3);
                assert_eq!(row, 1);
                assert_eq!(col, 4);
            }
            other => panic!("expected Syntax error, got {other:?}"),
        }
    }

    #[test]
    fn stray_high_surrogate_becomes_placeholder() {
        let value = parse("\"\\uD83D\"").unwrap();
        assert_eq!(value, Value::String("?".to_string()));
    }

    #[test]
    fn extended_number_literals() {
        assert_eq!(parse("inf").unwrap(), Value::Float(f64::INFINITY));
        assert_eq!(parse("-inf").unwrap(), Value::Float(f64::NEG_INFINITY));
        match parse("nan").unwrap() {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("expected Float(NaN), got {other:?}"),
        }
    }

    #[test]
    fn integer_literals_never_promote_to_float() {
        assert_eq!(parse("500").unwrap(), Value::Int(500));
        assert_eq!(parse("-500").unwrap(), Value::Int(-500));
        assert_eq!(parse("3.0").unwrap(), Value::Float(3.0));
    }

    #[test]
    fn byte_literal_with_whitespace() {
        let value = parse("<01 02 03>").unwrap();
        assert_eq!(value, Value::Bytes(vec![0x01, 0x02, 0x03]));
    }

    #[test]
    fn indexed_container_markers() {
        assert!(matches!(parse("[#1,2]").unwrap(), Value::Array(_)));
        assert!(matches!(parse("{#\"a\":1}").unwrap(), Value::Trie(_)));
    }

    #[test]
    fn map_with_non_string_key() {
        let value = parse("{1:\"one\"}").unwrap();
        let mut expected = Map::new();
        expected.insert(Value::Int(1), Value::String("one".to_string()));
        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn oversized_integer_becomes_bigint() {
        let value = parse("99999999999999999999999999").unwrap();
        assert!(matches!(value, Value::BigInt(_)));
    }
}
