//! Error types for the Nibs binary codec and the Tibs text codec.
//!
//! Generalizes hematite's hand-rolled `NbtError` (an enum of failure modes
//! with manual `From` conversions) using `thiserror`'s derive instead, the
//! idiom most error enums in this ecosystem reach for.

use thiserror::Error;

/// Errors from the Nibs binary codec (§7: `DecodeError`, `EncodeError`, and
/// the UTF-8 half of `InvariantError`).
#[derive(Debug, Error)]
pub enum NibsError {
    /// A head byte named a small tag this decoder does not recognize.
    #[error("unknown Nibs small tag {tag} at offset {offset}")]
    UnknownTag {
        /// The unrecognized tag nibble.
        tag: u8,
        /// Byte offset of the head that named it.
        offset: usize,
    },

    /// A read would run past the end of the supplied buffer, or past a
    /// container's own declared body length.
    #[error("truncated Nibs data: needed {needed} bytes, {available} available at offset {offset}")]
    Truncated {
        /// Bytes required to complete the read.
        needed: usize,
        /// Bytes actually available from the read position.
        available: usize,
        /// Byte offset the read was attempted at.
        offset: usize,
    },

    /// A `STRING` body's bytes were not valid UTF-8.
    #[error("invalid UTF-8 in Nibs string at offset {offset}: {source}")]
    InvalidUtf8 {
        /// Byte offset of the string's body.
        offset: usize,
        /// The underlying UTF-8 validation failure.
        #[source]
        source: std::str::Utf8Error,
    },

    /// A `Value::BigInt` did not fit the `i64` range the Nibs wire format
    /// can carry (§3, §4.3).
    #[error("integer magnitude out of range for Nibs encoding: {digits}")]
    IntegerTooLarge {
        /// The decimal digits that did not fit.
        digits: String,
    },

    /// The caller passed a value kind this encoder has no wire
    /// representation for (reachable only through user extension hooks).
    #[error("unsupported value kind for Nibs encoding: {kind}")]
    UnsupportedValue {
        /// A short description of the offending value's kind.
        kind: String,
    },
}

/// Errors from the Tibs text parser (§7: `ParseError` and the codepoint
/// half of `InvariantError`).
#[derive(Debug, Error)]
pub enum TibsError {
    /// A syntax error at a specific byte offset, with the row/column
    /// derived from scanning the input up to that offset (§4.5).
    #[error("Unexpected {found} at index {index} (row {row} / col {col})")]
    Syntax {
        /// `'c'` for an offending byte, or `EOS` at end of input.
        found: String,
        /// Byte offset of the failure.
        index: usize,
        /// 1-based row, counting `\n` bytes.
        row: usize,
        /// 1-based column within that row.
        col: usize,
    },

    /// A malformed byte literal (`<...>`): odd digit count or a non-hex
    /// byte.
    #[error("invalid byte literal: {reason}")]
    InvalidHex {
        /// Human-readable reason.
        reason: String,
    },

    /// A `\uXXXX` escape (or surrogate pair) decoded to a value outside
    /// `0x0..=0x10FFFF`.
    #[error("invalid Unicode code point: {0:#x}")]
    InvalidCodepoint(u32),
}

impl TibsError {
    /// Builds a `Syntax` error for an offending byte at `index`, computing
    /// row/col by scanning `input` (§4.5).
    pub(crate) fn unexpected_byte(input: &[u8], index: usize, byte: u8) -> TibsError {
        let (row, col) = locate(input, index);
        TibsError::Syntax {
            found: format!("'{}'", byte as char),
            index,
            row,
            col,
        }
    }

    /// Builds a `Syntax` error for running out of input at `index`.
    pub(crate) fn unexpected_eos(input: &[u8], index: usize) -> TibsError {
        let (row, col) = locate(input, index);
        TibsError::Syntax {
            found: "EOS".to_string(),
            index,
            row,
            col,
        }
    }
}

/// Computes the 1-based `(row, col)` of byte offset `index` in `input`.
fn locate(input: &[u8], index: usize) -> (usize, usize) {
    let mut row = 1;
    let mut col = 1;
    for &b in &input[..index.min(input.len())] {
        if b == b'\n' {
            row += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (row, col)
}
