//! The Nibs binary codec: a compact byte-tagged wire format with a lazy,
//! pointer-walking decoder (§4.1–§4.4).

mod decode;
mod encode;
mod head;

pub use decode::{decode, decode_with, is_container, skip, Decoded, MapHandle, TupleHandle};
pub use encode::{encode, encode_with};
pub use head::{zigzag_decode, zigzag_encode};
