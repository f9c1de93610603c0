//! The Tibs text codec: a JSON superset parsing/rendering the same value
//! model as Nibs (§4.5–§4.6).

mod encoder;
mod parser;

pub use encoder::{encode, encode_with_hook, Renderer, ToTextHook};
pub use parser::{parse, parse_bytes};
