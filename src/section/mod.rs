// Section transformers: a `begin` header, a body, a trailer.
//
// `Decoder` finds and decodes sections (one, or many when built by
// `multi::multi_decoder`); `Encoder` wraps a byte stream as one section.

mod decoder;
mod encoder;

pub use decoder::{DecodeState, Decoder};
pub use encoder::{DEFAULT_FILENAME, EncodeOptions, Encoder};
