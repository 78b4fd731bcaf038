//! uuwire: streaming uuencode in Rust.
//!
//! The crate provides:
//! - The wire format: character, line, body and header codecs (`codec`)
//! - Resumable section encoder/decoder (`section`) behind the `Transform`
//!   contract and its `std::io` adapters (`transform`)
//! - A concurrent multi-section decoder with cancellation (`multi`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use uuwire::section::{Decoder, EncodeOptions, Encoder};
//! use uuwire::transform::transform_all;
//!
//! let opts = EncodeOptions {
//!     filename: Some("pp.txt".into()),
//!     ..Default::default()
//! };
//! let encoded = transform_all(&mut Encoder::new(opts), b"I love you forever.").unwrap();
//! assert_eq!(
//!     encoded,
//!     b"begin 644 pp.txt\n322!L;W9E('EO=2!F;W)E=F5R+@``\n`\nend\n"
//! );
//!
//! let mut decoder = Decoder::new();
//! let decoded = transform_all(&mut decoder, &encoded).unwrap();
//! assert_eq!(decoded, b"I love you forever.");
//! assert_eq!(decoder.filename(), Some("pp.txt"));
//! ```

pub mod codec;
pub mod error;
pub mod io;
pub mod multi;
pub mod section;
pub mod transform;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{FormatError, UuError};
pub use multi::{Canceller, Section, multi_decoder};
pub use section::{Decoder, EncodeOptions, Encoder};
pub use transform::{Progress, Status, Transform, TransformReader, TransformWriter};
