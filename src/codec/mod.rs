// Uuencode wire format.
//
// # Modules
//
// - `quantum`: 3 bytes <-> 4 characters bit packing
// - `line`: one length-prefixed line, padding accounting
// - `body`: line sequence <-> payload stream, trailer detection
// - `header`: `begin <mode> <name>` line

pub mod body;
pub mod header;
pub mod line;
pub mod quantum;

pub use body::{BodyProgress, BodyStatus};
pub use header::SectionMetadata;
