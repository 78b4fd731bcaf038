// `begin <mode> <filename>` header line parsing and emission.

use std::fmt::Write as _;

use super::body::trim_cr;

/// Literal opening a section header.
pub const BEGIN_MARKER: &[u8] = b"begin";

/// Longest header line accepted while seeking, terminator included.
pub const MAX_HEADER_LEN: usize = 1024;

/// Mode written when the encoder is not told otherwise.
pub const DEFAULT_MODE: u32 = 0o644;

/// Metadata carried by a section header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMetadata {
    /// Name from the header, if any.
    pub filename: Option<String>,
    /// Permission bits, when the mode token is a valid octal number.
    pub mode: Option<u32>,
}

impl SectionMetadata {
    pub fn clear(&mut self) {
        self.filename = None;
        self.mode = None;
    }
}

/// Whether a line fragment starting at a line boundary could still turn out
/// to be a header once more bytes arrive.
pub fn is_candidate(fragment: &[u8]) -> bool {
    fragment.starts_with(BEGIN_MARKER) || BEGIN_MARKER.starts_with(fragment)
}

/// Parse a complete line (terminator stripped or not) as a section header.
///
/// Accepts `begin <mode>` followed by any number of filename tokens. The mode
/// token is recorded only when it parses as octal; the remaining tokens are
/// joined with single spaces.
pub fn parse(line: &[u8]) -> Option<SectionMetadata> {
    let line = trim_cr(line.strip_suffix(b"\n").unwrap_or(line));
    let rest = line.strip_prefix(BEGIN_MARKER)?;
    if !rest.first().is_some_and(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let text = String::from_utf8_lossy(rest);
    let mut tokens = text.split_ascii_whitespace();
    let mode_token = tokens.next()?;
    let mode = u32::from_str_radix(mode_token, 8).ok();

    let name = tokens.collect::<Vec<_>>().join(" ");
    let filename = (!name.is_empty()).then_some(name);
    Some(SectionMetadata { filename, mode })
}

/// Render the header line for `mode`/`filename` into `out`, replacing its
/// contents.
pub fn render(out: &mut String, mode: u32, filename: &str, eol: &str) {
    out.clear();
    let _ = write!(out, "begin {mode:o} {filename}{eol}");
}
