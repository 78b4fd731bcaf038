// Section body: encoded lines <-> payload bytes.
//
// Both directions are stateless beyond the caller's source cursor: every
// call starts at a line boundary and only ever consumes whole lines (decode)
// or whole 45-byte chunks (encode), so a short-buffer return can be retried
// from the reported offset.

use super::line::{self, MAX_ENCODED_LINE, MAX_LINE_BYTES, MAX_LINE_LEN};
use super::quantum::{self, GRAVE};
use crate::error::{FormatError, UuError};

/// Literal closing the trailer.
pub const END_MARKER: &[u8] = b"end";

/// Outcome of one body step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStatus {
    /// All source bytes were consumed.
    Drained,
    /// An incomplete unit remains unconsumed at the end of the source.
    ShortSrc,
    /// The next unit does not fit in the remaining destination.
    ShortDst,
    /// The trailer was consumed (decode) or emitted (encode).
    Trailer,
    /// Decoding stopped in front of a malformed line; the lines before it
    /// were decoded. A call starting at that line reports the error.
    Malformed,
}

/// Counts and status of one body step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyProgress {
    pub consumed: usize,
    pub written: usize,
    pub status: BodyStatus,
}

impl BodyProgress {
    fn new(consumed: usize, written: usize, status: BodyStatus) -> Self {
        Self {
            consumed,
            written,
            status,
        }
    }
}

/// Strip a single trailing `\r`.
#[inline]
pub(crate) fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Whether a body line opens the trailer (declared length zero).
#[inline]
fn is_zero_line(line: &[u8]) -> bool {
    matches!(line.first(), None | Some(&GRAVE) | Some(&quantum::OFFSET))
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode encoded lines from `src` into `dst`.
///
/// `base` is the absolute stream offset of `src[0]`, used for error
/// positions. On `Trailer` the `end` line has been consumed and decoding
/// stops; the rest of `src` belongs to the caller. A malformed line is an
/// error only when it is the first line of the call; otherwise the lines
/// ahead of it are returned with `Malformed`.
pub fn decode(
    dst: &mut [u8],
    src: &[u8],
    at_eof: bool,
    base: u64,
) -> Result<BodyProgress, UuError> {
    let mut n_src = 0usize;
    let mut n_dst = 0usize;
    let mut scratch = [0u8; MAX_LINE_BYTES];

    while n_src < src.len() {
        let rest = &src[n_src..];
        let at = base + n_src as u64;
        let Some(eol) = rest.iter().position(|&b| b == b'\n') else {
            if rest.len() > MAX_LINE_LEN {
                let err = UuError::LineTooLong {
                    offset: at,
                    limit: MAX_LINE_LEN,
                };
                return stop(n_src, n_dst, err);
            }
            return Ok(BodyProgress::new(n_src, n_dst, BodyStatus::ShortSrc));
        };
        if eol > MAX_LINE_LEN {
            let err = UuError::LineTooLong {
                offset: at,
                limit: MAX_LINE_LEN,
            };
            return stop(n_src, n_dst, err);
        }
        let line = trim_cr(&rest[..eol]);

        if is_zero_line(line) {
            let after = &rest[eol + 1..];
            let end = if line.is_empty() {
                after_empty_line(after, at_eof)
            } else {
                trailer_end(after, at_eof)
            };
            return match end {
                Some(Ok(len)) => Ok(BodyProgress::new(
                    n_src + eol + 1 + len,
                    n_dst,
                    BodyStatus::Trailer,
                )),
                Some(Err(kind)) => {
                    stop(n_src, n_dst, UuError::bad_format(at + eol as u64 + 1, kind))
                }
                None => Ok(BodyProgress::new(n_src, n_dst, BodyStatus::ShortSrc)),
            };
        }

        let n = match line::decode_line(line, &mut scratch) {
            Ok(n) => n,
            Err(f) => {
                return stop(n_src, n_dst, UuError::bad_format(at + f.column as u64, f.kind));
            }
        };
        if dst.len() - n_dst < n {
            return Ok(BodyProgress::new(n_src, n_dst, BodyStatus::ShortDst));
        }
        dst[n_dst..n_dst + n].copy_from_slice(&scratch[..n]);
        n_dst += n;
        n_src += eol + 1;
    }

    Ok(BodyProgress::new(n_src, n_dst, BodyStatus::Drained))
}

/// Fail with `err`, unless lines were already decoded in this call.
fn stop(n_src: usize, n_dst: usize, err: UuError) -> Result<BodyProgress, UuError> {
    if n_src == 0 {
        Err(err)
    } else {
        Ok(BodyProgress::new(n_src, n_dst, BodyStatus::Malformed))
    }
}

/// An empty line may also stand in front of the padding-character line
/// (`\n`\nend\n`).
fn after_empty_line(rest: &[u8], at_eof: bool) -> Option<Result<usize, FormatError>> {
    let Some(eol) = rest.iter().position(|&b| b == b'\n') else {
        return trailer_end(rest, at_eof);
    };
    match trim_cr(&rest[..eol]) {
        [GRAVE] | [quantum::OFFSET] => {
            trailer_end(&rest[eol + 1..], at_eof).map(|end| end.map(|len| eol + 1 + len))
        }
        _ => trailer_end(rest, at_eof),
    }
}

/// Look for the `end` line following a zero-length line.
///
/// Returns the bytes it spans, `None` when more source is needed, or the
/// format error if something else follows.
fn trailer_end(rest: &[u8], at_eof: bool) -> Option<Result<usize, FormatError>> {
    match rest.iter().position(|&b| b == b'\n') {
        Some(eol) => Some(if trim_cr(&rest[..eol]) == END_MARKER {
            Ok(eol + 1)
        } else {
            Err(FormatError::MissingEnd)
        }),
        // A final `end` without a terminator is accepted at end of stream.
        None if at_eof => Some(if trim_cr(rest) == END_MARKER {
            Ok(rest.len())
        } else {
            Err(FormatError::MissingEnd)
        }),
        None if END_MARKER.len() + 1 < rest.len() => Some(Err(FormatError::MissingEnd)),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Bytes needed for the final partial line plus trailer.
pub fn trailer_len(remaining: usize, eol: &[u8]) -> usize {
    let last = if remaining == 0 {
        0
    } else {
        1 + line::encoded_chars(remaining) + eol.len()
    };
    last + 1 + eol.len() + END_MARKER.len() + eol.len()
}

/// Encode payload bytes from `src` into lines in `dst`.
///
/// Full 45-byte chunks are always emitted. The final partial line and the
/// trailer are only emitted when `at_eof` is set; until then a tail shorter
/// than a line is left unconsumed with `ShortSrc`.
pub fn encode(
    dst: &mut [u8],
    src: &[u8],
    at_eof: bool,
    grave: bool,
    eol: &[u8],
) -> BodyProgress {
    let mut n_src = 0usize;
    let mut n_dst = 0usize;
    let mut line_buf = [0u8; MAX_ENCODED_LINE];

    while src.len() - n_src >= MAX_LINE_BYTES {
        let need = MAX_ENCODED_LINE + eol.len();
        if dst.len() - n_dst < need {
            return BodyProgress::new(n_src, n_dst, BodyStatus::ShortDst);
        }
        let n = line::encode_line(&src[n_src..n_src + MAX_LINE_BYTES], grave, &mut line_buf);
        n_dst += put(&mut dst[n_dst..], &line_buf[..n]);
        n_dst += put(&mut dst[n_dst..], eol);
        n_src += MAX_LINE_BYTES;
    }

    let tail = &src[n_src..];
    if !at_eof {
        let status = if tail.is_empty() {
            BodyStatus::Drained
        } else {
            BodyStatus::ShortSrc
        };
        return BodyProgress::new(n_src, n_dst, status);
    }

    if dst.len() - n_dst < trailer_len(tail.len(), eol) {
        return BodyProgress::new(n_src, n_dst, BodyStatus::ShortDst);
    }
    if !tail.is_empty() {
        let n = line::encode_line(tail, grave, &mut line_buf);
        n_dst += put(&mut dst[n_dst..], &line_buf[..n]);
        n_dst += put(&mut dst[n_dst..], eol);
        n_src += tail.len();
    }
    n_dst += put(&mut dst[n_dst..], &[GRAVE]);
    n_dst += put(&mut dst[n_dst..], eol);
    n_dst += put(&mut dst[n_dst..], END_MARKER);
    n_dst += put(&mut dst[n_dst..], eol);

    BodyProgress::new(n_src, n_dst, BodyStatus::Trailer)
}

#[inline]
fn put(dst: &mut [u8], bytes: &[u8]) -> usize {
    dst[..bytes.len()].copy_from_slice(bytes);
    bytes.len()
}
