// Line codec: one encoded line <-> up to 45 payload bytes.
//
// Line layout: a length character (payload byte count + 0x20) followed by
// 4*ceil(n/3) quantum characters. The final quantum of a line carries 1 or 2
// padding bytes when n is not a multiple of three.

use super::quantum::{self, ENCODED_LEN, RAW_LEN};
use crate::error::FormatError;

/// Maximum payload bytes per line (length character `M`).
pub const MAX_LINE_BYTES: usize = 45;

/// Maximum encoded characters per line, excluding the length character.
pub const MAX_LINE_CHARS: usize = MAX_LINE_BYTES / RAW_LEN * ENCODED_LEN;

/// Longest encoded line accepted by the decoder, `\r` included.
pub const MAX_LINE_LEN: usize = 64;

/// Upper bound of `encode_line` output for a full line.
pub const MAX_ENCODED_LINE: usize = 1 + MAX_LINE_CHARS;

/// A rejected line: the kind plus the column of the offending character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFault {
    pub column: usize,
    pub kind: FormatError,
}

impl LineFault {
    fn at(column: usize, kind: FormatError) -> Self {
        Self { column, kind }
    }
}

/// Number of encoded characters (excluding the length character) for `n`
/// payload bytes.
#[inline]
pub fn encoded_chars(n: usize) -> usize {
    n.div_ceil(RAW_LEN) * ENCODED_LEN
}

/// Encode up to 45 bytes into `out`, length character first. Returns the
/// number of characters written (`1 + encoded_chars(data.len())`).
///
/// Panics if `data` is longer than a line or `out` is too small.
pub fn encode_line(data: &[u8], grave: bool, out: &mut [u8]) -> usize {
    assert!(data.len() <= MAX_LINE_BYTES, "line payload too long");
    let total = 1 + encoded_chars(data.len());
    assert!(out.len() >= total, "line output buffer too small");

    out[0] = quantum::encode_char(data.len() as u8, grave);
    let mut w = 1;
    for chunk in data.chunks(RAW_LEN) {
        let mut group = [0u8; RAW_LEN];
        group[..chunk.len()].copy_from_slice(chunk);
        let enc = quantum::encode_quantum(group, RAW_LEN - chunk.len(), grave);
        out[w..w + ENCODED_LEN].copy_from_slice(&enc);
        w += ENCODED_LEN;
    }
    w
}

/// Payload length declared by a line's length character.
///
/// Returns `None` for an empty line.
#[inline]
pub fn declared_len(line: &[u8]) -> Option<Result<usize, LineFault>> {
    let &c = line.first()?;
    if !quantum::is_valid_char(c) {
        return Some(Err(LineFault::at(0, FormatError::BadChar { byte: c })));
    }
    Some(Ok(quantum::decode_char(c) as usize))
}

/// Validate and decode one line (terminator already stripped) into `out`.
/// Returns the payload length.
///
/// The padding count `capacity - declared` must be 0, 1 or 2.
pub fn decode_line(line: &[u8], out: &mut [u8; MAX_LINE_BYTES]) -> Result<usize, LineFault> {
    let declared = match declared_len(line) {
        Some(res) => res?,
        None => return Ok(0),
    };
    let chars = &line[1..];
    if chars.len() % ENCODED_LEN != 0 {
        return Err(LineFault::at(1, FormatError::Misaligned { len: chars.len() }));
    }
    let capacity = chars.len() / ENCODED_LEN * RAW_LEN;
    if declared > capacity {
        return Err(LineFault::at(
            0,
            FormatError::LengthOverflow { declared, capacity },
        ));
    }
    let padding = capacity - declared;
    if padding > 2 {
        return Err(LineFault::at(
            0,
            FormatError::BadPadding {
                declared,
                capacity,
                padding,
            },
        ));
    }
    if capacity > MAX_LINE_BYTES {
        return Err(LineFault::at(
            0,
            FormatError::LengthOverflow {
                declared,
                capacity: MAX_LINE_BYTES,
            },
        ));
    }
    if let Some(col) = chars.iter().position(|&c| !quantum::is_valid_char(c)) {
        return Err(LineFault::at(
            1 + col,
            FormatError::BadChar { byte: chars[col] },
        ));
    }

    let mut raw = [0u8; MAX_LINE_BYTES];
    for (i, q) in chars.chunks_exact(ENCODED_LEN).enumerate() {
        let dec = quantum::decode_quantum([q[0], q[1], q[2], q[3]]);
        raw[i * RAW_LEN..(i + 1) * RAW_LEN].copy_from_slice(&dec);
    }
    out[..declared].copy_from_slice(&raw[..declared]);
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &[u8]) -> Result<Vec<u8>, LineFault> {
        let mut out = [0u8; MAX_LINE_BYTES];
        let n = decode_line(line, &mut out)?;
        Ok(out[..n].to_vec())
    }

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = [0u8; MAX_ENCODED_LINE];
        let n = encode_line(data, true, &mut out);
        out[..n].to_vec()
    }

    #[test]
    fn known_lines() {
        assert_eq!(decode(b"#0V%T").unwrap(), b"Cat");
        assert_eq!(
            decode(b"::'1T<#HO+W=W=RYW:6MI<&5D:6$N;W)G#0H`").unwrap(),
            b"http://www.wikipedia.org\r\n"
        );
        assert_eq!(
            decode(b"322!L;W9E('EO=2!F;W)E=F5R+@``").unwrap(),
            b"I love you forever."
        );
    }

    #[test]
    fn encode_known_line() {
        assert_eq!(encode(b"I love you forever."), b"322!L;W9E('EO=2!F;W)E=F5R+@``");
        assert_eq!(encode(b"Cat"), b"#0V%T");
        assert_eq!(
            encode(b"http://www.wikipedia.org\r\n"),
            b"::'1T<#HO+W=W=RYW:6MI<&5D:6$N;W)G#0H`"
        );
    }

    #[test]
    fn full_line_uses_m() {
        let data = [0xA5u8; MAX_LINE_BYTES];
        let line = encode(&data);
        assert_eq!(line.len(), MAX_ENCODED_LINE);
        assert_eq!(line[0], b'M');
        assert_eq!(decode(&line).unwrap(), data);
    }

    #[test]
    fn output_length_matches_groups() {
        for n in 0..=MAX_LINE_BYTES {
            let data: Vec<u8> = (0..n as u8).collect();
            let line = encode(&data);
            assert_eq!(line.len(), 1 + 4 * n.div_ceil(3), "n={n}");
            assert_eq!(decode(&line).unwrap(), data, "n={n}");
        }
    }

    #[test]
    fn padding_edges_at_43_44_45() {
        // 45 chars of payload => 60 encoded chars => capacity 45.
        for (declared, padding) in [(43usize, 2usize), (44, 1), (45, 0)] {
            let data: Vec<u8> = (0..declared as u8).map(|b| b.wrapping_mul(37)).collect();
            let line = encode(&data);
            assert_eq!(line.len() - 1, 60, "declared={declared}");
            assert_eq!(60 / 4 * 3 - declared, padding);
            assert_eq!(decode(&line).unwrap(), data);
        }
    }

    #[test]
    fn padding_of_three_is_rejected() {
        // 42 declared in 60 chars leaves 3 bytes of padding.
        let data = [7u8; 45];
        let mut line = encode(&data);
        line[0] = quantum::encode_char(42, true);
        let fault = decode(&line).unwrap_err();
        assert_eq!(
            fault.kind,
            FormatError::BadPadding {
                declared: 42,
                capacity: 45,
                padding: 3
            }
        );
    }

    #[test]
    fn declared_beyond_capacity_is_rejected() {
        let mut line = encode(b"Cat");
        line[0] = quantum::encode_char(4, true);
        let fault = decode(&line).unwrap_err();
        assert_eq!(
            fault.kind,
            FormatError::LengthOverflow {
                declared: 4,
                capacity: 3
            }
        );
    }

    #[test]
    fn misaligned_line_is_rejected() {
        let fault = decode(b"#0V%").unwrap_err();
        assert_eq!(fault.kind, FormatError::Misaligned { len: 3 });
    }

    #[test]
    fn out_of_range_length_char() {
        let fault = decode(b"a22!L;W9E('EO=2!F;W)E=F5R+@``").unwrap_err();
        assert_eq!(fault.kind, FormatError::BadChar { byte: b'a' });
        assert_eq!(fault.column, 0);

        let fault = decode(b"\x1f22!L;W9E('EO=2!F;W)E=F5R+@``").unwrap_err();
        assert_eq!(fault.kind, FormatError::BadChar { byte: 0x1F });
    }

    #[test]
    fn out_of_range_body_char() {
        let fault = decode(b"#0V%\x7f").unwrap_err();
        assert_eq!(fault.kind, FormatError::BadChar { byte: 0x7F });
        assert_eq!(fault.column, 4);
    }
}
