// Quantum codec: 3 raw bytes <-> 4 printable characters.
//
// Each character carries 6 bits offset by 0x20 (space). In grave mode a zero
// sextet is written as 0x60 instead of 0x20. Decoding accepts either form.

/// Offset added to every 6-bit value.
pub const OFFSET: u8 = b' ';

/// Grave accent: alternative encoding of zero, also the trailer marker.
pub const GRAVE: u8 = b'`';

/// Raw bytes per quantum.
pub const RAW_LEN: usize = 3;

/// Encoded characters per quantum.
pub const ENCODED_LEN: usize = 4;

/// Encode a single 6-bit value as a character.
#[inline]
pub fn encode_char(value: u8, grave: bool) -> u8 {
    let value = value & 0x3F;
    if value == 0 && grave {
        GRAVE
    } else {
        value + OFFSET
    }
}

/// Decode a character to its 6-bit value.
///
/// No range check: callers validate with [`is_valid_char`] first.
#[inline]
pub fn decode_char(c: u8) -> u8 {
    if c == GRAVE {
        0
    } else {
        c.wrapping_sub(OFFSET) & 0x3F
    }
}

/// Whether `c` may appear in an encoded line.
#[inline]
pub fn is_valid_char(c: u8) -> bool {
    (OFFSET..=GRAVE).contains(&c)
}

/// Encode one quantum. The last `padding` bytes of `group` (0..=2) are not
/// part of the payload and are encoded as zero.
#[inline]
pub fn encode_quantum(group: [u8; RAW_LEN], padding: usize, grave: bool) -> [u8; ENCODED_LEN] {
    debug_assert!(padding <= 2);
    let mut g = group;
    for b in g.iter_mut().skip(RAW_LEN - padding) {
        *b = 0;
    }
    [
        encode_char(g[0] >> 2, grave),
        encode_char((g[0] << 4) | (g[1] >> 4), grave),
        encode_char((g[1] << 2) | (g[2] >> 6), grave),
        encode_char(g[2], grave),
    ]
}

/// Decode one quantum.
#[inline]
pub fn decode_quantum(chars: [u8; ENCODED_LEN]) -> [u8; RAW_LEN] {
    let c0 = decode_char(chars[0]);
    let c1 = decode_char(chars[1]);
    let c2 = decode_char(chars[2]);
    let c3 = decode_char(chars[3]);
    [(c0 << 2) | (c1 >> 4), (c1 << 4) | (c2 >> 2), (c2 << 6) | c3]
}
