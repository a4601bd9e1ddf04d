use bytes::BufMut;

/// Largest number of bytes a count can occupy.
pub const MAX_COUNT_BYTES: usize = 9;

/// Number of extra bytes following a first byte: one per leading one bit.
#[inline]
pub fn extra_bytes(first: u8) -> usize {
    first.leading_ones() as usize
}

/// Encoded length in bytes of `value`.
pub fn count_length(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    if bits > 56 {
        MAX_COUNT_BYTES
    } else {
        // 7 payload bits per byte until the prefix fills the first byte
        bits.saturating_sub(1) / 7 + 1
    }
}

/// Writes an unsigned variable-length count.
///
/// The first byte starts with one `1` bit per extra byte, terminated by a `0`
/// (omitted when all eight bits are prefix), and carries the most significant
/// bits of the value. Extra bytes follow in big-endian order.
pub fn put_count<B: BufMut>(buf: &mut B, value: u64) {
    let extra = count_length(value) - 1;
    if extra == 8 {
        buf.put_u8(0xFF);
        buf.put_u64(value);
        return;
    }
    let prefix = if extra == 0 { 0 } else { 0xFFu8 << (8 - extra) };
    buf.put_u8(prefix | (value >> (8 * extra)) as u8);
    for i in (0..extra).rev() {
        buf.put_u8((value >> (8 * i)) as u8);
    }
}

/// Writes a signed count using the zig-zag mapping.
pub fn put_scount<B: BufMut>(buf: &mut B, value: i64) {
    put_count(buf, zigzag(value));
}

/// Decodes a count from the start of `input`.
///
/// Returns the value and the number of bytes consumed, or `None` if `input`
/// ends inside the encoding.
pub fn decode_count(input: &[u8]) -> Option<(u64, usize)> {
    let first = *input.first()?;
    let extra = extra_bytes(first);
    let tail = input.get(1..=extra)?;
    let mut value = if extra == 8 {
        0
    } else {
        u64::from(first & (0x7F >> extra))
    };
    for &byte in tail {
        value = (value << 8) | u64::from(byte);
    }
    Some((value, extra + 1))
}

/// Maps 0, -1, 1, -2, 2, ... onto 0, 1, 2, 3, 4, ...
#[inline]
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`].
#[inline]
pub fn unzigzag(value: u64) -> i64 {
    if value & 1 == 1 {
        -((value >> 1) as i64) - 1
    } else {
        (value >> 1) as i64
    }
}
