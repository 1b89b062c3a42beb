use crate::error::WireError;

/// Maximum number of bytes a varint can occupy.
/// ceil(64 / 7) = 10 bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a `u64` value as a base-128 varint into the provided buffer.
///
/// # Returns
///
/// The number of bytes written (1–10).
///
/// # Panics
///
/// Panics if `buf` is shorter than the required encoding length.
/// A 10-byte buffer is always sufficient for any `u64`.
///
/// # Wire format examples
///
/// | Value   | Encoded bytes        | Length |
/// |---------|----------------------|--------|
/// | 0       | `[0x00]`             | 1      |
/// | 127     | `[0x7F]`             | 1      |
/// | 128     | `[0x80, 0x01]`       | 2      |
/// | 300     | `[0xAC, 0x02]`       | 2      |
/// | 16384   | `[0x80, 0x80, 0x01]` | 3      |
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        // Take the lowest 7 bits
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value > 0 {
            // More bytes to come: set the continuation bit
            byte |= 0x80;
        }

        buf[i] = byte;
        i += 1;

        if value == 0 {
            break;
        }
    }
    i
}

/// Number of bytes [`encode_varint`] writes for `value`.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    // 64 - leading_zeros gives the significant bit count; 0 still needs a byte.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the provided byte slice.
///
/// Bytes are consumed seven bits at a time, low-order group first, until a
/// byte with the high bit clear is found. Bits beyond the 64th are
/// discarded, matching how a negative `int32` is sign-extended to ten bytes
/// on the wire.
///
/// # Returns
///
/// `(decoded_value, bytes_consumed)` on success.
///
/// # Errors
///
/// - [`WireError::MalformedVarint`] if ten bytes are consumed without
///   finding a terminating byte.
/// - [`WireError::Truncated`] if the slice ends mid-varint.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut result: u64 = 0;

    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        // Extract the 7 data bits and shift them into position
        result |= u64::from(byte & 0x7F) << (7 * i);

        // If MSB is clear, this is the last byte
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    if buf.len() >= MAX_VARINT_LEN {
        return Err(WireError::MalformedVarint);
    }

    // We ran out of input bytes while MSB was still set
    Err(WireError::Truncated { offset: buf.len() })
}

/// Decode a varint and keep only the low 32 bits.
///
/// # Errors
///
/// Same as [`decode_varint`].
#[allow(clippy::cast_possible_truncation)]
pub fn decode_varint32(buf: &[u8]) -> Result<(u32, usize), WireError> {
    decode_varint(buf).map(|(value, n)| (value as u32, n))
}

/// Fast-path decode over a window known to hold at least ten bytes.
///
/// The fixed-size array removes every per-byte bounds check. The result and
/// the failure classification are identical to [`decode_varint`] over the
/// same bytes.
///
/// # Errors
///
/// [`WireError::MalformedVarint`] if none of the ten bytes terminates.
pub fn decode_varint_unrolled(buf: &[u8; MAX_VARINT_LEN]) -> Result<(u64, usize), WireError> {
    let mut result: u64 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte < 0x80 {
            return Ok((result, i + 1));
        }
    }
    Err(WireError::MalformedVarint)
}

/// Map a zigzag-encoded 32-bit value back to its signed form.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn decode_zigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Map a zigzag-encoded 64-bit value back to its signed form.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn decode_zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Map a signed 32-bit value to its zigzag form.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn encode_zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Map a signed 64-bit value to its zigzag form.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn encode_zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}
