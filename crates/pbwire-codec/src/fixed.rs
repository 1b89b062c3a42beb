use crate::error::WireError;

/// Read a little-endian `u32` from the front of `buf`.
///
/// # Errors
///
/// [`WireError::Truncated`] if fewer than four bytes are available.
pub fn decode_fixed32(buf: &[u8]) -> Result<u32, WireError> {
    let bytes: [u8; 4] = buf
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(WireError::Truncated { offset: buf.len() })?;
    Ok(u32::from_le_bytes(bytes))
}

/// Read a little-endian `u64` from the front of `buf`.
///
/// # Errors
///
/// [`WireError::Truncated`] if fewer than eight bytes are available.
pub fn decode_fixed64(buf: &[u8]) -> Result<u64, WireError> {
    let bytes: [u8; 8] = buf
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or(WireError::Truncated { offset: buf.len() })?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        assert_eq!(decode_fixed32(&[0x78, 0x56, 0x34, 0x12]).unwrap(), 0x1234_5678);
        assert_eq!(
            decode_fixed64(&[0xF0, 0xDE, 0xBC, 0x9A, 0x78, 0x56, 0x34, 0x12]).unwrap(),
            0x1234_5678_9ABC_DEF0
        );
    }

    #[test]
    fn ignores_trailing_bytes() {
        assert_eq!(decode_fixed32(&[1, 0, 0, 0, 0xFF]).unwrap(), 1);
    }

    #[test]
    fn short_input_is_truncated() {
        assert_eq!(decode_fixed32(&[1, 2, 3]), Err(WireError::Truncated { offset: 3 }));
        assert_eq!(decode_fixed64(&[0; 7]), Err(WireError::Truncated { offset: 7 }));
    }
}
