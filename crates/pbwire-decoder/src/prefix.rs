//! Varint readers that work directly on a byte source, without building a
//! [`Decoder`](crate::Decoder).
//!
//! These are for peeking at a length prefix in front of a delimited
//! message. They consume exactly the bytes of one varint and never read
//! ahead, so the source is left positioned at the message body.

use std::io::{self, Read};

use pbwire_codec::MAX_VARINT_LEN;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::DecodeError;

/// Read one varint from `reader` and keep its low 32 bits.
///
/// # Errors
///
/// - [`DecodeError::Truncated`] if the source ends mid-varint, including
///   before the first byte.
/// - [`DecodeError::MalformedVarint`] if ten bytes pass without a
///   terminator.
/// - [`DecodeError::Io`] for any other read failure.
pub fn read_varint32_from<R: Read>(reader: &mut R) -> Result<u32, DecodeError> {
    let first = read_byte(reader, 0)?;
    read_varint32_with_first_byte(first, reader)
}

/// Finish reading a varint whose first byte the caller already pulled,
/// typically to tell a clean end of input apart from a truncated prefix.
///
/// # Errors
///
/// Same as [`read_varint32_from`].
pub fn read_varint32_with_first_byte<R: Read>(first: u8, reader: &mut R) -> Result<u32, DecodeError> {
    let mut state = VarintState::new(first);
    while !state.done() {
        let byte = read_byte(reader, state.consumed())?;
        state.push(byte)?;
    }
    Ok(state.value())
}

/// Read the length prefix of the next delimited message.
///
/// Returns `Ok(None)` if the source is cleanly exhausted before the first
/// byte, which is how a sequence of delimited messages ends.
///
/// # Errors
///
/// Same as [`read_varint32_from`], except a clean end of input.
pub fn read_delimited_len<R: Read>(reader: &mut R) -> Result<Option<u32>, DecodeError> {
    let mut first = [0u8; 1];
    loop {
        match reader.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(DecodeError::Io(e)),
        }
    }
    read_varint32_with_first_byte(first[0], reader).map(Some)
}

/// Async counterpart of [`read_varint32_from`] for tokio readers.
///
/// # Errors
///
/// Same as [`read_varint32_from`].
pub async fn read_varint32_async<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, DecodeError> {
    let first = read_byte_async(reader, 0).await?;
    let mut state = VarintState::new(first);
    while !state.done() {
        let byte = read_byte_async(reader, state.consumed()).await?;
        state.push(byte)?;
    }
    Ok(state.value())
}

/// Byte-at-a-time varint accumulator shared by the sync and async readers.
struct VarintState {
    value: u64,
    consumed: usize,
    last: u8,
}

impl VarintState {
    fn new(first: u8) -> Self {
        Self {
            value: u64::from(first & 0x7F),
            consumed: 1,
            last: first,
        }
    }

    fn done(&self) -> bool {
        self.last & 0x80 == 0
    }

    fn consumed(&self) -> usize {
        self.consumed
    }

    fn push(&mut self, byte: u8) -> Result<(), DecodeError> {
        self.value |= u64::from(byte & 0x7F) << (7 * self.consumed);
        self.consumed += 1;
        self.last = byte;
        if !self.done() && self.consumed == MAX_VARINT_LEN {
            return Err(DecodeError::MalformedVarint);
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn value(&self) -> u32 {
        self.value as u32
    }
}

fn read_byte<R: Read>(reader: &mut R, consumed: usize) -> Result<u8, DecodeError> {
    let mut byte = [0u8; 1];
    match reader.read_exact(&mut byte) {
        Ok(()) => Ok(byte[0]),
        Err(e) => Err(eof_as_truncated(e, consumed)),
    }
}

async fn read_byte_async<R: AsyncRead + Unpin>(reader: &mut R, consumed: usize) -> Result<u8, DecodeError> {
    match reader.read_u8().await {
        Ok(byte) => Ok(byte),
        Err(e) => Err(eof_as_truncated(e, consumed)),
    }
}

fn eof_as_truncated(err: io::Error, consumed: usize) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::Truncated {
            offset: consumed as u64,
        }
    } else {
        DecodeError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_exactly_one_varint() {
        let data = [0xAC, 0x02, 0x7F];
        let mut reader = &data[..];
        assert_eq!(read_varint32_from(&mut reader).unwrap(), 300);
        assert_eq!(reader, &[0x7F], "no read-ahead past the varint");
    }

    #[test]
    fn keeps_low_bits_of_wide_varints() {
        // -1 as int32 is sign-extended to ten bytes
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(read_varint32_from(&mut &data[..]).unwrap(), u32::MAX);
    }

    #[test]
    fn ten_continuation_bytes_are_malformed() {
        let mut data = vec![0x80; 10];
        data.push(0x00);
        assert!(matches!(
            read_varint32_from(&mut &data[..]),
            Err(DecodeError::MalformedVarint)
        ));
    }

    #[test]
    fn truncated_prefix() {
        assert!(matches!(
            read_varint32_from(&mut &[0x80][..]),
            Err(DecodeError::Truncated { offset: 1 })
        ));
        assert!(matches!(
            read_varint32_from(&mut &[0u8; 0][..]),
            Err(DecodeError::Truncated { offset: 0 })
        ));
    }

    #[test]
    fn with_first_byte_continues_the_varint() {
        let mut rest = &[0x02][..];
        assert_eq!(read_varint32_with_first_byte(0xAC, &mut rest).unwrap(), 300);
        assert_eq!(read_varint32_with_first_byte(0x05, &mut &[0u8; 0][..]).unwrap(), 5);
    }

    #[test]
    fn delimited_len_sees_clean_end() {
        let data = [0x03, b'a', b'b', b'c'];
        let mut reader = &data[..];
        assert_eq!(read_delimited_len(&mut reader).unwrap(), Some(3));
        reader = &reader[3..];
        assert_eq!(read_delimited_len(&mut reader).unwrap(), None);
    }

    #[tokio::test]
    async fn async_reader_matches_sync() {
        let data = [0x96, 0x01, 0xFF];
        let mut reader = &data[..];
        assert_eq!(read_varint32_async(&mut reader).await.unwrap(), 150);
        assert_eq!(reader, &[0xFF]);
    }

    #[tokio::test]
    async fn async_reader_reports_truncation() {
        let mut reader = &[0xFF, 0xFF][..];
        assert!(matches!(
            read_varint32_async(&mut reader).await,
            Err(DecodeError::Truncated { offset: 2 })
        ));
    }
}
