//! Typed scalar reads layered on the decoder's primitives.
//!
//! ```text
//! ┌──────────────────────────────┬────────────┬────────────────────────┐
//! │ Reader                       │ Wire type  │ Decoding               │
//! ├──────────────────────────────┼────────────┼────────────────────────┤
//! │ read_uint32 / read_uint64    │ varint     │ as-is                  │
//! │ read_int32 / read_int64      │ varint     │ two's complement       │
//! │ read_sint32 / read_sint64    │ varint     │ zigzag                 │
//! │ read_bool                    │ varint     │ non-zero is true       │
//! │ read_enum                    │ varint     │ as int32               │
//! │ read_fixed32 / read_sfixed32 │ 32-bit     │ little-endian          │
//! │ read_fixed64 / read_sfixed64 │ 64-bit     │ little-endian          │
//! │ read_float / read_double     │ 32/64-bit  │ IEEE 754 bit pattern   │
//! └──────────────────────────────┴────────────┴────────────────────────┘
//! ```

use pbwire_codec::varint::{decode_zigzag32, decode_zigzag64};

use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::source::ByteSource;

#[allow(clippy::cast_possible_wrap, clippy::missing_errors_doc)]
impl<'a, S: ByteSource<'a>> Decoder<'a, S> {
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        self.read_raw_little_endian64().map(f64::from_bits)
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        self.read_raw_little_endian32().map(f32::from_bits)
    }

    pub fn read_uint64(&mut self) -> Result<u64, DecodeError> {
        self.read_raw_varint64()
    }

    pub fn read_int64(&mut self) -> Result<i64, DecodeError> {
        self.read_raw_varint64().map(|v| v as i64)
    }

    /// Negative values arrive sign-extended to ten bytes; only the low 32
    /// bits are kept.
    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        self.read_raw_varint32().map(|v| v as i32)
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        self.read_raw_little_endian64()
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        self.read_raw_little_endian32()
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        self.read_raw_varint64().map(|v| v != 0)
    }

    pub fn read_uint32(&mut self) -> Result<u32, DecodeError> {
        self.read_raw_varint32()
    }

    pub fn read_enum(&mut self) -> Result<i32, DecodeError> {
        self.read_int32()
    }

    pub fn read_sfixed32(&mut self) -> Result<i32, DecodeError> {
        self.read_raw_little_endian32().map(|v| v as i32)
    }

    pub fn read_sfixed64(&mut self) -> Result<i64, DecodeError> {
        self.read_raw_little_endian64().map(|v| v as i64)
    }

    pub fn read_sint32(&mut self) -> Result<i32, DecodeError> {
        self.read_raw_varint32().map(decode_zigzag32)
    }

    pub fn read_sint64(&mut self) -> Result<i64, DecodeError> {
        self.read_raw_varint64().map(decode_zigzag64)
    }
}
