use crate::varint::{MAX_VARINT_LEN, encode_varint};
use crate::wire_type::{WireType, make_tag};

/// Minimal field writer used to build fixtures for tests, benches and
/// fuzz round trips.
///
/// Every method appends to an internal buffer and returns `&mut Self`, so
/// fixtures read top to bottom in wire order:
///
/// ```rust
/// use pbwire_codec::FieldWriter;
///
/// let bytes = FieldWriter::new()
///     .varint_field(1, 150)
///     .bytes_field(2, b"testing")
///     .nested(3, |inner| {
///         inner.fixed32_field(1, 7);
///     })
///     .finish();
/// assert_eq!(&bytes[..3], &[0x08, 0x96, 0x01]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bare varint with no tag.
    pub fn raw_varint(&mut self, value: u64) -> &mut Self {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let n = encode_varint(value, &mut scratch);
        self.buf.extend_from_slice(&scratch[..n]);
        self
    }

    /// Append raw bytes verbatim. Used to plant malformed input.
    pub fn raw_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a tag for `field_number` with the given wire type.
    pub fn tag(&mut self, field_number: u32, wire_type: WireType) -> &mut Self {
        self.raw_varint(u64::from(make_tag(field_number, wire_type)))
    }

    /// Encode a varint field (wire type 0).
    pub fn varint_field(&mut self, field_number: u32, value: u64) -> &mut Self {
        self.tag(field_number, WireType::Varint).raw_varint(value)
    }

    /// Encode a 32-bit fixed field (wire type 5).
    pub fn fixed32_field(&mut self, field_number: u32, value: u32) -> &mut Self {
        self.tag(field_number, WireType::Fixed32)
            .raw_bytes(&value.to_le_bytes())
    }

    /// Encode a 64-bit fixed field (wire type 1).
    pub fn fixed64_field(&mut self, field_number: u32, value: u64) -> &mut Self {
        self.tag(field_number, WireType::Fixed64)
            .raw_bytes(&value.to_le_bytes())
    }

    /// Encode a length-delimited field (wire type 2).
    pub fn bytes_field(&mut self, field_number: u32, data: &[u8]) -> &mut Self {
        self.tag(field_number, WireType::LengthDelimited)
            .raw_varint(data.len() as u64)
            .raw_bytes(data)
    }

    /// Encode a length-delimited field whose payload is built by `build`.
    pub fn nested(&mut self, field_number: u32, build: impl FnOnce(&mut FieldWriter)) -> &mut Self {
        let mut inner = FieldWriter::new();
        build(&mut inner);
        self.bytes_field(field_number, &inner.buf)
    }

    /// Encode a group: start tag, the fields from `build`, matching end tag.
    pub fn group(&mut self, field_number: u32, build: impl FnOnce(&mut FieldWriter)) -> &mut Self {
        self.tag(field_number, WireType::StartGroup);
        build(self);
        self.tag(field_number, WireType::EndGroup)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Return a copy of the bytes written so far.
    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        self.buf.clone()
    }
}
