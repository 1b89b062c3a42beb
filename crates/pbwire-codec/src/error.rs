/// Errors raised by the leaf codecs when they run directly over a slice.
///
/// The decoder crate maps each of these onto its own flat `DecodeError`
/// variants, so callers of the full decoder never see this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Varint encoding ran 10 bytes without a terminating byte.
    #[error("malformed varint: no terminator within 10 bytes")]
    MalformedVarint,

    /// Input ended before a complete value could be read.
    #[error("truncated input at offset {offset}")]
    Truncated { offset: usize },

    /// The low three bits of a tag named wire type 6 or 7.
    #[error("invalid wire type {value}")]
    InvalidWireType { value: u32 },
}
