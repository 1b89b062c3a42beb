use std::string::FromUtf8Error;

use pbwire_codec::WireError;

/// Errors that can occur while decoding wire-format input.
///
/// Every failure is reported at the point of detection and never retried.
/// After an error the decoder is memory-safe but its position is
/// unspecified, so callers should abandon the read chain.
///
/// ```text
///   DecodeError
///   ├── MalformedVarint        ← no terminator within 10 bytes
///   ├── Truncated              ← source or active limit ended mid-value
///   ├── InvalidTag             ← field number zero
///   ├── InvalidWireType        ← tag carried wire type 6 or 7
///   ├── InvalidEndTag          ← group closed by the wrong tag
///   ├── SizeLimitExceeded      ← stream read past its size budget
///   ├── RecursionLimitExceeded ← caller-tracked nesting too deep
///   ├── InvalidUtf8            ← strict string decode failed
///   ├── LengthOverflow         ← declared length not representable
///   ├── UnbalancedLimit        ← pop_limit with a stale token
///   ├── OutOfBounds            ← slice sub-range outside the input
///   └── Io(std::io::Error)     ← from the streaming source
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A varint ran ten bytes without a terminating byte.
    #[error("malformed varint: no terminator within 10 bytes")]
    MalformedVarint,

    /// The input ended, or the innermost limit was reached, before a value
    /// could be completed. `offset` is the absolute stream position of
    /// the failed read.
    #[error("truncated message at offset {offset}")]
    Truncated { offset: u64 },

    /// A non-zero tag carried field number zero.
    #[error("invalid tag {tag:#x}: field number is zero")]
    InvalidTag { tag: u32 },

    /// A tag's low bits named an unknown wire type.
    #[error("invalid wire type {value}")]
    InvalidWireType { value: u32 },

    /// A group ended with a tag that does not match its start tag.
    #[error("expected end tag {expected:#x}, found {found:#x}")]
    InvalidEndTag { expected: u32, found: u32 },

    /// A stream-backed read would take the running total past the
    /// configured size limit.
    #[error("size limit of {limit} bytes exceeded")]
    SizeLimitExceeded { limit: u64 },

    /// Nesting went deeper than the configured recursion limit.
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: u32 },

    /// A strict string read found bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// A declared length is larger than any length the wire can carry, or
    /// adding it to the current position overflows.
    #[error("declared length {length} exceeds representable range")]
    LengthOverflow { length: u64 },

    /// `pop_limit` was handed a token that is not the innermost one.
    #[error("unbalanced limit pop: token for depth {found_depth}, stack depth {expected_depth}")]
    UnbalancedLimit {
        expected_depth: usize,
        found_depth: usize,
    },

    /// A requested sub-range does not fit inside the input slice.
    #[error("range {offset}+{len} out of bounds for input of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// An I/O error from the streaming source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<WireError> for DecodeError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::MalformedVarint => Self::MalformedVarint,
            WireError::Truncated { offset } => Self::Truncated {
                offset: offset as u64,
            },
            WireError::InvalidWireType { value } => Self::InvalidWireType { value },
        }
    }
}
