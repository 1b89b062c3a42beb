use crate::error::WireError;

/// Number of low-order tag bits that carry the wire type.
pub const TAG_TYPE_BITS: u32 = 3;

const TAG_TYPE_MASK: u32 = (1 << TAG_TYPE_BITS) - 1;

/// Largest field number representable in a 32-bit tag.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Encoding category of a field, carried in the low three bits of its tag.
///
/// ```text
/// ┌──────┬─────────────────┬──────────────────────────────────┐
/// │ Wire │ Type            │ Payload format                   │
/// ├──────┼─────────────────┼──────────────────────────────────┤
/// │ 0    │ Varint          │ Single varint value              │
/// │ 1    │ Fixed64         │ 8 bytes, little-endian           │
/// │ 2    │ LengthDelimited │ Varint length + raw bytes        │
/// │ 3    │ StartGroup      │ Fields until matching EndGroup   │
/// │ 4    │ EndGroup        │ No payload                       │
/// │ 5    │ Fixed32         │ 4 bytes, little-endian           │
/// └──────┴─────────────────┴──────────────────────────────────┘
/// ```
///
/// A reader that knows only the wire type can always skip a field it does
/// not understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    /// Convert the low three bits of a tag to a [`WireType`].
    ///
    /// # Errors
    ///
    /// [`WireError::InvalidWireType`] for 6 and 7 (and anything larger).
    pub fn from_raw(value: u32) -> Result<Self, WireError> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            3 => Ok(Self::StartGroup),
            4 => Ok(Self::EndGroup),
            5 => Ok(Self::Fixed32),
            other => Err(WireError::InvalidWireType { value: other }),
        }
    }

    /// Short lowercase label used in diagnostics and CLI output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Varint => "varint",
            Self::Fixed64 => "i64",
            Self::LengthDelimited => "len",
            Self::StartGroup => "sgroup",
            Self::EndGroup => "egroup",
            Self::Fixed32 => "i32",
        }
    }
}

/// Combine a field number and wire type into a tag.
#[must_use]
pub fn make_tag(field_number: u32, wire_type: WireType) -> u32 {
    (field_number << TAG_TYPE_BITS) | wire_type as u32
}

/// Field number carried by `tag`.
#[must_use]
pub fn tag_field_number(tag: u32) -> u32 {
    tag >> TAG_TYPE_BITS
}

/// Wire type carried by `tag`.
///
/// # Errors
///
/// [`WireError::InvalidWireType`] if the low bits are 6 or 7.
pub fn tag_wire_type(tag: u32) -> Result<WireType, WireError> {
    WireType::from_raw(tag & TAG_TYPE_MASK)
}
