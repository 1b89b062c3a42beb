#![warn(clippy::pedantic)]

pub mod error;
pub mod fixed;
pub mod varint;
pub mod wire_type;
pub mod writer;

pub use error::WireError;
pub use varint::MAX_VARINT_LEN;
pub use wire_type::{WireType, make_tag, tag_field_number, tag_wire_type};
pub use writer::FieldWriter;
