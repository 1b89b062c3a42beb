#![warn(clippy::pedantic)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod limit;
pub mod prefix;
pub mod source;
pub mod view;

mod values;

pub use config::DecoderConfig;
pub use decoder::{BufDecoder, ChunkedDecoder, Decoder, MAX_DECLARED_LEN, SliceDecoder, StreamDecoder};
pub use error::DecodeError;
pub use limit::LimitToken;
pub use prefix::{read_delimited_len, read_varint32_async, read_varint32_from, read_varint32_with_first_byte};
pub use source::{BufSource, ByteSource, ChunkedSource, SliceSource, StreamSource};
pub use view::{ByteView, Rope};
