//! Decoder construction shared by every command.
//!
//! The same file bytes can be fed through any of the four source adapters,
//! which makes the CLI a quick way to check that they agree.

use bytes::Bytes;
use clap::ValueEnum;
use pbwire_decoder::config::{DEFAULT_BUFFER_SIZE, DEFAULT_RECURSION_LIMIT, DEFAULT_SIZE_LIMIT};
use pbwire_decoder::{ByteSource, DecodeError, Decoder, DecoderConfig};

/// Which adapter the file bytes are read through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Borrowed slice of the whole file.
    #[default]
    Slice,
    /// One contiguous `Bytes` buffer.
    Buf,
    /// `--chunk-size` pieces, read as a chunk sequence.
    Chunked,
    /// A blocking reader with a `--chunk-size` window.
    Stream,
}

/// Decoder options common to all commands.
#[derive(clap::Args, Clone, Debug)]
pub struct DecoderArgs {
    /// Source adapter to read the file through.
    #[arg(long, value_enum, default_value_t = SourceKind::Slice)]
    pub source: SourceKind,

    /// Chunk size for `chunked`, window size for `stream`.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub chunk_size: usize,

    /// Byte budget for stream sources.
    #[arg(long, default_value_t = DEFAULT_SIZE_LIMIT)]
    pub size_limit: u64,

    /// Maximum group and message nesting depth.
    #[arg(long, default_value_t = DEFAULT_RECURSION_LIMIT)]
    pub recursion_limit: u32,

    /// Return zero-copy views where the source allows it.
    #[arg(long)]
    pub alias: bool,
}

impl DecoderArgs {
    pub fn config(&self) -> DecoderConfig {
        DecoderConfig {
            recursion_limit: self.recursion_limit,
            size_limit: self.size_limit,
            buffer_size: self.chunk_size.max(1),
            aliasing: self.alias,
        }
    }
}

/// Work to run against a decoder of whichever source type was chosen.
pub trait DecoderTask {
    type Output;

    fn run<'a, S: ByteSource<'a>>(self, decoder: Decoder<'a, S>) -> Result<Self::Output, DecodeError>;
}

/// Build a decoder over `bytes` as `args` asks and hand it to `task`.
pub fn with_decoder<T: DecoderTask>(bytes: &[u8], args: &DecoderArgs, task: T) -> Result<T::Output, DecodeError> {
    let config = args.config();
    match args.source {
        SourceKind::Slice => task.run(Decoder::from_slice(bytes).with_config(config)),
        SourceKind::Buf => task.run(Decoder::from_bytes(Bytes::copy_from_slice(bytes)).with_config(config)),
        SourceKind::Chunked => {
            let chunks: Vec<Bytes> = bytes
                .chunks(config.buffer_size)
                .map(Bytes::copy_from_slice)
                .collect();
            task.run(Decoder::from_chunks_with_rope(chunks).with_config(config))
        }
        SourceKind::Stream => task.run(Decoder::from_reader_with_config(bytes, config)),
    }
}
