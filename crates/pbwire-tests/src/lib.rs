//! Shared harness for the integration tests: run one check against the same
//! bytes through every source adapter and window size.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────┐
//! │ Label            │ Adapter                                      │
//! ├──────────────────┼──────────────────────────────────────────────┤
//! │ slice            │ SliceSource over the whole input             │
//! │ buf              │ BufSource over one Bytes                     │
//! │ chunked/N        │ ChunkedSource, N-byte chunks                 │
//! │ chunked-rope/N   │ ChunkedSource with rope reads, N-byte chunks │
//! │ stream/N         │ StreamSource with an N-byte window           │
//! │ stutter/N        │ stream/N over a reader that short-reads and  │
//! │                  │ returns Interrupted on every other call      │
//! └──────────────────┴──────────────────────────────────────────────┘
//! ```

use std::io::{self, Read};

use bytes::Bytes;
use pbwire_decoder::{ByteSource, Decoder};

/// Chunk and window sizes every adapter is exercised at.
pub const WINDOW_SIZES: [usize; 6] = [1, 2, 3, 7, 64, 4096];

/// A check that can run against a decoder of any source type.
pub trait Check {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, decoder: Decoder<'a, S>);
}

/// Run `check` once per adapter and window size.
pub fn for_each_adapter(bytes: &[u8], check: &impl Check) {
    check.check("slice", Decoder::from_slice(bytes));
    check.check("buf", Decoder::from_bytes(Bytes::copy_from_slice(bytes)));

    for size in WINDOW_SIZES {
        check.check(&format!("chunked/{size}"), Decoder::from_chunks(chunks(bytes, size)));
        check.check(
            &format!("chunked-rope/{size}"),
            Decoder::from_chunks_with_rope(chunks(bytes, size)),
        );
        check.check(&format!("stream/{size}"), Decoder::from_reader_with_capacity(bytes, size));
        check.check(
            &format!("stutter/{size}"),
            Decoder::from_reader_with_capacity(Stuttering::new(bytes), size),
        );
    }
}

/// Run `check` over the stream adapters only, at every window size. Used
/// for behavior that materialized sources do not have, such as the size
/// budget.
pub fn for_each_stream_adapter(bytes: &[u8], check: &impl Check) {
    for size in WINDOW_SIZES {
        check.check(&format!("stream/{size}"), Decoder::from_reader_with_capacity(bytes, size));
        check.check(
            &format!("stutter/{size}"),
            Decoder::from_reader_with_capacity(Stuttering::new(bytes), size),
        );
    }
}

/// Split `bytes` into `size`-byte `Bytes` chunks.
#[must_use]
pub fn chunks(bytes: &[u8], size: usize) -> Vec<Bytes> {
    bytes.chunks(size.max(1)).map(Bytes::copy_from_slice).collect()
}

/// A reader that hands out at most three bytes per call and fails every
/// other call with `Interrupted`.
pub struct Stuttering<'a> {
    data: &'a [u8],
    interrupt: bool,
}

impl<'a> Stuttering<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, interrupt: false }
    }
}

impl Read for Stuttering<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        let n = buf.len().min(self.data.len()).min(3);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
