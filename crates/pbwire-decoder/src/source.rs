use std::io::{self, Read};
use std::ops::Range;

use bytes::Bytes;

use crate::config::DEFAULT_BUFFER_SIZE;
use crate::view::ByteView;

/// A backing store that feeds bytes to a [`Decoder`](crate::Decoder).
///
/// The decoder only ever sees one resident window at a time. When it has
/// consumed the whole window and needs more, it calls [`refill`], which
/// replaces the window with the next run of bytes.
///
/// ```text
///   source bytes:  [ ...retired... | window | ...not yet resident... ]
///                                   ^ pos
/// ```
///
/// Contract for implementors:
///
/// - `refill` is only called once the current window is fully consumed.
/// - On `Ok(true)` the new window is non-empty.
/// - On `Ok(false)` the window is left untouched; the source is exhausted
///   (or, for streams, has no more bytes right now).
/// - `slice_direct` may return a zero-copy view of window bytes; returning
///   `None` makes the decoder copy instead.
///
/// [`refill`]: ByteSource::refill
pub trait ByteSource<'a> {
    /// Short name used in log events.
    fn kind(&self) -> &'static str;

    /// The currently resident bytes.
    fn window(&self) -> &[u8];

    /// Replace an exhausted window with at most `max_len` further bytes.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from streaming sources.
    fn refill(&mut self, max_len: usize) -> io::Result<bool>;

    /// Zero-copy view of `range` within the current window, if this source
    /// can lend its storage.
    fn slice_direct(&self, _range: Range<usize>) -> Option<ByteView<'a>> {
        None
    }

    /// Bytes known to remain after the current window, when the whole
    /// input is materialized.
    fn remaining_hint(&self) -> Option<u64> {
        None
    }

    /// Whether reads block on an external source; only such sources are
    /// subject to the size limit.
    fn is_streaming(&self) -> bool {
        false
    }

    /// Whether reads spanning windows may be returned as multi-segment
    /// ropes instead of one contiguous copy.
    fn supports_rope(&self) -> bool {
        false
    }
}

// ── Slice ─────────────────────────────────────────────────────────────────────

/// A caller-owned byte slice, resident in full.
#[derive(Clone, Copy, Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> ByteSource<'a> for SliceSource<'a> {
    fn kind(&self) -> &'static str {
        "slice"
    }

    fn window(&self) -> &[u8] {
        self.data
    }

    fn refill(&mut self, _max_len: usize) -> io::Result<bool> {
        Ok(false)
    }

    fn slice_direct(&self, range: Range<usize>) -> Option<ByteView<'a>> {
        self.data.get(range).map(ByteView::Borrowed)
    }

    fn remaining_hint(&self) -> Option<u64> {
        Some(0)
    }
}

// ── Contiguous buffer ─────────────────────────────────────────────────────────

/// A single contiguous `Bytes` buffer, resident in full.
#[derive(Clone, Debug)]
pub struct BufSource {
    data: Bytes,
}

impl BufSource {
    #[must_use]
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }
}

impl ByteSource<'static> for BufSource {
    fn kind(&self) -> &'static str {
        "buf"
    }

    fn window(&self) -> &[u8] {
        &self.data
    }

    fn refill(&mut self, _max_len: usize) -> io::Result<bool> {
        Ok(false)
    }

    fn slice_direct(&self, range: Range<usize>) -> Option<ByteView<'static>> {
        if range.end > self.data.len() {
            return None;
        }
        Some(ByteView::Shared(self.data.slice(range)))
    }

    fn remaining_hint(&self) -> Option<u64> {
        Some(0)
    }
}

// ── Chunked ───────────────────────────────────────────────────────────────────

/// An ordered sequence of `Bytes` chunks, each becoming the window in turn.
///
/// Empty chunks are dropped at construction so every refill yields bytes.
#[derive(Clone, Debug)]
pub struct ChunkedSource {
    chunks: Vec<Bytes>,
    index: usize,
    /// Total length of the chunks after `index`.
    tail_len: u64,
    rope: bool,
}

impl ChunkedSource {
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: Vec<Bytes> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        let tail_len = chunks.iter().skip(1).map(|c| c.len() as u64).sum();
        Self {
            chunks,
            index: 0,
            tail_len,
            rope: false,
        }
    }

    /// Allow reads that span chunks to come back as zero-copy ropes.
    #[must_use]
    pub fn with_rope(mut self, enabled: bool) -> Self {
        self.rope = enabled;
        self
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl ByteSource<'static> for ChunkedSource {
    fn kind(&self) -> &'static str {
        "chunked"
    }

    fn window(&self) -> &[u8] {
        match self.chunks.get(self.index) {
            Some(chunk) => chunk,
            None => &[],
        }
    }

    fn refill(&mut self, _max_len: usize) -> io::Result<bool> {
        let next = self.index + 1;
        let Some(chunk) = self.chunks.get(next) else {
            return Ok(false);
        };
        self.tail_len -= chunk.len() as u64;
        self.index = next;
        Ok(true)
    }

    fn slice_direct(&self, range: Range<usize>) -> Option<ByteView<'static>> {
        let chunk = self.chunks.get(self.index)?;
        if range.end > chunk.len() {
            return None;
        }
        Some(ByteView::Shared(chunk.slice(range)))
    }

    fn remaining_hint(&self) -> Option<u64> {
        Some(self.tail_len)
    }

    fn supports_rope(&self) -> bool {
        self.rope
    }
}

// ── Stream ────────────────────────────────────────────────────────────────────

/// A pull-based reader with an internally owned window of fixed capacity.
///
/// A short read is simply a smaller window; only `Ok(0)` marks the end of
/// the source. Reads interrupted by a signal are retried. The window is
/// overwritten on every refill, so it is never lent out as a view.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
    buf: Box<[u8]>,
    filled: usize,
}

impl<R: Read> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// A capacity of zero is raised to one byte.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            filled: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl<R: Read> ByteSource<'static> for StreamSource<R> {
    fn kind(&self) -> &'static str {
        "stream"
    }

    fn window(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    fn refill(&mut self, max_len: usize) -> io::Result<bool> {
        let want = self.buf.len().min(max_len);
        if want == 0 {
            return Ok(false);
        }
        loop {
            match self.reader.read(&mut self.buf[..want]) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn is_streaming(&self) -> bool {
        true
    }
}
