use std::io::Read;
use std::marker::PhantomData;

use bytes::Bytes;
use pbwire_codec::fixed::{decode_fixed32, decode_fixed64};
use pbwire_codec::varint::{MAX_VARINT_LEN, decode_varint_unrolled};
use pbwire_codec::{WireType, make_tag, tag_field_number, tag_wire_type};
use tracing::{debug, trace};

use crate::config::{DEFAULT_RECURSION_LIMIT, DEFAULT_SIZE_LIMIT, DecoderConfig};
use crate::error::DecodeError;
use crate::limit::{LimitStack, LimitToken, NO_LIMIT};
use crate::source::{BufSource, ByteSource, ChunkedSource, SliceSource, StreamSource};
use crate::view::{ByteView, Rope};

/// Largest length a length-delimited field may declare. The wire carries
/// lengths as `int32`, so anything above this is negative to every other
/// implementation and rejected here.
pub const MAX_DECLARED_LEN: u32 = i32::MAX as u32;

/// Upper bound on the first allocation for a stream read whose length the
/// source cannot vouch for. The buffer then grows only as bytes arrive.
const MAX_SPECULATIVE_ALLOC: usize = 4096;

pub type SliceDecoder<'a> = Decoder<'a, SliceSource<'a>>;
pub type BufDecoder = Decoder<'static, BufSource>;
pub type ChunkedDecoder = Decoder<'static, ChunkedSource>;
pub type StreamDecoder<R> = Decoder<'static, StreamSource<R>>;

/// Buffered reader for tag/value wire-format input.
///
/// A decoder is bound to exactly one [`ByteSource`] for its whole life and
/// exposes only primitive reads; message structure is driven by the caller
/// issuing tag, varint, fixed and length-delimited reads in sequence.
///
/// Bookkeeping, all in absolute stream offsets:
///
/// ```text
///   window_start          window_start + pos        current_limit
///        │                        │                       │
///   ─────┼────────────────────────┼────────────┬──────────┼──────
///        │◄──── consumed ────────►│◄─ resident ─►│          │
///        0 ........................ pos ..... buf_limit   (absolute)
/// ```
///
/// `buf_limit` is the window length clamped to the active limit (and, for
/// streams, to the size budget), so every in-window fast path is bounded
/// without checking either on its own.
///
/// # Example
///
/// ```rust
/// use pbwire_codec::FieldWriter;
/// use pbwire_decoder::Decoder;
///
/// let bytes = FieldWriter::new()
///     .varint_field(1, 150)
///     .bytes_field(2, b"testing")
///     .finish();
///
/// let mut decoder = Decoder::from_slice(&bytes);
/// assert_eq!(decoder.read_tag().unwrap(), 0x08);
/// assert_eq!(decoder.read_raw_varint64().unwrap(), 150);
/// assert_eq!(decoder.read_tag().unwrap(), 0x12);
/// assert_eq!(decoder.read_string().unwrap(), "testing");
/// assert_eq!(decoder.read_tag().unwrap(), 0);
/// ```
pub struct Decoder<'a, S> {
    source: S,
    /// Read position within the current window.
    pos: usize,
    /// Readable end of the window: its length clamped to `current_limit`.
    buf_limit: usize,
    /// Absolute offset of the first byte of the current window.
    window_start: u64,
    /// Absolute offset reads may not cross, or `NO_LIMIT`.
    current_limit: u64,
    limits: LimitStack,
    /// Absolute offset of the last size-counter reset.
    counter_base: u64,
    size_limit: u64,
    recursion_depth: u32,
    recursion_limit: u32,
    aliasing: bool,
    last_tag: u32,
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> Decoder<'a, SliceSource<'a>> {
    /// Decode from a borrowed slice. With aliasing enabled, byte reads
    /// borrow straight from `data`.
    #[must_use]
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }

    /// Decode only `data[offset..offset + len]`. Nothing outside that range
    /// is ever exposed.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the range does not fit in `data`.
    pub fn from_slice_range(data: &'a [u8], offset: usize, len: usize) -> Result<Self, DecodeError> {
        let range = offset
            .checked_add(len)
            .and_then(|end| data.get(offset..end))
            .ok_or(DecodeError::OutOfBounds {
                offset,
                len,
                available: data.len(),
            })?;
        Ok(Self::from_slice(range))
    }
}

impl Decoder<'static, BufSource> {
    /// Decode from one contiguous buffer. With aliasing enabled, byte
    /// reads share its storage.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(BufSource::new(data.into()))
    }
}

impl Decoder<'static, ChunkedSource> {
    /// Decode from an ordered sequence of buffers. Reads spanning two
    /// chunks are copied into one contiguous buffer.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self::new(ChunkedSource::new(chunks))
    }

    /// Like [`from_chunks`](Self::from_chunks), but with aliasing enabled
    /// [`read_raw_rope`](Self::read_raw_rope) returns spanning reads as
    /// zero-copy multi-segment ropes.
    pub fn from_chunks_with_rope(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self::new(ChunkedSource::new(chunks).with_rope(true))
    }
}

impl<R: Read> Decoder<'static, StreamSource<R>> {
    /// Decode from a blocking reader through a 4 KiB internal window.
    pub fn from_reader(reader: R) -> Self {
        Self::new(StreamSource::new(reader))
    }

    /// Decode from a blocking reader through a window of `capacity` bytes.
    pub fn from_reader_with_capacity(reader: R, capacity: usize) -> Self {
        Self::new(StreamSource::with_capacity(reader, capacity))
    }

    /// Decode from a blocking reader with every field of `config` applied,
    /// including the window size.
    pub fn from_reader_with_config(reader: R, config: DecoderConfig) -> Self {
        Self::from_reader_with_capacity(reader, config.buffer_size).with_config(config)
    }
}

impl<'a, S: ByteSource<'a>> Decoder<'a, S> {
    /// Bind a decoder to `source` with default limits and aliasing off.
    pub fn new(source: S) -> Self {
        let mut decoder = Self {
            source,
            pos: 0,
            buf_limit: 0,
            window_start: 0,
            current_limit: NO_LIMIT,
            limits: LimitStack::default(),
            counter_base: 0,
            size_limit: DEFAULT_SIZE_LIMIT,
            recursion_depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            aliasing: false,
            last_tag: 0,
            _borrow: PhantomData,
        };
        decoder.recompute_buf_limit();
        decoder
    }

    /// Apply the recursion limit, size limit and aliasing flag from
    /// `config`. The buffer size only matters at stream construction.
    #[must_use]
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.recursion_limit = config.recursion_limit;
        self.size_limit = config.size_limit;
        self.aliasing = config.aliasing;
        self.recompute_buf_limit();
        self
    }

    // ── Tags ─────────────────────────────────────────────────────────────

    /// Read a field tag. Returns 0 at the logical end of input, which is
    /// the end of the source or of the innermost pushed limit.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidTag`] if the tag's field number is zero, plus
    /// any varint read failure.
    pub fn read_tag(&mut self) -> Result<u32, DecodeError> {
        if self.is_at_end()? {
            self.last_tag = 0;
            return Ok(0);
        }
        let tag = self.read_raw_varint32()?;
        if tag_field_number(tag) == 0 {
            return Err(DecodeError::InvalidTag { tag });
        }
        self.last_tag = tag;
        Ok(tag)
    }

    /// The tag most recently returned by [`read_tag`](Self::read_tag).
    #[must_use]
    pub fn last_tag(&self) -> u32 {
        self.last_tag
    }

    /// Verify that the last tag read was `expected`. Used after a group to
    /// check it closed with the matching end tag.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidEndTag`] on mismatch.
    pub fn check_last_tag_was(&self, expected: u32) -> Result<(), DecodeError> {
        if self.last_tag == expected {
            Ok(())
        } else {
            Err(DecodeError::InvalidEndTag {
                expected,
                found: self.last_tag,
            })
        }
    }

    // ── Varints ──────────────────────────────────────────────────────────

    /// Read a varint and keep its low 32 bits.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedVarint`] or [`DecodeError::Truncated`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_raw_varint32(&mut self) -> Result<u32, DecodeError> {
        self.read_raw_varint64().map(|value| value as u32)
    }

    /// Read a 64-bit varint.
    ///
    /// When ten bytes are resident inside the active limit the value is
    /// decoded in place; otherwise bytes are pulled one at a time through
    /// refills. Both paths agree on value and on failure kind.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedVarint`] or [`DecodeError::Truncated`].
    pub fn read_raw_varint64(&mut self) -> Result<u64, DecodeError> {
        let resident = &self.source.window()[self.pos..self.buf_limit];
        if let Some(head) = resident.first_chunk::<MAX_VARINT_LEN>() {
            let (value, consumed) = decode_varint_unrolled(head)?;
            self.pos += consumed;
            return Ok(value);
        }
        self.read_varint64_slow()
    }

    fn read_varint64_slow(&mut self) -> Result<u64, DecodeError> {
        let mut result = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_raw_byte()?;
            result |= u64::from(byte & 0x7F) << (7 * i);
            if byte < 0x80 {
                return Ok(result);
            }
        }
        Err(DecodeError::MalformedVarint)
    }

    // ── Fixed width ──────────────────────────────────────────────────────

    /// Read four bytes as a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if the source or active limit ends first.
    pub fn read_raw_little_endian32(&mut self) -> Result<u32, DecodeError> {
        if self.buf_limit - self.pos >= 4 {
            let value = decode_fixed32(&self.source.window()[self.pos..self.buf_limit])?;
            self.pos += 4;
            return Ok(value);
        }
        let mut bytes = [0u8; 4];
        self.read_exact_into(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read eight bytes as a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if the source or active limit ends first.
    pub fn read_raw_little_endian64(&mut self) -> Result<u64, DecodeError> {
        if self.buf_limit - self.pos >= 8 {
            let value = decode_fixed64(&self.source.window()[self.pos..self.buf_limit])?;
            self.pos += 8;
            return Ok(value);
        }
        let mut bytes = [0u8; 8];
        self.read_exact_into(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    // ── Raw bytes ────────────────────────────────────────────────────────

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] at the end of input or limit, or
    /// [`DecodeError::SizeLimitExceeded`] when a stream's budget is spent.
    pub fn read_raw_byte(&mut self) -> Result<u8, DecodeError> {
        if self.pos == self.buf_limit {
            self.refill()?;
        }
        let byte = self.source.window()[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly `len` bytes.
    ///
    /// A read that lies inside the current window is returned as a view of
    /// the caller's storage when aliasing is enabled and the source can
    /// lend it. Every other read is an owned copy, assembled across
    /// refills if needed.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::LengthOverflow`] if `len` cannot be added to the
    ///   current position.
    /// - [`DecodeError::Truncated`] if the active limit or the source ends
    ///   first. Materialized sources detect this before allocating.
    /// - [`DecodeError::SizeLimitExceeded`] if a stream read would pass the
    ///   size budget.
    pub fn read_raw_bytes(&mut self, len: usize) -> Result<ByteView<'a>, DecodeError> {
        if len == 0 {
            return Ok(ByteView::empty());
        }
        if len <= self.buf_limit - self.pos {
            let range = self.pos..self.pos + len;
            self.pos += len;
            if self.aliasing
                && let Some(view) = self.source.slice_direct(range.clone())
            {
                return Ok(view);
            }
            return Ok(ByteView::Owned(self.source.window()[range].to_vec()));
        }

        self.ensure_can_supply(len)?;
        let initial = if self.source.remaining_hint().is_some() {
            len
        } else {
            len.min(MAX_SPECULATIVE_ALLOC)
        };
        let mut out = Vec::with_capacity(initial);
        self.for_each_window(len, |piece| out.extend_from_slice(piece))?;
        Ok(ByteView::Owned(out))
    }

    /// Read exactly `len` bytes as a [`Rope`].
    ///
    /// On a chunked decoder built with rope support and with aliasing on,
    /// each chunk touched contributes one shared segment and nothing is
    /// copied. Everywhere else this is [`read_raw_bytes`] wrapped in a
    /// single-segment rope.
    ///
    /// # Errors
    ///
    /// Same as [`read_raw_bytes`](Self::read_raw_bytes).
    ///
    /// [`read_raw_bytes`]: Self::read_raw_bytes
    pub fn read_raw_rope(&mut self, len: usize) -> Result<Rope, DecodeError> {
        let mut rope = Rope::new();
        if !(self.aliasing && self.source.supports_rope()) {
            rope.push(self.read_raw_bytes(len)?.into_bytes());
            return Ok(rope);
        }

        if len > self.buf_limit - self.pos {
            self.ensure_can_supply(len)?;
        }
        let mut remaining = len;
        while remaining > 0 {
            if self.pos == self.buf_limit {
                self.refill()?;
            }
            let take = (self.buf_limit - self.pos).min(remaining);
            let range = self.pos..self.pos + take;
            let segment = match self.source.slice_direct(range.clone()) {
                Some(view) => view.into_bytes(),
                None => Bytes::copy_from_slice(&self.source.window()[range]),
            };
            rope.push(segment);
            self.pos += take;
            remaining -= take;
        }
        Ok(rope)
    }

    /// Discard exactly `len` bytes without materializing them.
    ///
    /// # Errors
    ///
    /// Same as [`read_raw_bytes`](Self::read_raw_bytes).
    pub fn skip_raw_bytes(&mut self, len: usize) -> Result<(), DecodeError> {
        if len <= self.buf_limit - self.pos {
            self.pos += len;
            return Ok(());
        }
        self.ensure_can_supply(len)?;
        self.for_each_window(len, |_| {})
    }

    // ── Length-delimited ─────────────────────────────────────────────────

    /// Read a varint length prefix.
    ///
    /// # Errors
    ///
    /// [`DecodeError::LengthOverflow`] if the length exceeds
    /// [`MAX_DECLARED_LEN`].
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let length = self.read_raw_varint32()?;
        if length > MAX_DECLARED_LEN {
            debug!(length, "rejected length prefix beyond int32 range");
            return Err(DecodeError::LengthOverflow {
                length: u64::from(length),
            });
        }
        usize::try_from(length).map_err(|_| DecodeError::LengthOverflow {
            length: u64::from(length),
        })
    }

    /// Read a length-prefixed byte range under the aliasing policy.
    ///
    /// # Errors
    ///
    /// Same as [`read_length`](Self::read_length) and
    /// [`read_raw_bytes`](Self::read_raw_bytes).
    pub fn read_bytes(&mut self) -> Result<ByteView<'a>, DecodeError> {
        let len = self.read_length()?;
        self.read_raw_bytes(len)
    }

    /// Read a length-prefixed byte range into an owned vector.
    ///
    /// # Errors
    ///
    /// Same as [`read_bytes`](Self::read_bytes).
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.read_bytes().map(ByteView::into_vec)
    }

    /// Read a length-prefixed byte range as a [`Rope`].
    ///
    /// # Errors
    ///
    /// Same as [`read_bytes`](Self::read_bytes).
    pub fn read_rope(&mut self) -> Result<Rope, DecodeError> {
        let len = self.read_length()?;
        self.read_raw_rope(len)
    }

    /// Read a length-prefixed string, replacing invalid UTF-8 sequences
    /// with U+FFFD.
    ///
    /// # Errors
    ///
    /// Same as [`read_bytes`](Self::read_bytes).
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a length-prefixed string that must be valid UTF-8.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidUtf8`] on any invalid sequence, plus the
    /// errors of [`read_bytes`](Self::read_bytes).
    pub fn read_string_require_utf8(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?.into_vec();
        Ok(String::from_utf8(bytes)?)
    }

    // ── Skipping ─────────────────────────────────────────────────────────

    /// Skip the payload of the field introduced by `tag`.
    ///
    /// Returns `false` if `tag` is an end-group tag, which has no payload
    /// and closes the enclosing group; `true` otherwise.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidWireType`] for wire types 6 and 7, malformed
    /// or truncated payloads, and [`DecodeError::InvalidEndTag`] for a group
    /// closed by the wrong tag.
    pub fn skip_field(&mut self, tag: u32) -> Result<bool, DecodeError> {
        let wire_type = tag_wire_type(tag)?;
        trace!(field = tag_field_number(tag), wire_type = wire_type.label(), "skip field");
        match wire_type {
            WireType::Varint => {
                self.read_raw_varint64()?;
            }
            WireType::Fixed64 => self.skip_raw_bytes(8)?,
            WireType::LengthDelimited => {
                let len = self.read_length()?;
                self.skip_raw_bytes(len)?;
            }
            WireType::StartGroup => {
                self.enter_recursion()?;
                self.skip_message()?;
                self.exit_recursion();
                self.check_last_tag_was(make_tag(tag_field_number(tag), WireType::EndGroup))?;
            }
            WireType::EndGroup => return Ok(false),
            WireType::Fixed32 => self.skip_raw_bytes(4)?,
        }
        Ok(true)
    }

    /// Skip fields until the end of input, the end of the current limit,
    /// or an end-group tag.
    ///
    /// # Errors
    ///
    /// Any error from [`read_tag`](Self::read_tag) or
    /// [`skip_field`](Self::skip_field).
    pub fn skip_message(&mut self) -> Result<(), DecodeError> {
        loop {
            let tag = self.read_tag()?;
            if tag == 0 || !self.skip_field(tag)? {
                return Ok(());
            }
        }
    }

    // ── Limits ───────────────────────────────────────────────────────────

    /// Bound further reads to the next `byte_count` bytes.
    ///
    /// A bound reaching past the currently active limit is accepted but
    /// clamped to it, so an inner range can never extend an outer one.
    ///
    /// # Errors
    ///
    /// [`DecodeError::LengthOverflow`] if the new bound is not addressable.
    pub fn push_limit(&mut self, byte_count: usize) -> Result<LimitToken, DecodeError> {
        let opened_at = self.absolute_pos();
        let requested = opened_at
            .checked_add(byte_count as u64)
            .ok_or(DecodeError::LengthOverflow {
                length: byte_count as u64,
            })?;
        let previous = self.current_limit;
        let token = self.limits.push(previous, opened_at);
        self.current_limit = requested.min(previous);
        self.recompute_buf_limit();
        debug!(
            depth = self.limits.depth(),
            opened_at,
            limit = self.current_limit,
            "pushed limit"
        );
        Ok(token)
    }

    /// Restore the limit that was active before the matching
    /// [`push_limit`](Self::push_limit).
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnbalancedLimit`] if `token` is not the innermost.
    pub fn pop_limit(&mut self, token: LimitToken) -> Result<(), DecodeError> {
        self.current_limit = self.limits.pop(token)?;
        self.recompute_buf_limit();
        debug!(depth = self.limits.depth(), "popped limit");
        Ok(())
    }

    /// Bytes left before the innermost limit, or `None` when no limit is
    /// active.
    #[must_use]
    pub fn bytes_until_limit(&self) -> Option<u64> {
        if self.current_limit == NO_LIMIT {
            return None;
        }
        Some(self.current_limit.saturating_sub(self.absolute_pos()))
    }

    /// Number of limits currently pushed.
    #[must_use]
    pub fn limit_depth(&self) -> usize {
        self.limits.depth()
    }

    /// Whether the active limit, or the end of the source, has been
    /// reached. May pull from a stream source to find out.
    ///
    /// # Errors
    ///
    /// Only I/O errors from a stream source.
    pub fn is_at_end(&mut self) -> Result<bool, DecodeError> {
        if self.pos < self.buf_limit {
            return Ok(false);
        }
        Ok(!self.try_refill()?)
    }

    // ── Size accounting ──────────────────────────────────────────────────

    /// Bytes consumed since construction or the last
    /// [`reset_size_counter`](Self::reset_size_counter).
    #[must_use]
    pub fn total_bytes_read(&self) -> u64 {
        self.absolute_pos() - self.counter_base
    }

    /// Set the cumulative byte budget for stream sources and return the
    /// previous one. Materialized sources are bounded by their length and
    /// ignore it.
    pub fn set_size_limit(&mut self, limit: u64) -> u64 {
        let previous = std::mem::replace(&mut self.size_limit, limit);
        self.recompute_buf_limit();
        previous
    }

    #[must_use]
    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// Zero the running total without moving the read position, so a long
    /// stream can be consumed in bounded increments.
    pub fn reset_size_counter(&mut self) {
        self.counter_base = self.absolute_pos();
        self.recompute_buf_limit();
    }

    // ── Aliasing ─────────────────────────────────────────────────────────

    /// Allow byte reads to return views of the caller's storage.
    ///
    /// Off by default. A view returned while this is on reflects the
    /// backing storage, not a snapshot of it.
    pub fn enable_aliasing(&mut self, enabled: bool) {
        self.aliasing = enabled;
    }

    #[must_use]
    pub fn is_aliasing(&self) -> bool {
        self.aliasing
    }

    // ── Recursion ────────────────────────────────────────────────────────

    /// Set the maximum nesting depth and return the previous one.
    pub fn set_recursion_limit(&mut self, limit: u32) -> u32 {
        std::mem::replace(&mut self.recursion_limit, limit)
    }

    #[must_use]
    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    #[must_use]
    pub fn recursion_depth(&self) -> u32 {
        self.recursion_depth
    }

    /// Record entry into a nested structure.
    ///
    /// # Errors
    ///
    /// [`DecodeError::RecursionLimitExceeded`] if this would pass the
    /// configured limit; the depth is left unchanged.
    pub fn enter_recursion(&mut self) -> Result<(), DecodeError> {
        if self.recursion_depth >= self.recursion_limit {
            debug!(limit = self.recursion_limit, "recursion limit exceeded");
            return Err(DecodeError::RecursionLimitExceeded {
                limit: self.recursion_limit,
            });
        }
        self.recursion_depth += 1;
        Ok(())
    }

    /// Record exit from a nested structure.
    pub fn exit_recursion(&mut self) {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
    }

    // ── Window management ────────────────────────────────────────────────

    fn absolute_pos(&self) -> u64 {
        self.window_start + self.pos as u64
    }

    fn recompute_buf_limit(&mut self) {
        let len = self.source.window().len();
        let mut end = self.current_limit;
        if self.source.is_streaming() {
            end = end.min(self.counter_base.saturating_add(self.size_limit));
        }
        let room = end.saturating_sub(self.window_start);
        let limit = usize::try_from(room).map_or(len, |room| room.min(len));
        // Never behind the read position, even once the budget shrinks.
        self.buf_limit = limit.max(self.pos);
    }

    /// Try to make more bytes resident. `Ok(false)` means no more bytes
    /// can be read right now, because of the active limit, the size
    /// budget, or the end of the source.
    fn try_refill(&mut self) -> Result<bool, DecodeError> {
        if self.pos < self.source.window().len() {
            // Window still holds bytes, but they lie beyond the limit.
            return Ok(false);
        }
        let absolute = self.absolute_pos();
        if absolute >= self.current_limit {
            return Ok(false);
        }
        let mut max_len = usize::MAX;
        if self.source.is_streaming() {
            let used = absolute - self.counter_base;
            if used >= self.size_limit {
                return Ok(false);
            }
            max_len = usize::try_from(self.size_limit - used).unwrap_or(usize::MAX);
        }
        if !self.source.refill(max_len)? {
            return Ok(false);
        }
        self.window_start = absolute;
        self.pos = 0;
        self.recompute_buf_limit();
        trace!(
            source = self.source.kind(),
            offset = absolute,
            obtained = self.source.window().len(),
            "refilled window"
        );
        Ok(self.buf_limit > 0)
    }

    /// Make at least one more byte resident or report why not.
    fn refill(&mut self) -> Result<(), DecodeError> {
        if self.try_refill()? {
            return Ok(());
        }
        Err(self.exhausted_error())
    }

    fn exhausted_error(&self) -> DecodeError {
        let absolute = self.absolute_pos();
        if absolute < self.current_limit
            && self.source.is_streaming()
            && absolute - self.counter_base >= self.size_limit
        {
            debug!(limit = self.size_limit, "size limit exceeded");
            return DecodeError::SizeLimitExceeded {
                limit: self.size_limit,
            };
        }
        DecodeError::Truncated { offset: absolute }
    }

    /// Reject a read of `len` bytes up front if it cannot possibly
    /// succeed, before anything is allocated for it.
    fn ensure_can_supply(&self, len: usize) -> Result<(), DecodeError> {
        let absolute = self.absolute_pos();
        let end = absolute
            .checked_add(len as u64)
            .ok_or(DecodeError::LengthOverflow { length: len as u64 })?;

        if end > self.current_limit {
            return Err(DecodeError::Truncated { offset: absolute });
        }
        if self.source.is_streaming() && end - self.counter_base > self.size_limit {
            debug!(len, limit = self.size_limit, "read would pass size limit");
            return Err(DecodeError::SizeLimitExceeded {
                limit: self.size_limit,
            });
        }
        if let Some(tail) = self.source.remaining_hint() {
            let available = (self.source.window().len() - self.pos) as u64 + tail;
            if len as u64 > available {
                return Err(DecodeError::Truncated { offset: absolute });
            }
        }
        Ok(())
    }

    /// Walk `len` bytes window by window, handing each resident piece to
    /// `visit` and consuming it.
    fn for_each_window(&mut self, len: usize, mut visit: impl FnMut(&[u8])) -> Result<(), DecodeError> {
        let mut remaining = len;
        while remaining > 0 {
            if self.pos == self.buf_limit {
                self.refill()?;
            }
            let take = (self.buf_limit - self.pos).min(remaining);
            visit(&self.source.window()[self.pos..self.pos + take]);
            self.pos += take;
            remaining -= take;
        }
        Ok(())
    }

    fn read_exact_into(&mut self, out: &mut [u8]) -> Result<(), DecodeError> {
        let mut filled = 0;
        self.for_each_window(out.len(), |piece| {
            out[filled..filled + piece.len()].copy_from_slice(piece);
            filled += piece.len();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbwire_codec::FieldWriter;

    #[test]
    fn reads_fields_in_order() {
        let bytes = FieldWriter::new()
            .varint_field(1, 300)
            .fixed32_field(2, 0xDEAD_BEEF)
            .fixed64_field(3, u64::MAX - 1)
            .bytes_field(4, b"abc")
            .finish();
        let mut decoder = Decoder::from_slice(&bytes);

        assert_eq!(decoder.read_tag().unwrap(), make_tag(1, WireType::Varint));
        assert_eq!(decoder.read_raw_varint32().unwrap(), 300);
        assert_eq!(decoder.read_tag().unwrap(), make_tag(2, WireType::Fixed32));
        assert_eq!(decoder.read_raw_little_endian32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(decoder.read_tag().unwrap(), make_tag(3, WireType::Fixed64));
        assert_eq!(decoder.read_raw_little_endian64().unwrap(), u64::MAX - 1);
        assert_eq!(decoder.read_tag().unwrap(), make_tag(4, WireType::LengthDelimited));
        assert_eq!(&*decoder.read_bytes().unwrap(), b"abc");
        assert_eq!(decoder.read_tag().unwrap(), 0);
        assert!(decoder.is_at_end().unwrap());
        assert_eq!(decoder.total_bytes_read(), bytes.len() as u64);
    }

    #[test]
    fn zero_field_number_is_invalid() {
        let mut decoder = Decoder::from_slice(&[0x02, 0x00]);
        assert!(matches!(decoder.read_tag(), Err(DecodeError::InvalidTag { tag: 2 })));
    }

    #[test]
    fn malformed_varint_on_fast_path() {
        let mut bytes = vec![0x80; 10];
        bytes.extend_from_slice(&[0x00; 5]);
        let mut decoder = Decoder::from_slice(&bytes);
        assert!(matches!(decoder.read_raw_varint64(), Err(DecodeError::MalformedVarint)));
    }

    #[test]
    fn malformed_varint_on_slow_path() {
        let mut bytes = vec![0x80; 10];
        bytes.push(0x00);
        let mut decoder = Decoder::from_reader_with_capacity(&bytes[..], 1);
        assert!(matches!(decoder.read_raw_varint64(), Err(DecodeError::MalformedVarint)));
    }

    #[test]
    fn lone_continuation_byte_is_truncated() {
        let mut decoder = Decoder::from_slice(&[0x80]);
        assert!(matches!(
            decoder.read_raw_varint32(),
            Err(DecodeError::Truncated { offset: 1 })
        ));
    }

    #[test]
    fn limit_clamps_fast_paths() {
        // Ten resident bytes, but a limit of 2 must stop the varint
        let bytes = [0xFF; 12];
        let mut decoder = Decoder::from_slice(&bytes);
        let _token = decoder.push_limit(2).unwrap();
        assert!(matches!(decoder.read_raw_varint64(), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn skip_one_byte_inside_limit_then_pop() {
        let bytes = [0x00, 0x01, 0x02];
        let mut decoder = Decoder::from_slice(&bytes);
        let token = decoder.push_limit(1).unwrap();
        decoder.skip_raw_bytes(1).unwrap();
        assert!(decoder.is_at_end().unwrap());
        decoder.pop_limit(token).unwrap();
        assert_eq!(decoder.read_raw_byte().unwrap(), 0x01);
    }

    #[test]
    fn oversized_push_is_clamped_to_outer_limit() {
        let bytes = [1u8, 2, 3, 4, 5, 6];
        let mut decoder = Decoder::from_slice(&bytes);
        let outer = decoder.push_limit(3).unwrap();
        let inner = decoder.push_limit(100).unwrap();
        assert_eq!(decoder.bytes_until_limit(), Some(3));
        decoder.skip_raw_bytes(3).unwrap();
        assert!(matches!(decoder.read_raw_byte(), Err(DecodeError::Truncated { .. })));
        decoder.pop_limit(inner).unwrap();
        decoder.pop_limit(outer).unwrap();
        assert_eq!(decoder.bytes_until_limit(), None);
        assert_eq!(decoder.read_raw_byte().unwrap(), 4);
    }

    #[test]
    fn skip_field_handles_every_wire_type() {
        let bytes = FieldWriter::new()
            .varint_field(1, u64::MAX)
            .fixed64_field(2, 7)
            .bytes_field(3, &[0xAA; 40])
            .group(4, |group| {
                group.varint_field(1, 1).bytes_field(2, b"nested");
            })
            .fixed32_field(5, 9)
            .varint_field(6, 42)
            .finish();
        let mut decoder = Decoder::from_slice(&bytes);
        for _ in 0..5 {
            let tag = decoder.read_tag().unwrap();
            assert!(decoder.skip_field(tag).unwrap());
        }
        assert_eq!(decoder.read_tag().unwrap(), make_tag(6, WireType::Varint));
        assert_eq!(decoder.read_raw_varint64().unwrap(), 42);
        assert_eq!(decoder.recursion_depth(), 0);
    }

    #[test]
    fn end_group_tag_returns_false() {
        let mut decoder = Decoder::from_slice(&[]);
        assert!(!decoder.skip_field(make_tag(3, WireType::EndGroup)).unwrap());
    }

    #[test]
    fn group_with_wrong_end_tag_fails() {
        let bytes = FieldWriter::new()
            .tag(1, WireType::StartGroup)
            .tag(2, WireType::EndGroup)
            .finish();
        let mut decoder = Decoder::from_slice(&bytes);
        let tag = decoder.read_tag().unwrap();
        assert!(matches!(
            decoder.skip_field(tag),
            Err(DecodeError::InvalidEndTag {
                expected: 0x0C,
                found: 0x14
            })
        ));
    }

    #[test]
    fn invalid_wire_type_fails_skip() {
        let mut decoder = Decoder::from_slice(&[0x0E, 0x00]);
        let tag = decoder.read_tag().unwrap();
        assert!(matches!(
            decoder.skip_field(tag),
            Err(DecodeError::InvalidWireType { value: 6 })
        ));
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let mut decoder = Decoder::from_slice(&[]);
        decoder.set_recursion_limit(2);
        decoder.enter_recursion().unwrap();
        decoder.enter_recursion().unwrap();
        assert!(matches!(
            decoder.enter_recursion(),
            Err(DecodeError::RecursionLimitExceeded { limit: 2 })
        ));
        assert_eq!(decoder.recursion_depth(), 2);
        decoder.exit_recursion();
        decoder.enter_recursion().unwrap();
    }

    #[test]
    fn deeply_nested_groups_hit_recursion_limit() {
        let mut bytes = Vec::new();
        for _ in 0..5 {
            bytes.push(make_tag(1, WireType::StartGroup) as u8);
        }
        let mut decoder = Decoder::from_slice(&bytes);
        decoder.set_recursion_limit(3);
        let tag = decoder.read_tag().unwrap();
        assert!(matches!(
            decoder.skip_field(tag),
            Err(DecodeError::RecursionLimitExceeded { limit: 3 })
        ));
    }

    #[test]
    fn slice_range_rejects_out_of_bounds() {
        let data = [0u8; 4];
        assert!(matches!(
            Decoder::from_slice_range(&data, 2, 3),
            Err(DecodeError::OutOfBounds {
                offset: 2,
                len: 3,
                available: 4
            })
        ));
        assert!(Decoder::from_slice_range(&data, usize::MAX, 2).is_err());
    }

    #[test]
    fn strict_and_lossy_strings() {
        let bytes = FieldWriter::new()
            .raw_varint(3)
            .raw_bytes(&[b'a', 0xFF, b'b'])
            .finish();
        let mut decoder = Decoder::from_slice(&bytes);
        assert_eq!(decoder.read_string().unwrap(), "a\u{FFFD}b");

        let mut decoder = Decoder::from_slice(&bytes);
        assert!(matches!(
            decoder.read_string_require_utf8(),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn config_is_applied() {
        let config = DecoderConfig {
            recursion_limit: 7,
            size_limit: 64,
            aliasing: true,
            ..DecoderConfig::default()
        };
        let decoder = Decoder::from_slice(&[]).with_config(config);
        assert_eq!(decoder.recursion_limit(), 7);
        assert_eq!(decoder.size_limit(), 64);
        assert!(decoder.is_aliasing());
    }

    #[test]
    fn lowering_size_limit_below_bytes_read_stops_reads() {
        let data: Vec<u8> = (0..32).collect();
        let mut decoder = Decoder::from_reader_with_capacity(&data[..], 16);
        decoder.skip_raw_bytes(5).unwrap();
        decoder.set_size_limit(2);

        assert!(decoder.is_at_end().unwrap());
        assert!(matches!(
            decoder.read_raw_byte(),
            Err(DecodeError::SizeLimitExceeded { limit: 2 })
        ));
        assert!(matches!(
            decoder.read_raw_varint64(),
            Err(DecodeError::SizeLimitExceeded { limit: 2 })
        ));
        assert_eq!(decoder.total_bytes_read(), 5);

        decoder.set_size_limit(32);
        assert_eq!(decoder.read_raw_byte().unwrap(), 5);
    }

    #[test]
    fn config_applied_mid_stream_clamps_to_read_position() {
        let data: Vec<u8> = (0..32).collect();
        let mut decoder = Decoder::from_reader_with_capacity(&data[..], 16);
        decoder.skip_raw_bytes(9).unwrap();
        let config = DecoderConfig {
            size_limit: 4,
            ..DecoderConfig::default()
        };
        let mut decoder = decoder.with_config(config);
        assert!(decoder.is_at_end().unwrap());
        assert!(matches!(
            decoder.read_raw_little_endian32(),
            Err(DecodeError::SizeLimitExceeded { limit: 4 })
        ));
        assert!(matches!(
            decoder.read_raw_bytes(1),
            Err(DecodeError::SizeLimitExceeded { limit: 4 })
        ));
    }
}
