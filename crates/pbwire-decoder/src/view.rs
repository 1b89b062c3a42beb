use std::collections::VecDeque;
use std::ops::Deref;

use bytes::{Buf, Bytes, BytesMut};

/// A byte range returned by the decoder.
///
/// Which variant comes back is the aliasing policy made visible:
///
/// ```text
/// ┌──────────┬───────────────────────────────┬──────────────────────────┐
/// │ Variant  │ Produced when                 │ Storage                  │
/// ├──────────┼───────────────────────────────┼──────────────────────────┤
/// │ Borrowed │ aliasing on, slice source     │ the caller's &[u8]       │
/// │ Shared   │ aliasing on, Bytes / chunks   │ refcounted caller Bytes  │
/// │ Owned    │ aliasing off, stream source,  │ fresh Vec<u8>            │
/// │          │ or a read spanning windows    │                          │
/// └──────────┴───────────────────────────────┴──────────────────────────┘
/// ```
///
/// An aliased view observes the caller's storage, not a snapshot of it.
/// For `Borrowed` the borrow checker keeps the slice frozen while the view
/// lives; for `Shared` the storage is immutable `Bytes`. Once a caller
/// turns the view back into its own reusable buffer, later writes to that
/// buffer are visible through anything still sharing it.
#[derive(Clone, Debug)]
pub enum ByteView<'a> {
    Borrowed(&'a [u8]),
    Shared(Bytes),
    Owned(Vec<u8>),
}

impl<'a> ByteView<'a> {
    /// An empty view that owns no allocation.
    #[must_use]
    pub fn empty() -> Self {
        Self::Borrowed(&[])
    }

    /// Whether this view points into the caller's storage.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        matches!(self, Self::Borrowed(_) | Self::Shared(_))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Borrowed(slice) => slice,
            Self::Shared(bytes) => bytes,
            Self::Owned(vec) => vec,
        }
    }

    /// Convert into an owned vector, copying unless already owned.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Self::Borrowed(slice) => slice.to_vec(),
            Self::Shared(bytes) => bytes.to_vec(),
            Self::Owned(vec) => vec,
        }
    }

    /// Convert into `Bytes`. Shared views stay zero-copy, owned vectors are
    /// moved, borrowed slices are copied.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Borrowed(slice) => Bytes::copy_from_slice(slice),
            Self::Shared(bytes) => bytes,
            Self::Owned(vec) => Bytes::from(vec),
        }
    }
}

impl Deref for ByteView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for ByteView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteView<'_> {}

impl PartialEq<[u8]> for ByteView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

/// A non-contiguous sequence of byte segments read as one logical range.
///
/// Chunked decoders with rope support return one of these for reads that
/// span several chunks, so nothing is concatenated up front. The rope
/// implements [`bytes::Buf`], which gives forward seeking through
/// [`Buf::advance`] and piecewise access through [`Buf::chunk`].
#[derive(Clone, Debug, Default)]
pub struct Rope {
    segments: VecDeque<Bytes>,
    remaining: usize,
}

impl Rope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Empty segments are dropped.
    pub fn push(&mut self, segment: Bytes) {
        if segment.is_empty() {
            return;
        }
        self.remaining += segment.len();
        self.segments.push_back(segment);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Bytes> {
        self.segments.iter()
    }

    /// Flatten into one contiguous `Bytes`. A single-segment rope is
    /// returned without copying.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self.segments.len() {
            0 => Bytes::new(),
            1 => self.segments[0].clone(),
            _ => {
                let mut out = BytesMut::with_capacity(self.remaining);
                for segment in &self.segments {
                    out.extend_from_slice(segment);
                }
                out.freeze()
            }
        }
    }
}

impl Buf for Rope {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn chunk(&self) -> &[u8] {
        match self.segments.front() {
            Some(segment) => &segment[..],
            None => &[],
        }
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining,
            "cannot advance past end of rope: {cnt} > {}",
            self.remaining
        );
        self.remaining -= cnt;
        while cnt > 0 {
            let Some(front) = self.segments.front_mut() else {
                break;
            };
            if cnt < front.len() {
                front.advance(cnt);
                break;
            }
            cnt -= front.len();
            self.segments.pop_front();
        }
    }
}
