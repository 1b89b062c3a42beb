/// Default nesting bound for caller-tracked recursion.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Default cumulative byte budget for stream-backed decoders.
pub const DEFAULT_SIZE_LIMIT: u64 = i32::MAX as u64;

/// Default capacity of the stream source's internal window.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Configuration for a [`Decoder`](crate::Decoder).
///
/// ```text
/// ┌─────────────────┬──────────────┬──────────────────────────────────────┐
/// │ Field           │ Default      │ Purpose                              │
/// ├─────────────────┼──────────────┼──────────────────────────────────────┤
/// │ recursion_limit │ 100          │ Max depth for enter_recursion        │
/// │ size_limit      │ i32::MAX     │ Byte budget, stream sources only     │
/// │ buffer_size     │ 4096         │ Stream window capacity               │
/// │ aliasing        │ false        │ Return zero-copy views when possible │
/// └─────────────────┴──────────────┴──────────────────────────────────────┘
/// ```
///
/// `buffer_size` is only read when a stream decoder is constructed through
/// [`Decoder::from_reader_with_config`](crate::Decoder::from_reader_with_config);
/// the other fields can be applied to any decoder with
/// [`Decoder::with_config`](crate::Decoder::with_config).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum depth accepted by `enter_recursion`.
    pub recursion_limit: u32,

    /// Cumulative byte budget between size-counter resets. Ignored by
    /// materialized sources, whose length already bounds them.
    pub size_limit: u64,

    /// Capacity of the stream source's internal buffer.
    pub buffer_size: usize,

    /// Whether reads may return views that alias the caller's bytes.
    pub aliasing: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            size_limit: DEFAULT_SIZE_LIMIT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            aliasing: false,
        }
    }
}
