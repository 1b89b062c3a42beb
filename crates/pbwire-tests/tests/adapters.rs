//! Every adapter and window size must decode the same bytes to the same
//! values and fail on the same bytes with the same error kind.

use pbwire_codec::varint::encode_varint;
use pbwire_codec::{FieldWriter, MAX_VARINT_LEN, WireType, make_tag};
use pbwire_decoder::{ByteSource, DecodeError, Decoder};
use pbwire_tests::{Check, for_each_adapter};

fn encode(value: u64) -> Vec<u8> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let n = encode_varint(value, &mut buf);
    buf[..n].to_vec()
}

// ── Varints ──────────────────────────────────────────────────────────────────

struct VarintRoundTrip {
    value: u64,
    len: u64,
}

impl Check for VarintRoundTrip {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        assert_eq!(decoder.read_raw_varint64().unwrap(), self.value, "{label}");
        assert!(decoder.is_at_end().unwrap(), "{label}");
        assert_eq!(decoder.total_bytes_read(), self.len, "{label}");
    }
}

struct Varint32 {
    value: u32,
}

impl Check for Varint32 {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        assert_eq!(decoder.read_raw_varint32().unwrap(), self.value, "{label}");
        assert!(decoder.is_at_end().unwrap(), "{label}");
    }
}

#[test]
fn varints_decode_identically_everywhere() {
    for value in [
        0,
        1,
        127,
        128,
        300,
        16_384,
        u64::from(u32::MAX),
        1 << 56,
        u64::MAX - 1,
        u64::MAX,
    ] {
        let bytes = encode(value);
        for_each_adapter(
            &bytes,
            &VarintRoundTrip {
                value,
                len: bytes.len() as u64,
            },
        );
    }
}

#[test]
fn varint32_keeps_low_bits() {
    for value in [0u64, 150, u64::from(u32::MAX), u64::MAX, (-2i64) as u64] {
        for_each_adapter(&encode(value), &Varint32 { value: value as u32 });
    }
}

struct ExpectMalformed;

impl Check for ExpectMalformed {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        let err = decoder.read_raw_varint64().unwrap_err();
        assert!(matches!(err, DecodeError::MalformedVarint), "{label}: {err}");
    }
}

#[test]
fn ten_continuation_bytes_are_malformed_on_both_paths() {
    let mut bytes = vec![0x80; 10];
    bytes.push(0x00);
    // slice and buf take the in-window path, small windows the byte path
    for_each_adapter(&bytes, &ExpectMalformed);
}

struct SkipMalformed;

impl Check for SkipMalformed {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        let tag = decoder.read_tag().unwrap();
        let err = decoder.skip_field(tag).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedVarint), "{label}: {err}");
    }
}

#[test]
fn skipping_a_malformed_varint_fails() {
    let mut bytes = vec![make_tag(1, WireType::Varint) as u8];
    bytes.extend_from_slice(&[0xFF; 10]);
    bytes.extend_from_slice(&[0x00; 4]);
    for_each_adapter(&bytes, &SkipMalformed);
}

struct ExpectTruncated;

impl Check for ExpectTruncated {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        let err = decoder.read_raw_varint32().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { offset: 1 }), "{label}: {err}");
    }
}

#[test]
fn lone_continuation_byte_is_truncated() {
    for_each_adapter(&[0x80], &ExpectTruncated);
}

// ── Fixed width ──────────────────────────────────────────────────────────────

struct FixedWidth;

impl Check for FixedWidth {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        assert_eq!(decoder.read_raw_little_endian32().unwrap(), 0x1234_5678, "{label}");
        assert_eq!(
            decoder.read_raw_little_endian64().unwrap(),
            0x0102_0304_0506_0708,
            "{label}"
        );
        assert_eq!(decoder.read_double().unwrap(), -2.5, "{label}");
        let err = decoder.read_raw_little_endian32().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "{label}: {err}");
    }
}

#[test]
fn fixed_width_values_cross_windows() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x1234_5678u32.to_le_bytes());
    bytes.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
    bytes.extend_from_slice(&(-2.5f64).to_le_bytes());
    bytes.extend_from_slice(&[0xAA, 0xBB]);
    for_each_adapter(&bytes, &FixedWidth);
}

// ── Whole messages ───────────────────────────────────────────────────────────

fn sample_message(blob: &[u8]) -> Vec<u8> {
    FieldWriter::new()
        .varint_field(1, 150)
        .bytes_field(2, b"testing")
        .nested(3, |m| {
            m.varint_field(1, 1).bytes_field(2, b"abc");
        })
        .fixed64_field(4, 42)
        .bytes_field(5, blob)
        .group(6, |g| {
            g.fixed32_field(1, 7);
        })
        .finish()
}

struct ReadMessage {
    blob: Vec<u8>,
    len: u64,
}

impl Check for ReadMessage {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        assert_eq!(decoder.read_tag().unwrap(), 0x08, "{label}");
        assert_eq!(decoder.read_uint32().unwrap(), 150, "{label}");
        assert_eq!(decoder.read_tag().unwrap(), 0x12, "{label}");
        assert_eq!(decoder.read_string_require_utf8().unwrap(), "testing", "{label}");

        assert_eq!(decoder.read_tag().unwrap(), 0x1A, "{label}");
        let len = decoder.read_length().unwrap();
        let token = decoder.push_limit(len).unwrap();
        decoder.enter_recursion().unwrap();
        assert_eq!(decoder.read_tag().unwrap(), 0x08, "{label}");
        assert!(decoder.read_bool().unwrap(), "{label}");
        assert_eq!(decoder.read_tag().unwrap(), 0x12, "{label}");
        assert_eq!(decoder.read_byte_array().unwrap(), b"abc", "{label}");
        assert_eq!(decoder.read_tag().unwrap(), 0, "{label}");
        assert!(decoder.is_at_end().unwrap(), "{label}");
        decoder.exit_recursion();
        decoder.pop_limit(token).unwrap();

        assert_eq!(decoder.read_tag().unwrap(), 0x21, "{label}");
        assert_eq!(decoder.read_fixed64().unwrap(), 42, "{label}");
        assert_eq!(decoder.read_tag().unwrap(), 0x2A, "{label}");
        assert_eq!(&*decoder.read_bytes().unwrap(), &self.blob[..], "{label}");

        let tag = decoder.read_tag().unwrap();
        assert_eq!(tag, make_tag(6, WireType::StartGroup), "{label}");
        assert!(decoder.skip_field(tag).unwrap(), "{label}");

        assert_eq!(decoder.read_tag().unwrap(), 0, "{label}");
        assert_eq!(decoder.total_bytes_read(), self.len, "{label}");
    }
}

#[test]
fn message_reads_agree_across_adapters() {
    let blob: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let bytes = sample_message(&blob);
    for_each_adapter(
        &bytes,
        &ReadMessage {
            blob,
            len: bytes.len() as u64,
        },
    );
}

struct SkipEverything {
    len: u64,
}

impl Check for SkipEverything {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        decoder.skip_message().unwrap();
        assert_eq!(decoder.last_tag(), 0, "{label}");
        assert!(decoder.is_at_end().unwrap(), "{label}");
        assert_eq!(decoder.total_bytes_read(), self.len, "{label}");
    }
}

#[test]
fn skip_message_consumes_everything() {
    let bytes = sample_message(&[7; 300]);
    for_each_adapter(&bytes, &SkipEverything { len: bytes.len() as u64 });
}

struct RopeRead {
    blob: Vec<u8>,
}

impl Check for RopeRead {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        decoder.enable_aliasing(true);
        assert_eq!(decoder.read_tag().unwrap(), 0x0A, "{label}");
        let rope = decoder.read_rope().unwrap();
        assert_eq!(rope.len(), self.blob.len(), "{label}");
        assert_eq!(&rope.to_bytes()[..], &self.blob[..], "{label}");
        assert!(decoder.is_at_end().unwrap(), "{label}");
    }
}

#[test]
fn rope_reads_agree_across_adapters() {
    let blob: Vec<u8> = (0..100u8).collect();
    let bytes = FieldWriter::new().bytes_field(1, &blob).finish();
    for_each_adapter(&bytes, &RopeRead { blob });
}

// ── Limits ───────────────────────────────────────────────────────────────────

struct SkipInsideLimit;

impl Check for SkipInsideLimit {
    fn check<'a, S: ByteSource<'a>>(&self, label: &str, mut decoder: Decoder<'a, S>) {
        let token = decoder.push_limit(1).unwrap();
        decoder.skip_raw_bytes(1).unwrap();
        assert!(decoder.is_at_end().unwrap(), "{label}");
        decoder.pop_limit(token).unwrap();
        assert_eq!(decoder.read_raw_byte().unwrap(), 0xBB, "{label}");
        assert_eq!(decoder.read_raw_byte().unwrap(), 0xCC, "{label}");
    }
}

#[test]
fn push_skip_pop_keeps_position() {
    for_each_adapter(&[0xAA, 0xBB, 0xCC], &SkipInsideLimit);
}

#[test]
fn bounded_slice_exposes_only_its_range() {
    let data = [0xFF, 0xFF, 0xFF, 0x08, 0x01, 0x18, 0x96, 0x01, 0xFF, 0xFF];
    let mut decoder = Decoder::from_slice_range(&data, 3, 5).unwrap();

    assert_eq!(decoder.read_tag().unwrap(), 0x08);
    assert_eq!(decoder.read_raw_varint32().unwrap(), 1);
    assert_eq!(decoder.read_tag().unwrap(), 0x18);
    assert_eq!(decoder.read_raw_varint32().unwrap(), 150);
    assert_eq!(decoder.read_tag().unwrap(), 0);
    assert_eq!(decoder.total_bytes_read(), 5);

    assert_eq!(decoder.read_tag().unwrap(), 0);
    assert!(matches!(decoder.read_raw_byte(), Err(DecodeError::Truncated { offset: 5 })));
    assert!(decoder.skip_raw_bytes(1).is_err());
    assert_eq!(decoder.total_bytes_read(), 5);
}
