#![no_main]

use libfuzzer_sys::fuzz_target;
use pbwire_codec::varint::decode_varint;
use pbwire_decoder::{DecodeError, Decoder};

// Fuzz target: the decoder's varint paths against the codec.
//
// The in-window fast path (slice) and the byte-at-a-time path (one-byte
// stream window) must agree with `decode_varint` on value, length and
// failure kind.
fuzz_target!(|data: &[u8]| {
    let expected = decode_varint(data);

    let mut fast = Decoder::from_slice(data);
    let mut slow = Decoder::from_reader_with_capacity(data, 1);
    let fast_result = fast.read_raw_varint64();
    let slow_result = slow.read_raw_varint64();

    match expected {
        Ok((value, len)) => {
            assert_eq!(fast_result.unwrap(), value);
            assert_eq!(slow_result.unwrap(), value);
            assert_eq!(fast.total_bytes_read(), len as u64);
            assert_eq!(slow.total_bytes_read(), len as u64);
        }
        Err(_) => {
            let same_kind = matches!(
                (fast_result, slow_result),
                (Err(DecodeError::MalformedVarint), Err(DecodeError::MalformedVarint))
                    | (Err(DecodeError::Truncated { .. }), Err(DecodeError::Truncated { .. }))
            );
            assert!(same_kind);
        }
    }
});
