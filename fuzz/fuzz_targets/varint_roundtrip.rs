#![no_main]

use libfuzzer_sys::fuzz_target;
use pbwire_codec::varint::{
    decode_zigzag32, decode_zigzag64, encode_varint, encode_zigzag32, encode_zigzag64, varint_len,
};
use pbwire_decoder::Decoder;

// Fuzz target: encode a value, then decode it through the stream path.
fuzz_target!(|input: (u64, i32, i64)| {
    let (value, small, signed) = input;
    assert_eq!(decode_zigzag32(encode_zigzag32(small)), small);
    assert_eq!(decode_zigzag64(encode_zigzag64(signed)), signed);

    let mut buf = [0u8; 10];
    let n = encode_varint(value, &mut buf);
    assert_eq!(n, varint_len(value));

    let mut decoder = Decoder::from_reader_with_capacity(&buf[..n], 3);
    assert_eq!(decoder.read_raw_varint64().unwrap(), value);
    assert!(decoder.is_at_end().unwrap());
});
