#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use pbwire_decoder::{ByteSource, Decoder};

#[derive(Arbitrary, Debug)]
struct Input {
    window: u8,
    data: Vec<u8>,
}

// Fuzz target: slice, chunked and stream decoders must produce the same
// tag sequence and outcome on the same bytes, and the same final offset
// when the walk succeeds.
fuzz_target!(|input: Input| {
    let window = usize::from(input.window).max(1);
    let chunks: Vec<Bytes> = input.data.chunks(window).map(Bytes::copy_from_slice).collect();

    let reference = trace(Decoder::from_slice(&input.data));
    assert_eq!(trace(Decoder::from_chunks(chunks)), reference);
    assert_eq!(
        trace(Decoder::from_reader_with_capacity(&input.data[..], window)),
        reference
    );
});

/// Tags seen, and the final offset if the walk succeeded.
fn trace<'a, S: ByteSource<'a>>(mut decoder: Decoder<'a, S>) -> (Vec<u32>, Option<u64>) {
    let mut tags = Vec::new();
    let ok = loop {
        match decoder.read_tag() {
            Ok(0) => break true,
            Ok(tag) => {
                tags.push(tag);
                match decoder.skip_field(tag) {
                    Ok(true) => {}
                    Ok(false) => break true,
                    Err(_) => break false,
                }
            }
            Err(_) => break false,
        }
    };
    (tags, ok.then(|| decoder.total_bytes_read()))
}
