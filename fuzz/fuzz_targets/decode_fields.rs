#![no_main]

use libfuzzer_sys::fuzz_target;
use pbwire_codec::{tag_wire_type, WireType};
use pbwire_decoder::{ByteSource, DecodeError, Decoder};

// Fuzz target: walk arbitrary bytes as a message, descending into every
// length-delimited field through the limit stack.
//
// Catches bugs in:
// - Limit bookkeeping (push/pop desync, reads crossing a limit)
// - Hostile length prefixes (huge or overflowing allocations)
// - Group matching and recursion accounting
fuzz_target!(|data: &[u8]| {
    let mut decoder = Decoder::from_slice(data);
    decoder.set_recursion_limit(32);
    let _ = walk(&mut decoder);
});

fn walk<'a, S: ByteSource<'a>>(decoder: &mut Decoder<'a, S>) -> Result<(), DecodeError> {
    loop {
        let tag = decoder.read_tag()?;
        if tag == 0 {
            return Ok(());
        }
        if tag_wire_type(tag)? == WireType::LengthDelimited {
            let len = decoder.read_length()?;
            let token = decoder.push_limit(len)?;
            decoder.enter_recursion()?;
            // A nested parse failure is fine; the payload may be plain bytes
            let before = decoder.bytes_until_limit();
            if walk(decoder).is_err() {
                let left = decoder.bytes_until_limit().unwrap_or(0);
                assert!(before.map_or(true, |b| left <= b));
                decoder.skip_raw_bytes(left as usize)?;
            }
            decoder.exit_recursion();
            decoder.pop_limit(token)?;
        } else if !decoder.skip_field(tag)? {
            return Ok(());
        }
    }
}
