use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pbwire_codec::FieldWriter;
use pbwire_decoder::{ByteSource, DecodeError, Decoder};
use pbwire_tests::chunks;

fn varint_payload(count: u64) -> Vec<u8> {
    let mut writer = FieldWriter::new();
    for i in 0..count {
        writer.varint_field(1, i.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    }
    writer.finish()
}

fn mixed_payload(blob_len: usize) -> Vec<u8> {
    let blob = vec![b'x'; blob_len];
    let mut writer = FieldWriter::new();
    for i in 0..64 {
        writer
            .varint_field(1, i)
            .fixed32_field(2, 7)
            .bytes_field(3, &blob)
            .nested(4, |m| {
                m.varint_field(1, 1).fixed64_field(2, 2);
            });
    }
    writer.finish()
}

fn skip_all<'a, S: ByteSource<'a>>(mut decoder: Decoder<'a, S>) -> Result<u64, DecodeError> {
    decoder.skip_message()?;
    Ok(decoder.total_bytes_read())
}

fn sum_varints<'a, S: ByteSource<'a>>(mut decoder: Decoder<'a, S>) -> Result<u64, DecodeError> {
    let mut sum = 0u64;
    while decoder.read_tag()? != 0 {
        sum = sum.wrapping_add(decoder.read_raw_varint64()?);
    }
    Ok(sum)
}

fn bench_varints(c: &mut Criterion) {
    let payload = varint_payload(10_000);
    let mut group = c.benchmark_group("varints");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("slice", |b| {
        b.iter(|| sum_varints(Decoder::from_slice(&payload)).unwrap());
    });
    group.bench_function("stream_4096", |b| {
        b.iter(|| sum_varints(Decoder::from_reader(&payload[..])).unwrap());
    });
    group.bench_function("stream_7", |b| {
        b.iter(|| sum_varints(Decoder::from_reader_with_capacity(&payload[..], 7)).unwrap());
    });

    group.finish();
}

fn bench_sources(c: &mut Criterion) {
    let mut group = c.benchmark_group("skip_message");

    for blob_len in [16, 1024, 16 * 1024] {
        let payload = mixed_payload(blob_len);
        let shared = Bytes::from(payload.clone());
        let pieces = chunks(&payload, 1024);
        group.throughput(Throughput::Bytes(payload.len() as u64));

        group.bench_with_input(BenchmarkId::new("slice", blob_len), &payload, |b, p| {
            b.iter(|| skip_all(Decoder::from_slice(p)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("buf", blob_len), &shared, |b, p| {
            b.iter(|| skip_all(Decoder::from_bytes(p.clone())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("chunked_1k", blob_len), &pieces, |b, p| {
            b.iter(|| skip_all(Decoder::from_chunks(p.iter().cloned())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("stream", blob_len), &payload, |b, p| {
            b.iter(|| skip_all(Decoder::from_reader(&p[..])).unwrap());
        });
    }

    group.finish();
}

fn bench_aliasing(c: &mut Criterion) {
    let payload = FieldWriter::new().bytes_field(1, &vec![0xAB; 64 * 1024]).finish();
    let mut group = c.benchmark_group("read_bytes_64k");

    for aliasing in [false, true] {
        let label = if aliasing { "aliased" } else { "copied" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut decoder = Decoder::from_slice(&payload);
                decoder.enable_aliasing(aliasing);
                decoder.read_tag().unwrap();
                decoder.read_bytes().unwrap().len()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_varints, bench_sources, bench_aliasing);
criterion_main!(benches);
