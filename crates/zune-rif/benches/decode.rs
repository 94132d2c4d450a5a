use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nanorand::{Rng, WyRand};
use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;
use zune_core::options::EncoderOptions;
use zune_rif::{ArenaPool, CRifDecoder, CompressOptions, RifDecoder, RifEncoder, RifReader};

const WIDTH: usize = 512;
const HEIGHT: usize = 512;

fn test_pixels() -> Vec<u8> {
    // sparse noise over a flat background so tiles repeat
    let mut rand = WyRand::new_seed(0x52_49_46);
    (0..WIDTH * HEIGHT * 2)
        .map(|i| {
            if i % 2 == 1 || rand.generate_range(0_u32..16) != 0 {
                200
            } else {
                rand.generate::<u8>()
            }
        })
        .collect()
}

fn decode_whole(data: &[u8]) -> usize {
    let image = RifDecoder::new(RifReader::from_bytes(data), None)
        .unwrap()
        .decode()
        .unwrap();
    image.width()
}

fn decode_chunked(data: &[u8], pool: &ArenaPool) -> usize {
    pool.clear();
    let mut decoder = RifDecoder::new(RifReader::from_bytes(data), Some(pool)).unwrap();
    while !decoder.read_chunk(4096).unwrap().is_closed() {}
    decoder.bytes_read()
}

fn decode_compressed(data: &[u8]) -> usize {
    let image = CRifDecoder::new(RifReader::from_bytes(data), None)
        .unwrap()
        .decode()
        .unwrap();
    image.number_of_patterns()
}

fn bench_decode(c: &mut Criterion) {
    let pixels = test_pixels();
    let options = EncoderOptions::new(WIDTH, HEIGHT, ColorSpace::LumaA, BitDepth::Eight);
    let encoder = RifEncoder::new(&pixels, options);

    let raw = encoder.encode().unwrap();
    let compressed = encoder
        .encode_compressed(&CompressOptions::default())
        .unwrap();
    let pool = ArenaPool::new(WIDTH * HEIGHT * 2);

    let mut group = c.benchmark_group("rif: Simple decode");

    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("raw whole", |b| {
        b.iter(|| black_box(decode_whole(raw.as_slice())))
    });

    group.bench_function("raw chunked pooled", |b| {
        b.iter(|| black_box(decode_chunked(raw.as_slice(), &pool)))
    });

    group.bench_function("compressed whole", |b| {
        b.iter(|| black_box(decode_compressed(compressed.as_slice())))
    });
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(20))
      };
    targets=bench_decode);

criterion_main!(benches);
