/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;
use zune_core::options::EncoderOptions;
use zune_rif::{
    ArenaPool, CRifDecoder, CompressOptions, PoolError, RifDecodeErrors, RifDecoder,
    RifEncoder, RifReader
};

fn raw_file(width: usize, height: usize, value: u8) -> Vec<u8> {
    let pixels = vec![value; width * height];
    let options = EncoderOptions::new(width, height, ColorSpace::Luma, BitDepth::Eight);
    RifEncoder::new(&pixels, options).encode().unwrap()
}

fn compressed_file() -> Vec<u8> {
    let pixels: Vec<u8> = (0..64).map(|i| (i % 8 / 4) as u8 * 100).collect();
    let options = EncoderOptions::new(8, 8, ColorSpace::Luma, BitDepth::Eight);
    RifEncoder::new(&pixels, options)
        .encode_compressed(&CompressOptions::fixed(4))
        .unwrap()
}

#[test]
fn images_in_one_pool_do_not_overlap() {
    let pool = ArenaPool::new(256);

    let first = RifDecoder::new(RifReader::from_bytes(raw_file(4, 4, 1)), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();
    let second = RifDecoder::new(RifReader::from_bytes(raw_file(3, 3, 2)), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();

    let a = first.pool_region().unwrap();
    let b = second.pool_region().unwrap();

    assert_eq!((a.offset(), a.len()), (0, 16));
    assert_eq!((b.offset(), b.len()), (16, 9));
    assert!(a.pool().ptr_eq(b.pool()));

    assert_eq!(first.get_pixel(3, 3), (1, 255));
    assert_eq!(second.get_pixel(2, 2), (2, 255));
}

#[test]
fn clear_reuses_the_base_offset() {
    let pool = ArenaPool::new(64);

    let data = compressed_file();
    let compressed = CRifDecoder::new(RifReader::from_bytes(data.clone()), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(compressed.cells_region().unwrap().offset(), 0);
    assert!(pool.cursor() > 0);
    compressed.release();

    pool.clear();

    let again = CRifDecoder::new(RifReader::from_bytes(data), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(again.cells_region().unwrap().offset(), 0);
    assert_eq!(again.get_pixel(7, 7), (100, 255));
}

#[test]
fn pool_sized_for_one_image() {
    let data = compressed_file();
    let header = CRifDecoder::new(RifReader::from_bytes(data.as_slice()), None)
        .unwrap()
        .header()
        .to_owned();

    let pool = ArenaPool::new(header.pool_size().unwrap());
    let image = CRifDecoder::new(RifReader::from_bytes(data.as_slice()), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();

    assert_eq!(pool.remaining(), 0);
    assert!(image.is_pooled());

    // the decompressed copy needs its own room
    assert!(matches!(
        image.decompress(Some(&pool)),
        Err(RifDecodeErrors::PoolErrors(PoolError::Exhausted { .. }))
    ));

    pool.resize(pool.capacity() + header.decompressed_pool_size().unwrap());
    let raw = image.decompress(Some(&pool)).unwrap();
    assert_eq!(raw.get_pixel(4, 0), (100, 255));
    assert_eq!(pool.remaining(), 0);
}

#[test]
fn exhaustion_leaves_earlier_images_intact() {
    let pool = ArenaPool::new(20);

    let first = RifDecoder::new(RifReader::from_bytes(raw_file(4, 4, 9)), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();
    let err = RifDecoder::new(RifReader::from_bytes(raw_file(4, 4, 1)), Some(&pool)).err();

    assert!(matches!(
        err,
        Some(RifDecodeErrors::PoolErrors(PoolError::Exhausted {
            requested: 16,
            available: 4
        }))
    ));
    assert_eq!(pool.cursor(), 16);
    assert_eq!(first.get_pixel(0, 0), (9, 255));
}

#[test]
fn copies_outlive_the_pool() {
    let pool = ArenaPool::new(16);
    let pooled = RifDecoder::new(RifReader::from_bytes(raw_file(4, 4, 3)), Some(&pool))
        .unwrap()
        .decode()
        .unwrap();
    let copy = pooled.copy();

    pool.clone().release();

    assert_eq!(pooled.get_pixel(0, 0), (0, 255));
    assert_eq!(copy.get_pixel(0, 0), (3, 255));
    assert!(!copy.is_pooled());
}
