/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Decoding and encoding RIF luminance images
//!
//! RIF stores 8 bit luminance pixels with an optional alpha channel in one
//! of two layouts
//! - raw, a short header followed by the pixels
//! - compressed, the image is cut into square tiles, every distinct tile is
//!   stored once in a pattern table and a cell table says which pattern each
//!   grid position shows
//!
//! # Features
//! - Incremental decoding, each `read_chunk` call does a bounded amount of I/O
//! - Optional arena backed storage so many images can share one allocation
//! - Decompression of tiled images into raw ones
//! - Raw and compressed encoding
//! - `no_std`
//!
//! # Example
//! ```
//! use zune_rif::{ArenaPool, RifDecoder, RifReader};
//!
//! let pool = ArenaPool::new(1024);
//! let data = [1, 0, 0, 0, 2, 0, 0, 0, 1, 10, 255, 20, 128];
//!
//! let mut decoder = RifDecoder::new(RifReader::from_bytes(data), Some(&pool)).unwrap();
//! while !decoder.read_chunk(2).unwrap().is_closed() {}
//!
//! let image = decoder.into_image();
//! assert_eq!(image.get_pixel(0, 0), (10, 255));
//! assert_eq!(image.get_pixel(-1, 0), (0, 255));
//! ```
//!
//! ## `no_std`
//! You can use `no_std` with alloc feature to compile for `no_std` endpoints,
//! file backed sources need the `std` feature

#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub use cdecoder::CRifDecoder;
pub use cimage::CRifImage;
pub use decoder::{ReadStatus, RifDecoder};
pub use decompress::decompress;
pub use encoder::*;
pub use errors::*;
pub use header::{CRifHeader, RifHeader};
pub use image::RifImage;
pub use pixel::{OpaqueImage, PixelAccess};
pub use pool::{ArenaPool, PoolRegion};
pub use source::*;
pub use zune_core;

mod cdecoder;
mod cimage;
mod constants;
mod decoder;
mod decompress;
mod encoder;
mod errors;
mod header;
mod image;
mod pixel;
mod pool;
mod serde;
mod source;
mod storage;
