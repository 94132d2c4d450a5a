/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;

use zune_core::log::trace;

use crate::cimage::CRifImage;
use crate::errors::RifDecodeErrors;
use crate::header::RifHeader;
use crate::image::RifImage;
use crate::pool::ArenaPool;

/// Expand a compressed image into an uncompressed one
///
/// The result has the nominal width, height and alpha flag of `image`
/// and every pixel equals `image.get_pixel(x, y)`. Pixels the cell grid
/// does not cover read as `(0, 255)` as they would from `image`.
///
/// # Arguments
/// - `image`: The compressed image, it is left untouched
/// - `pool`: Pool to carve the result from, or `None` to allocate it.
///    It may be the pool `image` lives in.
///
/// # Example
/// ```
/// use zune_rif::{decompress, CRifDecoder, RifReader};
///
/// let mut data = vec![1];
/// for field in [1_u32, 1, 1, 1, 1, 1] {
///     data.extend_from_slice(&field.to_be_bytes());
/// }
/// data.extend_from_slice(&[42, 7]);
/// data.extend_from_slice(&0_u32.to_be_bytes());
///
/// let compressed = CRifDecoder::new(RifReader::from_bytes(data), None).unwrap().decode().unwrap();
/// let raw = decompress(&compressed, None).unwrap();
///
/// assert_eq!(raw.get_pixel(0, 0), (42, 7));
/// ```
pub fn decompress(image: &CRifImage, pool: Option<&ArenaPool>) -> Result<RifImage, RifDecodeErrors> {
    let header = RifHeader {
        has_alpha: image.has_alpha(),
        width:     image.width(),
        height:    image.height()
    };
    let mut output = RifImage::allocate(&header, pool)?;

    let bytes_per_pixel = header.bytes_per_pixel();
    let mut row = vec![0_u8; header.width * bytes_per_pixel];

    // build a whole row before writing, both images may share a pool
    for y in 0..header.height {
        for (x, pixel) in row.chunks_exact_mut(bytes_per_pixel).enumerate() {
            let (color, alpha) = image.get_pixel(x as isize, y as isize);

            pixel[0] = color;
            if let Some(a) = pixel.get_mut(1) {
                *a = alpha;
            }
        }
        output.write_row(y, &row);
    }
    trace!("Decompressed {}x{} image", header.width, header.height);

    Ok(output)
}
