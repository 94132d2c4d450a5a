/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Encoding luminance images to RIF
//!
//! Input is 8 bit `Luma` or `LumaA` pixels described by
//! [`EncoderOptions`], RGBA input can be converted beforehand with
//! [`rgba_to_luma_alpha`].
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use zune_core::bytestream::{ZByteWriterTrait, ZWriter};
use zune_core::colorspace::ColorSpace;
use zune_core::log::{debug, trace};
use zune_core::options::EncoderOptions;

use crate::constants::{CELL_INDEX_SIZE, CRIF_HEADER_SIZE, OUT_OF_BOUNDS_PIXEL, RIF_HEADER_SIZE};
use crate::errors::RifEncodeErrors;
use crate::header::bytes_per_pixel;

const SUPPORTED_COLORSPACES: [ColorSpace; 2] = [ColorSpace::Luma, ColorSpace::LumaA];

/// Pattern sizes tried when compressing
///
/// Sizes run from `max_pattern_size` (clamped to the image width) down
/// to `min_pattern_size` in decrements of `step`, the size giving the
/// smallest file wins and ties go to the smaller size.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CompressOptions {
    pub min_pattern_size: usize,
    pub max_pattern_size: usize,
    pub step:             usize
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            min_pattern_size: 8,
            max_pattern_size: 8,
            step:             2
        }
    }
}

impl CompressOptions {
    /// Only try `size`
    pub const fn fixed(size: usize) -> CompressOptions {
        CompressOptions {
            min_pattern_size: size,
            max_pattern_size: size,
            step:             1
        }
    }

    /// Candidate sizes for an image `width` pixels wide, largest first
    fn candidates(&self, width: usize) -> Result<Vec<usize>, RifEncodeErrors> {
        if self.min_pattern_size == 0
            || self.step == 0
            || self.min_pattern_size > self.max_pattern_size
        {
            return Err(RifEncodeErrors::InvalidPatternRange);
        }
        let largest = self
            .max_pattern_size
            .min(width)
            .max(self.min_pattern_size);

        Ok((self.min_pattern_size..=largest)
            .step_by(self.step)
            .map(|k| largest - (k - self.min_pattern_size))
            .collect())
    }
}

/// Tables produced by tiling an image with one pattern size
struct Tiling {
    pattern_size: usize,
    cell_cols:    usize,
    cell_rows:    usize,
    patterns:     Vec<u8>,
    count:        usize,
    cells:        Vec<u32>
}

impl Tiling {
    fn encoded_len(&self) -> usize {
        CRIF_HEADER_SIZE + self.patterns.len() + self.cells.len() * CELL_INDEX_SIZE
    }
}

/// A RIF encoder
///
/// # Example
/// ```
/// use zune_core::bit_depth::BitDepth;
/// use zune_core::colorspace::ColorSpace;
/// use zune_core::options::EncoderOptions;
/// use zune_rif::{RifDecoder, RifEncoder, RifReader};
///
/// let pixels = [10, 255, 20, 128];
/// let options = EncoderOptions::new(2, 1, ColorSpace::LumaA, BitDepth::Eight);
/// let encoded = RifEncoder::new(&pixels, options).encode().unwrap();
///
/// assert_eq!(encoded, [1, 0, 0, 0, 2, 0, 0, 0, 1, 10, 255, 20, 128]);
///
/// let image = RifDecoder::new(RifReader::from_bytes(encoded), None).unwrap().decode().unwrap();
/// assert_eq!(image.get_pixel(1, 0), (20, 128));
/// ```
pub struct RifEncoder<'a> {
    // Luma or LumaA pixels
    pixel_data:  &'a [u8],
    options:     EncoderOptions,
    force_alpha: bool
}

impl<'a> RifEncoder<'a> {
    /// Create an encoder for `data` laid out as `options` describes
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> RifEncoder<'a> {
        RifEncoder {
            pixel_data: data,
            options,
            force_alpha: false
        }
    }

    /// Write an alpha channel even if every pixel is opaque
    pub fn set_force_alpha(&mut self, yes: bool) {
        self.force_alpha = yes;
    }

    /// Whether the output carries an alpha channel
    ///
    /// True when forced or when some input pixel is not fully opaque
    pub fn has_alpha(&self) -> bool {
        if self.force_alpha {
            return true;
        }
        self.options.colorspace() == ColorSpace::LumaA
            && self.pixel_data.chunks_exact(2).any(|pixel| pixel[1] != 255)
    }

    fn check(&self) -> Result<(), RifEncodeErrors> {
        let colorspace = self.options.colorspace();

        if !SUPPORTED_COLORSPACES.contains(&colorspace) {
            return Err(RifEncodeErrors::UnsupportedColorspace(
                colorspace,
                &SUPPORTED_COLORSPACES
            ));
        }
        let (width, height) = (self.options.width(), self.options.height());

        for dimension in [width, height] {
            if u32::try_from(dimension).is_err() {
                return Err(RifEncodeErrors::TooLargeDimensions(dimension));
            }
        }
        let expected = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(colorspace.num_components()))
            .ok_or(RifEncodeErrors::Static("Image dimensions overflow"))?;

        if self.pixel_data.len() != expected {
            return Err(RifEncodeErrors::WrongInputSize(
                expected,
                self.pixel_data.len()
            ));
        }
        Ok(())
    }

    /// Pixel at `(x, y)`, `(0, 255)` past the edges
    fn pixel(&self, x: usize, y: usize) -> (u8, u8) {
        let width = self.options.width();

        if x >= width || y >= self.options.height() {
            return OUT_OF_BOUNDS_PIXEL;
        }
        let index = y * width + x;

        if self.options.colorspace() == ColorSpace::LumaA {
            (self.pixel_data[index * 2], self.pixel_data[index * 2 + 1])
        } else {
            (self.pixel_data[index], 255)
        }
    }

    fn encode_headers<T: ZByteWriterTrait>(
        &self, stream: &mut ZWriter<T>, has_alpha: bool
    ) -> Result<(), RifEncodeErrors> {
        stream.write_u8_err(u8::from(has_alpha))?;
        // both fit, checked in `check`
        stream.write_u32_be_err(self.options.width() as u32)?;
        stream.write_u32_be_err(self.options.height() as u32)?;
        Ok(())
    }

    /// Encode to the uncompressed format
    pub fn encode(&self) -> Result<Vec<u8>, RifEncodeErrors> {
        let mut output = Vec::new();
        self.encode_to(&mut output)?;
        Ok(output)
    }

    /// Encode to the uncompressed format, writing into `sink`
    ///
    /// Returns the number of bytes written
    pub fn encode_to<T: ZByteWriterTrait>(&self, sink: T) -> Result<usize, RifEncodeErrors> {
        self.check()?;

        let has_alpha = self.has_alpha();
        let (width, height) = (self.options.width(), self.options.height());
        let mut stream = ZWriter::new(sink);

        stream.reserve(RIF_HEADER_SIZE + width * height * bytes_per_pixel(has_alpha))?;
        self.encode_headers(&mut stream, has_alpha)?;

        let mut row = vec![0_u8; width * bytes_per_pixel(has_alpha)];

        for y in 0..height {
            for (x, out) in row.chunks_exact_mut(bytes_per_pixel(has_alpha)).enumerate() {
                let (color, alpha) = self.pixel(x, y);

                out[0] = color;
                if has_alpha {
                    out[1] = alpha;
                }
            }
            stream.write_all(&row)?;
        }
        Ok(stream.bytes_written())
    }

    /// Encode to the tile compressed format
    ///
    /// # Example
    /// ```
    /// use zune_core::bit_depth::BitDepth;
    /// use zune_core::colorspace::ColorSpace;
    /// use zune_core::options::EncoderOptions;
    /// use zune_rif::{CRifDecoder, CompressOptions, RifEncoder, RifReader};
    ///
    /// // a checkerboard of 2x2 squares
    /// let pixels: Vec<u8> = (0..64).map(|i| if (i % 8 / 2 + i / 16) % 2 == 0 { 0 } else { 255 }).collect();
    /// let options = EncoderOptions::new(8, 8, ColorSpace::Luma, BitDepth::Eight);
    /// let encoded = RifEncoder::new(&pixels, options)
    ///     .encode_compressed(&CompressOptions::fixed(2))
    ///     .unwrap();
    ///
    /// let image = CRifDecoder::new(RifReader::from_bytes(encoded), None).unwrap().decode().unwrap();
    /// assert_eq!(image.number_of_patterns(), 2);
    /// assert_eq!(image.number_of_cells(), 16);
    /// ```
    pub fn encode_compressed(
        &self, compress_options: &CompressOptions
    ) -> Result<Vec<u8>, RifEncodeErrors> {
        let mut output = Vec::new();
        self.encode_compressed_to(compress_options, &mut output)?;
        Ok(output)
    }

    /// Encode to the tile compressed format, writing into `sink`
    ///
    /// Returns the number of bytes written
    pub fn encode_compressed_to<T: ZByteWriterTrait>(
        &self, compress_options: &CompressOptions, sink: T
    ) -> Result<usize, RifEncodeErrors> {
        self.check()?;

        let has_alpha = self.has_alpha();
        let mut best: Option<Tiling> = None;

        for pattern_size in compress_options.candidates(self.options.width())? {
            let tiling = self.tile(pattern_size, has_alpha)?;

            trace!(
                "Pattern size {}: {} patterns, {} bytes",
                pattern_size,
                tiling.count,
                tiling.encoded_len()
            );
            match &best {
                Some(current) if tiling.encoded_len() > current.encoded_len() => {}
                _ => best = Some(tiling)
            }
        }
        let best = best.ok_or(RifEncodeErrors::InvalidPatternRange)?;

        debug!(
            "Chose pattern size {} with {} patterns for {} cells",
            best.pattern_size,
            best.count,
            best.cells.len()
        );

        let mut stream = ZWriter::new(sink);

        stream.reserve(best.encoded_len())?;
        self.encode_headers(&mut stream, has_alpha)?;

        for field in [best.cell_cols, best.cell_rows, best.pattern_size, best.count] {
            let field = u32::try_from(field).map_err(|_| RifEncodeErrors::TooLargeDimensions(field))?;
            stream.write_u32_be_err(field)?;
        }
        stream.write_all(&best.patterns)?;

        for cell in &best.cells {
            stream.write_u32_be_err(*cell)?;
        }
        Ok(stream.bytes_written())
    }

    /// Split the image into `pattern_size` tiles, storing each distinct
    /// tile once in first seen order
    fn tile(&self, pattern_size: usize, has_alpha: bool) -> Result<Tiling, RifEncodeErrors> {
        let (width, height) = (self.options.width(), self.options.height());
        let cell_cols = width.div_ceil(pattern_size);
        let cell_rows = height.div_ceil(pattern_size);

        let tile_len = pattern_size * pattern_size * bytes_per_pixel(has_alpha);
        let mut seen: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
        let mut patterns = Vec::new();
        let mut cells = Vec::with_capacity(cell_cols * cell_rows);
        let mut tile = Vec::with_capacity(tile_len);

        for cell_row in 0..cell_rows {
            for cell_col in 0..cell_cols {
                tile.clear();

                for y in cell_row * pattern_size..(cell_row + 1) * pattern_size {
                    for x in cell_col * pattern_size..(cell_col + 1) * pattern_size {
                        let (color, alpha) = self.pixel(x, y);

                        tile.push(color);
                        if has_alpha {
                            tile.push(alpha);
                        }
                    }
                }
                let next = u32::try_from(seen.len())
                    .map_err(|_| RifEncodeErrors::Static("Too many distinct patterns"))?;

                let index = *seen.entry(tile.clone()).or_insert_with(|| {
                    patterns.extend_from_slice(&tile);
                    next
                });
                cells.push(index);
            }
        }
        // decoders address the pattern table with 32 bit offsets
        if u32::try_from(patterns.len()).is_err() {
            return Err(RifEncodeErrors::Static("Pattern table is too large"));
        }

        Ok(Tiling {
            pattern_size,
            cell_cols,
            cell_rows,
            count: seen.len(),
            patterns,
            cells
        })
    }
}

/// Convert RGBA8 pixels to `(luminance, alpha)` pairs
///
/// Luminance is `round(0.2125 r + 0.7154 g + 0.0721 b)`, alpha is copied.
/// A trailing partial pixel is ignored.
pub fn rgba_to_luma_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(rgba.len() / 2);

    for pixel in rgba.chunks_exact(4) {
        let luma = 0.2125 * f32::from(pixel[0])
            + 0.7154 * f32::from(pixel[1])
            + 0.0721 * f32::from(pixel[2]);

        output.push(round_to_u8(luma));
        output.push(pixel[3]);
    }
    output
}

// f32::round lives in std
fn round_to_u8(value: f32) -> u8 {
    let rounded = (value + 0.5) as u32;
    rounded.min(255) as u8
}
