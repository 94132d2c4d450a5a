/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;

use crate::errors::RifDecodeErrors;
use crate::header::{bytes_per_pixel, RifHeader};
use crate::pixel::{in_bounds, pixel_or_default};
use crate::pool::{ArenaPool, PoolRegion};
use crate::storage::Storage;

/// An uncompressed luminance image
///
/// Pixels are stored row major, one byte (color) per pixel
/// for images without alpha and two bytes (color, alpha) for
/// images with alpha.
///
/// The pixel buffer is either owned by the image or a region of an
/// [`ArenaPool`], dropping the image frees owned storage only.
pub struct RifImage {
    width:     usize,
    height:    usize,
    has_alpha: bool,
    pixels:    Storage
}

impl RifImage {
    /// Allocate a zeroed image for `header`
    pub(crate) fn allocate(
        header: &RifHeader, pool: Option<&ArenaPool>
    ) -> Result<RifImage, RifDecodeErrors> {
        let length = header
            .pixel_bytes()
            .ok_or(RifDecodeErrors::Overflow("pixel buffer size"))?;

        Ok(RifImage {
            width:     header.width,
            height:    header.height,
            has_alpha: header.has_alpha,
            pixels:    Storage::allocate(length, pool)?
        })
    }

    pub(crate) fn empty() -> RifImage {
        RifImage {
            width:     0,
            height:    0,
            has_alpha: false,
            pixels:    Storage::Owned(Vec::new())
        }
    }

    /// Create an image with alpha where every pixel is
    /// transparent black `(0, 0)`
    ///
    /// # Example
    /// ```
    /// use zune_rif::RifImage;
    ///
    /// let image = RifImage::new_blank(4, 4);
    /// assert_eq!(image.get_pixel(3, 3), (0, 0));
    /// assert_eq!(image.get_pixel(4, 3), (0, 255));
    /// ```
    pub fn new_blank(width: usize, height: usize) -> RifImage {
        let length = width.saturating_mul(height).saturating_mul(2);

        RifImage {
            width,
            height,
            has_alpha: true,
            pixels: Storage::Owned(vec![0; length])
        }
    }

    /// Create an image from already decoded pixels
    ///
    /// # Returns
    /// - `None` if `pixels` is not `width*height*(1 or 2)` bytes long
    pub fn from_pixels(
        width: usize, height: usize, has_alpha: bool, pixels: Vec<u8>
    ) -> Option<RifImage> {
        let expected = width
            .checked_mul(height)?
            .checked_mul(bytes_per_pixel(has_alpha))?;

        if pixels.len() != expected {
            return None;
        }
        Some(RifImage {
            width,
            height,
            has_alpha,
            pixels: Storage::Owned(pixels)
        })
    }

    /// Deep copy the image into storage owned by the copy,
    /// regardless of whether this image lives in a pool
    pub fn copy(&self) -> RifImage {
        RifImage {
            width:     self.width,
            height:    self.height,
            has_alpha: self.has_alpha,
            pixels:    Storage::Owned(self.pixels.to_vec())
        }
    }

    /// Release the image
    ///
    /// Owned pixels are freed, pooled pixels stay in the pool
    /// until it is cleared or released.
    pub fn release(self) {}

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    /// Return the width and height of the image
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub const fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Luma for images without alpha, LumaA otherwise
    pub const fn colorspace(&self) -> ColorSpace {
        if self.has_alpha {
            ColorSpace::LumaA
        } else {
            ColorSpace::Luma
        }
    }

    /// Always [`BitDepth::Eight`]
    pub const fn bit_depth(&self) -> BitDepth {
        BitDepth::Eight
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        bytes_per_pixel(self.has_alpha)
    }

    /// Whether the pixels live in an [`ArenaPool`]
    pub fn is_pooled(&self) -> bool {
        self.pixels.region().is_some()
    }

    /// The pool region backing the pixels, if any
    pub fn pool_region(&self) -> Option<&PoolRegion> {
        self.pixels.region()
    }

    /// A copy of the pixel buffer in its stored layout
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.to_vec()
    }

    /// Return the `(color, alpha)` pair at `(x, y)`
    ///
    /// Coordinates outside the image return `(0, 255)`, images
    /// without alpha always report an alpha of `255`
    pub fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        let Some((x, y)) = in_bounds(x, y, self.width, self.height) else {
            return pixel_or_default(None);
        };
        let index = y * self.width + x;

        if self.has_alpha {
            pixel_or_default(self.pixels.pair(index * 2))
        } else {
            pixel_or_default(self.pixels.byte(index).map(|color| (color, 255)))
        }
    }

    /// Write the pixel at `(x, y)`, out of range coordinates are ignored
    ///
    /// `alpha` is dropped for images without alpha.
    pub fn set_pixel(&mut self, x: isize, y: isize, color: u8, alpha: u8) {
        let Some((x, y)) = in_bounds(x, y, self.width, self.height) else {
            return;
        };
        let index = y * self.width + x;
        let has_alpha = self.has_alpha;

        self.pixels.with_slice_mut(|pixels| {
            if has_alpha {
                if let Some(pair) = pixels.get_mut(index * 2..index * 2 + 2) {
                    pair[0] = color;
                    pair[1] = alpha;
                }
            } else if let Some(pixel) = pixels.get_mut(index) {
                *pixel = color;
            }
        });
    }

    /// Overwrite row `y` with bytes already in the stored layout
    pub(crate) fn write_row(&mut self, y: usize, row: &[u8]) {
        let stride = self.width * self.bytes_per_pixel();
        let start = y * stride;

        self.pixels.with_slice_mut(|pixels| {
            if let Some(dest) = pixels.get_mut(start..start + stride) {
                dest.copy_from_slice(&row[..stride]);
            }
        });
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.pixels
    }
}

impl Clone for RifImage {
    /// Same as [`copy`](RifImage::copy), the clone owns its pixels
    fn clone(&self) -> Self {
        self.copy()
    }
}
