/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Random access to decoded pixels
//!
//! Both image variants answer the same question, what is the
//! `(color, alpha)` pair at `(x, y)`, this is what renderers and
//! bindings consume.
//!
//! Coordinates outside the image are not an error, they read as
//! opaque black `(0, 255)` since transformed draws routinely sample
//! past the edges.
use crate::cimage::CRifImage;
use crate::constants::OUT_OF_BOUNDS_PIXEL;
use crate::image::RifImage;

/// Read access to `(color, alpha)` pairs
pub trait PixelAccess {
    /// Width and height
    fn dimensions(&self) -> (usize, usize);

    /// Whether pixels carry their own alpha, images without
    /// alpha always report `255`
    fn has_alpha(&self) -> bool;

    /// The `(color, alpha)` pair at `(x, y)`, `(0, 255)` outside the image
    fn get_pixel(&self, x: isize, y: isize) -> (u8, u8);
}

/// Either image variant behind one type
#[derive(Copy, Clone)]
pub enum OpaqueImage<'a> {
    Raw(&'a RifImage),
    Compressed(&'a CRifImage)
}

impl<'a> From<&'a RifImage> for OpaqueImage<'a> {
    fn from(value: &'a RifImage) -> Self {
        OpaqueImage::Raw(value)
    }
}

impl<'a> From<&'a CRifImage> for OpaqueImage<'a> {
    fn from(value: &'a CRifImage) -> Self {
        OpaqueImage::Compressed(value)
    }
}

impl OpaqueImage<'_> {
    pub const fn is_compressed(&self) -> bool {
        matches!(self, OpaqueImage::Compressed(_))
    }
}

impl PixelAccess for OpaqueImage<'_> {
    fn dimensions(&self) -> (usize, usize) {
        match self {
            OpaqueImage::Raw(image) => image.dimensions(),
            OpaqueImage::Compressed(image) => image.dimensions()
        }
    }

    fn has_alpha(&self) -> bool {
        match self {
            OpaqueImage::Raw(image) => image.has_alpha(),
            OpaqueImage::Compressed(image) => image.has_alpha()
        }
    }

    fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        match self {
            OpaqueImage::Raw(image) => image.get_pixel(x, y),
            OpaqueImage::Compressed(image) => image.get_pixel(x, y)
        }
    }
}

impl PixelAccess for RifImage {
    fn dimensions(&self) -> (usize, usize) {
        RifImage::dimensions(self)
    }

    fn has_alpha(&self) -> bool {
        RifImage::has_alpha(self)
    }

    fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        RifImage::get_pixel(self, x, y)
    }
}

impl PixelAccess for CRifImage {
    fn dimensions(&self) -> (usize, usize) {
        CRifImage::dimensions(self)
    }

    fn has_alpha(&self) -> bool {
        CRifImage::has_alpha(self)
    }

    fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        CRifImage::get_pixel(self, x, y)
    }
}

/// Convert signed coordinates to in bounds unsigned ones
#[inline]
pub(crate) fn in_bounds(x: isize, y: isize, width: usize, height: usize) -> Option<(usize, usize)> {
    let x = usize::try_from(x).ok()?;
    let y = usize::try_from(y).ok()?;

    if x >= width || y >= height {
        return None;
    }
    Some((x, y))
}

/// Pixels missing from storage read like out of bounds ones
#[inline]
pub(crate) fn pixel_or_default(pixel: Option<(u8, u8)>) -> (u8, u8) {
    pixel.unwrap_or(OUT_OF_BOUNDS_PIXEL)
}
