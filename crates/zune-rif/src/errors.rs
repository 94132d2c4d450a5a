/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible when reading, decoding and encoding RIF images
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use zune_core::bytestream::ZByteIoError;
use zune_core::colorspace::ColorSpace;

/// Errors reported by an [`ArenaPool`](crate::ArenaPool)
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum PoolError {
    /// A reservation would move the cursor past the pool capacity
    ///
    /// The pool cursor is left untouched.
    Exhausted {
        /// Bytes asked for
        requested: usize,
        /// Bytes left between the cursor and the capacity
        available: usize
    }
}

impl Debug for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PoolError::Exhausted {
                requested,
                available
            } => {
                writeln!(
                    f,
                    "Pool exhausted, requested {requested} bytes but only {available} are left"
                )
            }
        }
    }
}

/// Possible errors that may occur during decoding
pub enum RifDecodeErrors {
    /// The storage could not resolve the image name
    NotFound(String),
    /// The stream ended before the header or the
    /// requested chunk could be read
    ///
    /// # Arguments
    /// - 1st argument is the number of bytes we expected
    /// - 2nd argument is the number of bytes actually read
    InsufficientData(usize, usize),
    /// The alpha flag is neither `0` nor `1`
    ///
    /// Only reported in strict mode
    InvalidAlphaFlag(u8),
    /// Too large dimensions for a given dimension
    ///
    /// # Arguments
    /// - dimension name
    /// - configured maximum
    /// - value found in the header
    TooLargeDimensions(&'static str, usize, usize),
    /// Size calculations derived from the header overflow
    Overflow(&'static str),
    /// A compressed image has tiles with a zero edge
    ZeroPatternSize,
    /// A compressed image declares more patterns than it has cells
    ///
    /// # Arguments
    /// - number of patterns
    /// - number of cells
    TooManyPatterns(usize, usize),
    /// A cell references a pattern that does not exist
    InvalidPatternIndex {
        /// Row major index of the cell
        cell:     usize,
        /// Pattern index read from the stream
        index:    u32,
        /// Number of patterns in the image
        patterns: usize
    },
    /// Storage for the image could not be reserved from the pool
    PoolErrors(PoolError),
    /// The byte source failed
    IoErrors(ZByteIoError),
    /// Generic message
    Generic(&'static str)
}

impl Debug for RifDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            RifDecodeErrors::NotFound(name) => {
                writeln!(f, "Could not open `{name}`")
            }
            RifDecodeErrors::InsufficientData(expected, found) => {
                writeln!(
                    f,
                    "Insufficient data, required {expected} bytes but stream provided {found}"
                )
            }
            RifDecodeErrors::InvalidAlphaFlag(flag) => {
                writeln!(f, "Invalid alpha flag {flag}, expected either 0 or 1")
            }
            RifDecodeErrors::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension}, {found} exceeds {expected}"
                )
            }
            RifDecodeErrors::Overflow(what) => {
                writeln!(f, "Overflow when calculating {what}")
            }
            RifDecodeErrors::ZeroPatternSize => {
                writeln!(f, "Pattern size is zero but the image has cells")
            }
            RifDecodeErrors::TooManyPatterns(patterns, cells) => {
                writeln!(
                    f,
                    "Image declares {patterns} patterns but only has {cells} cells to show them"
                )
            }
            RifDecodeErrors::InvalidPatternIndex {
                cell,
                index,
                patterns
            } => {
                writeln!(
                    f,
                    "Cell {cell} references pattern {index} but image only has {patterns} patterns"
                )
            }
            RifDecodeErrors::PoolErrors(err) => {
                writeln!(f, "{err:?}")
            }
            RifDecodeErrors::IoErrors(err) => {
                writeln!(f, "I/O error {err:?}")
            }
            RifDecodeErrors::Generic(val) => {
                writeln!(f, "{val}")
            }
        }
    }
}

impl From<&'static str> for RifDecodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Generic(r)
    }
}

impl From<PoolError> for RifDecodeErrors {
    fn from(value: PoolError) -> Self {
        RifDecodeErrors::PoolErrors(value)
    }
}

impl From<ZByteIoError> for RifDecodeErrors {
    fn from(value: ZByteIoError) -> Self {
        RifDecodeErrors::IoErrors(value)
    }
}

/// Errors encountered during encoding
pub enum RifEncodeErrors {
    /// The input array length doesn't match `width*height*components`
    ///
    /// # Arguments
    /// - expected length
    /// - found length
    WrongInputSize(usize, usize),
    /// The dimension cannot be stored in a 32 bit header field
    TooLargeDimensions(usize),
    /// The pattern size search range is empty or starts at zero
    InvalidPatternRange,
    /// The input colorspace is not one the format can store
    ///
    /// # Arguments
    /// - found colorspace
    /// - supported colorspaces
    UnsupportedColorspace(ColorSpace, &'static [ColorSpace]),
    /// The sink failed
    IoErrors(ZByteIoError),
    /// Generic message
    Static(&'static str)
}

impl Debug for RifEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            RifEncodeErrors::WrongInputSize(expected, found) => {
                writeln!(f, "Input array length {found} doesn't match {expected}")
            }
            RifEncodeErrors::TooLargeDimensions(found) => {
                writeln!(
                    f,
                    "Too large image dimensions {found}, RIF can only encode values less than {}",
                    u32::MAX
                )
            }
            RifEncodeErrors::InvalidPatternRange => {
                writeln!(f, "Pattern size range must be non-empty and start above zero")
            }
            RifEncodeErrors::UnsupportedColorspace(found, supported) => {
                writeln!(f, "Cannot encode image with colorspace {found:?} into RIF, supported ones are {supported:?}")
            }
            RifEncodeErrors::IoErrors(err) => writeln!(f, "I/O error {err:?}"),
            RifEncodeErrors::Static(err) => writeln!(f, "{err}")
        }
    }
}

impl From<&'static str> for RifEncodeErrors {
    fn from(value: &'static str) -> Self {
        RifEncodeErrors::Static(value)
    }
}

impl From<ZByteIoError> for RifEncodeErrors {
    fn from(value: ZByteIoError) -> Self {
        RifEncodeErrors::IoErrors(value)
    }
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl Display for RifDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl Display for RifEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {}

#[cfg(feature = "std")]
impl std::error::Error for RifDecodeErrors {}

#[cfg(feature = "std")]
impl std::error::Error for RifEncodeErrors {}
