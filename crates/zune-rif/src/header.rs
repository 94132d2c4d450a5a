/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Header layouts for the raw and the compressed variant
//!
//! All multi byte fields are unsigned 32 bit big endian integers.
//!
//! Raw
//! ```text
//! | alpha (1) | width (4) | height (4) | pixels ...
//! ```
//! Compressed
//! ```text
//! | alpha (1) | width (4) | height (4) | cell cols (4) | cell rows (4) | pattern size (4) | patterns (4) |
//! | pattern table ... | cell table (4 bytes per cell) ...
//! ```
use zune_core::bytestream::{ZCursor, ZReader};
use zune_core::colorspace::ColorSpace;
use zune_core::log::{error, trace, warn};
use zune_core::options::DecoderOptions;

use crate::constants::{CELL_INDEX_SIZE, CRIF_HEADER_SIZE, RIF_HEADER_SIZE};
use crate::errors::RifDecodeErrors;
use crate::source::{split_read, RifSource};

/// Header of an uncompressed image
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RifHeader {
    pub has_alpha: bool,
    pub width:     usize,
    pub height:    usize
}

impl RifHeader {
    /// 2 with alpha, 1 without
    pub const fn bytes_per_pixel(&self) -> usize {
        bytes_per_pixel(self.has_alpha)
    }

    /// Luma or LumaA
    pub const fn colorspace(&self) -> ColorSpace {
        colorspace(self.has_alpha)
    }

    /// Length of the pixel payload following the header
    ///
    /// `None` if `width*height*bytes_per_pixel` overflows
    pub fn pixel_bytes(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.bytes_per_pixel())
    }

    /// Number of pool bytes a pooled decode of this image reserves
    pub fn pool_size(&self) -> Option<usize> {
        self.pixel_bytes()
    }

    pub(crate) fn read<S: RifSource>(
        source: &mut S, options: &DecoderOptions
    ) -> Result<RifHeader, RifDecodeErrors> {
        let mut bytes = [0_u8; RIF_HEADER_SIZE];
        read_header_bytes(source, &mut bytes)?;

        let mut fields = ZReader::new(ZCursor::new(bytes));
        let [flag] = fields.read_fixed_bytes_or_error::<1>()?;

        let header = RifHeader {
            has_alpha: alpha_flag(flag, options)?,
            width:     fields.get_u32_be_err()? as usize,
            height:    fields.get_u32_be_err()? as usize
        };
        check_dimensions(header.width, header.height, options)?;

        if header.pixel_bytes().is_none() {
            return Err(RifDecodeErrors::Overflow("pixel buffer size"));
        }

        trace!("Image width: {}", header.width);
        trace!("Image height: {}", header.height);
        trace!("Image has alpha: {}", header.has_alpha);

        Ok(header)
    }
}

/// Header of a tile compressed image
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CRifHeader {
    pub has_alpha:          bool,
    /// Nominal width, the addressable width is `cell_cols*pattern_size`
    pub width:              usize,
    /// Nominal height, the addressable height is `cell_rows*pattern_size`
    pub height:             usize,
    pub cell_cols:          usize,
    pub cell_rows:          usize,
    /// Edge length of a square pattern
    pub pattern_size:       usize,
    pub number_of_patterns: usize
}

impl CRifHeader {
    pub const fn bytes_per_pixel(&self) -> usize {
        bytes_per_pixel(self.has_alpha)
    }

    pub const fn colorspace(&self) -> ColorSpace {
        colorspace(self.has_alpha)
    }

    pub fn number_of_cells(&self) -> Option<usize> {
        self.cell_cols.checked_mul(self.cell_rows)
    }

    /// Bytes in a single pattern
    pub fn tile_bytes(&self) -> Option<usize> {
        self.pattern_size
            .checked_mul(self.pattern_size)?
            .checked_mul(self.bytes_per_pixel())
    }

    /// Bytes in the whole pattern table
    pub fn patterns_bytes(&self) -> Option<usize> {
        self.tile_bytes()?.checked_mul(self.number_of_patterns)
    }

    /// Bytes in the cell table, both on the wire and once decoded
    pub fn cells_bytes(&self) -> Option<usize> {
        self.number_of_cells()?.checked_mul(CELL_INDEX_SIZE)
    }

    /// Length of the payload following the header
    pub fn payload_bytes(&self) -> Option<usize> {
        self.patterns_bytes()?.checked_add(self.cells_bytes()?)
    }

    /// Number of pool bytes a pooled decode of this image reserves,
    /// the cell table followed by the pattern table
    pub fn pool_size(&self) -> Option<usize> {
        self.payload_bytes()
    }

    /// Number of pool bytes a pooled decompression of this image reserves
    pub fn decompressed_pool_size(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.bytes_per_pixel())
    }

    pub(crate) fn read<S: RifSource>(
        source: &mut S, options: &DecoderOptions
    ) -> Result<CRifHeader, RifDecodeErrors> {
        let mut bytes = [0_u8; CRIF_HEADER_SIZE];
        read_header_bytes(source, &mut bytes)?;

        let mut fields = ZReader::new(ZCursor::new(bytes));
        let [flag] = fields.read_fixed_bytes_or_error::<1>()?;

        let header = CRifHeader {
            has_alpha:          alpha_flag(flag, options)?,
            width:              fields.get_u32_be_err()? as usize,
            height:             fields.get_u32_be_err()? as usize,
            cell_cols:          fields.get_u32_be_err()? as usize,
            cell_rows:          fields.get_u32_be_err()? as usize,
            pattern_size:       fields.get_u32_be_err()? as usize,
            number_of_patterns: fields.get_u32_be_err()? as usize
        };
        check_dimensions(header.width, header.height, options)?;

        let number_of_cells = header
            .number_of_cells()
            .ok_or(RifDecodeErrors::Overflow("number of cells"))?;

        if header.pattern_size == 0 && number_of_cells != 0 {
            return Err(RifDecodeErrors::ZeroPatternSize);
        }
        check_grid(&header, options)?;

        if header.number_of_patterns > number_of_cells {
            return Err(RifDecodeErrors::TooManyPatterns(
                header.number_of_patterns,
                number_of_cells
            ));
        }
        let patterns_bytes = header
            .patterns_bytes()
            .ok_or(RifDecodeErrors::Overflow("pattern table size"))?;

        // cell slots store byte offsets into the pattern table
        if patterns_bytes > u32::MAX as usize {
            return Err(RifDecodeErrors::Overflow("pattern table size"));
        }
        if header.payload_bytes().is_none() {
            return Err(RifDecodeErrors::Overflow("cell table size"));
        }

        let grid_width = header.cell_cols.saturating_mul(header.pattern_size);
        let grid_height = header.cell_rows.saturating_mul(header.pattern_size);

        if header.width > grid_width || header.height > grid_height {
            warn!(
                "Nominal size {}x{} exceeds the cell grid {}x{}, pixels outside the grid read as black",
                header.width,
                header.height,
                grid_width,
                grid_height
            );
        }

        trace!("Image width: {}", header.width);
        trace!("Image height: {}", header.height);
        trace!("Image has alpha: {}", header.has_alpha);
        trace!("Cell grid: {}x{}", header.cell_cols, header.cell_rows);
        trace!("Pattern size: {}", header.pattern_size);
        trace!("Number of patterns: {}", header.number_of_patterns);

        Ok(header)
    }
}

pub(crate) const fn bytes_per_pixel(has_alpha: bool) -> usize {
    if has_alpha {
        2
    } else {
        1
    }
}

const fn colorspace(has_alpha: bool) -> ColorSpace {
    if has_alpha {
        ColorSpace::LumaA
    } else {
        ColorSpace::Luma
    }
}

fn read_header_bytes<S: RifSource>(
    source: &mut S, bytes: &mut [u8]
) -> Result<(), RifDecodeErrors> {
    let (read, io_error) = split_read(source.read_exact_or_short(bytes));

    if let Some(e) = io_error {
        return Err(RifDecodeErrors::IoErrors(e));
    }
    if read != bytes.len() {
        error!("Stream ended inside the header after {} bytes", read);
        return Err(RifDecodeErrors::InsufficientData(bytes.len(), read));
    }
    Ok(())
}

fn alpha_flag(flag: u8, options: &DecoderOptions) -> Result<bool, RifDecodeErrors> {
    match flag {
        0 => Ok(false),
        1 => Ok(true),
        _ => {
            if options.strict_mode() {
                return Err(RifDecodeErrors::InvalidAlphaFlag(flag));
            }
            error!("Invalid alpha flag {}, treating image as opaque", flag);
            Ok(false)
        }
    }
}

fn check_dimensions(
    width: usize, height: usize, options: &DecoderOptions
) -> Result<(), RifDecodeErrors> {
    if width > options.max_width() {
        return Err(RifDecodeErrors::TooLargeDimensions(
            "width",
            options.max_width(),
            width
        ));
    }
    if height > options.max_height() {
        return Err(RifDecodeErrors::TooLargeDimensions(
            "height",
            options.max_height(),
            height
        ));
    }
    Ok(())
}

/// Bound the cell grid by the decoder limits so a header alone cannot
/// ask for an unbounded allocation
///
/// The grid may overhang a limit by less than one pattern, as padded
/// edge tiles do.
fn check_grid(header: &CRifHeader, options: &DecoderOptions) -> Result<(), RifDecodeErrors> {
    let pattern_size = header.pattern_size;
    let limits = [
        ("cell grid width", header.cell_cols, options.max_width()),
        ("cell grid height", header.cell_rows, options.max_height())
    ];

    for (name, cells, limit) in limits {
        if pattern_size > limit {
            return Err(RifDecodeErrors::TooLargeDimensions(
                "pattern size",
                limit,
                pattern_size
            ));
        }
        let extent = cells
            .checked_mul(pattern_size)
            .ok_or(RifDecodeErrors::Overflow(name))?;

        if extent > limit.saturating_add(pattern_size.saturating_sub(1)) {
            return Err(RifDecodeErrors::TooLargeDimensions(name, limit, extent));
        }
    }
    Ok(())
}
