/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use zune_core::colorspace::ColorSpace;

use crate::constants::CELL_INDEX_SIZE;
use crate::decompress::decompress;
use crate::errors::RifDecodeErrors;
use crate::header::CRifHeader;
use crate::image::RifImage;
use crate::pixel::{in_bounds, pixel_or_default};
use crate::pool::{ArenaPool, PoolRegion};
use crate::storage::Storage;

/// A tile compressed luminance image
///
/// The image is a grid of `cell_cols x cell_rows` cells, each cell
/// refers to one square pattern in the pattern table, so identical tiles
/// are stored once no matter how many cells show them.
///
/// Cells hold the byte offset of their pattern inside the pattern table
/// rather than a pointer, the table and the cells may live in an
/// [`ArenaPool`] and be moved around freely.
pub struct CRifImage {
    header:     CRifHeader,
    tile_bytes: usize,
    patterns:   Storage,
    cells:      Storage
}

impl CRifImage {
    /// Allocate zeroed pattern and cell tables for `header`
    ///
    /// A pooled image makes a single reservation, cell table first
    /// then the pattern table, so a failure leaves the pool cursor
    /// untouched.
    pub(crate) fn allocate(
        header: &CRifHeader, pool: Option<&ArenaPool>
    ) -> Result<CRifImage, RifDecodeErrors> {
        let tile_bytes = header
            .tile_bytes()
            .ok_or(RifDecodeErrors::Overflow("pattern size"))?;
        let patterns_bytes = header
            .patterns_bytes()
            .ok_or(RifDecodeErrors::Overflow("pattern table size"))?;
        let cells_bytes = header
            .cells_bytes()
            .ok_or(RifDecodeErrors::Overflow("cell table size"))?;

        let (cells, patterns) = match pool {
            Some(pool) => {
                let total = cells_bytes
                    .checked_add(patterns_bytes)
                    .ok_or(RifDecodeErrors::Overflow("compressed image size"))?;
                let (cells, patterns) = pool.reserve(total)?.split_at(cells_bytes);

                (Storage::Pooled(cells), Storage::Pooled(patterns))
            }
            None => (
                Storage::Owned(vec![0; cells_bytes]),
                Storage::Owned(vec![0; patterns_bytes])
            )
        };

        Ok(CRifImage {
            header: *header,
            tile_bytes,
            patterns,
            cells
        })
    }

    pub(crate) fn empty() -> CRifImage {
        CRifImage {
            header:     CRifHeader {
                has_alpha:          false,
                width:              0,
                height:             0,
                cell_cols:          0,
                cell_rows:          0,
                pattern_size:       0,
                number_of_patterns: 0
            },
            tile_bytes: 0,
            patterns:   Storage::Owned(Vec::new()),
            cells:      Storage::Owned(Vec::new())
        }
    }

    /// Return the `(color, alpha)` pair at `(x, y)`
    ///
    /// Coordinates outside the nominal size, outside the cell grid,
    /// or any pixel of an image with a zero pattern size read as `(0, 255)`.
    pub fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        let pattern_size = self.header.pattern_size;

        if pattern_size == 0 {
            return pixel_or_default(None);
        }
        let Some((x, y)) = in_bounds(x, y, self.header.width, self.header.height) else {
            return pixel_or_default(None);
        };
        let (cell_col, cell_row) = (x / pattern_size, y / pattern_size);

        if cell_col >= self.header.cell_cols || cell_row >= self.header.cell_rows {
            return pixel_or_default(None);
        }
        let local_x = x - cell_col * pattern_size;
        let local_y = y - cell_row * pattern_size;
        let cell = cell_row * self.header.cell_cols + cell_col;

        let Some(tile) = self.cells.slot(cell * CELL_INDEX_SIZE) else {
            return pixel_or_default(None);
        };
        let pixel_index = local_y * pattern_size + local_x;
        let position = tile as usize + pixel_index * self.header.bytes_per_pixel();

        if self.header.has_alpha {
            pixel_or_default(self.patterns.pair(position))
        } else {
            pixel_or_default(self.patterns.byte(position).map(|color| (color, 255)))
        }
    }

    /// Index of the pattern shown by `cell`, in row major cell order
    ///
    /// Cells the decoder has not read yet show pattern `0`.
    pub fn pattern_index(&self, cell: usize) -> Option<usize> {
        if self.tile_bytes == 0 {
            return None;
        }
        let offset = self.cells.slot(cell.checked_mul(CELL_INDEX_SIZE)?)?;
        Some(offset as usize / self.tile_bytes)
    }

    /// Decompress into a raw image, see [`decompress`]
    pub fn decompress(&self, pool: Option<&ArenaPool>) -> Result<RifImage, RifDecodeErrors> {
        decompress(self, pool)
    }

    /// Release the image
    ///
    /// Owned tables are freed, pooled tables stay in the pool.
    pub fn release(self) {}

    pub const fn header(&self) -> &CRifHeader {
        &self.header
    }

    pub const fn width(&self) -> usize {
        self.header.width
    }

    pub const fn height(&self) -> usize {
        self.header.height
    }

    /// Nominal width and height
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.header.width, self.header.height)
    }

    pub const fn has_alpha(&self) -> bool {
        self.header.has_alpha
    }

    pub const fn colorspace(&self) -> ColorSpace {
        self.header.colorspace()
    }

    pub const fn pattern_size(&self) -> usize {
        self.header.pattern_size
    }

    /// Number of cell columns and rows
    pub const fn cell_dimensions(&self) -> (usize, usize) {
        (self.header.cell_cols, self.header.cell_rows)
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells.len() / CELL_INDEX_SIZE
    }

    pub const fn number_of_patterns(&self) -> usize {
        self.header.number_of_patterns
    }

    /// Bytes in one pattern
    pub const fn tile_bytes(&self) -> usize {
        self.tile_bytes
    }

    pub fn is_pooled(&self) -> bool {
        self.cells.region().is_some()
    }

    /// Pool region backing the pattern table, if any
    pub fn patterns_region(&self) -> Option<&PoolRegion> {
        self.patterns.region()
    }

    /// Pool region backing the cell table, if any
    pub fn cells_region(&self) -> Option<&PoolRegion> {
        self.cells.region()
    }

    pub(crate) fn patterns_mut(&mut self) -> &mut Storage {
        &mut self.patterns
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Storage {
        &mut self.cells
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::cdecoder::CRifDecoder;
    use crate::pool::ArenaPool;
    use crate::source::RifReader;

    /// 3x3 nominal image over a 2x2 grid of 2x2 patterns without alpha,
    /// pattern 0 is a ramp, pattern 1 is solid 200
    fn two_pattern_file() -> Vec<u8> {
        let mut data = vec![0];
        for field in [3_u32, 3, 2, 2, 2, 2] {
            data.extend_from_slice(&field.to_be_bytes());
        }
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend_from_slice(&[200; 4]);
        for index in [0_u32, 1, 1, 0] {
            data.extend_from_slice(&index.to_be_bytes());
        }
        data
    }

    #[test]
    fn lookup_through_cells() {
        let image = CRifDecoder::new(RifReader::from_bytes(two_pattern_file()), None)
            .unwrap()
            .decode()
            .unwrap();

        assert_eq!(image.get_pixel(0, 0), (1, 255));
        assert_eq!(image.get_pixel(1, 1), (4, 255));
        assert_eq!(image.get_pixel(2, 0), (200, 255));
        assert_eq!(image.get_pixel(0, 2), (200, 255));
        assert_eq!(image.get_pixel(2, 2), (1, 255));
        // nominal size clips the grid
        assert_eq!(image.get_pixel(3, 3), (0, 255));
        assert_eq!(image.get_pixel(-1, 0), (0, 255));

        let indices: Vec<_> = (0..4).filter_map(|cell| image.pattern_index(cell)).collect();
        assert_eq!(indices, [0, 1, 1, 0]);
    }

    #[test]
    fn pooled_tables_are_contiguous() {
        let pool = ArenaPool::new(64);
        pool.reserve(5).unwrap();

        let image = CRifDecoder::new(RifReader::from_bytes(two_pattern_file()), Some(&pool))
            .unwrap()
            .decode()
            .unwrap();

        let cells = image.cells_region().unwrap();
        let patterns = image.patterns_region().unwrap();

        assert_eq!((cells.offset(), cells.len()), (5, 16));
        assert_eq!((patterns.offset(), patterns.len()), (21, 8));
        assert_eq!(pool.cursor(), 29);
        assert_eq!(image.get_pixel(1, 0), (2, 255));
    }
}
