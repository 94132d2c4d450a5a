/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Incremental decoding of tile compressed images
//!
//! Decoding runs in two phases that never overlap
//! 1. The pattern table is copied verbatim into the image.
//! 2. Cell indices are read, validated against the number of patterns
//!    and turned into byte offsets into the pattern table.
//!
//! A `read_chunk` call with a non zero size works on one phase only,
//! so a cell is never resolved before every pattern is in place.
use zune_core::bytestream::ZByteIoError;
use zune_core::log::{error, trace, warn};
use zune_core::options::DecoderOptions;

use crate::cimage::CRifImage;
use crate::constants::CELL_INDEX_SIZE;
use crate::decoder::ReadStatus;
use crate::errors::RifDecodeErrors;
use crate::header::CRifHeader;
use crate::pool::ArenaPool;
use crate::source::{split_read, RifSource, RifStorage};

/// An incremental decoder for compressed RIF images
///
/// # Example
/// ```
/// use zune_rif::{CRifDecoder, RifReader};
///
/// let mut data = vec![0];
/// // 2x2 image made of a single 2x2 pattern
/// for field in [2_u32, 2, 1, 1, 2, 1] {
///     data.extend_from_slice(&field.to_be_bytes());
/// }
/// data.extend_from_slice(&[10, 20, 30, 40]);
/// data.extend_from_slice(&0_u32.to_be_bytes());
///
/// let mut decoder = CRifDecoder::new(RifReader::from_bytes(data), None).unwrap();
///
/// // patterns first
/// decoder.read_chunk(64).unwrap();
/// assert_eq!(decoder.cells_read(), 0);
/// // then cells
/// assert!(decoder.read_chunk(4).unwrap().is_closed());
/// assert_eq!(decoder.get_pixel(1, 1), (40, 255));
/// ```
pub struct CRifDecoder<S: RifSource> {
    header:         CRifHeader,
    image:          CRifImage,
    source:         Option<S>,
    patterns_read:  usize,
    patterns_total: usize,
    cells_read:     usize,
    cells_total:    usize,
    // bytes of the next cell index read so far
    pending:        [u8; CELL_INDEX_SIZE],
    pending_len:    usize,
    poisoned:       bool,
    options:        DecoderOptions
}

impl<S: RifSource> CRifDecoder<S> {
    /// Open `name` from `storage` and decode its header
    ///
    /// # Returns
    /// - `Err(RifDecodeErrors::NotFound)` if the storage doesn't know `name`
    pub fn open<T>(
        storage: &T, name: &str, pool: Option<&ArenaPool>
    ) -> Result<CRifDecoder<S>, RifDecodeErrors>
    where
        T: RifStorage<Source = S>
    {
        let source = storage.open(name)?;
        CRifDecoder::new(source, pool)
    }

    /// Create a decoder over `source` with the default options
    pub fn new(source: S, pool: Option<&ArenaPool>) -> Result<CRifDecoder<S>, RifDecodeErrors> {
        CRifDecoder::new_with_options(source, pool, DecoderOptions::default())
    }

    /// Create a decoder that obeys the given options
    ///
    /// The header is read and the tables allocated immediately, on
    /// error the source is closed and nothing is reserved from `pool`.
    pub fn new_with_options(
        mut source: S, pool: Option<&ArenaPool>, options: DecoderOptions
    ) -> Result<CRifDecoder<S>, RifDecodeErrors> {
        let result = CRifHeader::read(&mut source, &options)
            .and_then(|header| Ok((header, CRifImage::allocate(&header, pool)?)));

        let (header, image) = match result {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(close_err) = source.close() {
                    warn!("Could not close source after failed open: {:?}", close_err);
                }
                return Err(e);
            }
        };

        Ok(CRifDecoder {
            patterns_total: image.number_of_patterns() * image.tile_bytes(),
            cells_total: image.number_of_cells(),
            header,
            image,
            source: Some(source),
            patterns_read: 0,
            cells_read: 0,
            pending: [0; CELL_INDEX_SIZE],
            pending_len: 0,
            poisoned: false,
            options
        })
    }

    /// Read the next chunk
    ///
    /// While patterns remain, up to `size` pattern bytes are read.
    /// Once every pattern is in, `max(1, size / 4)` cells are read per call.
    /// A `size` of `0` reads all remaining patterns followed by all remaining
    /// cells.
    ///
    /// # Returns
    /// - `Ok(ReadStatus::Closed)` once the last cell is resolved, the source is
    ///   closed at that point and later calls do no I/O
    /// - `Ok(ReadStatus::Pending)` if more remains
    /// - `Err(RifDecodeErrors::InsufficientData)` or `Err(RifDecodeErrors::IoErrors)`
    ///   if the stream ended early or the source failed, whatever arrived is kept
    ///   so the call may be retried
    /// - `Err(RifDecodeErrors::InvalidPatternIndex)` if a cell refers to a pattern
    ///   that doesn't exist. The image is corrupt, the source is closed and every
    ///   later call fails
    pub fn read_chunk(&mut self, size: usize) -> Result<ReadStatus, RifDecodeErrors> {
        if self.poisoned {
            return Err(RifDecodeErrors::Generic(
                "Decoding was aborted after a corrupt pattern index"
            ));
        }
        if self.source.is_none() {
            return Ok(ReadStatus::Closed);
        }

        if size == 0 {
            self.read_patterns(self.patterns_total - self.patterns_read)?;
            self.read_cells(self.cells_total - self.cells_read)?;
        } else if self.patterns_read < self.patterns_total {
            self.read_patterns(size.min(self.patterns_total - self.patterns_read))?;
        } else {
            let cells = (size / CELL_INDEX_SIZE).max(1);
            self.read_cells(cells.min(self.cells_total - self.cells_read))?;
        }

        if self.patterns_read == self.patterns_total && self.cells_read == self.cells_total {
            self.close_source()?;
            return Ok(ReadStatus::Closed);
        }
        Ok(ReadStatus::Pending)
    }

    /// Read all that remains and return the image
    pub fn decode(mut self) -> Result<CRifImage, RifDecodeErrors> {
        self.read_chunk(0)?;
        Ok(self.into_image())
    }

    fn read_patterns(&mut self, count: usize) -> Result<(), RifDecodeErrors> {
        if count == 0 {
            return Ok(());
        }
        let source = self
            .source
            .as_mut()
            .ok_or(RifDecodeErrors::Generic("Source is closed"))?;
        let start = self.patterns_read;

        let (stored, io_error) = self
            .image
            .patterns_mut()
            .with_slice_mut(|patterns| {
                split_read(source.read_exact_or_short(&mut patterns[start..start + count]))
            })
            .ok_or(RifDecodeErrors::Generic("Pattern table is no longer in its pool"))?;

        self.patterns_read += stored;

        trace!(
            "Pattern phase: read {} bytes ({}/{})",
            stored,
            self.patterns_read,
            self.patterns_total
        );

        if let Some(e) = io_error {
            error!(
                "Source failed after {} of {} pattern bytes",
                self.patterns_read, self.patterns_total
            );
            return Err(RifDecodeErrors::IoErrors(e));
        }

        if stored < count {
            error!(
                "Stream ended after {} of {} pattern bytes",
                self.patterns_read, self.patterns_total
            );
            return Err(RifDecodeErrors::InsufficientData(count, stored));
        }
        Ok(())
    }

    /// Read `count` cell indices in place and resolve them to
    /// pattern offsets
    ///
    /// Bytes of an index cut short by the stream are staged in
    /// `pending` rather than left in the table, so a stalled cell keeps
    /// showing pattern `0`.
    fn read_cells(&mut self, count: usize) -> Result<(), RifDecodeErrors> {
        if count == 0 {
            return Ok(());
        }
        let source = self
            .source
            .as_mut()
            .ok_or(RifDecodeErrors::Generic("Source is closed"))?;

        let first_cell = self.cells_read;
        let first = first_cell * CELL_INDEX_SIZE;
        let start = first + self.pending_len;
        let end = (first_cell + count) * CELL_INDEX_SIZE;
        let patterns = self.header.number_of_patterns;
        let tile_bytes = self.image.tile_bytes();
        let pending = self.pending;

        let outcome = self
            .image
            .cells_mut()
            .with_slice_mut(|cells| {
                cells[first..start].copy_from_slice(&pending[..start - first]);

                let (stored, io_error) =
                    split_read(source.read_exact_or_short(&mut cells[start..end]));
                let filled = start + stored;
                let complete = filled / CELL_INDEX_SIZE;
                let resolved = resolve_cells(
                    &mut cells[first..complete * CELL_INDEX_SIZE],
                    first_cell,
                    patterns,
                    tile_bytes
                );

                let mut staged = [0; CELL_INDEX_SIZE];
                let tail = &mut cells[complete * CELL_INDEX_SIZE..filled];

                staged[..tail.len()].copy_from_slice(tail);
                tail.fill(0);

                CellRead {
                    stored,
                    complete,
                    staged,
                    io_error,
                    resolved
                }
            })
            .ok_or(RifDecodeErrors::Generic("Cell table is no longer in its pool"))?;

        if let Err(e) = outcome.resolved {
            return Err(self.poison(e));
        }
        self.cells_read = outcome.complete;
        self.pending_len = (start + outcome.stored) % CELL_INDEX_SIZE;
        self.pending = outcome.staged;

        trace!(
            "Cell phase: resolved {} cells ({}/{})",
            outcome.complete - first_cell,
            self.cells_read,
            self.cells_total
        );

        if let Some(e) = outcome.io_error {
            error!(
                "Source failed after {} of {} cells",
                self.cells_read, self.cells_total
            );
            return Err(RifDecodeErrors::IoErrors(e));
        }
        if outcome.stored < end - start {
            error!(
                "Stream ended after {} of {} cells",
                self.cells_read, self.cells_total
            );
            return Err(RifDecodeErrors::InsufficientData(end - start, outcome.stored));
        }
        Ok(())
    }

    /// Abort decoding for good, corrupt indices are not retried
    fn poison(&mut self, err: RifDecodeErrors) -> RifDecodeErrors {
        if let RifDecodeErrors::InvalidPatternIndex { .. } = err {
            error!("{:?}", err);
            self.poisoned = true;

            if let Err(close_err) = self.close_source() {
                warn!("Could not close source: {:?}", close_err);
            }
        }
        err
    }

    fn close_source(&mut self) -> Result<(), RifDecodeErrors> {
        if let Some(mut source) = self.source.take() {
            source.close()?;
        }
        Ok(())
    }

    /// The image being decoded
    ///
    /// Cells not yet read show pattern `0`.
    pub const fn image(&self) -> &CRifImage {
        &self.image
    }

    /// Stop decoding and return the image, closing the source if it
    /// is still open
    pub fn into_image(mut self) -> CRifImage {
        if let Err(e) = self.close_source() {
            warn!("Could not close source: {:?}", e);
        }
        core::mem::replace(&mut self.image, CRifImage::empty())
    }

    /// Release the decoder and its image, closing the source if it
    /// is still open
    pub fn release(mut self) -> Result<(), RifDecodeErrors> {
        self.close_source()
    }

    /// Shorthand for `self.image().get_pixel(x, y)`
    pub fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        self.image.get_pixel(x, y)
    }

    pub const fn header(&self) -> &CRifHeader {
        &self.header
    }

    pub const fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Nominal width and height
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.header.width, self.header.height)
    }

    pub const fn has_alpha(&self) -> bool {
        self.header.has_alpha
    }

    pub const fn pattern_size(&self) -> usize {
        self.header.pattern_size
    }

    pub const fn number_of_patterns(&self) -> usize {
        self.header.number_of_patterns
    }

    pub const fn cell_dimensions(&self) -> (usize, usize) {
        (self.header.cell_cols, self.header.cell_rows)
    }

    pub const fn number_of_cells(&self) -> usize {
        self.cells_total
    }

    /// Pattern bytes stored so far
    pub const fn patterns_read_bytes(&self) -> usize {
        self.patterns_read
    }

    /// Length of the pattern table
    pub const fn patterns_total_bytes(&self) -> usize {
        self.patterns_total
    }

    /// Cells resolved so far
    pub const fn cells_read(&self) -> usize {
        self.cells_read
    }

    /// Payload bytes consumed so far, patterns plus 4 bytes per cell
    pub const fn bytes_read(&self) -> usize {
        self.patterns_read + self.cells_read * CELL_INDEX_SIZE + self.pending_len
    }

    /// Length of the payload following the header
    pub const fn total_bytes(&self) -> usize {
        self.patterns_total + self.cells_total * CELL_INDEX_SIZE
    }

    /// Whether the pattern phase is over
    pub const fn patterns_complete(&self) -> bool {
        self.patterns_read == self.patterns_total
    }

    /// Whether every byte was read and the source closed
    pub const fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}

/// Result of one pass over the cell table
struct CellRead {
    stored:   usize,
    complete: usize,
    staged:   [u8; CELL_INDEX_SIZE],
    io_error: Option<ZByteIoError>,
    resolved: Result<(), RifDecodeErrors>
}

/// Turn big endian pattern indices into native endian byte offsets
fn resolve_cells(
    slots: &mut [u8], first_cell: usize, patterns: usize, tile_bytes: usize
) -> Result<(), RifDecodeErrors> {
    for (cell, slot) in slots.chunks_exact_mut(CELL_INDEX_SIZE).enumerate() {
        let index = u32::from_be_bytes([slot[0], slot[1], slot[2], slot[3]]);

        if index as usize >= patterns {
            return Err(RifDecodeErrors::InvalidPatternIndex {
                cell: first_cell + cell,
                index,
                patterns
            });
        }
        // the header guarantees the pattern table fits in 32 bits
        let offset = u32::try_from(index as usize * tile_bytes)
            .map_err(|_| RifDecodeErrors::Overflow("pattern offset"))?;

        slot.copy_from_slice(&offset.to_ne_bytes());
    }
    Ok(())
}

impl<S: RifSource> Drop for CRifDecoder<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close_source() {
            warn!("Could not close source: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use zune_core::bytestream::ZByteIoError;

    use crate::cdecoder::CRifDecoder;
    use crate::decoder::ReadStatus;
    use crate::errors::RifDecodeErrors;
    use crate::pool::ArenaPool;
    use crate::source::{RifReader, RifSource};

    fn file(header: [u32; 6], patterns: &[u8], cells: &[u32]) -> Vec<u8> {
        let mut data = vec![0];
        for field in header {
            data.extend_from_slice(&field.to_be_bytes());
        }
        data.extend_from_slice(patterns);
        for cell in cells {
            data.extend_from_slice(&cell.to_be_bytes());
        }
        data
    }

    /// 4x2 image, two 2x2 patterns, cells [1, 0]
    fn small() -> Vec<u8> {
        file([4, 2, 2, 1, 2, 2], &[1, 2, 3, 4, 5, 6, 7, 8], &[1, 0])
    }

    #[test]
    fn one_phase_per_call() {
        let mut decoder = CRifDecoder::new(RifReader::from_bytes(small()), None).unwrap();

        assert_eq!(decoder.total_bytes(), 16);
        assert_eq!(decoder.read_chunk(5).unwrap(), ReadStatus::Pending);
        assert_eq!(decoder.patterns_read_bytes(), 5);
        // clamped to what is left of the pattern table, no cell is touched
        assert_eq!(decoder.read_chunk(100).unwrap(), ReadStatus::Pending);
        assert!(decoder.patterns_complete());
        assert_eq!(decoder.cells_read(), 0);
        // size 4 resolves exactly one cell
        assert_eq!(decoder.read_chunk(4).unwrap(), ReadStatus::Pending);
        assert_eq!(decoder.cells_read(), 1);
        // sizes below 4 still make progress
        assert_eq!(decoder.read_chunk(1).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.cells_read(), 2);
        assert_eq!(decoder.bytes_read(), 16);

        assert_eq!(decoder.get_pixel(0, 0), (5, 255));
        assert_eq!(decoder.get_pixel(3, 1), (4, 255));
    }

    #[test]
    fn zero_size_drains_both_phases() {
        let mut decoder = CRifDecoder::new(RifReader::from_bytes(small()), None).unwrap();

        assert_eq!(decoder.read_chunk(0).unwrap(), ReadStatus::Closed);
        assert!(decoder.is_closed());
        assert_eq!(decoder.read_chunk(0).unwrap(), ReadStatus::Closed);
    }

    #[test]
    fn corrupt_index_poisons_the_decoder() {
        let data = file([4, 2, 2, 1, 2, 2], &[0; 8], &[0, 2]);
        let mut cursor = RifReader::from_bytes(data);
        let mut decoder = CRifDecoder::new(&mut cursor, None).unwrap();

        decoder.read_chunk(8).unwrap();
        let err = decoder.read_chunk(0).err();
        assert!(matches!(
            err,
            Some(RifDecodeErrors::InvalidPatternIndex {
                cell:     1,
                index:    2,
                patterns: 2
            })
        ));
        assert!(decoder.is_closed());
        assert!(decoder.read_chunk(4).is_err());
        drop(decoder);
        assert!(cursor.is_closed());
    }

    /// Interrupts the stream once at `stall_at`, either with an early end
    /// of stream or with an error, then carries on
    struct Stalling {
        data:     Vec<u8>,
        position: usize,
        stall_at: Option<usize>,
        fail:     bool
    }

    impl Stalling {
        fn new(data: Vec<u8>, stall_at: usize, fail: bool) -> Stalling {
            Stalling {
                data,
                position: 0,
                stall_at: Some(stall_at),
                fail
            }
        }
    }

    impl RifSource for Stalling {
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
            if self.stall_at == Some(self.position) {
                self.stall_at = None;

                if self.fail {
                    return Err(ZByteIoError::Generic("read interrupted"));
                }
                return Ok(0);
            }
            let limit = self.stall_at.unwrap_or(self.data.len());
            let count = buf.len().min(limit - self.position);

            buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
            self.position += count;
            Ok(count)
        }

        fn close(&mut self) -> Result<(), ZByteIoError> {
            Ok(())
        }
    }

    #[test]
    fn partial_cell_index_is_completed_on_retry() {
        let data = small();
        let stall_at = data.len() - 2;
        let mut decoder = CRifDecoder::new(Stalling::new(data, stall_at, false), None).unwrap();

        assert!(matches!(
            decoder.read_chunk(0),
            Err(RifDecodeErrors::InsufficientData(8, 6))
        ));
        assert_eq!(decoder.cells_read(), 1);
        assert_eq!(decoder.bytes_read(), 14);
        assert!(!decoder.is_closed());

        assert!(decoder.read_chunk(4).unwrap().is_closed());
        assert_eq!(decoder.get_pixel(0, 0), (5, 255));
        assert_eq!(decoder.get_pixel(2, 0), (1, 255));
    }

    #[test]
    fn source_failure_inside_patterns_is_retried_in_place() {
        let data = small();
        let mut decoder = CRifDecoder::new(Stalling::new(data, 25 + 3, true), None).unwrap();

        assert!(matches!(
            decoder.read_chunk(0),
            Err(RifDecodeErrors::IoErrors(_))
        ));
        assert_eq!(decoder.patterns_read_bytes(), 3);

        assert_eq!(decoder.read_chunk(0).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.get_pixel(0, 0), (5, 255));
        assert_eq!(decoder.get_pixel(1, 1), (8, 255));
        assert_eq!(decoder.get_pixel(3, 1), (4, 255));
    }

    #[test]
    fn stalled_cell_reads_as_pattern_zero() {
        // 257 single pixel patterns, so the index of the last one has a
        // non zero third byte
        let patterns: Vec<u8> = (0..257).map(|i| (i % 251) as u8 + 1).collect();
        let cells: Vec<u32> = (0..257).rev().collect();
        let data = file([257, 1, 257, 1, 1, 257], &patterns, &cells);

        let stall_at = 25 + 257 + 3;
        let mut decoder = CRifDecoder::new(Stalling::new(data, stall_at, true), None).unwrap();

        assert!(matches!(
            decoder.read_chunk(0),
            Err(RifDecodeErrors::IoErrors(_))
        ));
        assert_eq!(decoder.cells_read(), 0);
        assert_eq!(decoder.bytes_read(), 257 + 3);
        assert_eq!(decoder.image().pattern_index(0), Some(0));
        assert_eq!(decoder.get_pixel(0, 0), (1, 255));

        assert_eq!(decoder.read_chunk(0).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.image().pattern_index(0), Some(256));
        assert_eq!(decoder.get_pixel(0, 0), (6, 255));
        assert_eq!(decoder.get_pixel(256, 0), (1, 255));
    }

    #[test]
    fn zero_cell_image_closes_on_first_read() {
        let data = file([0, 0, 0, 0, 4, 0], &[], &[]);
        let mut decoder = CRifDecoder::new(RifReader::from_bytes(data), None).unwrap();

        assert!(!decoder.is_closed());
        assert_eq!(decoder.read_chunk(16).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.get_pixel(0, 0), (0, 255));
    }

    #[test]
    fn pool_failure_reserves_nothing() {
        let pool = ArenaPool::new(15);
        let err = CRifDecoder::new(RifReader::from_bytes(small()), Some(&pool)).err();

        assert!(matches!(err, Some(RifDecodeErrors::PoolErrors(_))));
        assert_eq!(pool.cursor(), 0);
    }
}
