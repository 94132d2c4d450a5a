/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use zune_core::log::{error, trace, warn};
use zune_core::options::DecoderOptions;

use crate::errors::RifDecodeErrors;
use crate::header::RifHeader;
use crate::image::RifImage;
use crate::pool::ArenaPool;
use crate::source::{split_read, RifSource, RifStorage};

/// Outcome of a successful incremental read
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadStatus {
    /// More data remains, call `read_chunk` again
    Pending,
    /// Every byte was read and the source is closed
    Closed
}

impl ReadStatus {
    pub const fn is_closed(self) -> bool {
        matches!(self, ReadStatus::Closed)
    }
}

/// An incremental decoder for uncompressed RIF images
///
/// The header is parsed and the pixel buffer allocated when the
/// decoder is created, pixels are then filled by repeated calls to
/// [`read_chunk`](RifDecoder::read_chunk), each doing a bounded amount of I/O
/// so the caller can interleave other work, e.g. keep a game loop running
/// while an image streams in from slow storage.
///
/// # Example
/// ```
/// use zune_rif::{RifDecoder, RifReader};
///
/// let data = [1, 0, 0, 0, 2, 0, 0, 0, 1, 10, 255, 20, 128];
/// let mut decoder = RifDecoder::new(RifReader::from_bytes(data), None).unwrap();
///
/// while !decoder.read_chunk(1).unwrap().is_closed() {
///     // do other work
/// }
/// assert_eq!(decoder.image().get_pixel(1, 0), (20, 128));
/// ```
pub struct RifDecoder<S: RifSource> {
    header:      RifHeader,
    image:       RifImage,
    source:      Option<S>,
    total_bytes: usize,
    read_bytes:  usize,
    options:     DecoderOptions
}

impl<S: RifSource> RifDecoder<S> {
    /// Open `name` from `storage` and decode its header
    ///
    /// # Arguments
    /// - `storage`: Where to look `name` up
    /// - `name`: Name of the image
    /// - `pool`: Pool to carve the pixel buffer from, or `None` to allocate it
    ///
    /// # Returns
    /// - `Err(RifDecodeErrors::NotFound)` if the storage doesn't know `name`
    pub fn open<T>(
        storage: &T, name: &str, pool: Option<&ArenaPool>
    ) -> Result<RifDecoder<S>, RifDecodeErrors>
    where
        T: RifStorage<Source = S>
    {
        let source = storage.open(name)?;
        RifDecoder::new(source, pool)
    }

    /// Create a decoder over `source` with the default options
    ///
    /// The header is read immediately, on error the source is closed
    /// and no image is constructed.
    pub fn new(source: S, pool: Option<&ArenaPool>) -> Result<RifDecoder<S>, RifDecodeErrors> {
        RifDecoder::new_with_options(source, pool, DecoderOptions::default())
    }

    /// Create a decoder that obeys the given options
    ///
    /// # Example
    /// ```
    /// use zune_core::options::DecoderOptions;
    /// use zune_rif::{RifDecoder, RifReader};
    ///
    /// // only decode images less than 10 in width
    /// let options = DecoderOptions::default().set_max_width(10);
    /// let data = [0, 0, 0, 0, 11, 0, 0, 0, 1];
    ///
    /// assert!(RifDecoder::new_with_options(RifReader::from_bytes(data), None, options).is_err());
    /// ```
    pub fn new_with_options(
        mut source: S, pool: Option<&ArenaPool>, options: DecoderOptions
    ) -> Result<RifDecoder<S>, RifDecodeErrors> {
        let result = RifHeader::read(&mut source, &options)
            .and_then(|header| Ok((header, RifImage::allocate(&header, pool)?)));

        let (header, mut image) = match result {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(close_err) = source.close() {
                    warn!("Could not close source after failed open: {:?}", close_err);
                }
                return Err(e);
            }
        };
        let total_bytes = image.storage_mut().len();

        Ok(RifDecoder {
            header,
            image,
            source: Some(source),
            total_bytes,
            read_bytes: 0,
            options
        })
    }

    /// Read the next chunk of pixels
    ///
    /// # Arguments
    /// - `size`: Maximum number of bytes to read, clamped to what remains.
    ///   `0` reads everything that remains in one call
    ///
    /// # Returns
    /// - `Ok(ReadStatus::Closed)` once the last pixel byte is stored, the source is
    ///   closed at that point. Later calls return `Closed` without doing any I/O
    /// - `Ok(ReadStatus::Pending)` if bytes remain
    /// - `Err(RifDecodeErrors::InsufficientData)` if the stream ended early, bytes
    ///   that did arrive are kept and counted so the call can be retried
    /// - `Err(RifDecodeErrors::IoErrors)` if the source failed, again with the bytes
    ///   read before the failure kept and counted
    pub fn read_chunk(&mut self, size: usize) -> Result<ReadStatus, RifDecodeErrors> {
        let Some(source) = self.source.as_mut() else {
            return Ok(ReadStatus::Closed);
        };
        let remaining = self.total_bytes - self.read_bytes;
        let chunk = if size == 0 { remaining } else { size.min(remaining) };

        let start = self.read_bytes;
        let (stored, io_error) = self
            .image
            .storage_mut()
            .with_slice_mut(|pixels| {
                split_read(source.read_exact_or_short(&mut pixels[start..start + chunk]))
            })
            .ok_or(RifDecodeErrors::Generic("Pixel storage is no longer in its pool"))?;

        // the source has moved past whatever was stored, even on failure
        self.read_bytes += stored;

        trace!(
            "Read {} of {} pixel bytes ({}/{})",
            stored,
            chunk,
            self.read_bytes,
            self.total_bytes
        );

        if let Some(e) = io_error {
            error!("Source failed after {} of {} pixel bytes", self.read_bytes, self.total_bytes);
            return Err(RifDecodeErrors::IoErrors(e));
        }
        if stored < chunk {
            error!("Stream ended after {} of {} pixel bytes", self.read_bytes, self.total_bytes);
            return Err(RifDecodeErrors::InsufficientData(chunk, stored));
        }
        if self.read_bytes == self.total_bytes {
            self.close_source()?;
            return Ok(ReadStatus::Closed);
        }
        Ok(ReadStatus::Pending)
    }

    /// Read all remaining pixels and return the image
    pub fn decode(mut self) -> Result<RifImage, RifDecodeErrors> {
        self.read_chunk(0)?;
        Ok(self.into_image())
    }

    fn close_source(&mut self) -> Result<(), RifDecodeErrors> {
        if let Some(mut source) = self.source.take() {
            source.close()?;
        }
        Ok(())
    }

    /// The image being decoded
    ///
    /// Pixels not yet read are zero.
    pub const fn image(&self) -> &RifImage {
        &self.image
    }

    /// Stop decoding and return the image, closing the source if
    /// it is still open
    pub fn into_image(mut self) -> RifImage {
        if let Err(e) = self.close_source() {
            warn!("Could not close source: {:?}", e);
        }
        core::mem::replace(&mut self.image, RifImage::empty())
    }

    /// Release the decoder and its image, closing the source if
    /// it is still open
    ///
    /// Owned pixels are freed, pooled pixels stay in the pool
    pub fn release(mut self) -> Result<(), RifDecodeErrors> {
        self.close_source()
    }

    /// Shorthand for `self.image().get_pixel(x, y)`
    pub fn get_pixel(&self, x: isize, y: isize) -> (u8, u8) {
        self.image.get_pixel(x, y)
    }

    pub const fn header(&self) -> &RifHeader {
        &self.header
    }

    pub const fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Return the width and height of the image
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.header.width, self.header.height)
    }

    pub const fn has_alpha(&self) -> bool {
        self.header.has_alpha
    }

    /// Pixel bytes stored so far
    pub const fn bytes_read(&self) -> usize {
        self.read_bytes
    }

    /// Length of the pixel payload
    pub const fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Whether every byte was read and the source closed
    pub const fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}

impl<S: RifSource> Drop for RifDecoder<S> {
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

    use crate::decoder::{ReadStatus, RifDecoder};
    use crate::errors::RifDecodeErrors;
    use crate::pool::ArenaPool;
    use crate::source::{MemoryStorage, RifReader, RifSource};

    fn gray_ramp(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0];
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend((0..width * height).map(|i| (i % 256) as u8));
        data
    }

    #[test]
    fn decode_with_alpha() {
        let data = [1, 0, 0, 0, 2, 0, 0, 0, 1, 10, 255, 20, 128];
        let image = RifDecoder::new(RifReader::from_bytes(data), None)
            .unwrap()
            .decode()
            .unwrap();

        assert_eq!(image.get_pixel(0, 0), (10, 255));
        assert_eq!(image.get_pixel(1, 0), (20, 128));
        assert_eq!(image.get_pixel(2, 0), (0, 255));
        assert_eq!(image.get_pixel(0, -1), (0, 255));
    }

    #[test]
    fn chunks_are_clamped_to_remaining() {
        let mut decoder = RifDecoder::new(RifReader::from_bytes(gray_ramp(5, 2)), None).unwrap();

        assert_eq!(decoder.total_bytes(), 10);
        assert_eq!(decoder.read_chunk(4).unwrap(), ReadStatus::Pending);
        assert_eq!(decoder.bytes_read(), 4);
        assert_eq!(decoder.read_chunk(4).unwrap(), ReadStatus::Pending);
        assert_eq!(decoder.read_chunk(4).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.bytes_read(), 10);
        assert!(decoder.is_closed());
        // no I/O after close
        assert_eq!(decoder.read_chunk(4).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.get_pixel(4, 1), (9, 255));
    }

    #[test]
    fn source_is_closed_exactly_at_the_end() {
        let mut cursor = RifReader::from_bytes(gray_ramp(2, 2));
        let mut decoder = RifDecoder::new(&mut cursor, None).unwrap();

        decoder.read_chunk(3).unwrap();
        assert!(!decoder.is_closed());
        decoder.read_chunk(1).unwrap();
        assert!(decoder.is_closed());
        drop(decoder);

        assert!(cursor.is_closed());
        assert!(cursor.read_bytes(&mut [0]).is_err());
    }

    #[test]
    fn truncated_pixels_can_be_retried() {
        let mut data = gray_ramp(4, 1);
        data.truncate(data.len() - 2);

        let mut decoder = RifDecoder::new(RifReader::from_bytes(data), None).unwrap();
        let err = decoder.read_chunk(0).err();

        assert!(matches!(err, Some(RifDecodeErrors::InsufficientData(4, 2))));
        assert_eq!(decoder.bytes_read(), 2);
        assert!(!decoder.is_closed());
        assert_eq!(decoder.get_pixel(1, 0), (1, 255));
    }

    /// Fails a single read once `fail_at` bytes were handed out
    struct FailsOnce {
        data:     Vec<u8>,
        position: usize,
        fail_at:  Option<usize>
    }

    impl RifSource for FailsOnce {
        fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
            if self.fail_at == Some(self.position) {
                self.fail_at = None;
                return Err(ZByteIoError::Generic("read interrupted"));
            }
            let limit = self.fail_at.unwrap_or(self.data.len());
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
    fn source_failure_keeps_bytes_already_read() {
        let mut data = vec![0, 0, 0, 0, 6, 0, 0, 0, 1];
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);

        let source = FailsOnce {
            data,
            position: 0,
            fail_at: Some(12)
        };
        let mut decoder = RifDecoder::new(source, None).unwrap();

        assert!(matches!(
            decoder.read_chunk(0),
            Err(RifDecodeErrors::IoErrors(_))
        ));
        assert_eq!(decoder.bytes_read(), 3);
        assert!(!decoder.is_closed());

        assert_eq!(decoder.read_chunk(0).unwrap(), ReadStatus::Closed);
        assert_eq!(decoder.image().to_bytes(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn failed_open_closes_source() {
        let mut cursor = RifReader::from_bytes([0, 0, 0]);
        assert!(RifDecoder::new(&mut cursor, None).is_err());
        assert!(cursor.is_closed());
    }

    #[test]
    fn open_by_name() {
        let mut storage = MemoryStorage::new();
        storage.insert("ramp.rif", gray_ramp(3, 3));

        let decoder = RifDecoder::open(&storage, "ramp.rif", None).unwrap();
        assert_eq!(decoder.dimensions(), (3, 3));

        assert!(matches!(
            RifDecoder::open(&storage, "nope.rif", None).err(),
            Some(RifDecodeErrors::NotFound(_))
        ));
    }

    #[test]
    fn pool_exhaustion_aborts_open() {
        let pool = ArenaPool::new(8);
        let err = RifDecoder::new(RifReader::from_bytes(gray_ramp(3, 3)), Some(&pool)).err();

        assert!(matches!(err, Some(RifDecodeErrors::PoolErrors(_))));
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn pooled_decode() {
        let pool = ArenaPool::new(9);
        let mut decoder = RifDecoder::new(RifReader::from_bytes(gray_ramp(3, 3)), Some(&pool)).unwrap();

        decoder.read_chunk(0).unwrap();
        let image = decoder.into_image();

        assert!(image.is_pooled());
        assert_eq!(image.pool_region().map(|r| r.offset()), Some(0));
        assert_eq!(image.get_pixel(2, 2), (8, 255));
        assert_eq!(pool.remaining(), 0);
    }
}
