/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Byte sources used by the decoders
//!
//! The decoders never touch the platform directly, instead a host
//! provides a [`RifStorage`] that resolves names into [`RifSource`]s.
//! A source is read sequentially and closed once the decoder has
//! consumed every byte of the image.
//!
//! [`RifReader`] adapts any zune [`ZByteReaderTrait`] reader, a
//! [`ZCursor`] for in memory data or a `BufReader<File>` for files.
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use zune_core::bytestream::{ZByteIoError, ZByteReaderTrait, ZCursor, ZReader};

use crate::errors::RifDecodeErrors;

/// A read that stopped on an error after storing `filled` bytes
pub struct PartialRead {
    pub filled: usize,
    pub error:  ZByteIoError
}

/// A sequentially readable and closeable stream of bytes
///
/// This is the only capability the decoders require from the host platform
pub trait RifSource {
    /// Read bytes into `buf` returning how many bytes were read
    ///
    /// A return value smaller than `buf.len()` is not an error, `0` signals
    /// the end of the stream.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError>;

    /// Close the source, releasing whatever handle backs it
    ///
    /// Closing an already closed source is a no-op
    fn close(&mut self) -> Result<(), ZByteIoError>;

    /// Read until `buf` is full or the stream ends
    ///
    /// # Returns
    /// - `Ok(usize)`: Number of bytes stored at the start of `buf`, less than
    ///   `buf.len()` only if the stream ended
    /// - `Err(PartialRead)`: The source failed, bytes stored before the
    ///   failure are counted in `filled`
    fn read_exact_or_short(&mut self, buf: &mut [u8]) -> Result<usize, PartialRead> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.read_bytes(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(error) => return Err(PartialRead { filled, error })
            }
        }
        Ok(filled)
    }
}

/// Split a fill result into the stored byte count and the error, if any
pub(crate) fn split_read(result: Result<usize, PartialRead>) -> (usize, Option<ZByteIoError>) {
    match result {
        Ok(filled) => (filled, None),
        Err(PartialRead { filled, error }) => (filled, Some(error))
    }
}

/// A host provided namespace of images, e.g. a directory
/// or an asset bundle
pub trait RifStorage {
    /// The source type returned on a successful open
    type Source: RifSource;

    /// Open `name` for reading
    ///
    /// ## Errors
    /// [`RifDecodeErrors::NotFound`] if `name` does not resolve
    fn open(&self, name: &str) -> Result<Self::Source, RifDecodeErrors>;
}

impl<T: RifSource + ?Sized> RifSource for &mut T {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
        (**self).read_bytes(buf)
    }

    fn close(&mut self) -> Result<(), ZByteIoError> {
        (**self).close()
    }
}

/// A closeable source over a zune byte reader
///
/// The reader is dropped on [`close`](RifSource::close), reads after that fail.
///
/// # Example
/// ```
/// use zune_core::bytestream::ZCursor;
/// use zune_rif::{RifReader, RifSource};
///
/// let mut source = RifReader::new(ZCursor::new([1_u8, 2, 3]));
/// let mut buf = [0; 4];
/// assert_eq!(source.read_exact_or_short(&mut buf).ok(), Some(3));
///
/// source.close().unwrap();
/// assert!(source.read_bytes(&mut buf).is_err());
/// ```
pub struct RifReader<T: ZByteReaderTrait> {
    reader: Option<ZReader<T>>
}

impl<T: ZByteReaderTrait> RifReader<T> {
    pub fn new(reader: T) -> RifReader<T> {
        RifReader {
            reader: Some(ZReader::new(reader))
        }
    }
    /// Whether [`close`](RifSource::close) was called
    pub const fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl<T: AsRef<[u8]>> RifReader<ZCursor<T>> {
    /// A source over in memory bytes
    pub fn from_bytes(data: T) -> RifReader<ZCursor<T>> {
        RifReader::new(ZCursor::new(data))
    }
}

impl<T: ZByteReaderTrait> RifSource for RifReader<T> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
        match self.reader.as_mut() {
            Some(reader) => reader.read_bytes(buf),
            None => Err(ZByteIoError::Generic("Source is closed"))
        }
    }

    fn close(&mut self) -> Result<(), ZByteIoError> {
        self.reader = None;
        Ok(())
    }
}

/// A storage keeping named images in memory
///
/// Useful for assets embedded in the binary and for tests
#[derive(Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, Vec<u8>>
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }
    /// Add or replace an entry
    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.entries.insert(name.to_string(), data);
    }
    /// Remove an entry returning its bytes
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }
}

impl RifStorage for MemoryStorage {
    type Source = RifReader<ZCursor<Vec<u8>>>;

    fn open(&self, name: &str) -> Result<Self::Source, RifDecodeErrors> {
        match self.entries.get(name) {
            Some(data) => Ok(RifReader::from_bytes(data.clone())),
            None => Err(RifDecodeErrors::NotFound(name.to_string()))
        }
    }
}

#[cfg(feature = "std")]
pub use file::FileSystem;

#[cfg(feature = "std")]
mod file {
    use std::fs::File;
    use std::io::{BufReader, ErrorKind};
    use std::path::PathBuf;

    use zune_core::bytestream::ZByteIoError;

    use crate::errors::RifDecodeErrors;
    use crate::source::{RifReader, RifStorage};

    /// Files under a root directory, opened as buffered readers
    #[derive(Default, Clone)]
    pub struct FileSystem {
        root: PathBuf
    }

    impl FileSystem {
        /// Resolve names relative to `root`
        pub fn new<P: Into<PathBuf>>(root: P) -> FileSystem {
            FileSystem { root: root.into() }
        }
    }

    impl RifStorage for FileSystem {
        type Source = RifReader<BufReader<File>>;

        fn open(&self, name: &str) -> Result<Self::Source, RifDecodeErrors> {
            match File::open(self.root.join(name)) {
                Ok(file) => Ok(RifReader::new(BufReader::new(file))),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(RifDecodeErrors::NotFound(name.to_string()))
                }
                Err(e) => Err(RifDecodeErrors::IoErrors(ZByteIoError::from(e)))
            }
        }
    }
}
