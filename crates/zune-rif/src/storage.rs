/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use crate::errors::PoolError;
use crate::pool::{ArenaPool, PoolRegion};

/// Bytes backing an image, either owned by the image or
/// carved out of a pool
///
/// Dropping owned storage frees it, dropping pooled storage leaves the
/// pool untouched.
pub(crate) enum Storage {
    Owned(Vec<u8>),
    Pooled(PoolRegion)
}

impl Storage {
    /// Zeroed storage of `length` bytes, reserved from `pool` when one is given
    pub fn allocate(length: usize, pool: Option<&ArenaPool>) -> Result<Storage, PoolError> {
        match pool {
            Some(pool) => Ok(Storage::Pooled(pool.reserve(length)?)),
            None => Ok(Storage::Owned(vec![0; length]))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::Owned(bytes) => bytes.len(),
            Storage::Pooled(region) => region.len()
        }
    }

    pub fn region(&self) -> Option<&PoolRegion> {
        match self {
            Storage::Owned(_) => None,
            Storage::Pooled(region) => Some(region)
        }
    }

    pub fn with_slice<R, F: FnOnce(&[u8]) -> R>(&self, func: F) -> Option<R> {
        match self {
            Storage::Owned(bytes) => Some(func(bytes)),
            Storage::Pooled(region) => region.with_slice(func)
        }
    }

    pub fn with_slice_mut<R, F: FnOnce(&mut [u8]) -> R>(&mut self, func: F) -> Option<R> {
        match self {
            Storage::Owned(bytes) => Some(func(bytes)),
            Storage::Pooled(region) => region.with_slice_mut(func)
        }
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.with_slice(|bytes| bytes.get(index).copied()).flatten()
    }

    /// Two consecutive bytes starting at `index`
    pub fn pair(&self, index: usize) -> Option<(u8, u8)> {
        self.with_slice(|bytes| match bytes.get(index..index + 2) {
            Some(pair) => Some((pair[0], pair[1])),
            None => None
        })
        .flatten()
    }

    /// A native endian cell slot starting at `index`
    pub fn slot(&self, index: usize) -> Option<u32> {
        self.with_slice(|bytes| {
            bytes
                .get(index..index + 4)
                .map(|slot| u32::from_ne_bytes([slot[0], slot[1], slot[2], slot[3]]))
        })
        .flatten()
    }

    /// Copy of the bytes, empty if the backing pool no longer holds them
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_slice(|bytes| bytes.to_vec()).unwrap_or_default()
    }
}
