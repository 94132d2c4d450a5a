/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A bump allocated arena backing image storage
//!
//! A pool is a single zero initialized buffer with a cursor, every
//! reservation hands out the bytes at the cursor and moves it forward.
//! Regions cannot be freed individually, the whole pool is rewound with
//! [`clear`](ArenaPool::clear), which is meant to happen between whole image
//! loads when no image carved from the pool is alive anymore.
//!
//! Handles are cheap to clone and all clones refer to the same buffer,
//! images keep a handle plus an offset and length instead of pointers into
//! the buffer.
//!
//! The pool is single threaded, only one decode in progress should reserve
//! from a pool at a time.
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use zune_core::log::debug;

use crate::errors::PoolError;

struct PoolInner {
    buffer: Vec<u8>,
    cursor: usize
}

/// A shared handle to an arena
///
/// # Example
/// ```
/// use zune_rif::ArenaPool;
///
/// let pool = ArenaPool::new(32);
/// let first = pool.reserve(10).unwrap();
/// let second = pool.reserve(10).unwrap();
///
/// assert_eq!(first.offset(), 0);
/// assert_eq!(second.offset(), 10);
/// assert!(pool.reserve(13).is_err());
/// ```
#[derive(Clone)]
pub struct ArenaPool {
    inner: Rc<RefCell<PoolInner>>
}

impl ArenaPool {
    /// Create a pool with `capacity` zeroed bytes and the cursor at the start
    pub fn new(capacity: usize) -> ArenaPool {
        ArenaPool {
            inner: Rc::new(RefCell::new(PoolInner {
                buffer: vec![0; capacity],
                cursor: 0
            }))
        }
    }

    /// Reserve `length` bytes starting at the cursor
    ///
    /// # Returns
    /// - `Ok(PoolRegion)`: the region, its offset is the cursor position before the call
    /// - `Err(PoolError::Exhausted)`: the reservation does not fit, the cursor is not moved
    pub fn reserve(&self, length: usize) -> Result<PoolRegion, PoolError> {
        let mut inner = self.inner.borrow_mut();
        let available = inner.buffer.len().saturating_sub(inner.cursor);

        if length > available {
            return Err(PoolError::Exhausted {
                requested: length,
                available
            });
        }
        let offset = inner.cursor;
        inner.cursor += length;

        debug!("Reserved {} pool bytes at offset {}", length, offset);

        Ok(PoolRegion {
            pool: self.clone(),
            offset,
            length
        })
    }

    /// Rewind the cursor to the start and zero the whole buffer
    ///
    /// Every region handed out before this call now aliases memory
    /// that later reservations will reuse.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.cursor = 0;
        inner.buffer.fill(0);
    }

    /// Grow or shrink the backing buffer to `capacity` bytes
    ///
    /// Contents up to the smaller of the two sizes are kept, new bytes
    /// are zeroed. The cursor is not moved, if it ends up past the new
    /// capacity every later reservation fails until the pool is cleared.
    pub fn resize(&self, capacity: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.buffer.resize(capacity, 0);
        inner.buffer.shrink_to_fit();
    }

    /// Free the backing buffer
    ///
    /// Regions still referring to this pool read as out of bounds afterwards.
    pub fn release(self) {
        let mut inner = self.inner.borrow_mut();
        inner.buffer = Vec::new();
        inner.cursor = 0;
    }

    /// Size of the backing buffer
    pub fn capacity(&self) -> usize {
        self.inner.borrow().buffer.len()
    }

    /// Offset the next reservation will start at
    pub fn cursor(&self) -> usize {
        self.inner.borrow().cursor
    }

    /// Bytes left between the cursor and the capacity
    pub fn remaining(&self) -> usize {
        let inner = self.inner.borrow();
        inner.buffer.len().saturating_sub(inner.cursor)
    }

    /// Whether both handles refer to the same pool
    pub fn ptr_eq(&self, other: &ArenaPool) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A range of bytes reserved from an [`ArenaPool`]
#[derive(Clone)]
pub struct PoolRegion {
    pool:   ArenaPool,
    offset: usize,
    length: usize
}

impl PoolRegion {
    /// Start of the region inside the pool
    pub const fn offset(&self) -> usize {
        self.offset
    }
    /// Number of bytes in the region
    pub const fn len(&self) -> usize {
        self.length
    }
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
    /// The pool this region was reserved from
    pub const fn pool(&self) -> &ArenaPool {
        &self.pool
    }

    /// Split into `[0, mid)` and `[mid, len)`, `mid` is clamped to the region length
    pub(crate) fn split_at(self, mid: usize) -> (PoolRegion, PoolRegion) {
        let mid = mid.min(self.length);
        let tail = PoolRegion {
            pool:   self.pool.clone(),
            offset: self.offset + mid,
            length: self.length - mid
        };
        let head = PoolRegion {
            pool:   self.pool,
            offset: self.offset,
            length: mid
        };
        (head, tail)
    }

    /// Run `func` over the region bytes
    ///
    /// Returns `None` if the pool was shrunk or released below the region
    pub(crate) fn with_slice<R, F: FnOnce(&[u8]) -> R>(&self, func: F) -> Option<R> {
        let inner = self.pool.inner.borrow();
        inner
            .buffer
            .get(self.offset..self.offset + self.length)
            .map(func)
    }

    /// Run `func` over the region bytes mutably
    ///
    /// Returns `None` if the pool was shrunk or released below the region
    pub(crate) fn with_slice_mut<R, F: FnOnce(&mut [u8]) -> R>(&self, func: F) -> Option<R> {
        let mut inner = self.pool.inner.borrow_mut();
        inner
            .buffer
            .get_mut(self.offset..self.offset + self.length)
            .map(func)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::PoolError;
    use crate::pool::ArenaPool;

    #[test]
    fn reservations_are_contiguous() {
        let pool = ArenaPool::new(100);
        let a = pool.reserve(30).unwrap();
        let b = pool.reserve(0).unwrap();
        let c = pool.reserve(70).unwrap();

        assert_eq!((a.offset(), a.len()), (0, 30));
        assert_eq!((b.offset(), b.len()), (30, 0));
        assert_eq!((c.offset(), c.len()), (30, 70));
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn exhausted_reservation_keeps_cursor() {
        let pool = ArenaPool::new(8);
        pool.reserve(5).unwrap();

        let err = pool.reserve(4).err().unwrap();
        assert!(
            err == PoolError::Exhausted {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(pool.cursor(), 5);
        assert!(pool.reserve(3).is_ok());
    }

    #[test]
    fn clear_rewinds_and_zeroes() {
        let pool = ArenaPool::new(4);
        let region = pool.reserve(4).unwrap();
        region.with_slice_mut(|bytes| bytes.fill(9)).unwrap();

        pool.clear();

        assert_eq!(pool.cursor(), 0);
        assert_eq!(region.with_slice(|bytes| bytes.to_vec()).unwrap(), [0; 4]);
        assert_eq!(pool.reserve(4).unwrap().offset(), 0);
    }

    #[test]
    fn resize_keeps_contents_and_cursor() {
        let pool = ArenaPool::new(4);
        let region = pool.reserve(2).unwrap();
        region.with_slice_mut(|bytes| bytes.copy_from_slice(&[1, 2])).unwrap();

        pool.resize(16);
        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.cursor(), 2);
        assert_eq!(region.with_slice(|bytes| bytes.to_vec()).unwrap(), [1, 2]);

        pool.resize(1);
        assert!(region.with_slice(|_| ()).is_none());
        assert!(pool.reserve(1).is_err());
    }

    #[test]
    fn released_pool_has_no_storage() {
        let pool = ArenaPool::new(16);
        let region = pool.reserve(8).unwrap();
        let handle = pool.clone();

        pool.release();

        assert_eq!(handle.capacity(), 0);
        assert!(region.with_slice(|_| ()).is_none());
    }
}
