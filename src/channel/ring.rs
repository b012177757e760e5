//! Circular byte buffer with two indices.
//!
//! One slot is always kept empty so `read_pos == write_pos` means empty and
//! the buffer holds at most `capacity - 1` bytes. Callers hold the channel
//! lock for every method here.

use crate::error::{ChannelError, Result};

/// Storage and positions of a ring channel.
#[derive(Debug)]
pub(crate) struct Ring {
    capacity: usize,
    /// Empty when released; exactly `capacity` bytes when allocated.
    storage: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Ring {
    /// Create an unallocated ring.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            storage: Vec::new(),
            read_pos: 0,
            write_pos: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn is_allocated(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Allocate zeroed storage and reset both positions.
    ///
    /// Reports allocation failure instead of aborting.
    pub(crate) fn allocate(&mut self) -> Result<()> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(self.capacity)
            .map_err(|_| ChannelError::OutOfMemory {
                requested: self.capacity,
            })?;
        storage.resize(self.capacity, 0);
        self.storage = storage;
        self.read_pos = 0;
        self.write_pos = 0;
        Ok(())
    }

    /// Drop storage, discarding any unread bytes.
    pub(crate) fn release(&mut self) {
        self.storage = Vec::new();
        self.read_pos = 0;
        self.write_pos = 0;
    }

    pub(crate) fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub(crate) fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    /// Bytes that can be written before the ring is full.
    pub(crate) fn free_space(&self) -> usize {
        (self.read_pos + self.capacity - self.write_pos - 1) % self.capacity
    }

    /// Bytes buffered and not yet read.
    pub(crate) fn used_space(&self) -> usize {
        (self.write_pos + self.capacity - self.read_pos) % self.capacity
    }

    /// Longest run readable without crossing the end of storage.
    fn readable_run(&self) -> usize {
        if self.write_pos > self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.capacity - self.read_pos
        }
    }

    /// Longest run writable without crossing the end of storage or
    /// catching up with `read_pos`.
    fn writable_run(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.capacity - self.write_pos
        } else {
            self.read_pos - self.write_pos - 1
        }
    }

    /// Copy one contiguous run out into `buf`; never crosses the wrap.
    ///
    /// Must not be called when empty.
    pub(crate) fn copy_out(&mut self, buf: &mut [u8]) -> usize {
        debug_assert!(!self.is_empty());
        let count = buf.len().min(self.readable_run());
        let start = self.read_pos;
        buf[..count].copy_from_slice(&self.storage[start..start + count]);
        self.read_pos = (start + count) % self.capacity;
        count
    }

    /// Copy one contiguous run in from `data`; never crosses the wrap.
    ///
    /// Must not be called when full.
    pub(crate) fn copy_in(&mut self, data: &[u8]) -> usize {
        debug_assert!(self.free_space() > 0);
        let count = data.len().min(self.free_space()).min(self.writable_run());
        let start = self.write_pos;
        self.storage[start..start + count].copy_from_slice(&data[..count]);
        self.write_pos = (start + count) % self.capacity;
        count
    }
}
