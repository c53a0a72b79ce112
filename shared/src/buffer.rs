//! Bounded append-only buffer for composing valve commands
//!
//! The buffer reserves one slot of its capacity for a terminator, so the
//! usable content length is `capacity - 1`. Every append is checked before
//! anything is written; an append that would not fit leaves the buffer
//! untouched and returns [`Overflow`].

use bytes::{BufMut, Bytes, BytesMut};

/// Reference capacity of the composed command buffer, terminator included
pub const DEFAULT_COMMAND_CAPACITY: usize = 80;

/// Returned when an append would exceed the buffer capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// Bytes already in the buffer
    pub len: usize,
    /// Bytes the rejected append needed
    pub needed: usize,
    /// Total capacity, terminator included
    pub capacity: usize,
}

/// Capacity-checked byte buffer
#[derive(Debug)]
pub struct CommandBuffer {
    buffer: BytesMut,
    capacity: usize,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_CAPACITY)
    }
}

impl CommandBuffer {
    /// Create a buffer holding at most `capacity - 1` content bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Content bytes still available
    pub fn remaining(&self) -> usize {
        self.capacity
            .saturating_sub(1)
            .saturating_sub(self.buffer.len())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a single byte
    pub fn push(&mut self, byte: u8) -> Result<(), Overflow> {
        self.check(1)?;
        self.buffer.put_u8(byte);
        Ok(())
    }

    /// Append a slice; all or nothing
    pub fn push_slice(&mut self, data: &[u8]) -> Result<(), Overflow> {
        self.check(data.len())?;
        self.buffer.put_slice(data);
        Ok(())
    }

    /// Take the composed bytes
    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }

    fn check(&self, needed: usize) -> Result<(), Overflow> {
        if needed > self.remaining() {
            return Err(Overflow {
                len: self.buffer.len(),
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
