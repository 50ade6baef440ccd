//! Output buffer allocation.
//!
//! Border pixels of a blurred frame are never written, so whatever the
//! allocator puts in a fresh buffer is what the border band ends up holding.

use std::fmt;
use std::sync::Arc;

pub trait BufferAllocator: Send + Sync {
    fn allocate(&self, len: usize) -> Vec<u8>;
}

/// Zero-filled buffers. The default for every kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroedAllocator;

impl BufferAllocator for ZeroedAllocator {
    fn allocate(&self, len: usize) -> Vec<u8> {
        vec![0u8; len]
    }
}

/// Buffers pre-filled with a sentinel byte.
#[derive(Debug, Clone, Copy)]
pub struct FilledAllocator(pub u8);

impl BufferAllocator for FilledAllocator {
    fn allocate(&self, len: usize) -> Vec<u8> {
        vec![self.0; len]
    }
}

/// Shared handle passed through kernel configuration.
#[derive(Clone)]
pub struct SharedAllocator(Arc<dyn BufferAllocator>);

impl SharedAllocator {
    pub fn new<A: BufferAllocator + 'static>(allocator: A) -> Self {
        Self(Arc::new(allocator))
    }

    pub fn from_arc(allocator: Arc<dyn BufferAllocator>) -> Self {
        Self(allocator)
    }

    pub fn allocate(&self, len: usize) -> Vec<u8> {
        self.0.allocate(len)
    }
}

impl Default for SharedAllocator {
    fn default() -> Self {
        Self::new(ZeroedAllocator)
    }
}

impl fmt::Debug for SharedAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedAllocator")
    }
}
