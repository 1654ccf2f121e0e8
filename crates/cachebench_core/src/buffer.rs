//! Page-aligned benchmark buffers

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use thiserror::Error;

/// Alignment every benchmark buffer starts on.
pub const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("cannot allocate a zero-sized buffer")]
    ZeroSize,

    #[error("no valid layout for {size} bytes aligned to {alignment}")]
    InvalidLayout { size: usize, alignment: usize },

    #[error("out of memory allocating {size} bytes")]
    OutOfMemory { size: usize },
}

/// A heap block with a caller-chosen alignment, freed on drop.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate `size` bytes aligned to `alignment`. Contents are unspecified
    /// until [`fill`](Self::fill) is called.
    pub fn allocate(size: usize, alignment: usize) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let layout = Layout::from_size_align(size, alignment)
            .map_err(|_| AllocError::InvalidLayout { size, alignment })?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory { size })?;
        Ok(Self { ptr, layout })
    }

    /// Allocate and write `fill` to every byte so all pages are committed
    /// before the first timed pass.
    pub fn allocate_filled(size: usize, alignment: usize, fill: u8) -> Result<Self, AllocError> {
        let mut buffer = Self::allocate(size, alignment)?;
        buffer.fill(fill);
        Ok(buffer)
    }

    pub fn fill(&mut self, byte: u8) {
        // SAFETY: the block is valid for `len` bytes of writes.
        unsafe {
            ptr::write_bytes(self.ptr.as_ptr(), byte, self.len());
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Byte view of the buffer. Only meaningful after a fill.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the block is live for `len` bytes; callers fill before reading.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by `alloc::alloc` with this exact layout.
        unsafe {
            alloc::dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len())
            .field("alignment", &self.alignment())
            .finish()
    }
}
