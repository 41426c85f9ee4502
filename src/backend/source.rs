//! Raw system memory seam beneath the first tier.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::ALIGN;

/// Supplier of raw memory blocks to the first tier.
///
/// A source reports failure with `None` and never retries; the out-of-memory
/// policy lives in [`MallocAllocator`](super::malloc::MallocAllocator).
pub trait BlockSource {
    /// Obtain `size` bytes aligned to [`ALIGN`].
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block obtained from this source.
    ///
    /// # Safety
    /// `ptr` must come from this source with the same `size`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);

    /// Resize a block. On `None` the original block is untouched.
    ///
    /// # Safety
    /// `ptr` must come from this source with `old_size`.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>>;
}

/// The process allocator, reached through `alloc::alloc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct System;

#[inline]
fn layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.max(1), ALIGN).ok()
}

impl BlockSource for System {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = layout(size)?;
        NonNull::new(unsafe { alloc::alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = layout(size) {
            unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        let old = layout(old_size)?;
        layout(new_size)?;
        NonNull::new(unsafe { alloc::alloc::realloc(ptr.as_ptr(), old, new_size.max(1)) })
    }
}

impl<S: BlockSource + ?Sized> BlockSource for &S {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).deallocate(ptr, size) }
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        unsafe { (**self).reallocate(ptr, old_size, new_size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_alignment() {
        for size in [0usize, 1, 7, 8, 100, 4096] {
            let p = System.allocate(size).unwrap();
            assert_eq!(p.as_ptr() as usize % ALIGN, 0);
            unsafe { System.deallocate(p, size) };
        }
    }

    #[test]
    fn test_system_reallocate_keeps_bytes() {
        let p = System.allocate(16).unwrap();
        unsafe {
            p.as_ptr().write_bytes(0xAB, 16);
            let q = System.reallocate(p, 16, 256).unwrap();
            assert_eq!(*q.as_ptr().add(15), 0xAB);
            System.deallocate(q, 256);
        }
    }
}
