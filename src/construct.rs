//! Object lifecycle helpers.
//!
//! Containers obtain raw memory from an [`Allocator`] and manage object lifetime
//! separately: values are written into place with [`construct`] and dropped in
//! place with [`destroy`]/[`destroy_slice`]. Destruction is skipped entirely for
//! types without drop glue.

use core::ptr::{self, NonNull};

use crate::Allocator;
use crate::error::AllocError;

/// Move `value` into uninitialized memory.
///
/// # Safety
/// `ptr` must be valid for writes and properly aligned. Any previous value at
/// `ptr` is overwritten without being dropped.
#[inline]
pub unsafe fn construct<T>(ptr: *mut T, value: T) {
    unsafe { ptr.write(value) }
}

/// Drop the value at `ptr` in place.
///
/// # Safety
/// `ptr` must point to an initialized value that is not used afterwards.
#[inline]
pub unsafe fn destroy<T>(ptr: *mut T) {
    if core::mem::needs_drop::<T>() {
        unsafe { ptr::drop_in_place(ptr) }
    }
}

/// Drop `len` contiguous values starting at `first`.
///
/// # Safety
/// Same as [`destroy`] for each of the `len` values.
#[inline]
pub unsafe fn destroy_slice<T>(first: *mut T, len: usize) {
    if core::mem::needs_drop::<T>() && len > 0 {
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, len)) }
    }
}

/// Bytes needed for `n` values of `T`.
#[inline]
fn array_bytes<T>(n: usize) -> Result<usize, AllocError> {
    size_of::<T>()
        .checked_mul(n)
        .ok_or(AllocError::OutOfMemory { size: usize::MAX })
}

/// Allocate uninitialized storage for `n` values of `T`.
///
/// `T` must not need more than [`ALIGN`](crate::ALIGN) alignment.
pub fn allocate_array<T, A: Allocator + ?Sized>(alloc: &A, n: usize) -> Result<NonNull<T>, AllocError> {
    debug_assert!(align_of::<T>() <= crate::ALIGN);
    Ok(alloc.allocate(array_bytes::<T>(n)?)?.cast())
}

/// Release storage obtained from [`allocate_array`].
///
/// # Safety
/// `ptr` must come from `allocate_array::<T>` on `alloc` with the same `n`. The
/// values must already be destroyed.
pub unsafe fn deallocate_array<T, A: Allocator + ?Sized>(alloc: &A, ptr: NonNull<T>, n: usize) {
    unsafe { alloc.deallocate(ptr.cast(), size_of::<T>() * n) }
}

/// Allocate uninitialized storage for a single `T`.
#[inline]
pub fn allocate_one<T, A: Allocator + ?Sized>(alloc: &A) -> Result<NonNull<T>, AllocError> {
    allocate_array(alloc, 1)
}

/// Release storage obtained from [`allocate_one`].
///
/// # Safety
/// See [`deallocate_array`].
#[inline]
pub unsafe fn deallocate_one<T, A: Allocator + ?Sized>(alloc: &A, ptr: NonNull<T>) {
    unsafe { deallocate_array(alloc, ptr, 1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrackingAllocator;
    use crate::backend::pool::PoolAllocator;
    use std::rc::Rc;

    #[test]
    fn test_construct_destroy_roundtrip() {
        let pool = PoolAllocator::new();
        let tracked = Rc::new(());
        let slot = allocate_one::<Rc<()>, _>(&pool).unwrap();
        unsafe {
            construct(slot.as_ptr(), Rc::clone(&tracked));
            assert_eq!(Rc::strong_count(&tracked), 2);
            destroy(slot.as_ptr());
            assert_eq!(Rc::strong_count(&tracked), 1);
            deallocate_one(&pool, slot);
        }
    }

    #[test]
    fn test_destroy_slice_drops_each() {
        let alloc = TrackingAllocator::new(PoolAllocator::new());
        let tracked = Rc::new(());
        let base = allocate_array::<Rc<()>, _>(&alloc, 5).unwrap();
        unsafe {
            for i in 0..5 {
                construct(base.as_ptr().add(i), Rc::clone(&tracked));
            }
            assert_eq!(Rc::strong_count(&tracked), 6);
            destroy_slice(base.as_ptr(), 5);
            deallocate_array(&alloc, base, 5);
        }
        assert_eq!(Rc::strong_count(&tracked), 1);
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn test_allocate_array_overflow() {
        let pool = PoolAllocator::new();
        assert!(allocate_array::<u64, _>(&pool, usize::MAX).is_err());
    }
}
