//! # TinySTL - A no_std Container Runtime on a Pooled Allocator
//!
//! TinySTL provides ownership-correct generic containers built on a custom two-tier
//! memory allocator and a uniform cursor abstraction. It features:
//!
//! - **Two-tier allocator** - Small requests served from pooled size classes, large ones passed through
//! - **Out-of-memory hook** - A settable handler retried before an allocation is reported as failed
//! - **Segmented deque** - O(1) push/pop at both ends and random access across fixed-size buffers
//! - **Red-black tree** - O(log n) ordered storage backing maps, multimaps, sets and multisets
//! - **Injectable allocators** - Every container is generic over [`Allocator`], defaulting to a global pool
//!
//! ## Quick Start
//!
//! ```rust
//! use tinystl::prelude::*;
//!
//! let mut deque: Deque<u32> = Deque::new();
//! deque.push_back(2).unwrap();
//! deque.push_front(1).unwrap();
//! assert_eq!(deque.iter().copied().collect::<Vec<_>>(), [1, 2]);
//!
//! let mut set: TreeSet<&str> = TreeSet::new();
//! set.insert("pear").unwrap();
//! set.insert("apple").unwrap();
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), ["apple", "pear"]);
//! ```
//!
//! ## Features
//!
//! - `tree-collections` (default) - `TreeMap`, `TreeMultiMap`, `TreeSet` and `TreeMultiSet` wrappers
//!
//! ## Architecture
//!
//! ### Core Traits
//!
//! The [`Allocator`] trait is the raw memory contract every container consumes:
//!
//! - `allocate()` - Obtain a block of at least `size` bytes, aligned to [`ALIGN`]
//! - `deallocate()` - Return a block, passing the size it was requested with
//! - `reallocate()` - Resize a block, preserving its leading bytes
//!
//! ### Backends
//!
//! **MallocAllocator** - First tier:
//! - Pass-through to a [`BlockSource`](prelude::BlockSource)
//! - Out-of-memory handler retried in a loop
//!
//! **PoolAllocator** - Second tier:
//! - 16 size classes (8..=128 bytes) with intrusive free lists
//! - Refills carved from a bump-pointer chunk pool
//! - Chunks returned to the source only when the pool is dropped
//!
//! **Global** - Zero-sized handle on a process-wide, lock-guarded pool
//!
//! ### Containers
//!
//! **Deque** - Map of fixed-size buffers, random-access cursors that cross buffer boundaries.
//!
//! **RbTree** - Parent-linked red-black tree with cached leftmost/rightmost nodes and cursor-based
//! hinted insertion and removal.
//!
//! ## Examples
//!
//! ### Scoped Pool
//!
//! ```rust
//! use tinystl::prelude::*;
//!
//! let pool = PoolAllocator::new();
//! let mut deque = Deque::new_in(&pool);
//! for i in 0..100u64 {
//!     deque.push_back(i).unwrap();
//! }
//! assert_eq!(deque[42], 42);
//! assert!(pool.stats().chunk_requests >= 1);
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;
#[cfg(test)]
extern crate std;

use core::ptr::{self, NonNull};

mod backend;
mod collections;
mod compare;
mod construct;
mod error;
mod global;
mod iter;
pub mod prelude;

use error::AllocError;

/// Alignment of every block handed out by the allocators in this crate.
pub const ALIGN: usize = 8;

/// Largest request served by the pooled tier. Larger requests go to the first tier.
pub const MAX_BYTES: usize = 128;

/// Number of pooled size classes (`MAX_BYTES / ALIGN`).
pub const NFREELISTS: usize = MAX_BYTES / ALIGN;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Rounds `bytes` up to the next multiple of [`ALIGN`].
#[inline]
pub const fn round_up(bytes: usize) -> usize {
    (bytes + ALIGN - 1) & !(ALIGN - 1)
}

/// Index of the size class serving a request of `bytes` (1..=[`MAX_BYTES`]).
#[inline]
pub const fn freelist_index(bytes: usize) -> usize {
    (bytes + ALIGN - 1) / ALIGN - 1
}

/// Raw memory contract consumed by every container.
///
/// Blocks are aligned to [`ALIGN`] bytes. Callers must pass the same `size` to
/// [`deallocate`](Allocator::deallocate) that they passed to
/// [`allocate`](Allocator::allocate); the pooled tier relies on it to find the
/// owning size class.
pub trait Allocator {
    /// Allocate a block of at least `size` bytes.
    ///
    /// # Returns
    /// * `Ok(ptr)` - Pointer to the uninitialized block
    /// * `Err(AllocError::OutOfMemory)` - The request could not be satisfied
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    /// `ptr` must come from `allocate`/`reallocate` on this allocator with the same `size`,
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);

    /// Resize a block, preserving `min(old_size, new_size)` leading bytes.
    ///
    /// On failure the original block is untouched and still owned by the caller.
    ///
    /// # Safety
    /// Same requirements as [`deallocate`](Allocator::deallocate) for `ptr` and `old_size`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let fresh = self.allocate(new_size)?;
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size.min(new_size));
            self.deallocate(ptr, old_size);
        }
        Ok(fresh)
    }
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(size)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { (**self).deallocate(ptr, size) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { (**self).reallocate(ptr, old_size, new_size) }
    }
}
