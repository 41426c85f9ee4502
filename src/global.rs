//! Process-wide pooled allocator
//!
//! # Lock-Guarded Design
//!
//! Containers default to [`Global`], a zero-sized handle on one process-wide
//! [`PoolAllocator`] behind a `spin::Mutex`. Every request takes the lock for the
//! duration of a single allocate or deallocate, so containers on different threads
//! may share the pool. The containers themselves remain single-threaded values.
//!
//! The out-of-memory handler runs with the lock released, so a handler may free
//! memory by dropping containers that live on [`Global`].
//!
//! ## Important Constraints:
//! - **No allocation under [`with_global_pool`]** - The closure holds the lock
//! - **Never torn down** - Chunks obtained by the global pool live for the whole process
//!
//! ## Automatic Initialization
//!
//! The pool is a `static` built in a const context, so it is usable without any
//! setup. Configuration is optional:
//!
//! ```rust
//! use tinystl::prelude::*;
//!
//! configure_global_pool(PoolConfig::default().with_refill_batch(32));
//!
//! let mut deque: Deque<u8> = Deque::new();
//! deque.push_back(1).unwrap();
//! assert_eq!(deque.len(), 1);
//! ```

use core::ptr::NonNull;

use spin::{Mutex, MutexGuard};

use crate::Allocator;
use crate::backend::config::PoolConfig;
use crate::backend::malloc::OomHandler;
use crate::backend::pool::{PoolAllocator, PoolStats};
use crate::backend::source::{BlockSource, System};
use crate::error::AllocError;

/// A pool behind a spin lock whose out-of-memory handler runs unlocked.
pub(crate) struct LockedPool<S: BlockSource> {
    pool: Mutex<PoolAllocator<S>>,
}

impl<S: BlockSource> LockedPool<S> {
    pub(crate) const fn new(pool: PoolAllocator<S>) -> Self {
        Self {
            pool: Mutex::new(pool),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, PoolAllocator<S>> {
        self.pool.lock()
    }

    /// Run `attempt` under the lock with the handler disabled. On failure, call
    /// the handler with the lock released and try again.
    fn retry_unlocked<F>(&self, mut attempt: F) -> Result<NonNull<u8>, AllocError>
    where
        F: FnMut(&PoolAllocator<S>) -> Result<NonNull<u8>, AllocError>,
    {
        let mut calls = 0usize;
        loop {
            let (result, handler, limit) = {
                let pool = self.pool.lock();
                let handler = pool.set_oom_handler(None);
                let result = attempt(&pool);
                pool.set_oom_handler(handler);
                (result, handler, pool.first_tier().retry_limit())
            };
            let err = match result {
                Ok(ptr) => return Ok(ptr),
                Err(err) => err,
            };
            let Some(handler) = handler else {
                return Err(err);
            };
            if limit.is_some_and(|limit| calls >= limit) {
                tracing::error!(size = err.size(), calls, "out of memory, retry limit reached");
                return Err(err);
            }
            calls += 1;
            tracing::warn!(size = err.size(), attempt = calls, "pool exhausted, invoking oom handler");
            handler();
        }
    }
}

impl<S: BlockSource> Allocator for LockedPool<S> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.retry_unlocked(|pool| pool.allocate(size))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.pool.lock().deallocate(ptr, size) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // A failed attempt leaves `ptr` untouched, so retrying with it is sound.
        self.retry_unlocked(|pool| unsafe { pool.reallocate(ptr, old_size, new_size) })
    }
}

static GLOBAL_POOL: LockedPool<System> = LockedPool::new(PoolAllocator::new());

/// Handle on the process-wide pool. The default allocator of every container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Global;

impl Allocator for Global {
    #[inline]
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        GLOBAL_POOL.allocate(size)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { GLOBAL_POOL.deallocate(ptr, size) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { GLOBAL_POOL.reallocate(ptr, old_size, new_size) }
    }
}

/// Execute a closure with exclusive access to the global pool
///
/// The lock is held for the duration of `f`; allocating through [`Global`] inside
/// the closure deadlocks.
#[inline]
pub fn with_global_pool<F, R>(f: F) -> R
where
    F: FnOnce(&mut PoolAllocator<System>) -> R,
{
    f(&mut GLOBAL_POOL.lock())
}

/// Reconfigure the global pool. Blocks already pooled are kept.
pub fn configure_global_pool(config: PoolConfig) {
    with_global_pool(|pool| pool.configure(config));
}

/// Install the global pool's out-of-memory handler, returning the previous one.
///
/// The handler runs without the pool lock and may release memory held on [`Global`].
pub fn set_global_oom_handler(handler: Option<OomHandler>) -> Option<OomHandler> {
    with_global_pool(|pool| pool.set_oom_handler(handler))
}

/// Snapshot of the global pool's counters.
pub fn global_pool_stats() -> PoolStats {
    with_global_pool(|pool| pool.stats())
}
