//! First tier: pass-through allocation with an out-of-memory retry hook.

use core::cell::Cell;
use core::ptr::NonNull;

use super::source::{BlockSource, System};
use crate::Allocator;
use crate::error::AllocError;

/// Out-of-memory handler.
///
/// Called between retries after the source refused a request. A handler is
/// expected to release memory elsewhere or abort the process.
pub type OomHandler = fn();

/// First-tier allocator.
///
/// Every request goes straight to the [`BlockSource`]. On refusal the installed
/// [`OomHandler`] is called and the request retried until it succeeds, the
/// handler is removed, or the retry limit is reached.
pub struct MallocAllocator<S: BlockSource = System> {
    source: S,
    oom_handler: Cell<Option<OomHandler>>,
    retry_limit: Option<usize>,
}

impl MallocAllocator<System> {
    /// First tier over the process allocator.
    pub const fn new() -> Self {
        Self::with_source(System)
    }
}

impl Default for MallocAllocator<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BlockSource> MallocAllocator<S> {
    /// First tier over a custom block source.
    pub const fn with_source(source: S) -> Self {
        Self {
            source,
            oom_handler: Cell::new(None),
            retry_limit: None,
        }
    }

    /// Bound the number of handler calls per failed request. `None` retries forever.
    pub fn with_retry_limit(mut self, limit: Option<usize>) -> Self {
        self.retry_limit = limit;
        self
    }

    pub(crate) const fn set_retry_limit(&mut self, limit: Option<usize>) {
        self.retry_limit = limit;
    }

    pub(crate) fn retry_limit(&self) -> Option<usize> {
        self.retry_limit
    }

    /// Install a new out-of-memory handler, returning the previous one.
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.oom_handler.replace(handler)
    }

    /// The underlying block source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Single attempt against the source, without the handler loop.
    #[inline]
    pub(crate) fn try_allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.source.allocate(size)
    }

    fn oom_retry<F>(&self, size: usize, mut attempt: F) -> Result<NonNull<u8>, AllocError>
    where
        F: FnMut() -> Option<NonNull<u8>>,
    {
        let mut calls = 0usize;
        loop {
            let Some(handler) = self.oom_handler.get() else {
                tracing::error!(size, "out of memory, no handler installed");
                return Err(AllocError::OutOfMemory { size });
            };
            if self.retry_limit.is_some_and(|limit| calls >= limit) {
                tracing::error!(size, calls, "out of memory, retry limit reached");
                return Err(AllocError::OutOfMemory { size });
            }
            calls += 1;
            tracing::warn!(size, attempt = calls, "allocation refused, invoking oom handler");
            handler();
            if let Some(ptr) = attempt() {
                return Ok(ptr);
            }
        }
    }
}

impl<S: BlockSource> Allocator for MallocAllocator<S> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        match self.source.allocate(size) {
            Some(ptr) => Ok(ptr),
            None => self.oom_retry(size, || self.source.allocate(size)),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.source.deallocate(ptr, size) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        match unsafe { self.source.reallocate(ptr, old_size, new_size) } {
            Some(ptr) => Ok(ptr),
            None => self.oom_retry(new_size, || unsafe {
                self.source.reallocate(ptr, old_size, new_size)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CountingSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_malloc_pass_through() {
        let source = CountingSource::new();
        let alloc = MallocAllocator::with_source(&source);
        let p = alloc.allocate(300).unwrap();
        assert_eq!(source.requests(), 1);
        assert_eq!(source.live_bytes(), 300);
        unsafe { alloc.deallocate(p, 300) };
        assert_eq!(source.live_bytes(), 0);
    }

    #[test]
    fn test_malloc_fails_without_handler() {
        let source = CountingSource::new();
        source.fail_after(0);
        let alloc = MallocAllocator::with_source(&source);
        assert_eq!(alloc.allocate(512), Err(AllocError::OutOfMemory { size: 512 }));
    }

    #[test]
    fn test_malloc_handler_retries_until_success() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn handler() {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }

        // Refuse the first two attempts, then succeed.
        let source = CountingSource::new();
        source.fail_next(2);
        let alloc = MallocAllocator::with_source(&source);
        assert!(alloc.set_oom_handler(Some(handler)).is_none());

        let p = alloc.allocate(256).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
        unsafe { alloc.deallocate(p, 256) };
    }

    #[test]
    fn test_malloc_retry_limit() {
        fn handler() {}
        let source = CountingSource::new();
        source.fail_after(0);
        let alloc = MallocAllocator::with_source(&source).with_retry_limit(Some(3));
        alloc.set_oom_handler(Some(handler));
        assert!(alloc.allocate(1024).is_err());
        // One initial attempt plus one per handler call.
        assert_eq!(source.refusals(), 4);
    }

    #[test]
    fn test_set_oom_handler_returns_previous() {
        fn first() {}
        fn second() {}
        let alloc = MallocAllocator::new();
        assert!(alloc.set_oom_handler(Some(first)).is_none());
        let prev = alloc.set_oom_handler(Some(second)).unwrap();
        assert_eq!(prev as usize, first as OomHandler as usize);
        assert!(alloc.set_oom_handler(None).is_some());
    }

    #[test]
    fn test_malloc_reallocate() {
        let alloc = MallocAllocator::new();
        let p = alloc.allocate(200).unwrap();
        unsafe {
            p.as_ptr().write_bytes(7, 200);
            let q = alloc.reallocate(p, 200, 400).unwrap();
            assert_eq!(*q.as_ptr().add(199), 7);
            alloc.deallocate(q, 400);
        }
    }
}
