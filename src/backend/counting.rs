#![cfg(test)]

//! Instrumented test doubles for the allocator seams.

use core::cell::Cell;
use core::ptr::NonNull;

use super::source::{BlockSource, System};
use crate::Allocator;
use crate::error::AllocError;

/// Block source that counts system requests and can refuse them on demand.
pub struct CountingSource {
    requests: Cell<usize>,
    refusals: Cell<usize>,
    live_bytes: Cell<usize>,
    live_blocks: Cell<usize>,
    // Successful requests still allowed before every request is refused.
    budget: Cell<Option<usize>>,
    // Requests to refuse before serving again.
    refuse_next: Cell<usize>,
}

impl CountingSource {
    pub const fn new() -> Self {
        Self {
            requests: Cell::new(0),
            refusals: Cell::new(0),
            live_bytes: Cell::new(0),
            live_blocks: Cell::new(0),
            budget: Cell::new(None),
            refuse_next: Cell::new(0),
        }
    }

    /// Successful allocations and reallocations served so far.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    pub fn refusals(&self) -> usize {
        self.refusals.get()
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks.get()
    }

    /// Serve `n` more requests, then refuse everything.
    pub fn fail_after(&self, n: usize) {
        self.budget.set(Some(n));
    }

    /// Refuse the next `n` requests, then serve normally.
    pub fn fail_next(&self, n: usize) {
        self.refuse_next.set(n);
    }

    pub fn heal(&self) {
        self.budget.set(None);
        self.refuse_next.set(0);
    }

    fn admit(&self) -> bool {
        if self.refuse_next.get() > 0 {
            self.refuse_next.set(self.refuse_next.get() - 1);
            self.refusals.set(self.refusals.get() + 1);
            return false;
        }
        match self.budget.get() {
            Some(0) => {
                self.refusals.set(self.refusals.get() + 1);
                false
            }
            Some(n) => {
                self.budget.set(Some(n - 1));
                true
            }
            None => true,
        }
    }
}

impl BlockSource for CountingSource {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        let ptr = System.allocate(size)?;
        self.requests.set(self.requests.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + size);
        self.live_blocks.set(self.live_blocks.get() + 1);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.live_bytes.set(self.live_bytes.get() - size);
        self.live_blocks.set(self.live_blocks.get() - 1);
        unsafe { System.deallocate(ptr, size) }
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        let ptr = unsafe { System.reallocate(ptr, old_size, new_size)? };
        self.requests.set(self.requests.get() + 1);
        self.live_bytes.set(self.live_bytes.get() - old_size + new_size);
        Some(ptr)
    }
}

/// Allocator wrapper counting live blocks, with optional failure injection.
pub struct TrackingAllocator<A: Allocator> {
    inner: A,
    live_blocks: Cell<usize>,
    allocations: Cell<usize>,
    budget: Cell<Option<usize>>,
}

impl<A: Allocator> TrackingAllocator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            live_blocks: Cell::new(0),
            allocations: Cell::new(0),
            budget: Cell::new(None),
        }
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks.get()
    }

    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Serve `n` more allocations, then fail every request.
    pub fn fail_after(&self, n: usize) {
        self.budget.set(Some(n));
    }

    pub fn heal(&self) {
        self.budget.set(None);
    }
}

impl<A: Allocator> Allocator for TrackingAllocator<A> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        match self.budget.get() {
            Some(0) => return Err(AllocError::OutOfMemory { size }),
            Some(n) => self.budget.set(Some(n - 1)),
            None => {}
        }
        let ptr = self.inner.allocate(size)?;
        self.allocations.set(self.allocations.get() + 1);
        self.live_blocks.set(self.live_blocks.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.live_blocks.set(self.live_blocks.get() - 1);
        unsafe { self.inner.deallocate(ptr, size) }
    }
}
