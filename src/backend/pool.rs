//! Second tier: size-classed free lists refilled from a bump-pointer chunk pool.
//!
//! Requests up to [`MAX_BYTES`] are rounded up to a multiple of [`ALIGN`] and served
//! from one of [`NFREELISTS`] intrusive free lists. An empty list is refilled with a
//! batch of blocks carved from the front of the current chunk. When the chunk cannot
//! supply even one block, its remainder is donated to the matching free list and a new
//! chunk is requested from the first tier. If the first tier refuses, a block from a
//! larger size class becomes the new pool before the out-of-memory path is taken.
//!
//! Chunks are never returned during steady-state operation. They are threaded on an
//! intrusive list and handed back to the block source when the pool is dropped.

use core::cell::Cell;
use core::ptr::{self, NonNull};

use super::config::PoolConfig;
use super::malloc::{MallocAllocator, OomHandler};
use super::source::{BlockSource, System};
use crate::error::AllocError;
use crate::{ALIGN, Allocator, MAX_BYTES, NFREELISTS, freelist_index, round_up};

/// A free block: while on a list, its first word links to the next free block.
#[repr(C)]
struct FreeBlock {
    next: *mut FreeBlock,
}

/// Prefix of every chunk obtained from the first tier.
#[repr(C)]
struct ChunkHeader {
    next: *mut ChunkHeader,
    // Total bytes obtained, header included.
    size: usize,
}

const CHUNK_HEADER: usize = round_up(size_of::<ChunkHeader>());

/// Counters describing pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Chunks obtained from the first tier.
    pub chunk_requests: usize,
    /// Bytes of chunk memory obtained so far, headers excluded.
    pub heap_size: usize,
    /// Times a larger free block was recycled as the chunk pool.
    pub salvaged_blocks: usize,
    /// Requests above [`MAX_BYTES`] passed to the first tier.
    pub large_allocations: usize,
}

/// Pooled second-tier allocator.
///
/// Not thread-safe; wrap it in a lock (as [`Global`](crate::prelude::Global) does) to
/// share it between threads.
pub struct PoolAllocator<S: BlockSource = System> {
    malloc: MallocAllocator<S>,
    free_lists: [Cell<*mut FreeBlock>; NFREELISTS],
    start_free: Cell<*mut u8>,
    end_free: Cell<*mut u8>,
    heap_size: Cell<usize>,
    chunks: Cell<*mut ChunkHeader>,
    refill_batch: usize,
    chunk_requests: Cell<usize>,
    salvaged_blocks: Cell<usize>,
    large_allocations: Cell<usize>,
}

// The pool exclusively owns its chunks; the raw pointers never alias another pool.
unsafe impl<S: BlockSource + Send> Send for PoolAllocator<S> {}

impl PoolAllocator<System> {
    /// Pool over the process allocator with the default configuration.
    pub const fn new() -> Self {
        Self::with_source_and_config(System, PoolConfig::DEFAULT)
    }

    /// Pool over the process allocator.
    pub const fn with_config(config: PoolConfig) -> Self {
        Self::with_source_and_config(System, config)
    }
}

impl Default for PoolAllocator<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BlockSource> PoolAllocator<S> {
    /// Pool over a custom block source with the default configuration.
    pub const fn with_source(source: S) -> Self {
        Self::with_source_and_config(source, PoolConfig::DEFAULT)
    }

    /// Pool over a custom block source.
    pub const fn with_source_and_config(source: S, config: PoolConfig) -> Self {
        let mut malloc = MallocAllocator::with_source(source);
        malloc.set_retry_limit(config.oom_retry_limit);
        Self {
            malloc,
            free_lists: [const { Cell::new(ptr::null_mut()) }; NFREELISTS],
            start_free: Cell::new(ptr::null_mut()),
            end_free: Cell::new(ptr::null_mut()),
            heap_size: Cell::new(0),
            chunks: Cell::new(ptr::null_mut()),
            refill_batch: if config.refill_batch == 0 { 1 } else { config.refill_batch },
            chunk_requests: Cell::new(0),
            salvaged_blocks: Cell::new(0),
            large_allocations: Cell::new(0),
        }
    }

    /// Apply a new configuration. Blocks already pooled are kept.
    pub fn configure(&mut self, config: PoolConfig) {
        self.refill_batch = config.refill_batch.max(1);
        self.malloc.set_retry_limit(config.oom_retry_limit);
    }

    /// Install the first tier's out-of-memory handler, returning the previous one.
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.malloc.set_oom_handler(handler)
    }

    /// The first tier beneath this pool.
    pub fn first_tier(&self) -> &MallocAllocator<S> {
        &self.malloc
    }

    /// Activity counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            chunk_requests: self.chunk_requests.get(),
            heap_size: self.heap_size.get(),
            salvaged_blocks: self.salvaged_blocks.get(),
            large_allocations: self.large_allocations.get(),
        }
    }

    /// Bytes left in the current chunk pool.
    pub fn pool_remaining(&self) -> usize {
        self.end_free.get() as usize - self.start_free.get() as usize
    }

    /// Number of free blocks in the size class serving `size` bytes.
    ///
    /// Walks the list, so this is O(n). Returns 0 for sizes above [`MAX_BYTES`].
    pub fn free_list_len(&self, size: usize) -> usize {
        if size > MAX_BYTES {
            return 0;
        }
        let mut count = 0;
        let mut block = self.free_lists[freelist_index(size.max(1))].get();
        while !block.is_null() {
            count += 1;
            block = unsafe { (*block).next };
        }
        count
    }

    fn push_free(&self, block: *mut u8, size: usize) {
        let list = &self.free_lists[freelist_index(size)];
        let block = block.cast::<FreeBlock>();
        unsafe { block.write(FreeBlock { next: list.get() }) };
        list.set(block);
    }

    fn pop_free(&self, size: usize) -> Option<NonNull<u8>> {
        let list = &self.free_lists[freelist_index(size)];
        let block = NonNull::new(list.get())?;
        list.set(unsafe { (*block.as_ptr()).next });
        Some(block.cast())
    }

    /// Return one block of `size` bytes and thread the rest of a fresh batch onto its list.
    fn refill(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let mut nobjs = self.refill_batch;
        let chunk = self.chunk_alloc(size, &mut nobjs)?;
        tracing::debug!(size, blocks = nobjs, "refilled size class");
        if nobjs == 1 {
            return Ok(chunk);
        }

        let base = chunk.as_ptr();
        let list = &self.free_lists[freelist_index(size)];
        unsafe {
            let mut current = base.add(size).cast::<FreeBlock>();
            list.set(current);
            for i in 2..nobjs {
                let next = base.add(i * size).cast::<FreeBlock>();
                current.write(FreeBlock { next });
                current = next;
            }
            current.write(FreeBlock {
                next: ptr::null_mut(),
            });
        }
        Ok(chunk)
    }

    /// Carve up to `nobjs` blocks of `size` bytes from the chunk pool.
    ///
    /// On return `nobjs` holds the number of blocks actually carved (at least one).
    fn chunk_alloc(&self, size: usize, nobjs: &mut usize) -> Result<NonNull<u8>, AllocError> {
        loop {
            let start = self.start_free.get();
            let left = self.pool_remaining();
            let total = size * *nobjs;

            if left >= size {
                if left < total {
                    *nobjs = left / size;
                }
                self.start_free.set(unsafe { start.add(size * *nobjs) });
                return NonNull::new(start).ok_or(AllocError::OutOfMemory { size });
            }

            // Not even one block left: keep the remainder, then grow.
            if left > 0 {
                self.push_free(start, left);
            }
            self.start_free.set(ptr::null_mut());
            self.end_free.set(ptr::null_mut());

            let bytes_to_get = 2 * total + round_up(self.heap_size.get() >> 4);
            let request = bytes_to_get + CHUNK_HEADER;
            let raw = match self.malloc.try_allocate(request) {
                Some(raw) => raw,
                None => {
                    if self.salvage(size) {
                        continue;
                    }
                    self.malloc.allocate(request)?
                }
            };
            self.install_chunk(raw, bytes_to_get);
        }
    }

    /// Recycle a free block of at least `size` bytes as the chunk pool.
    fn salvage(&self, size: usize) -> bool {
        let mut candidate = size;
        while candidate <= MAX_BYTES {
            if let Some(block) = self.pop_free(candidate) {
                let start = block.as_ptr();
                self.start_free.set(start);
                self.end_free.set(unsafe { start.add(candidate) });
                self.salvaged_blocks.set(self.salvaged_blocks.get() + 1);
                tracing::warn!(size, donor = candidate, "first tier refused chunk, salvaged free block");
                return true;
            }
            candidate += ALIGN;
        }
        false
    }

    fn install_chunk(&self, raw: NonNull<u8>, bytes: usize) {
        let header = raw.as_ptr().cast::<ChunkHeader>();
        unsafe {
            header.write(ChunkHeader {
                next: self.chunks.get(),
                size: bytes + CHUNK_HEADER,
            });
        }
        self.chunks.set(header);

        let start = unsafe { raw.as_ptr().add(CHUNK_HEADER) };
        self.start_free.set(start);
        self.end_free.set(unsafe { start.add(bytes) });
        self.heap_size.set(self.heap_size.get() + bytes);
        self.chunk_requests.set(self.chunk_requests.get() + 1);
        tracing::debug!(bytes, heap_size = self.heap_size.get(), "installed new chunk");
    }
}

impl<S: BlockSource> Allocator for PoolAllocator<S> {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        if size > MAX_BYTES {
            self.large_allocations.set(self.large_allocations.get() + 1);
            return self.malloc.allocate(size);
        }
        let size = round_up(size.max(1));
        match self.pop_free(size) {
            Some(block) => Ok(block),
            None => self.refill(size),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        if size > MAX_BYTES {
            return unsafe { self.malloc.deallocate(ptr, size) };
        }
        self.push_free(ptr.as_ptr(), round_up(size.max(1)));
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old_size > MAX_BYTES && new_size > MAX_BYTES {
            return unsafe { self.malloc.reallocate(ptr, old_size, new_size) };
        }
        if round_up(old_size.max(1)) == round_up(new_size.max(1)) {
            return Ok(ptr);
        }
        let fresh = self.allocate(new_size)?;
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_size.min(new_size));
            self.deallocate(ptr, old_size);
        }
        Ok(fresh)
    }
}

impl<S: BlockSource> Drop for PoolAllocator<S> {
    fn drop(&mut self) {
        let mut chunk = self.chunks.replace(ptr::null_mut());
        while let Some(header) = NonNull::new(chunk) {
            let ChunkHeader { next, size } = unsafe { header.as_ptr().read() };
            unsafe { self.malloc.deallocate(header.cast(), size) };
            chunk = next;
        }
    }
}
