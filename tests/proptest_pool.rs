//! Property-based tests for the pooled allocator

use std::ptr::NonNull;

use proptest::prelude::*;
use tinystl::prelude::*;

#[derive(Debug, Clone)]
enum PoolOp {
    Alloc(usize),
    Free(usize),
    Realloc(usize, usize),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        5 => prop_oneof![1usize..=MAX_BYTES, (MAX_BYTES + 1)..1024].prop_map(PoolOp::Alloc),
        3 => any::<usize>().prop_map(PoolOp::Free),
        2 => (any::<usize>(), 1usize..512).prop_map(|(i, s)| PoolOp::Realloc(i, s)),
    ]
}

struct Block {
    ptr: NonNull<u8>,
    size: usize,
    tag: u8,
}

fn fill(block: &Block) {
    unsafe { std::ptr::write_bytes(block.ptr.as_ptr(), block.tag, block.size) };
}

fn intact(block: &Block) -> bool {
    let bytes = unsafe { std::slice::from_raw_parts(block.ptr.as_ptr(), block.size) };
    bytes.iter().all(|&b| b == block.tag)
}

proptest! {
    #[test]
    fn live_blocks_never_overlap(ops in prop::collection::vec(pool_op(), 1..400), batch in 1usize..40) {
        let pool = PoolAllocator::with_config(PoolConfig::default().with_refill_batch(batch));
        let mut live: Vec<Block> = Vec::new();
        let mut tag = 0u8;

        for op in ops {
            match op {
                PoolOp::Alloc(size) => {
                    let ptr = pool.allocate(size).unwrap();
                    prop_assert_eq!(ptr.as_ptr() as usize % ALIGN, 0);
                    tag = tag.wrapping_add(1);
                    let block = Block { ptr, size, tag };
                    fill(&block);
                    live.push(block);
                }
                PoolOp::Free(i) if !live.is_empty() => {
                    let block = live.swap_remove(i % live.len());
                    prop_assert!(intact(&block));
                    unsafe { pool.deallocate(block.ptr, block.size) };
                }
                PoolOp::Realloc(i, new_size) if !live.is_empty() => {
                    let i = i % live.len();
                    let kept = live[i].size.min(new_size);
                    let ptr = unsafe { pool.reallocate(live[i].ptr, live[i].size, new_size).unwrap() };
                    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), kept) };
                    prop_assert!(bytes.iter().all(|&b| b == live[i].tag));
                    live[i].ptr = ptr;
                    live[i].size = new_size;
                    fill(&live[i]);
                }
                _ => {}
            }
        }

        for block in &live {
            prop_assert!(intact(block));
        }
        for block in live {
            unsafe { pool.deallocate(block.ptr, block.size) };
        }
    }

    #[test]
    fn freed_blocks_are_reused(size in 1usize..=MAX_BYTES, count in 1usize..200) {
        let pool = PoolAllocator::new();
        let blocks: Vec<_> = (0..count).map(|_| pool.allocate(size).unwrap()).collect();
        let requests = pool.stats().chunk_requests;
        for &block in &blocks {
            unsafe { pool.deallocate(block, size) };
        }
        prop_assert!(pool.free_list_len(size) >= count);

        let again: Vec<_> = (0..count).map(|_| pool.allocate(size).unwrap()).collect();
        prop_assert_eq!(pool.stats().chunk_requests, requests);
        for block in again {
            unsafe { pool.deallocate(block, size) };
        }
    }

    #[test]
    fn large_requests_bypass_the_pool(sizes in prop::collection::vec((MAX_BYTES + 1)..8192, 1..50)) {
        let pool = PoolAllocator::new();
        for &size in &sizes {
            let block = pool.allocate(size).unwrap();
            unsafe { pool.deallocate(block, size) };
        }
        let stats = pool.stats();
        prop_assert_eq!(stats.large_allocations, sizes.len());
        prop_assert_eq!(stats.chunk_requests, 0);
    }
}
