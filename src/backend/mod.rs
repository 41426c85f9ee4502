//! Allocator backend implementations
//!
//! The first tier passes requests through to a [`BlockSource`](source::BlockSource);
//! the second tier pools small requests in size-classed free lists.

pub mod config;
pub mod malloc;
pub mod pool;
pub mod source;

/// Instrumented test doubles
mod counting;

#[cfg(test)]
pub(crate) use counting::{CountingSource, TrackingAllocator};
