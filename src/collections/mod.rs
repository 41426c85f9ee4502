//! Containers built on the allocator tiers.

pub mod deque;
pub mod rbtree;

#[cfg(feature = "tree-collections")]
pub mod map;
#[cfg(feature = "tree-collections")]
pub mod set;
