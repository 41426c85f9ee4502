//! Prelude module for convenient imports
//!
//! This is the **only public API** for TinySTL. All items should be accessed through:
//! ```
//! use tinystl::prelude::*;
//! ```
//!
//! Container-specific cursor and iterator types share short names, so they are
//! exported with a container prefix (`DequeCursor`, `TreeIter`, ...).

pub use crate::{ALIGN, Allocator, MAX_BYTES, NFREELISTS, freelist_index, round_up, version};

pub use crate::error::{AllocError, ContainerError, ContainerResult, RbViolation};

pub use crate::backend::config::PoolConfig;
pub use crate::backend::malloc::{MallocAllocator, OomHandler};
pub use crate::backend::pool::{PoolAllocator, PoolStats};
pub use crate::backend::source::{BlockSource, System};

pub use crate::global::{
    Global, configure_global_pool, global_pool_stats, set_global_oom_handler, with_global_pool,
};

pub use crate::construct::{
    allocate_array, allocate_one, construct, deallocate_array, deallocate_one, destroy, destroy_slice,
};

pub use crate::iter::{
    BidirectionalCursor, Category, CursorRange, ForwardCursor, RandomAccessCursor, advance, category_of,
    distance, next, prev,
};

pub use crate::compare::{Compare, First, Greater, Identity, KeyOfValue, Less};

pub use crate::collections::deque::{
    Cursor as DequeCursor, Deque, IntoIter as DequeIntoIter, Iter as DequeIter, IterMut as DequeIterMut,
};

pub use crate::collections::rbtree::{
    Cursor as TreeCursor, CursorMut as TreeCursorMut, IntoIter as TreeIntoIter, Iter as TreeIter,
    Range as TreeRange, RbTree,
};

#[cfg(feature = "tree-collections")]
pub use crate::collections::map::{
    Iter as MapIter, IterMut as MapIterMut, Range as MapRange, TreeMap, TreeMultiMap,
};

#[cfg(feature = "tree-collections")]
pub use crate::collections::set::{TreeMultiSet, TreeSet};
