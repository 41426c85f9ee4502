//! Ordered sets over [`RbTree`]
//!
//! [`TreeSet`] stores each key once; [`TreeMultiSet`] stores every inserted key,
//! keeping equivalent keys in insertion order.
//!
//! ```
//! use tinystl::prelude::*;
//!
//! let mut tags: TreeSet<&str> = TreeSet::new();
//! for tag in ["rust", "alloc", "rust", "tree"] {
//!     tags.insert(tag).unwrap();
//! }
//! assert_eq!(tags.iter().copied().collect::<Vec<_>>(), ["alloc", "rust", "tree"]);
//!
//! let mut bag: TreeMultiSet<u8> = [3, 1, 3].into_iter().collect();
//! assert_eq!(bag.count(&3), 2);
//! assert_eq!(bag.remove(&3), 2);
//! ```

use core::fmt;
use core::ops::RangeBounds;

use crate::Allocator;
use crate::collections::rbtree::{self, RbTree};
use crate::compare::{Compare, Identity, Less};
use crate::error::{ContainerResult, oom_abort_container};
use crate::global::Global;

macro_rules! set_common {
    ($set:ident) => {
        impl<T, C: Compare<T>> $set<T, C> {
            /// Empty set on the global pool.
            pub fn new() -> Self
            where
                C: Default,
            {
                Self { tree: RbTree::new() }
            }

            /// Empty set ordered by `compare`, on the global pool.
            pub fn with_compare(compare: C) -> Self {
                Self {
                    tree: RbTree::with_compare(compare),
                }
            }
        }

        impl<T, C: Compare<T>, A: Allocator> $set<T, C, A> {
            /// Empty set on `alloc`.
            pub fn new_in(alloc: A) -> Self
            where
                C: Default,
            {
                Self {
                    tree: RbTree::new_in(alloc),
                }
            }

            /// Number of stored keys.
            pub fn len(&self) -> usize {
                self.tree.len()
            }

            /// Whether the set is empty.
            pub fn is_empty(&self) -> bool {
                self.tree.is_empty()
            }

            /// Whether an equivalent key is stored.
            pub fn contains(&self, key: &T) -> bool {
                self.tree.contains(key)
            }

            /// The first stored key equivalent to `key`.
            pub fn get(&self, key: &T) -> Option<&T> {
                self.tree.get(key)
            }

            /// Number of stored keys equivalent to `key`.
            pub fn count(&self, key: &T) -> usize {
                self.tree.count(key)
            }

            /// The smallest key.
            pub fn first(&self) -> Option<&T> {
                self.tree.first()
            }

            /// The largest key.
            pub fn last(&self) -> Option<&T> {
                self.tree.last()
            }

            /// Remove and return the smallest key.
            pub fn pop_first(&mut self) -> Option<T> {
                self.tree.pop_first()
            }

            /// Remove and return the largest key.
            pub fn pop_last(&mut self) -> Option<T> {
                self.tree.pop_last()
            }

            /// Keys in order.
            pub fn iter(&self) -> rbtree::Iter<'_, T> {
                self.tree.iter()
            }

            /// Keys inside `range`, in order.
            pub fn range<R: RangeBounds<T>>(&self, range: R) -> rbtree::Range<'_, T> {
                self.tree.range(range)
            }

            /// Cursor at the first key not less than `key`.
            pub fn lower_bound(&self, key: &T) -> rbtree::Cursor<'_, T> {
                self.tree.lower_bound(key)
            }

            /// Cursor at the first key greater than `key`.
            pub fn upper_bound(&self, key: &T) -> rbtree::Cursor<'_, T> {
                self.tree.upper_bound(key)
            }

            /// Remove the keys inside `range`; returns how many.
            pub fn remove_range<R: RangeBounds<T>>(&mut self, range: R) -> usize {
                self.tree.erase_range(range)
            }

            /// Drop every key.
            pub fn clear(&mut self) {
                self.tree.clear();
            }

            /// Exchange contents with `other`.
            pub fn swap(&mut self, other: &mut Self) {
                self.tree.swap(&mut other.tree);
            }

            /// The underlying tree.
            pub fn as_tree(&self) -> &RbTree<T, Identity, C, A> {
                &self.tree
            }

            /// Deep copy on a clone of the allocator.
            pub fn try_clone(&self) -> ContainerResult<Self>
            where
                T: Clone,
                C: Clone,
                A: Clone,
            {
                Ok(Self {
                    tree: self.tree.try_clone()?,
                })
            }
        }

        impl<T, C: Compare<T> + Default> Default for $set<T, C> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T: Clone, C: Compare<T> + Clone, A: Allocator + Clone> Clone for $set<T, C, A> {
            fn clone(&self) -> Self {
                Self {
                    tree: self.tree.clone(),
                }
            }
        }

        impl<T: PartialEq, C: Compare<T>, A: Allocator> PartialEq for $set<T, C, A> {
            fn eq(&self, other: &Self) -> bool {
                self.tree == other.tree
            }
        }

        impl<T: Eq, C: Compare<T>, A: Allocator> Eq for $set<T, C, A> {}

        impl<T: fmt::Debug, C: Compare<T>, A: Allocator> fmt::Debug for $set<T, C, A> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set().entries(self.iter()).finish()
            }
        }

        impl<T, C: Compare<T>, A: Allocator> Extend<T> for $set<T, C, A> {
            fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
                for key in iter {
                    if let Err(err) = self.insert(key) {
                        oom_abort_container(err);
                    }
                }
            }
        }

        impl<T, C: Compare<T> + Default> FromIterator<T> for $set<T, C> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut set = Self::new();
                set.extend(iter);
                set
            }
        }

        impl<T, C: Compare<T>, A: Allocator> IntoIterator for $set<T, C, A> {
            type Item = T;
            type IntoIter = rbtree::IntoIter<T, Identity, C, A>;

            fn into_iter(self) -> Self::IntoIter {
                self.tree.into_iter()
            }
        }

        impl<'a, T, C: Compare<T>, A: Allocator> IntoIterator for &'a $set<T, C, A> {
            type Item = &'a T;
            type IntoIter = rbtree::Iter<'a, T>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }
    };
}

/// Ordered set of unique keys.
pub struct TreeSet<T, C: Compare<T> = Less, A: Allocator = Global> {
    tree: RbTree<T, Identity, C, A>,
}

set_common!(TreeSet);

impl<T, C: Compare<T>, A: Allocator> TreeSet<T, C, A> {
    /// Insert `key` unless an equivalent key is stored.
    ///
    /// # Returns
    /// * `Ok(true)` - The key was inserted
    /// * `Ok(false)` - An equivalent key was already stored
    /// * `Err(ContainerError::Alloc)` - No node could be allocated
    pub fn insert(&mut self, key: T) -> ContainerResult<bool> {
        Ok(self.tree.insert_unique(key)?.1)
    }

    /// Remove the key equivalent to `key`.
    pub fn remove(&mut self, key: &T) -> bool {
        self.tree.remove(key).is_some()
    }

    /// Remove and return the key equivalent to `key`.
    pub fn take(&mut self, key: &T) -> Option<T> {
        self.tree.remove(key)
    }
}

/// Ordered multiset.
pub struct TreeMultiSet<T, C: Compare<T> = Less, A: Allocator = Global> {
    tree: RbTree<T, Identity, C, A>,
}

set_common!(TreeMultiSet);

impl<T, C: Compare<T>, A: Allocator> TreeMultiSet<T, C, A> {
    /// Insert `key` after every equivalent key.
    pub fn insert(&mut self, key: T) -> ContainerResult<()> {
        self.tree.insert_equal(key)?;
        Ok(())
    }

    /// Remove every key equivalent to `key`; returns how many.
    pub fn remove(&mut self, key: &T) -> usize {
        self.tree.erase_key(key)
    }

    /// Remove one key equivalent to `key`.
    pub fn remove_one(&mut self, key: &T) -> bool {
        self.tree.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrackingAllocator;
    use crate::backend::pool::PoolAllocator;
    use crate::compare::Greater;
    use std::vec::Vec;

    #[test]
    fn test_set_basics() {
        let mut set: TreeSet<i32> = TreeSet::new();
        assert!(set.insert(3).unwrap());
        assert!(set.insert(1).unwrap());
        assert!(!set.insert(3).unwrap());
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert_eq!(set.count(&3), 1);
        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert_eq!(set.take(&3), Some(3));
        assert!(set.is_empty());
    }

    #[test]
    fn test_bounds_and_ranges() {
        let set: TreeSet<i32> = (0..100).step_by(10).collect();
        assert_eq!(set.lower_bound(&35).get(), Some(&40));
        assert_eq!(set.upper_bound(&40).get(), Some(&50));
        assert_eq!(set.range(20..50).copied().collect::<Vec<_>>(), [20, 30, 40]);
        assert_eq!(set.first(), Some(&0));
        assert_eq!(set.last(), Some(&90));
    }

    #[test]
    fn test_multiset() {
        let mut bag: TreeMultiSet<i32, Greater> = TreeMultiSet::new();
        bag.extend([2, 5, 2, 7, 2]);
        assert_eq!(bag.iter().copied().collect::<Vec<_>>(), [7, 5, 2, 2, 2]);
        assert!(bag.remove_one(&2));
        assert_eq!(bag.count(&2), 2);
        assert_eq!(bag.remove(&2), 2);
        assert_eq!(bag.len(), 2);
        assert!(bag.as_tree().verify().is_ok());
    }

    #[test]
    fn test_set_on_scoped_pool() {
        let alloc = TrackingAllocator::new(PoolAllocator::new());
        {
            let mut set = TreeSet::<u64, Less, _>::new_in(&alloc);
            for key in 0..64 {
                set.insert(key * 3).unwrap();
            }
            let copy = set.try_clone().unwrap();
            assert_eq!(copy, set);
            assert_eq!(alloc.live_blocks(), 128);
            assert_eq!(set.remove_range(..30), 10);
        }
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn test_debug_and_into_iter() {
        let set: TreeSet<char> = "hello".chars().collect();
        assert_eq!(std::format!("{:?}", set), "{'e', 'h', 'l', 'o'}");
        assert_eq!(set.into_iter().rev().collect::<Vec<_>>(), ['o', 'l', 'h', 'e']);
    }
}
