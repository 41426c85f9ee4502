//! Ordered maps over [`RbTree`]
//!
//! [`TreeMap`] keeps one value per key; [`TreeMultiMap`] keeps every inserted
//! pair, grouping equivalent keys in insertion order. Inserting never overwrites
//! a stored value.
//!
//! ```
//! use tinystl::prelude::*;
//!
//! let mut scores: TreeMap<&str, u32> = TreeMap::new();
//! scores.insert("ada", 3).unwrap();
//! assert!(!scores.insert("ada", 9).unwrap());
//! *scores.get_or_insert_default("bob").unwrap() += 2;
//!
//! assert_eq!(scores.at(&"ada"), Ok(&3));
//! assert_eq!(scores.at(&"eve"), Err(ContainerError::KeyNotFound));
//! assert_eq!(scores.iter().collect::<Vec<_>>(), [(&"ada", &3), (&"bob", &2)]);
//! ```

use core::fmt;
use core::iter::FusedIterator;
use core::ops::RangeBounds;

use crate::Allocator;
use crate::collections::rbtree::{self, RbTree};
use crate::compare::{Compare, First, Less};
use crate::error::{ContainerError, ContainerResult, oom_abort_container};
use crate::global::Global;

/// Iterator over `(&K, &T)` pairs in key order.
pub struct Iter<'a, K, T> {
    inner: rbtree::Iter<'a, (K, T)>,
}

impl<'a, K, T> Iterator for Iter<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, T> DoubleEndedIterator for Iter<'_, K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, T> ExactSizeIterator for Iter<'_, K, T> {}
impl<K, T> FusedIterator for Iter<'_, K, T> {}

/// Iterator over `(&K, &mut T)` pairs in key order.
pub struct IterMut<'a, K, T> {
    inner: rbtree::IterMut<'a, (K, T)>,
}

impl<'a, K, T> Iterator for IterMut<'a, K, T> {
    type Item = (&'a K, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, T> DoubleEndedIterator for IterMut<'_, K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (&*k, v))
    }
}

impl<K, T> ExactSizeIterator for IterMut<'_, K, T> {}
impl<K, T> FusedIterator for IterMut<'_, K, T> {}

/// Iterator over the pairs whose keys fall inside a range.
pub struct Range<'a, K, T> {
    inner: rbtree::Range<'a, (K, T)>,
}

impl<'a, K, T> Iterator for Range<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }
}

impl<K, T> DoubleEndedIterator for Range<'_, K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, T> FusedIterator for Range<'_, K, T> {}

macro_rules! map_common {
    ($map:ident) => {
        impl<K, T, C> $map<K, T, C>
        where
            C: Compare<K>,
        {
            /// Empty map on the global pool.
            pub fn new() -> Self
            where
                C: Default,
            {
                Self { tree: RbTree::new() }
            }

            /// Empty map ordered by `compare`, on the global pool.
            pub fn with_compare(compare: C) -> Self {
                Self {
                    tree: RbTree::with_compare(compare),
                }
            }
        }

        impl<K, T, C, A> $map<K, T, C, A>
        where
            C: Compare<K>,
            A: Allocator,
        {
            /// Empty map on `alloc`.
            pub fn new_in(alloc: A) -> Self
            where
                C: Default,
            {
                Self {
                    tree: RbTree::new_in(alloc),
                }
            }

            /// Number of stored pairs.
            pub fn len(&self) -> usize {
                self.tree.len()
            }

            /// Whether the map is empty.
            pub fn is_empty(&self) -> bool {
                self.tree.is_empty()
            }

            /// Whether `key` is stored.
            pub fn contains_key(&self, key: &K) -> bool {
                self.tree.contains(key)
            }

            /// Number of pairs stored under `key`.
            pub fn count(&self, key: &K) -> usize {
                self.tree.count(key)
            }

            /// The value of the first pair stored under `key`.
            pub fn get(&self, key: &K) -> Option<&T> {
                self.tree.get(key).map(|(_, v)| v)
            }

            /// Mutable value of the first pair stored under `key`.
            pub fn get_mut(&mut self, key: &K) -> Option<&mut T> {
                self.tree.get_mut(key).map(|(_, v)| v)
            }

            /// Bounds-checked lookup.
            ///
            /// # Returns
            /// * `Ok(&T)` - The value stored under `key`
            /// * `Err(ContainerError::KeyNotFound)` - `key` is not stored
            pub fn at(&self, key: &K) -> ContainerResult<&T> {
                self.get(key).ok_or(ContainerError::KeyNotFound)
            }

            /// Bounds-checked mutable lookup.
            pub fn at_mut(&mut self, key: &K) -> ContainerResult<&mut T> {
                self.get_mut(key).ok_or(ContainerError::KeyNotFound)
            }

            /// Pair with the smallest key.
            pub fn first(&self) -> Option<(&K, &T)> {
                self.tree.first().map(|(k, v)| (k, v))
            }

            /// Pair with the largest key.
            pub fn last(&self) -> Option<(&K, &T)> {
                self.tree.last().map(|(k, v)| (k, v))
            }

            /// Remove and return the pair with the smallest key.
            pub fn pop_first(&mut self) -> Option<(K, T)> {
                self.tree.pop_first()
            }

            /// Remove and return the pair with the largest key.
            pub fn pop_last(&mut self) -> Option<(K, T)> {
                self.tree.pop_last()
            }

            /// Pairs in key order.
            pub fn iter(&self) -> Iter<'_, K, T> {
                Iter { inner: self.tree.iter() }
            }

            /// Pairs in key order with mutable values.
            pub fn iter_mut(&mut self) -> IterMut<'_, K, T> {
                IterMut {
                    inner: self.tree.iter_mut(),
                }
            }

            /// Keys in order.
            pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
                self.tree.iter().map(|(k, _)| k)
            }

            /// Values in key order.
            pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
                self.tree.iter().map(|(_, v)| v)
            }

            /// Pairs whose keys fall inside `range`.
            pub fn range<R: RangeBounds<K>>(&self, range: R) -> Range<'_, K, T> {
                Range {
                    inner: self.tree.range(range),
                }
            }

            /// Remove the pairs whose keys fall inside `range`; returns how many.
            pub fn remove_range<R: RangeBounds<K>>(&mut self, range: R) -> usize {
                self.tree.erase_range(range)
            }

            /// Drop every pair.
            pub fn clear(&mut self) {
                self.tree.clear();
            }

            /// Exchange contents with `other`.
            pub fn swap(&mut self, other: &mut Self) {
                self.tree.swap(&mut other.tree);
            }

            /// The underlying tree.
            pub fn as_tree(&self) -> &RbTree<(K, T), First, C, A> {
                &self.tree
            }

            /// Deep copy on a clone of the allocator.
            pub fn try_clone(&self) -> ContainerResult<Self>
            where
                K: Clone,
                T: Clone,
                C: Clone,
                A: Clone,
            {
                Ok(Self {
                    tree: self.tree.try_clone()?,
                })
            }
        }

        impl<K, T, C: Compare<K> + Default> Default for $map<K, T, C> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<K: Clone, T: Clone, C: Compare<K> + Clone, A: Allocator + Clone> Clone for $map<K, T, C, A> {
            fn clone(&self) -> Self {
                Self {
                    tree: self.tree.clone(),
                }
            }
        }

        impl<K: PartialEq, T: PartialEq, C: Compare<K>, A: Allocator> PartialEq for $map<K, T, C, A> {
            fn eq(&self, other: &Self) -> bool {
                self.tree == other.tree
            }
        }

        impl<K: Eq, T: Eq, C: Compare<K>, A: Allocator> Eq for $map<K, T, C, A> {}

        impl<K: fmt::Debug, T: fmt::Debug, C: Compare<K>, A: Allocator> fmt::Debug for $map<K, T, C, A> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map().entries(self.iter()).finish()
            }
        }

        impl<K, T, C: Compare<K>, A: Allocator> Extend<(K, T)> for $map<K, T, C, A> {
            fn extend<I: IntoIterator<Item = (K, T)>>(&mut self, iter: I) {
                for (key, value) in iter {
                    if let Err(err) = self.insert(key, value) {
                        oom_abort_container(err);
                    }
                }
            }
        }

        impl<K, T, C: Compare<K> + Default> FromIterator<(K, T)> for $map<K, T, C> {
            fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
                let mut map = Self::new();
                map.extend(iter);
                map
            }
        }

        impl<K, T, C: Compare<K>, A: Allocator> IntoIterator for $map<K, T, C, A> {
            type Item = (K, T);
            type IntoIter = rbtree::IntoIter<(K, T), First, C, A>;

            fn into_iter(self) -> Self::IntoIter {
                self.tree.into_iter()
            }
        }

        impl<'a, K, T, C: Compare<K>, A: Allocator> IntoIterator for &'a $map<K, T, C, A> {
            type Item = (&'a K, &'a T);
            type IntoIter = Iter<'a, K, T>;

            fn into_iter(self) -> Iter<'a, K, T> {
                self.iter()
            }
        }
    };
}

/// Ordered map with unique keys.
pub struct TreeMap<K, T, C: Compare<K> = Less, A: Allocator = Global> {
    tree: RbTree<(K, T), First, C, A>,
}

map_common!(TreeMap);

impl<K, T, C: Compare<K>, A: Allocator> TreeMap<K, T, C, A> {
    /// Insert `value` under `key` unless the key is already stored.
    ///
    /// An existing value is never overwritten.
    ///
    /// # Returns
    /// * `Ok(true)` - The pair was inserted
    /// * `Ok(false)` - `key` was already stored; the pair is dropped
    /// * `Err(ContainerError::Alloc)` - No node could be allocated
    pub fn insert(&mut self, key: K, value: T) -> ContainerResult<bool> {
        Ok(self.tree.insert_unique((key, value))?.1)
    }

    /// The value under `key`, inserting one built by `make` when missing.
    pub fn get_or_insert_with<F: FnOnce() -> T>(&mut self, key: K, make: F) -> ContainerResult<&mut T> {
        let pair = self.tree.get_or_insert_with(key, |key| (key, make()))?;
        Ok(&mut pair.1)
    }

    /// The value under `key`, inserting `T::default()` when missing.
    pub fn get_or_insert_default(&mut self, key: K) -> ContainerResult<&mut T>
    where
        T: Default,
    {
        self.get_or_insert_with(key, T::default)
    }

    /// Remove `key` and return its value.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.tree.remove(key).map(|(_, v)| v)
    }
}

/// Ordered map keeping every inserted pair.
pub struct TreeMultiMap<K, T, C: Compare<K> = Less, A: Allocator = Global> {
    tree: RbTree<(K, T), First, C, A>,
}

map_common!(TreeMultiMap);

impl<K, T, C: Compare<K>, A: Allocator> TreeMultiMap<K, T, C, A> {
    /// Insert the pair after every pair with an equivalent key.
    pub fn insert(&mut self, key: K, value: T) -> ContainerResult<()> {
        self.tree.insert_equal((key, value))?;
        Ok(())
    }

    /// Values stored under `key`, in insertion order.
    pub fn get_all(&self, key: &K) -> impl DoubleEndedIterator<Item = &T> {
        let (first, last) = self.tree.equal_range(key);
        crate::iter::CursorRange::new(first, last).map(|(_, v)| v)
    }

    /// Remove every pair stored under `key`; returns how many.
    pub fn remove(&mut self, key: &K) -> usize {
        self.tree.erase_key(key)
    }
}
