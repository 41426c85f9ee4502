use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use super::RbTree;
use super::node::{Link, predecessor, successor};
use crate::Allocator;
use crate::compare::{Compare, KeyOfValue};

/// In-order iterator over an [`RbTree`].
pub struct Iter<'a, V> {
    front: Link<V>,
    back: Link<V>,
    remaining: usize,
    _marker: PhantomData<&'a V>,
}

// Hands out `&V` only.
unsafe impl<V: Sync> Send for Iter<'_, V> {}
unsafe impl<V: Sync> Sync for Iter<'_, V> {}

impl<V> Iter<'_, V> {
    pub(crate) fn new(front: Link<V>, back: Link<V>, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front?;
        self.remaining -= 1;
        unsafe {
            self.front = successor(node);
            Some(&(*node.as_ptr()).value)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back?;
        self.remaining -= 1;
        unsafe {
            self.back = predecessor(node);
            Some(&(*node.as_ptr()).value)
        }
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// In-order iterator handing out mutable values.
///
/// Only the map wrappers use it, and they expose the mapped part alone so keys
/// cannot be reordered.
pub(crate) struct IterMut<'a, V> {
    front: Link<V>,
    back: Link<V>,
    remaining: usize,
    _marker: PhantomData<&'a mut V>,
}

unsafe impl<V: Send> Send for IterMut<'_, V> {}
unsafe impl<V: Sync> Sync for IterMut<'_, V> {}

impl<V> IterMut<'_, V> {
    pub(crate) fn new(front: Link<V>, back: Link<V>, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front?;
        self.remaining -= 1;
        unsafe {
            self.front = successor(node);
            Some(&mut (*node.as_ptr()).value)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for IterMut<'a, V> {
    fn next_back(&mut self) -> Option<&'a mut V> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back?;
        self.remaining -= 1;
        unsafe {
            self.back = predecessor(node);
            Some(&mut (*node.as_ptr()).value)
        }
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// In-order iterator over the elements between two bounds.
pub struct Range<'a, V> {
    // Inclusive ends; both `None` once exhausted.
    front: Link<V>,
    back: Link<V>,
    _marker: PhantomData<&'a V>,
}

unsafe impl<V: Sync> Send for Range<'_, V> {}
unsafe impl<V: Sync> Sync for Range<'_, V> {}

impl<V> Range<'_, V> {
    /// Range over the half-open node interval `[first, last)`.
    pub(crate) fn new(first: Link<V>, last: Link<V>, rightmost: Link<V>) -> Self {
        if first.is_none() || first == last {
            return Self::empty();
        }
        let back = match last {
            Some(node) => unsafe { predecessor(node) },
            None => rightmost,
        };
        Self {
            front: first,
            back,
            _marker: PhantomData,
        }
    }

    fn empty() -> Self {
        Self {
            front: None,
            back: None,
            _marker: PhantomData,
        }
    }
}

impl<V> Clone for Range<'_, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        let node = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { successor(node) };
        }
        Some(unsafe { &(*node.as_ptr()).value })
    }
}

impl<'a, V> DoubleEndedIterator for Range<'a, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        let node = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { predecessor(node) };
        }
        Some(unsafe { &(*node.as_ptr()).value })
    }
}

impl<V> FusedIterator for Range<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Range<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Owning in-order iterator over an [`RbTree`].
pub struct IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    tree: RbTree<V, X, C, A>,
}

impl<V, X, C, A> IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    pub(crate) fn new(tree: RbTree<V, X, C, A>) -> Self {
        Self { tree }
    }
}

impl<V, X, C, A> Iterator for IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<V, X, C, A> DoubleEndedIterator for IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    fn next_back(&mut self) -> Option<V> {
        self.tree.pop_last()
    }
}

impl<V, X, C, A> ExactSizeIterator for IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
}

impl<V, X, C, A> FusedIterator for IntoIter<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
}
