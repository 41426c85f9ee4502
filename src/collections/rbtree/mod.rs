//! Red-black tree
//!
//! `RbTree` is the ordered engine behind the map and set collections. It stores
//! values of type `V` ordered by a key extracted with a [`KeyOfValue`] and compared
//! with a [`Compare`]. Both unique-key and equal-key insertion are supported on
//! the same tree; the wrappers pick one discipline each.
//!
//! Nodes come from the tree's [`Allocator`] one at a time. The tree caches its
//! leftmost and rightmost nodes, so `first`, `last` and cursor wrap-around from
//! the ghost position are O(1).
//!
//! # Examples
//!
//! ```
//! use tinystl::prelude::*;
//!
//! let mut tree: RbTree<i32> = RbTree::new();
//! for key in [5, 3, 8, 1, 4, 7, 9] {
//!     tree.insert_unique(key).unwrap();
//! }
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 3, 4, 5, 7, 8, 9]);
//!
//! assert_eq!(tree.erase_key(&5), 1);
//! assert_eq!(tree.lower_bound(&5).get(), Some(&7));
//! assert!(tree.verify().is_ok());
//! ```

#[macro_use]
mod node;
mod cursor;
mod iter;

use core::borrow::Borrow;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Bound, RangeBounds};
use core::ptr::{self, NonNull};

pub use cursor::{Cursor, CursorMut};
pub(crate) use iter::IterMut;
pub use iter::{IntoIter, Iter, Range};
use node::{Color, Link, Node, erase_rebalance, insert_rebalance, maximum, minimum, predecessor, successor};
use scopeguard::ScopeGuard;

use crate::compare::{Compare, Identity, KeyOfValue, Less};
use crate::construct::{allocate_one, construct, deallocate_one, destroy};
use crate::error::{AllocError, ContainerResult, RbViolation, oom_abort_container};
use crate::global::Global;
use crate::{ALIGN, Allocator};

/// Red-black tree ordered by `C` over keys extracted by `X`.
pub struct RbTree<V, X: KeyOfValue<V> = Identity, C: Compare<X::Key> = Less, A: Allocator = Global> {
    root: Link<V>,
    leftmost: Link<V>,
    rightmost: Link<V>,
    len: usize,
    compare: C,
    alloc: A,
    _marker: PhantomData<(V, fn() -> X)>,
}

unsafe impl<V: Send, X: KeyOfValue<V>, C: Compare<X::Key> + Send, A: Allocator + Send> Send for RbTree<V, X, C, A> {}
unsafe impl<V: Sync, X: KeyOfValue<V>, C: Compare<X::Key> + Sync, A: Allocator + Sync> Sync for RbTree<V, X, C, A> {}

impl<V, X, C> RbTree<V, X, C>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
{
    /// Empty tree on the global pool.
    pub fn new() -> Self
    where
        C: Default,
    {
        Self::with_compare_in(C::default(), Global)
    }

    /// Empty tree ordered by `compare`, on the global pool.
    pub fn with_compare(compare: C) -> Self {
        Self::with_compare_in(compare, Global)
    }
}

impl<V, X, C> Default for RbTree<V, X, C>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

// Unlink-free teardown of a detached subtree.
unsafe fn free_subtree<V, A: Allocator>(alloc: &A, mut x: Link<V>) {
    while let Some(node) = x {
        unsafe {
            free_subtree(alloc, n!(node).right);
            x = n!(node).left;
            destroy(node.as_ptr());
            deallocate_one(alloc, node);
        }
    }
}

// Copy one node's value and color; links are left empty.
unsafe fn clone_node<V: Clone, A: Allocator>(alloc: &A, src: NonNull<Node<V>>) -> Result<NonNull<Node<V>>, AllocError> {
    unsafe {
        let value = n!(src).value.clone();
        let node = allocate_one::<Node<V>, _>(alloc)?;
        construct(
            node.as_ptr(),
            Node {
                color: n!(src).color,
                ..Node::new(value)
            },
        );
        Ok(node)
    }
}

/// Structural copy of the subtree under `src`.
///
/// Right subtrees recurse and left spines are walked in a loop, so recursion
/// depth follows the tree height. On failure everything copied so far is freed.
unsafe fn copy_subtree<V: Clone, A: Allocator>(
    alloc: &A,
    src: NonNull<Node<V>>,
    parent: Link<V>,
) -> Result<NonNull<Node<V>>, AllocError> {
    unsafe {
        let top = clone_node(alloc, src)?;
        n!(top).parent = parent;
        let top = scopeguard::guard(top, |top| free_subtree(alloc, Some(top)));

        if let Some(right) = n!(src).right {
            n!(*top).right = Some(copy_subtree(alloc, right, Some(*top))?);
        }
        let mut p = *top;
        let mut x = n!(src).left;
        while let Some(src) = x {
            let y = clone_node(alloc, src)?;
            n!(p).left = Some(y);
            n!(y).parent = Some(p);
            if let Some(right) = n!(src).right {
                n!(y).right = Some(copy_subtree(alloc, right, Some(y))?);
            }
            p = y;
            x = n!(src).left;
        }
        Ok(ScopeGuard::into_inner(top))
    }
}

impl<V, X, C, A> RbTree<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    const _ASSERT_NODE_LAYOUT: () = assert!(
        align_of::<Node<V>>() <= ALIGN,
        "tree values must have alignment <= 8"
    );

    /// Empty tree on `alloc`.
    pub fn new_in(alloc: A) -> Self
    where
        C: Default,
    {
        Self::with_compare_in(C::default(), alloc)
    }

    /// Empty tree ordered by `compare`, on `alloc`. Nothing is allocated.
    pub const fn with_compare_in(compare: C, alloc: A) -> Self {
        Self {
            root: None,
            leftmost: None,
            rightmost: None,
            len: 0,
            compare,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The comparator.
    pub fn compare(&self) -> &C {
        &self.compare
    }

    /// The allocator backing this tree.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    unsafe fn key<'n>(node: NonNull<Node<V>>) -> &'n X::Key
    where
        V: 'n,
    {
        unsafe { X::key(&(*node.as_ptr()).value) }
    }

    #[inline]
    fn less(&self, a: &X::Key, b: &X::Key) -> bool {
        self.compare.less(a, b)
    }

    fn cursor(&self, node: Link<V>) -> Cursor<'_, V> {
        Cursor::new(node, self.leftmost, self.rightmost)
    }

    // First node whose key is not less than `key`.
    fn lower_bound_node(&self, key: &X::Key) -> Link<V> {
        let mut candidate = None;
        let mut x = self.root;
        while let Some(node) = x {
            unsafe {
                if !self.less(Self::key(node), key) {
                    candidate = Some(node);
                    x = n!(node).left;
                } else {
                    x = n!(node).right;
                }
            }
        }
        candidate
    }

    // First node whose key is greater than `key`.
    fn upper_bound_node(&self, key: &X::Key) -> Link<V> {
        let mut candidate = None;
        let mut x = self.root;
        while let Some(node) = x {
            unsafe {
                if self.less(key, Self::key(node)) {
                    candidate = Some(node);
                    x = n!(node).left;
                } else {
                    x = n!(node).right;
                }
            }
        }
        candidate
    }

    /// The node holding `key`, or the lower bound to insert before.
    fn search(&self, key: &X::Key) -> Result<NonNull<Node<V>>, Link<V>> {
        let lower = self.lower_bound_node(key);
        match lower {
            Some(node) if !self.less(key, unsafe { Self::key(node) }) => Ok(node),
            _ => Err(lower),
        }
    }

    /// Cursor to the first value with an equivalent key, or the ghost position.
    pub fn find(&self, key: &X::Key) -> Cursor<'_, V> {
        self.cursor(self.search(key).ok())
    }

    /// The first value with an equivalent key.
    pub fn get(&self, key: &X::Key) -> Option<&V> {
        self.search(key).ok().map(|node| unsafe { &(*node.as_ptr()).value })
    }

    pub(crate) fn get_mut(&mut self, key: &X::Key) -> Option<&mut V> {
        self.search(key).ok().map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Whether a value with an equivalent key is stored.
    pub fn contains(&self, key: &X::Key) -> bool {
        self.search(key).is_ok()
    }

    /// Cursor to the first value whose key is not less than `key`.
    pub fn lower_bound(&self, key: &X::Key) -> Cursor<'_, V> {
        self.cursor(self.lower_bound_node(key))
    }

    /// Cursor to the first value whose key is greater than `key`.
    pub fn upper_bound(&self, key: &X::Key) -> Cursor<'_, V> {
        self.cursor(self.upper_bound_node(key))
    }

    /// `(lower_bound, upper_bound)` for `key`: the half-open run of equivalent keys.
    pub fn equal_range(&self, key: &X::Key) -> (Cursor<'_, V>, Cursor<'_, V>) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Number of values with a key equivalent to `key`.
    pub fn count(&self, key: &X::Key) -> usize {
        Range::new(self.lower_bound_node(key), self.upper_bound_node(key), self.rightmost).count()
    }

    // Half-open node interval selected by `range`, empty when the bounds cross.
    fn bounds_to_nodes<R: RangeBounds<X::Key>>(&self, range: &R) -> (Link<V>, Link<V>) {
        let first = match range.start_bound() {
            Bound::Included(key) => self.lower_bound_node(key),
            Bound::Excluded(key) => self.upper_bound_node(key),
            Bound::Unbounded => self.leftmost,
        };
        let last = match range.end_bound() {
            Bound::Included(key) => self.upper_bound_node(key),
            Bound::Excluded(key) => self.lower_bound_node(key),
            Bound::Unbounded => None,
        };
        if let (Some(f), Some(l)) = (first, last) {
            if self.less(unsafe { Self::key(l) }, unsafe { Self::key(f) }) {
                return (None, None);
            }
        }
        (first, last)
    }

    /// In-order iterator over the values whose keys fall inside `range`.
    ///
    /// Crossed bounds give an empty iterator.
    pub fn range<R: RangeBounds<X::Key>>(&self, range: R) -> Range<'_, V> {
        let (first, last) = self.bounds_to_nodes(&range);
        Range::new(first, last, self.rightmost)
    }

    /// In-order iterator.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.leftmost, self.rightmost, self.len)
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut::new(self.leftmost, self.rightmost, self.len)
    }

    /// Cursor at the first value.
    pub fn begin(&self) -> Cursor<'_, V> {
        self.cursor(self.leftmost)
    }

    /// Cursor at the ghost position past the last value.
    pub fn end(&self) -> Cursor<'_, V> {
        self.cursor(None)
    }

    /// Mutable cursor at the first value.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, V, X, C, A> {
        CursorMut::new(self.leftmost, self)
    }

    /// Mutable cursor at the ghost position.
    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, V, X, C, A> {
        CursorMut::new(None, self)
    }

    /// Mutable cursor at the lower bound of `key`.
    pub fn lower_bound_mut(&mut self, key: &X::Key) -> CursorMut<'_, V, X, C, A> {
        let node = self.lower_bound_node(key);
        CursorMut::new(node, self)
    }

    /// The smallest value.
    pub fn first(&self) -> Option<&V> {
        self.leftmost.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// The largest value.
    pub fn last(&self) -> Option<&V> {
        self.rightmost.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Remove and return the smallest value.
    pub fn pop_first(&mut self) -> Option<V> {
        let node = self.leftmost?;
        Some(unsafe { self.erase_node(node) })
    }

    /// Remove and return the largest value.
    pub fn pop_last(&mut self) -> Option<V> {
        let node = self.rightmost?;
        Some(unsafe { self.erase_node(node) })
    }

    fn create_node(&self, value: V) -> Result<NonNull<Node<V>>, AllocError> {
        let () = Self::_ASSERT_NODE_LAYOUT;
        let node = allocate_one::<Node<V>, _>(&self.alloc)?;
        unsafe { construct(node.as_ptr(), Node::new(value)) };
        Ok(node)
    }

    /// Attach the fresh node `z` below `parent` and rebalance.
    unsafe fn link(&mut self, z: NonNull<Node<V>>, parent: Link<V>, insert_left: bool) {
        unsafe {
            n!(z).parent = parent;
            match parent {
                None => {
                    self.root = Some(z);
                    self.leftmost = Some(z);
                    self.rightmost = Some(z);
                }
                Some(p) if insert_left => {
                    n!(p).left = Some(z);
                    if self.leftmost == Some(p) {
                        self.leftmost = Some(z);
                    }
                }
                Some(p) => {
                    n!(p).right = Some(z);
                    if self.rightmost == Some(p) {
                        self.rightmost = Some(z);
                    }
                }
            }
            insert_rebalance(z, &mut self.root);
        }
        self.len += 1;
    }

    fn insert_at(&mut self, parent: Link<V>, insert_left: bool, value: V) -> Result<NonNull<Node<V>>, AllocError> {
        let z = self.create_node(value)?;
        unsafe { self.link(z, parent, insert_left) };
        Ok(z)
    }

    /// Where `key` would be linked, or the node already holding it.
    fn unique_position(&self, key: &X::Key) -> Result<(Link<V>, bool), NonNull<Node<V>>> {
        let mut parent = None;
        let mut x = self.root;
        let mut went_left = true;
        while let Some(node) = x {
            parent = Some(node);
            went_left = self.less(key, unsafe { Self::key(node) });
            x = unsafe {
                if went_left {
                    n!(node).left
                } else {
                    n!(node).right
                }
            };
        }
        // Only the in-order predecessor of the landing spot can be equivalent.
        let mut candidate = parent;
        if went_left {
            if parent == self.leftmost {
                return Ok((parent, true));
            }
            candidate = parent.and_then(|node| unsafe { predecessor(node) });
        }
        match candidate {
            Some(node) if !self.less(unsafe { Self::key(node) }, key) => Err(node),
            _ => Ok((parent, went_left)),
        }
    }

    /// Where `key` would be linked after all equivalent keys.
    fn equal_position(&self, key: &X::Key) -> (Link<V>, bool) {
        let mut parent = None;
        let mut x = self.root;
        let mut went_left = true;
        while let Some(node) = x {
            parent = Some(node);
            went_left = self.less(key, unsafe { Self::key(node) });
            x = unsafe {
                if went_left {
                    n!(node).left
                } else {
                    n!(node).right
                }
            };
        }
        (parent, went_left)
    }

    fn insert_unique_node(&mut self, value: V) -> Result<(NonNull<Node<V>>, bool), AllocError> {
        match self.unique_position(X::key(&value)) {
            Err(existing) => Ok((existing, false)),
            Ok((parent, left)) => Ok((self.insert_at(parent, left, value)?, true)),
        }
    }

    fn insert_equal_node(&mut self, value: V) -> Result<NonNull<Node<V>>, AllocError> {
        let (parent, left) = self.equal_position(X::key(&value));
        self.insert_at(parent, left, value)
    }

    /// Insert `value` unless a value with an equivalent key is stored.
    ///
    /// # Returns
    /// * `Ok((cursor, true))` - The value was inserted; the cursor points at it
    /// * `Ok((cursor, false))` - The cursor points at the stored equivalent; `value` is dropped
    /// * `Err(ContainerError::Alloc)` - No node could be allocated; the tree is unchanged
    pub fn insert_unique(&mut self, value: V) -> ContainerResult<(Cursor<'_, V>, bool)> {
        let (node, inserted) = self.insert_unique_node(value)?;
        Ok((self.cursor(Some(node)), inserted))
    }

    /// Insert `value` after every value with an equivalent key.
    pub fn insert_equal(&mut self, value: V) -> ContainerResult<Cursor<'_, V>> {
        let node = self.insert_equal_node(value)?;
        Ok(self.cursor(Some(node)))
    }

    /// Unique insert next to `hint`, falling back to a full search when the
    /// hint is not adjacent to the sort position of `value`.
    pub(crate) fn insert_unique_hint(&mut self, hint: Link<V>, value: V) -> Result<(NonNull<Node<V>>, bool), AllocError> {
        let key = X::key(&value);
        let position = unsafe {
            match hint {
                _ if hint == self.leftmost => match hint {
                    Some(first) if self.less(key, Self::key(first)) => Some((hint, true)),
                    _ => None,
                },
                None => match self.rightmost {
                    Some(last) if self.less(Self::key(last), key) => Some((self.rightmost, false)),
                    _ => None,
                },
                Some(pos) => match predecessor(pos) {
                    Some(before) if self.less(Self::key(before), key) && self.less(key, Self::key(pos)) => {
                        if n!(before).right.is_none() {
                            Some((Some(before), false))
                        } else {
                            Some((hint, true))
                        }
                    }
                    _ => None,
                },
            }
        };
        match position {
            Some((parent, left)) => {
                tracing::trace!("hinted unique insert used the hint");
                Ok((self.insert_at(parent, left, value)?, true))
            }
            None => {
                tracing::trace!("hinted unique insert missed, searching from the root");
                self.insert_unique_node(value)
            }
        }
    }

    /// Equal insert next to `hint`, falling back to a full search on a wrong hint.
    pub(crate) fn insert_equal_hint(&mut self, hint: Link<V>, value: V) -> Result<NonNull<Node<V>>, AllocError> {
        let key = X::key(&value);
        let position = unsafe {
            match hint {
                _ if hint == self.leftmost => match hint {
                    Some(first) if !self.less(Self::key(first), key) => Some((hint, true)),
                    _ => None,
                },
                None => match self.rightmost {
                    Some(last) if !self.less(key, Self::key(last)) => Some((self.rightmost, false)),
                    _ => None,
                },
                Some(pos) => match predecessor(pos) {
                    Some(before) if !self.less(key, Self::key(before)) && !self.less(Self::key(pos), key) => {
                        if n!(before).right.is_none() {
                            Some((Some(before), false))
                        } else {
                            Some((hint, true))
                        }
                    }
                    _ => None,
                },
            }
        };
        match position {
            Some((parent, left)) => {
                tracing::trace!("hinted equal insert used the hint");
                self.insert_at(parent, left, value)
            }
            None => {
                tracing::trace!("hinted equal insert missed, searching from the root");
                self.insert_equal_node(value)
            }
        }
    }

    /// The value stored under the key of the value `make` would build, inserting
    /// it first when missing. `make` only runs on a miss.
    pub(crate) fn get_or_insert_with<Q, F>(&mut self, key: Q, make: F) -> Result<&mut V, AllocError>
    where
        Q: Borrow<X::Key>,
        F: FnOnce(Q) -> V,
    {
        let hint = match self.search(key.borrow()) {
            Ok(node) => return Ok(unsafe { &mut (*node.as_ptr()).value }),
            Err(hint) => hint,
        };
        let (node, _) = self.insert_unique_hint(hint, make(key))?;
        Ok(unsafe { &mut (*node.as_ptr()).value })
    }

    /// Unlink `node`, free it and hand back its value.
    pub(crate) unsafe fn erase_node(&mut self, node: NonNull<Node<V>>) -> V {
        unsafe {
            erase_rebalance(node, &mut self.root, &mut self.leftmost, &mut self.rightmost);
            self.len -= 1;
            let value = ptr::read(&(*node.as_ptr()).value);
            deallocate_one(&self.alloc, node);
            value
        }
    }

    fn erase_nodes(&mut self, first: Link<V>, last: Link<V>) -> usize {
        if first.is_some() && first == self.leftmost && last.is_none() {
            let n = self.len;
            self.clear();
            return n;
        }
        let mut removed = 0;
        let mut cur = first;
        while cur != last {
            let Some(node) = cur else { break };
            unsafe {
                cur = successor(node);
                drop(self.erase_node(node));
            }
            removed += 1;
        }
        removed
    }

    /// Remove and return the first value with a key equivalent to `key`.
    pub fn remove(&mut self, key: &X::Key) -> Option<V> {
        let node = self.search(key).ok()?;
        Some(unsafe { self.erase_node(node) })
    }

    /// Remove every value with a key equivalent to `key`; returns how many.
    pub fn erase_key(&mut self, key: &X::Key) -> usize {
        let (first, last) = (self.lower_bound_node(key), self.upper_bound_node(key));
        self.erase_nodes(first, last)
    }

    /// Remove the values whose keys fall inside `range`; returns how many.
    ///
    /// A range covering the whole tree clears it in one postorder pass.
    pub fn erase_range<R: RangeBounds<X::Key>>(&mut self, range: R) -> usize {
        let (first, last) = self.bounds_to_nodes(&range);
        self.erase_nodes(first, last)
    }

    /// Drop every value and free every node.
    pub fn clear(&mut self) {
        let root = self.root.take();
        self.leftmost = None;
        self.rightmost = None;
        self.len = 0;
        unsafe { free_subtree(&self.alloc, root) };
    }

    /// Exchange contents with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Structural deep copy preserving shape and colors.
    pub fn try_clone(&self) -> ContainerResult<Self>
    where
        V: Clone,
        C: Clone,
        A: Clone,
    {
        let mut tree = Self::with_compare_in(self.compare.clone(), self.alloc.clone());
        if let Some(root) = self.root {
            let root = unsafe { copy_subtree(&tree.alloc, root, None)? };
            tree.root = Some(root);
            tree.leftmost = Some(unsafe { minimum(root) });
            tree.rightmost = Some(unsafe { maximum(root) });
            tree.len = self.len;
        }
        tracing::debug!(len = self.len, "cloned tree");
        Ok(tree)
    }

    /// Check every red-black and bookkeeping invariant.
    ///
    /// Returns the black height of the tree, counting the empty leaves.
    pub fn verify(&self) -> Result<usize, RbViolation> {
        let Some(root) = self.root else {
            if self.leftmost.is_some() || self.rightmost.is_some() {
                return Err(RbViolation::StaleExtremum);
            }
            if self.len != 0 {
                return Err(RbViolation::LenMismatch {
                    recorded: self.len,
                    counted: 0,
                });
            }
            return Ok(1);
        };
        unsafe {
            if n!(root).color == Color::Red {
                return Err(RbViolation::RedRoot);
            }
            if n!(root).parent.is_some() {
                return Err(RbViolation::BrokenParentLink);
            }
            let mut counted = 0;
            let height = Self::verify_subtree(root, &mut counted)?;
            if counted != self.len {
                return Err(RbViolation::LenMismatch {
                    recorded: self.len,
                    counted,
                });
            }
            if self.leftmost != Some(minimum(root)) || self.rightmost != Some(maximum(root)) {
                return Err(RbViolation::StaleExtremum);
            }
            let mut prev: Option<&X::Key> = None;
            for value in self.iter() {
                let key = X::key(value);
                if prev.is_some_and(|prev| self.less(key, prev)) {
                    return Err(RbViolation::OutOfOrder);
                }
                prev = Some(key);
            }
            Ok(height)
        }
    }

    unsafe fn verify_subtree(node: NonNull<Node<V>>, counted: &mut usize) -> Result<usize, RbViolation> {
        *counted += 1;
        unsafe {
            let red = n!(node).color == Color::Red;
            let mut heights = [1; 2];
            for (height, child) in heights.iter_mut().zip([n!(node).left, n!(node).right]) {
                if let Some(child) = child {
                    if n!(child).parent != Some(node) {
                        return Err(RbViolation::BrokenParentLink);
                    }
                    if red && n!(child).color == Color::Red {
                        return Err(RbViolation::RedRedEdge);
                    }
                    *height = Self::verify_subtree(child, counted)?;
                }
            }
            if heights[0] != heights[1] {
                return Err(RbViolation::BlackHeightMismatch {
                    left: heights[0],
                    right: heights[1],
                });
            }
            Ok(heights[0] + usize::from(!red))
        }
    }
}

impl<V, X, C, A> Drop for RbTree<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V, X, C, A> Clone for RbTree<V, X, C, A>
where
    V: Clone,
    X: KeyOfValue<V>,
    C: Compare<X::Key> + Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| oom_abort_container(err))
    }
}

impl<V, X, C, A> PartialEq for RbTree<V, X, C, A>
where
    V: PartialEq,
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V, X, C, A> Eq for RbTree<V, X, C, A>
where
    V: Eq,
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
}

impl<V, X, C, A> fmt::Debug for RbTree<V, X, C, A>
where
    V: fmt::Debug,
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<V, X, C, A> IntoIterator for RbTree<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    type Item = V;
    type IntoIter = IntoIter<V, X, C, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, V, X, C, A> IntoIterator for &'a RbTree<V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrackingAllocator;
    use crate::backend::pool::PoolAllocator;
    use crate::compare::{First, Greater};
    use crate::error::ContainerError;
    use crate::iter::{BidirectionalCursor, ForwardCursor, distance, prev};
    use std::rc::Rc;
    use std::vec::Vec;

    type Multi = RbTree<(i32, usize), First>;

    fn values<V: Copy, X: KeyOfValue<V>, C: Compare<X::Key>, A: Allocator>(tree: &RbTree<V, X, C, A>) -> Vec<V> {
        tree.iter().copied().collect()
    }

    fn unique<I: IntoIterator<Item = i32>>(keys: I) -> RbTree<i32> {
        let mut tree = RbTree::new();
        for key in keys {
            tree.insert_unique(key).unwrap();
        }
        tree
    }

    // Deterministic xorshift sequence.
    fn pseudo_random(seed: u64, n: usize) -> Vec<i32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 1000) as i32
            })
            .collect()
    }

    #[test]
    fn test_insert_and_erase_scenario() {
        let mut tree: RbTree<i32> = RbTree::new();
        for key in [5, 3, 8, 1, 4, 7, 9] {
            assert!(tree.insert_unique(key).unwrap().1);
        }
        assert_eq!(values(&tree), [1, 3, 4, 5, 7, 8, 9]);
        assert!(tree.verify().is_ok());

        assert_eq!(tree.erase_key(&5), 1);
        assert_eq!(values(&tree), [1, 3, 4, 7, 8, 9]);
        assert!(tree.verify().is_ok());
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_insert_unique_rejects_equivalent() {
        let mut tree: RbTree<i32> = RbTree::new();
        tree.insert_unique(4).unwrap();
        let (cursor, inserted) = tree.insert_unique(4).unwrap();
        assert!(!inserted);
        assert_eq!(cursor.get(), Some(&4));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_insert_equal_keeps_arrival_order() {
        let mut tree = Multi::new();
        for (seq, key) in [3, 1, 3, 2, 3, 1].into_iter().enumerate() {
            tree.insert_equal((key, seq)).unwrap();
        }
        assert_eq!(values(&tree), [(1, 1), (1, 5), (2, 3), (3, 0), (3, 2), (3, 4)]);
        assert_eq!(tree.count(&3), 3);
        assert_eq!(tree.count(&4), 0);
        assert!(tree.verify().is_ok());

        let (lo, hi) = tree.equal_range(&3);
        assert_eq!(lo.get(), Some(&(3, 0)));
        assert!(hi.is_end());
        assert_eq!(distance(&lo, &hi), 3);
        assert_eq!(tree.find(&1).get(), Some(&(1, 1)));
        assert!(tree.find(&7).is_end());
    }

    #[test]
    fn test_bounds() {
        let tree = unique([10, 20, 30, 40]);
        assert_eq!(tree.lower_bound(&20).get(), Some(&20));
        assert_eq!(tree.lower_bound(&21).get(), Some(&30));
        assert_eq!(tree.upper_bound(&20).get(), Some(&30));
        assert!(tree.upper_bound(&40).is_end());
        assert_eq!(tree.lower_bound(&0).get(), Some(&10));

        assert_eq!(tree.range(15..=30).copied().collect::<Vec<_>>(), [20, 30]);
        assert_eq!(tree.range(..20).copied().collect::<Vec<_>>(), [10]);
        assert_eq!(tree.range(25..).rev().copied().collect::<Vec<_>>(), [40, 30]);
        assert_eq!(tree.range(30..20).count(), 0);
        assert_eq!(tree.range(20..20).count(), 0);
    }

    #[test]
    fn test_cursor_wraps_through_ghost() {
        let tree = unique([1, 2, 3]);
        let mut cursor = tree.end();
        cursor.move_next();
        assert_eq!(cursor.get(), Some(&1));
        cursor.move_prev();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert_eq!(cursor.get(), Some(&3));
        assert_eq!(prev(&tree.end(), 2).get(), Some(&2));
        assert_eq!(tree.begin().peek_next(), Some(&2));
        assert_eq!(tree.begin().peek_prev(), None);
    }

    #[test]
    fn test_hinted_inserts() {
        let mut tree: RbTree<i32> = RbTree::new();
        {
            // Ascending input hinted at the end.
            let mut cursor = tree.cursor_end_mut();
            for key in 0..100 {
                assert!(cursor.insert_unique(key * 2).unwrap());
            }
            assert!(!cursor.insert_unique(50).unwrap());
        }
        {
            // Descending input hinted at the front.
            let mut cursor = tree.cursor_front_mut();
            assert!(cursor.insert_unique(-1).unwrap());
        }
        {
            // Correct middle hint, then a wrong one.
            let mut cursor = tree.lower_bound_mut(&10);
            assert!(cursor.insert_unique(9).unwrap());
            assert!(cursor.insert_unique(151).unwrap());
            cursor.insert_equal(10).unwrap();
            cursor.insert_equal(500).unwrap();
        }
        assert!(tree.verify().is_ok());
        assert_eq!(tree.len(), 105);
        assert_eq!(tree.first(), Some(&-1));
        assert_eq!(tree.last(), Some(&500));
        assert_eq!(tree.count(&10), 2);
        assert!(tree.contains(&9) && tree.contains(&151));
        let all = values(&tree);
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_remove_current() {
        let mut tree = unique(0..10);
        let mut cursor = tree.lower_bound_mut(&4);
        assert_eq!(cursor.remove_current(), Some(4));
        assert_eq!(cursor.get(), Some(&5));
        cursor.move_prev();
        assert_eq!(cursor.remove_current(), Some(3));
        assert_eq!(cursor.as_cursor().get(), Some(&5));

        let mut end = tree.cursor_end_mut();
        assert_eq!(end.remove_current(), None);
        assert_eq!(values(&tree), [0, 1, 2, 5, 6, 7, 8, 9]);
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn test_erase_range_and_clear() {
        let mut tree = unique(0..100);
        assert_eq!(tree.erase_range(10..20), 10);
        assert_eq!(tree.erase_range(90..), 10);
        assert_eq!(tree.len(), 80);
        assert!(tree.verify().is_ok());
        assert_eq!(tree.erase_range(..), 80);
        assert!(tree.is_empty());
        assert_eq!(tree.first(), None);
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn test_pop_both_ends() {
        let mut tree = unique([4, 2, 6]);
        assert_eq!(tree.pop_first(), Some(2));
        assert_eq!(tree.pop_last(), Some(6));
        assert_eq!(tree.pop_last(), Some(4));
        assert_eq!(tree.pop_first(), None);
    }

    #[test]
    fn test_random_insert_erase_keeps_invariants() {
        let mut tree: RbTree<i32> = RbTree::new();
        let mut model = std::collections::BTreeSet::new();
        for (i, key) in pseudo_random(0x9E37_79B9, 3000).into_iter().enumerate() {
            if i % 3 == 2 {
                assert_eq!(tree.erase_key(&key), usize::from(model.remove(&key)));
            } else {
                assert_eq!(tree.insert_unique(key).unwrap().1, model.insert(key));
            }
            if i % 97 == 0 {
                assert!(tree.verify().is_ok());
            }
        }
        assert!(tree.verify().is_ok());
        assert!(tree.iter().eq(model.iter()));
    }

    #[test]
    fn test_comparators() {
        let mut desc: RbTree<i32, Identity, Greater> = RbTree::new();
        for key in [2, 9, 4] {
            desc.insert_unique(key).unwrap();
        }
        assert_eq!(values(&desc), [9, 4, 2]);

        let by_abs = |a: &i32, b: &i32| a.abs() < b.abs();
        let mut tree = RbTree::<i32, Identity, _>::with_compare(by_abs);
        for key in [-3, 1, 2, -1] {
            tree.insert_unique(key).unwrap();
        }
        assert_eq!(values(&tree), [1, 2, -3]);
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn test_clone_preserves_shape() {
        let alloc = TrackingAllocator::new(PoolAllocator::new());
        let mut tree = RbTree::<i32, Identity, Less, _>::new_in(&alloc);
        for key in pseudo_random(7, 500) {
            tree.insert_equal(key).unwrap();
        }
        let copy = tree.try_clone().unwrap();
        assert_eq!(copy, tree);
        assert_eq!(copy.verify(), tree.verify());
        assert_eq!(alloc.live_blocks(), 1000);
        drop(copy);
        assert_eq!(alloc.live_blocks(), 500);
    }

    #[test]
    fn test_clone_rolls_back_on_allocation_failure() {
        let alloc = TrackingAllocator::new(PoolAllocator::new());
        let mut tree = RbTree::<i32, Identity, Less, _>::new_in(&alloc);
        for key in 0..300 {
            tree.insert_unique(key).unwrap();
        }
        alloc.fail_after(150);
        let err = tree.try_clone().unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(alloc.live_blocks(), 300);
        alloc.heal();
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn test_insert_failure_leaves_tree_unchanged() {
        let alloc = TrackingAllocator::new(PoolAllocator::new());
        let mut tree = RbTree::<i32, Identity, Less, _>::new_in(&alloc);
        tree.insert_unique(1).unwrap();
        alloc.fail_after(0);
        assert!(matches!(tree.insert_unique(2), Err(ContainerError::Alloc(_))));
        // A duplicate needs no node.
        assert!(!tree.insert_unique(1).unwrap().1);
        alloc.heal();
        assert_eq!(tree.len(), 1);
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn test_drop_counts() {
        let token = Rc::new(());
        {
            let mut tree: RbTree<(i32, Rc<()>), First> = RbTree::new();
            for i in 0..200 {
                tree.insert_equal((i % 17, Rc::clone(&token))).unwrap();
            }
            assert_eq!(Rc::strong_count(&token), 201);
            assert_eq!(tree.erase_key(&3), 12);
            assert_eq!(Rc::strong_count(&token), 201 - 12);
            drop(tree.pop_first());
            assert_eq!(Rc::strong_count(&token), 201 - 13);
        }
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn test_iteration_across_scoped_threads() {
        let mut tree = unique(0..500);
        let (all, some, cursor) = (tree.iter(), tree.range(100..200), tree.lower_bound(&250));
        let found = std::thread::scope(|s| {
            let a = s.spawn(move || all.rev().take(3).copied().collect::<Vec<_>>());
            let b = s.spawn(move || some.count());
            let c = s.spawn(move || cursor.peek_next().copied());
            (a.join().unwrap(), b.join().unwrap(), c.join().unwrap())
        });
        assert_eq!(found, (std::vec![499, 498, 497], 100, Some(251)));

        let mut cursor = tree.cursor_front_mut();
        std::thread::scope(|s| {
            s.spawn(|| {
                cursor.remove_current();
            });
        });
        assert_eq!(tree.first(), Some(&1));
    }

    #[test]
    fn test_iterators() {
        let tree = unique((0..50).rev());
        let mut iter = tree.iter();
        assert_eq!(iter.len(), 50);
        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&49));
        assert_eq!(iter.len(), 48);

        let owned: Vec<i32> = tree.clone().into_iter().rev().take(3).collect();
        assert_eq!(owned, [49, 48, 47]);
        assert_eq!(std::format!("{:?}", tree.range(..3)), "[0, 1, 2]");
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut tree = unique(0..20);
        unsafe {
            let root = tree.root.unwrap();
            n!(root).color = Color::Red;
            assert_eq!(tree.verify(), Err(RbViolation::RedRoot));
            n!(root).color = Color::Black;
            tree.len += 1;
            assert!(matches!(tree.verify(), Err(RbViolation::LenMismatch { .. })));
            tree.len -= 1;
        }
        assert!(tree.verify().is_ok());
    }
}
