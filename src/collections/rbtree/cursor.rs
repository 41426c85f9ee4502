//! In-order positions inside an [`RbTree`](super::RbTree).
//!
//! The position past the last element is a ghost: it holds no node. Stepping
//! forward from the ghost wraps to the first element and stepping back wraps to
//! the last, so a cursor can walk the tree in a ring.

use core::fmt;
use core::marker::PhantomData;

use super::RbTree;
use super::node::{Link, predecessor, successor};
use crate::Allocator;
use crate::compare::{Compare, KeyOfValue};
use crate::error::ContainerResult;
use crate::iter::{BidirectionalCursor, Category, ForwardCursor};

#[inline]
pub(crate) fn step_next<V>(node: Link<V>, leftmost: Link<V>) -> Link<V> {
    match node {
        Some(node) => unsafe { successor(node) },
        None => leftmost,
    }
}

#[inline]
pub(crate) fn step_prev<V>(node: Link<V>, rightmost: Link<V>) -> Link<V> {
    match node {
        Some(node) => unsafe { predecessor(node) },
        None => rightmost,
    }
}

/// Bidirectional cursor over a borrowed tree.
pub struct Cursor<'a, V> {
    pub(crate) node: Link<V>,
    leftmost: Link<V>,
    rightmost: Link<V>,
    _marker: PhantomData<&'a V>,
}

unsafe impl<V: Sync> Send for Cursor<'_, V> {}
unsafe impl<V: Sync> Sync for Cursor<'_, V> {}

impl<V> Clone for Cursor<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Cursor<'_, V> {}

impl<'a, V> Cursor<'a, V> {
    pub(crate) fn new(node: Link<V>, leftmost: Link<V>, rightmost: Link<V>) -> Self {
        Self {
            node,
            leftmost,
            rightmost,
            _marker: PhantomData,
        }
    }

    /// The element under the cursor, `None` at the ghost position.
    #[inline]
    pub fn get(&self) -> Option<&'a V> {
        self.node.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Whether the cursor sits at the ghost position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// The element after the cursor, without moving.
    pub fn peek_next(&self) -> Option<&'a V> {
        let mut next = *self;
        next.move_next();
        next.get()
    }

    /// The element before the cursor, without moving.
    pub fn peek_prev(&self) -> Option<&'a V> {
        let mut prev = *self;
        prev.move_prev();
        prev.get()
    }
}

impl<'a, V> ForwardCursor for Cursor<'a, V> {
    type Item = &'a V;

    const CATEGORY: Category = Category::Bidirectional;

    fn get(&self) -> Option<&'a V> {
        Cursor::get(self)
    }

    fn move_next(&mut self) {
        self.node = step_next(self.node, self.leftmost);
    }

    fn advance_by(&mut self, n: isize) {
        if n < 0 {
            self.retreat_by(-n);
        } else {
            for _ in 0..n {
                self.move_next();
            }
        }
    }
}

impl<V> BidirectionalCursor for Cursor<'_, V> {
    fn move_prev(&mut self) {
        self.node = step_prev(self.node, self.rightmost);
    }
}

impl<V> PartialEq for Cursor<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<V> Eq for Cursor<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Cursor<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.get()).finish()
    }
}

/// Cursor with exclusive access to its tree.
///
/// Besides moving, it inserts values using its position as the hint and removes
/// the element under it.
pub struct CursorMut<'a, V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    node: Link<V>,
    tree: &'a mut RbTree<V, X, C, A>,
}

unsafe impl<V, X, C, A> Send for CursorMut<'_, V, X, C, A>
where
    V: Send,
    X: KeyOfValue<V>,
    C: Compare<X::Key> + Send,
    A: Allocator + Send,
{
}

unsafe impl<V, X, C, A> Sync for CursorMut<'_, V, X, C, A>
where
    V: Sync,
    X: KeyOfValue<V>,
    C: Compare<X::Key> + Sync,
    A: Allocator + Sync,
{
}

impl<'a, V, X, C, A> CursorMut<'a, V, X, C, A>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
    A: Allocator,
{
    pub(crate) fn new(node: Link<V>, tree: &'a mut RbTree<V, X, C, A>) -> Self {
        Self { node, tree }
    }

    /// The element under the cursor, `None` at the ghost position.
    pub fn get(&self) -> Option<&V> {
        self.node.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Whether the cursor sits at the ghost position.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Step to the next element, wrapping from the ghost to the first.
    pub fn move_next(&mut self) {
        self.node = step_next(self.node, self.tree.leftmost);
    }

    /// Step to the previous element, wrapping from the ghost to the last.
    pub fn move_prev(&mut self) {
        self.node = step_prev(self.node, self.tree.rightmost);
    }

    /// Read-only view of the current position.
    pub fn as_cursor(&self) -> Cursor<'_, V> {
        Cursor::new(self.node, self.tree.leftmost, self.tree.rightmost)
    }

    /// Insert `value` unless an equivalent key exists, using the cursor as the hint.
    ///
    /// The hint pays off when `value` belongs right before the cursor. A wrong
    /// hint costs a full search. The cursor does not move.
    ///
    /// # Returns
    /// * `Ok(true)` - The value was inserted
    /// * `Ok(false)` - An equivalent key was already stored; `value` is dropped
    /// * `Err(ContainerError::Alloc)` - No node could be allocated
    pub fn insert_unique(&mut self, value: V) -> ContainerResult<bool> {
        let (_, inserted) = self.tree.insert_unique_hint(self.node, value)?;
        Ok(inserted)
    }

    /// Insert `value` after any equivalent keys, using the cursor as the hint.
    pub fn insert_equal(&mut self, value: V) -> ContainerResult<()> {
        self.tree.insert_equal_hint(self.node, value)?;
        Ok(())
    }

    /// Remove the element under the cursor and move to its successor.
    ///
    /// Returns `None` at the ghost position.
    pub fn remove_current(&mut self) -> Option<V> {
        let node = self.node?;
        self.node = unsafe { successor(node) };
        Some(unsafe { self.tree.erase_node(node) })
    }
}
