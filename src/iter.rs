//! Cursor categories and generic distance/advance dispatch.
//!
//! A cursor is a position inside a container. Cursors form a refinement chain:
//! forward cursors only step ahead, bidirectional cursors also step back, and
//! random-access cursors jump by any offset in O(1). [`distance`] and [`advance`]
//! pick the cheapest strategy the cursor supports: the linear defaults on
//! [`ForwardCursor`] are overridden by refining cursors.

/// Cursor capability, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Single-pass reading.
    Input,
    /// Multi-pass, forward stepping.
    Forward,
    /// Forward and backward stepping.
    Bidirectional,
    /// Constant-time jumps and ordering.
    RandomAccess,
}

impl Category {
    /// Whether a cursor of this category can be used where `other` is required.
    #[inline]
    pub fn refines(self, other: Category) -> bool {
        self >= other
    }
}

/// A multi-pass cursor that steps forward.
pub trait ForwardCursor: Clone + PartialEq {
    /// Item yielded by [`get`](ForwardCursor::get).
    type Item;

    /// Capability of this cursor type.
    const CATEGORY: Category = Category::Forward;

    /// The item at the current position, or `None` at the end position.
    fn get(&self) -> Option<Self::Item>;

    /// Step to the next position.
    fn move_next(&mut self);

    /// Move by `n` positions. Forward cursors only accept `n >= 0`.
    fn advance_by(&mut self, n: isize) {
        debug_assert!(n >= 0, "forward cursor cannot move backwards");
        for _ in 0..n {
            self.move_next();
        }
    }

    /// Positions from `self` to `last`, which must be reachable by stepping forward.
    fn distance_to(&self, last: &Self) -> isize {
        let mut cursor = self.clone();
        let mut n = 0;
        while cursor != *last {
            cursor.move_next();
            n += 1;
        }
        n
    }
}

/// A cursor that also steps backward.
pub trait BidirectionalCursor: ForwardCursor {
    /// Step to the previous position.
    fn move_prev(&mut self);

    /// Move back by `n` positions.
    fn retreat_by(&mut self, n: isize) {
        for _ in 0..n {
            self.move_prev();
        }
    }
}

/// A cursor with constant-time jumps and a total order over positions.
pub trait RandomAccessCursor: BidirectionalCursor + PartialOrd {
    /// The cursor `n` positions away.
    fn offset(&self, n: isize) -> Self;

    /// Signed number of positions from `origin` to `self`.
    fn diff(&self, origin: &Self) -> isize;

    /// The item `n` positions away.
    fn peek(&self, n: isize) -> Option<Self::Item> {
        self.offset(n).get()
    }
}

/// The category of cursor type `C`.
#[inline]
pub fn category_of<C: ForwardCursor>() -> Category {
    C::CATEGORY
}

/// Positions between `first` and `last`.
#[inline]
pub fn distance<C: ForwardCursor>(first: &C, last: &C) -> isize {
    first.distance_to(last)
}

/// Move `cursor` by `n` positions.
#[inline]
pub fn advance<C: ForwardCursor>(cursor: &mut C, n: isize) {
    cursor.advance_by(n);
}

/// The cursor `n` positions after `cursor`.
#[inline]
pub fn next<C: ForwardCursor>(cursor: &C, n: isize) -> C {
    let mut c = cursor.clone();
    c.advance_by(n);
    c
}

/// The cursor `n` positions before `cursor`.
#[inline]
pub fn prev<C: BidirectionalCursor>(cursor: &C, n: isize) -> C {
    let mut c = cursor.clone();
    c.retreat_by(n);
    c
}

/// Iterator over the half-open cursor range `[first, last)`.
#[derive(Clone)]
pub struct CursorRange<C> {
    first: C,
    last: C,
}

impl<C: ForwardCursor> CursorRange<C> {
    /// Range from `first` up to, not including, `last`.
    pub fn new(first: C, last: C) -> Self {
        Self { first, last }
    }

    /// Number of positions left, computed with the cursor's own strategy.
    pub fn remaining(&self) -> usize {
        distance(&self.first, &self.last).max(0) as usize
    }
}

impl<C: ForwardCursor> Iterator for CursorRange<C> {
    type Item = C::Item;

    fn next(&mut self) -> Option<C::Item> {
        if self.first == self.last {
            return None;
        }
        let item = self.first.get();
        self.first.move_next();
        item
    }
}

impl<C: BidirectionalCursor> DoubleEndedIterator for CursorRange<C> {
    fn next_back(&mut self) -> Option<C::Item> {
        if self.first == self.last {
            return None;
        }
        self.last.move_prev();
        self.last.get()
    }
}
