//! Double-ended queue over fixed-size buffers
//!
//! `Deque` stores elements in buffers of about 4 KiB, referenced from a central
//! map of buffer pointers. Buffers are kept roughly centered in the map so the
//! deque can grow at both ends; when a side of the map runs out of slots, the map
//! is reallocated and the buffer pointers re-centered.
//!
//! # Features
//!
//! - O(1) amortized push and pop at both ends
//! - O(1) random access, through indexing or random-access [`Cursor`]s
//! - Interior insert and erase shift the shorter side
//! - Buffers are released as soon as they empty; one buffer is always kept
//!
//! # Examples
//!
//! ```
//! use tinystl::prelude::*;
//!
//! let mut deque: Deque<i32> = Deque::new();
//! for i in (1..=5).rev() {
//!     deque.push_front(i).unwrap();
//! }
//! deque.push_back(6).unwrap();
//! deque.insert(3, 99).unwrap();
//!
//! assert_eq!(deque.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 99, 4, 5, 6]);
//! assert_eq!(deque.remove(3), Some(99));
//! assert_eq!(deque.at(10), Err(ContainerError::IndexOutOfRange { index: 10, len: 6 }));
//! ```

mod cursor;
mod iter;

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Bound, Index, IndexMut, RangeBounds};
use core::ptr::{self, NonNull};

pub use cursor::Cursor;
use cursor::{RawCursor, buffer_size, move_range, move_range_backward};
pub use iter::{IntoIter, Iter, IterMut};

use scopeguard::ScopeGuard;

use crate::construct::{allocate_array, construct, deallocate_array, destroy, destroy_slice};
use crate::error::{AllocError, ContainerError, ContainerResult, oom_abort_container};
use crate::global::Global;
use crate::{ALIGN, Allocator};

/// Minimum number of map slots.
const MAP_INIT_SIZE: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum End {
    Front,
    Back,
}

/// Double-ended queue over fixed-size buffers.
///
/// Elements must have a non-zero size and an alignment of at most
/// [`ALIGN`] bytes; other element types fail to compile.
pub struct Deque<T, A: Allocator = Global> {
    start: RawCursor<T>,
    finish: RawCursor<T>,
    map: NonNull<*mut T>,
    map_size: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Deque<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Deque<T, A> {}

impl<T> Deque<T> {
    /// Empty deque on the global pool.
    ///
    /// Aborts through the alloc-error hook if the initial buffer cannot be allocated.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Deque holding `n` clones of `value`, on the global pool.
    pub fn from_elem(n: usize, value: T) -> ContainerResult<Self>
    where
        T: Clone,
    {
        Self::try_from_iter_in(core::iter::repeat_n(value, n), Global)
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Deque<T, A> {
    const BUF: usize = buffer_size::<T>();
    const BUF_BYTES: usize = Self::BUF * size_of::<T>();

    const _ASSERT_ELEMENT_LAYOUT: () = assert!(
        size_of::<T>() != 0 && align_of::<T>() <= ALIGN,
        "deque elements must be non-zero-sized with alignment <= 8"
    );

    /// Empty deque on `alloc`, aborting on allocation failure.
    pub fn new_in(alloc: A) -> Self {
        match Self::with_nodes(alloc, 0) {
            Ok(deque) => deque,
            Err(err) => crate::error::oom_abort(err),
        }
    }

    /// Empty deque on `alloc`.
    ///
    /// The map and one buffer are allocated up front.
    pub fn try_new_in(alloc: A) -> ContainerResult<Self> {
        Ok(Self::with_nodes(alloc, 0)?)
    }

    /// Deque holding the items of an exact-size iterator, on `alloc`.
    ///
    /// All buffers are allocated before the first element is written.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> ContainerResult<Self>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let n = iter.len();
        let mut deque = Self::with_nodes(alloc, n)?;
        for value in iter.take(n) {
            unsafe {
                construct(deque.finish.cur, value);
                deque.finish.inc();
            }
        }
        // Release buffers reserved for items a short iterator never produced.
        unsafe { deque.release_spare_back() };
        Ok(deque)
    }

    /// Allocate a map and enough buffers for `num_elements`, centered in the map.
    fn with_nodes(alloc: A, num_elements: usize) -> Result<Self, AllocError> {
        let () = Self::_ASSERT_ELEMENT_LAYOUT;

        let num_nodes = num_elements / Self::BUF + 1;
        let map_size = MAP_INIT_SIZE.max(num_nodes + 2);
        let map = allocate_array::<*mut T, _>(&alloc, map_size)?;
        unsafe {
            for i in 0..map_size {
                map.as_ptr().add(i).write(ptr::null_mut());
            }
            let nstart = map.as_ptr().add((map_size - num_nodes) / 2);
            if let Err(err) = Self::create_nodes(&alloc, nstart, nstart.add(num_nodes)) {
                deallocate_array(&alloc, map, map_size);
                return Err(err);
            }
            let start = RawCursor::at_node_start(nstart);
            Ok(Self {
                start,
                finish: start,
                map,
                map_size,
                alloc,
                _marker: PhantomData,
            })
        }
    }

    /// Allocate a buffer into every map slot in `[first, end)`.
    ///
    /// On failure the buffers created by this call are released again.
    unsafe fn create_nodes(alloc: &A, first: *mut *mut T, end: *mut *mut T) -> Result<(), AllocError> {
        let mut cur = first;
        while cur < end {
            match allocate_array::<T, _>(alloc, Self::BUF) {
                Ok(buffer) => unsafe {
                    debug_assert!((*cur).is_null());
                    *cur = buffer.as_ptr();
                    cur = cur.add(1);
                },
                Err(err) => {
                    let created = unsafe { cur.offset_from(first) };
                    tracing::warn!(created, requested = unsafe { end.offset_from(first) }, "buffer allocation failed, rolling back batch");
                    unsafe { Self::destroy_nodes(alloc, first, cur) };
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Release the buffers held by map slots `[first, end)` and clear the slots.
    unsafe fn destroy_nodes(alloc: &A, first: *mut *mut T, end: *mut *mut T) {
        let mut cur = first;
        while cur < end {
            unsafe {
                if let Some(buffer) = NonNull::new(*cur) {
                    alloc.deallocate(buffer.cast(), Self::BUF_BYTES);
                }
                *cur = ptr::null_mut();
                cur = cur.add(1);
            }
        }
    }

    fn map_end(&self) -> *mut *mut T {
        unsafe { self.map.as_ptr().add(self.map_size) }
    }

    unsafe fn release_spare_back(&mut self) {
        let mut end = unsafe { self.finish.node.add(1) };
        while end < self.map_end() && unsafe { !(*end).is_null() } {
            end = unsafe { end.add(1) };
        }
        unsafe { Self::destroy_nodes(&self.alloc, self.finish.node.add(1), end) };
    }

    /// Guarantee room for `n` more elements at `end`, without constructing any.
    fn require_capacity(&mut self, n: usize, end: End) -> Result<(), AllocError> {
        let buf = Self::BUF;
        unsafe {
            match end {
                End::Front => {
                    let free = self.start.cur.offset_from(self.start.first) as usize;
                    if n > free {
                        let need = (n - free - 1) / buf + 1;
                        let spare = self.start.node.offset_from(self.map.as_ptr()) as usize;
                        if need > spare {
                            self.reallocate_map(need, End::Front)?;
                        } else {
                            Self::create_nodes(&self.alloc, self.start.node.sub(need), self.start.node)?;
                        }
                    }
                }
                End::Back => {
                    let free = self.finish.last.offset_from(self.finish.cur) as usize - 1;
                    if n > free {
                        let need = (n - free - 1) / buf + 1;
                        let spare = self.map_end().offset_from(self.finish.node) as usize - 1;
                        if need > spare {
                            self.reallocate_map(need, End::Back)?;
                        } else {
                            let first = self.finish.node.add(1);
                            Self::create_nodes(&self.alloc, first, first.add(need))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Make room for `need` fresh buffers at `end` by re-centering the buffer
    /// pointers, in place when the map is less than half full, otherwise in a
    /// larger map.
    unsafe fn reallocate_map(&mut self, need: usize, end: End) -> Result<(), AllocError> {
        unsafe {
            let old_buffers = self.finish.node.offset_from(self.start.node) as usize + 1;
            let new_buffers = old_buffers + need;

            if self.map_size > 2 * new_buffers {
                let map = self.map.as_ptr();
                let begin = map.add((self.map_size - new_buffers) / 2);
                let (fresh, relocated) = match end {
                    End::Front => (begin, begin.add(need)),
                    End::Back => (begin.add(old_buffers), begin),
                };
                let old_first = self.start.node;
                ptr::copy(old_first, relocated, old_buffers);
                for i in 0..old_buffers {
                    let slot = old_first.add(i);
                    if slot < relocated || slot >= relocated.add(old_buffers) {
                        *slot = ptr::null_mut();
                    }
                }
                self.start.node = relocated;
                self.finish.node = relocated.add(old_buffers - 1);
                tracing::trace!(map_size = self.map_size, side = ?end, "re-centered deque map");
                return Self::create_nodes(&self.alloc, fresh, fresh.add(need));
            }

            let new_size = (self.map_size * 2).max(self.map_size + need + MAP_INIT_SIZE);

            let new_map = allocate_array::<*mut T, _>(&self.alloc, new_size)?;
            for i in 0..new_size {
                new_map.as_ptr().add(i).write(ptr::null_mut());
            }
            let begin = new_map.as_ptr().add((new_size - new_buffers) / 2);
            let (fresh, relocated) = match end {
                End::Front => (begin, begin.add(need)),
                End::Back => (begin.add(old_buffers), begin),
            };
            if let Err(err) = Self::create_nodes(&self.alloc, fresh, fresh.add(need)) {
                deallocate_array(&self.alloc, new_map, new_size);
                return Err(err);
            }

            ptr::copy_nonoverlapping(self.start.node, relocated, old_buffers);
            deallocate_array(&self.alloc, self.map, self.map_size);
            tracing::debug!(old_size = self.map_size, new_size, side = ?end, "reallocated deque map");

            self.map = new_map;
            self.map_size = new_size;
            self.start.node = relocated;
            self.finish.node = relocated.add(old_buffers - 1);
        }
        Ok(())
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        unsafe { self.finish.diff(&self.start) as usize }
    }

    /// Whether the deque holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.finish
    }

    /// Elements per buffer.
    pub const fn buffer_capacity() -> usize {
        Self::BUF
    }

    /// Buffers currently allocated.
    pub fn buffer_count(&self) -> usize {
        unsafe { self.finish.node.offset_from(self.start.node) as usize + 1 }
    }

    /// Slots in the buffer map.
    pub fn map_capacity(&self) -> usize {
        self.map_size
    }

    /// The allocator backing this deque.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Append an element.
    pub fn push_back(&mut self, value: T) -> ContainerResult<()> {
        unsafe {
            if self.finish.cur != self.finish.last.sub(1) {
                construct(self.finish.cur, value);
                self.finish.cur = self.finish.cur.add(1);
            } else {
                self.require_capacity(1, End::Back)?;
                construct(self.finish.cur, value);
                self.finish.inc();
            }
        }
        Ok(())
    }

    /// Prepend an element.
    pub fn push_front(&mut self, value: T) -> ContainerResult<()> {
        unsafe {
            if self.start.cur != self.start.first {
                self.start.cur = self.start.cur.sub(1);
            } else {
                self.require_capacity(1, End::Front)?;
                self.start.dec();
            }
            construct(self.start.cur, value);
        }
        Ok(())
    }

    /// Remove the last element. Releases the last buffer once it empties.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        unsafe {
            if self.finish.cur != self.finish.first {
                self.finish.cur = self.finish.cur.sub(1);
                Some(ptr::read(self.finish.cur))
            } else {
                let emptied = self.finish.node;
                self.finish.dec();
                let value = ptr::read(self.finish.cur);
                Self::destroy_nodes(&self.alloc, emptied, emptied.add(1));
                Some(value)
            }
        }
    }

    /// Remove the first element. Releases the first buffer once it empties.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        unsafe {
            let value = ptr::read(self.start.cur);
            if self.start.cur != self.start.last.sub(1) {
                self.start.cur = self.start.cur.add(1);
            } else {
                let emptied = self.start.node;
                self.start = RawCursor::at_node_start(emptied.add(1));
                Self::destroy_nodes(&self.alloc, emptied, emptied.add(1));
            }
            Some(value)
        }
    }

    #[inline]
    fn raw_at(&self, index: usize) -> RawCursor<T> {
        unsafe { self.start.offset(index as isize) }
    }

    /// Element at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&T> {
        (index < self.len()).then(|| unsafe { &*self.raw_at(index).cur })
    }

    /// Mutable element at `index`, or `None` when out of range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        (index < self.len()).then(|| unsafe { &mut *self.raw_at(index).cur })
    }

    /// Bounds-checked access.
    ///
    /// # Returns
    /// * `Ok(&T)` - The element at `index`
    /// * `Err(ContainerError::IndexOutOfRange)` - `index >= len()`
    pub fn at(&self, index: usize) -> ContainerResult<&T> {
        self.get(index).ok_or(ContainerError::IndexOutOfRange { index, len: self.len() })
    }

    /// Bounds-checked mutable access.
    pub fn at_mut(&mut self, index: usize) -> ContainerResult<&mut T> {
        let len = self.len();
        self.get_mut(index).ok_or(ContainerError::IndexOutOfRange { index, len })
    }

    /// First element.
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Mutable first element.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Last element.
    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Mutable last element.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len().checked_sub(1).and_then(move |i| self.get_mut(i))
    }

    /// Cursor at the first element.
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::new(self.start, self.start, self.len())
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::new(self.finish, self.start, self.len())
    }

    /// Front-to-back iterator.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.start, self.finish, self.len())
    }

    /// Front-to-back iterator over mutable references.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.start, self.finish, self.len())
    }

    /// Open `n` uninitialized slots before position `index`, shifting the shorter side.
    ///
    /// Returns the first slot of the gap and the side that grew. The gap lies
    /// inside `[start, finish)` and must be filled before the deque is used again.
    unsafe fn open_gap(&mut self, index: usize, n: usize) -> Result<(RawCursor<T>, End), AllocError> {
        let len = self.len();
        let count = n as isize;
        unsafe {
            if index < len / 2 {
                self.require_capacity(n, End::Front)?;
                let old_start = self.start;
                let new_start = old_start.offset(-count);
                let pos = old_start.offset(index as isize);
                if index >= n {
                    // The first n elements move into fresh slots; the rest shift
                    // within slots that were already initialized.
                    let split = old_start.offset(count);
                    move_range(old_start, split, new_start);
                    move_range(split, pos, old_start);
                } else {
                    // Every displaced element lands in a fresh slot; the gap
                    // straddles the old start.
                    move_range(old_start, pos, new_start);
                }
                self.start = new_start;
                Ok((new_start.offset(index as isize), End::Front))
            } else {
                self.require_capacity(n, End::Back)?;
                let old_finish = self.finish;
                let new_finish = old_finish.offset(count);
                let pos = self.start.offset(index as isize);
                if len - index > n {
                    let split = old_finish.offset(-count);
                    move_range(split, old_finish, old_finish);
                    move_range_backward(pos, split, old_finish);
                } else {
                    move_range_backward(pos, old_finish, new_finish);
                }
                self.finish = new_finish;
                Ok((pos, End::Back))
            }
        }
    }

    /// Insert `value` before position `index`.
    ///
    /// # Returns
    /// * `Ok(())` - The element was inserted
    /// * `Err(ContainerError::IndexOutOfRange)` - `index > len()`
    /// * `Err(ContainerError::Alloc)` - No buffer could be allocated; the deque is unchanged
    pub fn insert(&mut self, index: usize, value: T) -> ContainerResult<()> {
        let len = self.len();
        if index > len {
            return Err(ContainerError::IndexOutOfRange { index, len });
        }
        if index == 0 {
            return self.push_front(value);
        }
        if index == len {
            return self.push_back(value);
        }
        unsafe {
            let (gap, _) = self.open_gap(index, 1)?;
            construct(gap.cur, value);
        }
        Ok(())
    }

    /// Insert `n` clones of `value` before position `index`.
    pub fn insert_n(&mut self, index: usize, n: usize, value: T) -> ContainerResult<()>
    where
        T: Clone,
    {
        self.insert_iter(index, core::iter::repeat_n(value, n))
    }

    /// Insert the items of an exact-size iterator before position `index`.
    ///
    /// If producing an item panics, the inserted prefix is dropped, the shifted
    /// elements move back and buffers created for the insert are released.
    ///
    /// # Panics
    /// Panics if the iterator yields fewer items than it reported.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I) -> ContainerResult<()>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let len = self.len();
        if index > len {
            return Err(ContainerError::IndexOutOfRange { index, len });
        }
        let mut iter = iter.into_iter();
        let n = iter.len();
        if n == 0 {
            return Ok(());
        }

        let (gap, side) = unsafe { self.open_gap(index, n)? };
        let fill = GapFill {
            deque: self,
            gap,
            next: gap,
            len: n,
            filled: 0,
            side,
        };
        let mut fill = scopeguard::guard(fill, |fill| unsafe { fill.rollback() });
        while fill.filled < n {
            match iter.next() {
                Some(value) => fill.push(value),
                None => panic!("ExactSizeIterator yielded fewer items than its reported length"),
            }
        }
        ScopeGuard::into_inner(fill);
        Ok(())
    }

    /// Advance `start` over `n` slots whose values were moved out, releasing emptied buffers.
    unsafe fn forget_front(&mut self, n: usize) {
        unsafe {
            let new_start = self.start.offset(n as isize);
            Self::destroy_nodes(&self.alloc, self.start.node, new_start.node);
            self.start = new_start;
        }
    }

    /// Retreat `finish` over `n` slots whose values were moved out, releasing emptied buffers.
    unsafe fn forget_back(&mut self, n: usize) {
        unsafe {
            let new_finish = self.finish.offset(-(n as isize));
            Self::destroy_nodes(&self.alloc, new_finish.node.add(1), self.finish.node.add(1));
            self.finish = new_finish;
        }
    }

    /// Remove and return the element at `index`, shifting the shorter side.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let len = self.len();
        if index >= len {
            return None;
        }
        unsafe {
            let pos = self.raw_at(index);
            let value = ptr::read(pos.cur);
            if index < len / 2 {
                move_range_backward(self.start, pos, pos.offset(1));
                self.forget_front(1);
            } else {
                move_range(pos.offset(1), self.finish, pos);
                self.forget_back(1);
            }
            Some(value)
        }
    }

    /// Drop the elements in `range`, shifting the shorter side.
    ///
    /// Erasing everything is equivalent to [`clear`](Deque::clear).
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) -> ContainerResult<()> {
        let len = self.len();
        let first = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let last = match range.end_bound() {
            Bound::Included(&i) => i.saturating_add(1),
            Bound::Excluded(&i) => i,
            Bound::Unbounded => len,
        };
        if first > last || last > len {
            return Err(ContainerError::IndexOutOfRange { index: last.max(first), len });
        }
        let n = last - first;
        if n == 0 {
            return Ok(());
        }
        if n == len {
            self.clear();
            return Ok(());
        }

        // Rotate the doomed elements to the nearer edge, then pop them so a
        // panicking destructor leaves the deque consistent.
        let at_front = first < (len - n) / 2;
        unsafe {
            if at_front {
                for i in (0..first).rev() {
                    ptr::swap(self.raw_at(i).cur, self.raw_at(i + n).cur);
                }
            } else {
                for i in last..len {
                    ptr::swap(self.raw_at(i).cur, self.raw_at(i - n).cur);
                }
            }
        }
        if at_front {
            for _ in 0..n {
                drop(self.pop_front());
            }
        } else {
            self.erase_tail(n);
        }
        Ok(())
    }

    /// Shorten the deque to `len` elements.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.erase_tail(self.len() - len);
        }
    }

    /// Drop the last `n` elements, `n <= len()`, releasing emptied buffers.
    fn erase_tail(&mut self, n: usize) {
        for _ in 0..n {
            drop(self.pop_back());
        }
    }

    /// Resize to `new_len`, filling with clones of `value`.
    pub fn resize(&mut self, new_len: usize, value: T) -> ContainerResult<()>
    where
        T: Clone,
    {
        let len = self.len();
        if new_len <= len {
            self.truncate(new_len);
            Ok(())
        } else {
            self.insert_n(len, new_len - len, value)
        }
    }

    /// Resize to `new_len`, filling with values produced by `f`.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut f: F) -> ContainerResult<()> {
        self.truncate(new_len);
        while self.len() < new_len {
            self.push_back(f())?;
        }
        Ok(())
    }

    /// Replace the contents with the items of `iter`.
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, iter: I) -> ContainerResult<()> {
        self.clear();
        for value in iter {
            self.push_back(value)?;
        }
        Ok(())
    }

    /// Replace the contents with `n` clones of `value`.
    pub fn assign_n(&mut self, n: usize, value: T) -> ContainerResult<()>
    where
        T: Clone,
    {
        self.clear();
        self.insert_n(0, n, value)
    }

    /// Drop every element. The buffer under the start position is kept.
    pub fn clear(&mut self) {
        let (first, last) = (self.start, self.finish);
        self.finish = self.start;
        unsafe {
            Self::destroy_elements(first, last);
            Self::destroy_nodes(&self.alloc, first.node.add(1), last.node.add(1));
        }
    }

    unsafe fn destroy_elements(first: RawCursor<T>, last: RawCursor<T>) {
        if !core::mem::needs_drop::<T>() {
            return;
        }
        unsafe {
            if first.node == last.node {
                destroy_slice(first.cur, last.cur.offset_from(first.cur) as usize);
                return;
            }
            destroy_slice(first.cur, first.last.offset_from(first.cur) as usize);
            let mut node = first.node.add(1);
            while node < last.node {
                destroy_slice(*node, Self::BUF);
                node = node.add(1);
            }
            destroy_slice(last.first, last.cur.offset_from(last.first) as usize);
        }
    }

    /// Exchange contents with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Deep copy on a clone of the allocator.
    pub fn try_clone(&self) -> ContainerResult<Self>
    where
        T: Clone,
        A: Clone,
    {
        Self::try_from_iter_in(self.iter().cloned(), self.alloc.clone())
    }
}

/// Fill state of a gap opened by `open_gap`.
///
/// Held in a scope guard while the gap is filled; the guard calls
/// [`rollback`](GapFill::rollback) unless it is disarmed.
struct GapFill<'a, T, A: Allocator> {
    deque: &'a mut Deque<T, A>,
    gap: RawCursor<T>,
    next: RawCursor<T>,
    len: usize,
    filled: usize,
    side: End,
}

impl<T, A: Allocator> GapFill<'_, T, A> {
    fn push(&mut self, value: T) {
        unsafe {
            construct(self.next.cur, value);
            self.next.inc();
        }
        self.filled += 1;
    }

    /// Destroy the values written so far, move the displaced elements back and
    /// release buffers created for the gap.
    unsafe fn rollback(self) {
        unsafe {
            let mut cur = self.gap;
            for _ in 0..self.filled {
                destroy(cur.cur);
                cur.inc();
            }
            let deque = self.deque;
            let gap_end = self.gap.offset(self.len as isize);
            match self.side {
                End::Front => {
                    let grown = deque.start;
                    move_range_backward(grown, self.gap, gap_end);
                    deque.start = grown.offset(self.len as isize);
                    Deque::<T, A>::destroy_nodes(&deque.alloc, grown.node, deque.start.node);
                }
                End::Back => {
                    let grown = deque.finish;
                    move_range(gap_end, grown, self.gap);
                    deque.finish = grown.offset(-(self.len as isize));
                    Deque::<T, A>::destroy_nodes(&deque.alloc, deque.finish.node.add(1), grown.node.add(1));
                }
            }
        }
    }
}

impl<T, A: Allocator> Drop for Deque<T, A> {
    fn drop(&mut self) {
        unsafe {
            Self::destroy_elements(self.start, self.finish);
            Self::destroy_nodes(&self.alloc, self.map.as_ptr(), self.map_end());
            deallocate_array(&self.alloc, self.map, self.map_size);
        }
    }
}

impl<T, A: Allocator> Index<usize> for Deque<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {index} out of range for deque of length {}", self.len()),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for Deque<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index {index} out of range for deque of length {len}"),
        }
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Deque<T, A> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| oom_abort_container(err))
    }
}

impl<T, A: Allocator> Extend<T> for Deque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if let Err(err) = self.push_back(value) {
                oom_abort_container(err);
            }
        }
    }
}

impl<T> FromIterator<T> for Deque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Deque::new();
        deque.extend(iter);
        deque
    }
}

impl<T, A: Allocator> IntoIterator for Deque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Deque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Deque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Deque<T, B>> for Deque<T, A> {
    fn eq(&self, other: &Deque<T, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: Allocator> Eq for Deque<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Deque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: Allocator> Ord for Deque<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: Allocator> Hash for Deque<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Deque<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
