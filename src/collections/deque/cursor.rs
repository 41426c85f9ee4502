//! Buffer-crossing positions inside a [`Deque`](super::Deque).

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Add, AddAssign, Index, Sub, SubAssign};
use core::ptr;

use crate::iter::{BidirectionalCursor, Category, ForwardCursor, RandomAccessCursor};

/// Elements per buffer: buffers span about 4 KiB, with at least 16 elements.
pub(crate) const fn buffer_size<T>() -> usize {
    let size = size_of::<T>();
    if size == 0 {
        1
    } else if size < 256 {
        4096 / size
    } else {
        16
    }
}

/// Unchecked four-pointer position: `cur` inside the buffer `[first, last)` held
/// by map slot `node`.
pub(crate) struct RawCursor<T> {
    pub(crate) cur: *mut T,
    pub(crate) first: *mut T,
    pub(crate) last: *mut T,
    pub(crate) node: *mut *mut T,
}

impl<T> Clone for RawCursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawCursor<T> {}

impl<T> PartialEq for RawCursor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cur == other.cur
    }
}

impl<T> RawCursor<T> {
    const BUF: usize = buffer_size::<T>();

    /// Position at the first slot of the buffer held by `node`.
    ///
    /// # Safety
    /// `node` must point at a map slot holding a live buffer.
    pub(crate) unsafe fn at_node_start(node: *mut *mut T) -> Self {
        let mut c = Self {
            cur: ptr::null_mut(),
            first: ptr::null_mut(),
            last: ptr::null_mut(),
            node,
        };
        unsafe { c.set_node(node) };
        c.cur = c.first;
        c
    }

    #[inline]
    pub(crate) unsafe fn set_node(&mut self, node: *mut *mut T) {
        self.node = node;
        self.first = unsafe { *node };
        self.last = self.first.wrapping_add(Self::BUF);
    }

    #[inline]
    pub(crate) unsafe fn inc(&mut self) {
        unsafe {
            self.cur = self.cur.add(1);
            if self.cur == self.last {
                self.set_node(self.node.add(1));
                self.cur = self.first;
            }
        }
    }

    #[inline]
    pub(crate) unsafe fn dec(&mut self) {
        unsafe {
            if self.cur == self.first {
                self.set_node(self.node.sub(1));
                self.cur = self.last;
            }
            self.cur = self.cur.sub(1);
        }
    }

    /// The position `n` elements away, crossing buffers as needed.
    ///
    /// # Safety
    /// The target position must lie inside buffers held by the map.
    pub(crate) unsafe fn offset(self, n: isize) -> Self {
        let buf = Self::BUF as isize;
        let mut r = self;
        unsafe {
            let offset = n + self.cur.offset_from(self.first);
            if (0..buf).contains(&offset) {
                r.cur = self.cur.offset(n);
            } else {
                // Division truncates toward zero: shift negative offsets so that
                // -buf lands one buffer back and -buf - 1 two buffers back.
                let node_offset = if offset > 0 {
                    offset / buf
                } else {
                    -((-offset - 1) / buf) - 1
                };
                r.set_node(self.node.offset(node_offset));
                r.cur = r.first.offset(offset - node_offset * buf);
            }
        }
        r
    }

    /// Signed element count from `origin` to `self`.
    ///
    /// # Safety
    /// Both cursors must be positions in the same deque.
    pub(crate) unsafe fn diff(&self, origin: &Self) -> isize {
        let buf = Self::BUF as isize;
        unsafe {
            buf * (self.node.offset_from(origin.node) - 1)
                + self.cur.offset_from(self.first)
                + origin.last.offset_from(origin.cur)
        }
    }
}

/// Bitwise-move `[first, last)` to the range starting at `dest`, front to back.
///
/// # Safety
/// Safe for overlapping ranges when `dest` precedes `first`. Source slots are
/// left logically uninitialized.
pub(crate) unsafe fn move_range<T>(mut first: RawCursor<T>, last: RawCursor<T>, mut dest: RawCursor<T>) {
    unsafe {
        while first != last {
            ptr::copy_nonoverlapping(first.cur, dest.cur, 1);
            first.inc();
            dest.inc();
        }
    }
}

/// Bitwise-move `[first, last)` to the range ending at `dest_last`, back to front.
///
/// # Safety
/// Safe for overlapping ranges when the destination follows the source.
pub(crate) unsafe fn move_range_backward<T>(first: RawCursor<T>, mut last: RawCursor<T>, mut dest_last: RawCursor<T>) {
    unsafe {
        while last != first {
            last.dec();
            dest_last.dec();
            ptr::copy_nonoverlapping(last.cur, dest_last.cur, 1);
        }
    }
}

/// Random-access cursor over a borrowed deque.
///
/// Arithmetic is bounds-checked against `[begin, end]` and panics when a cursor
/// would leave that range.
pub struct Cursor<'a, T> {
    raw: RawCursor<T>,
    start: RawCursor<T>,
    len: usize,
    _marker: PhantomData<&'a T>,
}

unsafe impl<T: Sync> Send for Cursor<'_, T> {}
unsafe impl<T: Sync> Sync for Cursor<'_, T> {}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(raw: RawCursor<T>, start: RawCursor<T>, len: usize) -> Self {
        Self {
            raw,
            start,
            len,
            _marker: PhantomData,
        }
    }

    /// Zero-based position of the cursor; `len()` at the end.
    #[inline]
    pub fn position(&self) -> usize {
        unsafe { self.raw.diff(&self.start) as usize }
    }

    /// Whether the cursor sits at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.position() == self.len
    }

    /// The element under the cursor, `None` at the end.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        if self.is_end() {
            None
        } else {
            Some(unsafe { &*self.raw.cur })
        }
    }

    fn jump(&self, n: isize) -> Self {
        let target = self.position() as isize + n;
        if target < 0 || target > self.len as isize {
            panic!("deque cursor moved out of bounds: position {target}, length {}", self.len);
        }
        Self {
            raw: unsafe { self.raw.offset(n) },
            ..*self
        }
    }
}

impl<'a, T> ForwardCursor for Cursor<'a, T> {
    type Item = &'a T;

    const CATEGORY: Category = Category::RandomAccess;

    fn get(&self) -> Option<&'a T> {
        Cursor::get(self)
    }

    fn move_next(&mut self) {
        *self = self.jump(1);
    }

    fn advance_by(&mut self, n: isize) {
        *self = self.jump(n);
    }

    fn distance_to(&self, last: &Self) -> isize {
        last.diff(self)
    }
}

impl<T> BidirectionalCursor for Cursor<'_, T> {
    fn move_prev(&mut self) {
        *self = self.jump(-1);
    }

    fn retreat_by(&mut self, n: isize) {
        *self = self.jump(-n);
    }
}

impl<T> RandomAccessCursor for Cursor<'_, T> {
    fn offset(&self, n: isize) -> Self {
        self.jump(n)
    }

    fn diff(&self, origin: &Self) -> isize {
        unsafe { self.raw.diff(&origin.raw) }
    }
}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T> PartialOrd for Cursor<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Cursor<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position().cmp(&other.position())
    }
}

impl<T> Add<isize> for Cursor<'_, T> {
    type Output = Self;

    fn add(self, n: isize) -> Self {
        self.jump(n)
    }
}

impl<T> Sub<isize> for Cursor<'_, T> {
    type Output = Self;

    fn sub(self, n: isize) -> Self {
        self.jump(-n)
    }
}

impl<T> Sub for Cursor<'_, T> {
    type Output = isize;

    fn sub(self, origin: Self) -> isize {
        self.diff(&origin)
    }
}

impl<T> AddAssign<isize> for Cursor<'_, T> {
    fn add_assign(&mut self, n: isize) {
        *self = self.jump(n);
    }
}

impl<T> SubAssign<isize> for Cursor<'_, T> {
    fn sub_assign(&mut self, n: isize) {
        *self = self.jump(-n);
    }
}

impl<T> Index<isize> for Cursor<'_, T> {
    type Output = T;

    fn index(&self, n: isize) -> &T {
        match self.jump(n).get() {
            Some(item) => item,
            None => panic!("deque cursor dereferenced at end"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.position())
            .field("item", &self.get())
            .finish()
    }
}
