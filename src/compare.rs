//! Key extraction and comparison contracts for ordered containers.

use core::cmp::Ordering;

/// Strict weak ordering over keys.
pub trait Compare<K: ?Sized> {
    /// Whether `a` orders before `b`.
    fn less(&self, a: &K, b: &K) -> bool;

    /// Neither key orders before the other.
    #[inline]
    fn equivalent(&self, a: &K, b: &K) -> bool {
        !self.less(a, b) && !self.less(b, a)
    }
}

/// Ascending order through [`Ord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Less;

/// Descending order through [`Ord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Greater;

impl<K: Ord + ?Sized> Compare<K> for Less {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a.cmp(b) == Ordering::Less
    }
}

impl<K: Ord + ?Sized> Compare<K> for Greater {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a.cmp(b) == Ordering::Greater
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Maps a stored value to the key it is ordered by.
pub trait KeyOfValue<V> {
    /// The key type.
    type Key;

    /// Borrow the key of `value`.
    fn key(value: &V) -> &Self::Key;
}

/// The value is its own key (sets).
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> KeyOfValue<T> for Identity {
    type Key = T;

    #[inline]
    fn key(value: &T) -> &T {
        value
    }
}

/// The key is the first element of a pair (maps).
#[derive(Debug, Clone, Copy, Default)]
pub struct First;

impl<K, V> KeyOfValue<(K, V)> for First {
    type Key = K;

    #[inline]
    fn key(value: &(K, V)) -> &K {
        &value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_less_and_greater() {
        assert!(Less.less(&1, &2));
        assert!(!Less.less(&2, &2));
        assert!(Greater.less(&3, &2));
        assert!(Less.equivalent(&4, &4));
    }

    #[test]
    fn test_closure_comparator() {
        let by_len = |a: &&str, b: &&str| a.len() < b.len();
        assert!(by_len.less(&"ab", &"abc"));
        assert!(by_len.equivalent(&"ab", &"cd"));
    }

    #[test]
    fn test_key_extractors() {
        assert_eq!(*Identity::key(&7), 7);
        assert_eq!(*First::key(&("k", 1)), "k");
    }
}
