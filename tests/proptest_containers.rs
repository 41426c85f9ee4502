//! Property-based tests for the containers against their std counterparts

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use proptest::prelude::*;
use tinystl::prelude::*;

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(i16),
    Remove(i16),
    PopFirst,
    PopLast,
    RemoveRange(i16, i16),
}

fn tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        4 => any::<i16>().prop_map(|k| TreeOp::Insert(k % 200)),
        2 => any::<i16>().prop_map(|k| TreeOp::Remove(k % 200)),
        1 => Just(TreeOp::PopFirst),
        1 => Just(TreeOp::PopLast),
        1 => (any::<i16>(), 0i16..20).prop_map(|(k, w)| TreeOp::RemoveRange(k % 200, k % 200 + w)),
    ]
}

#[derive(Debug, Clone)]
enum DequeOp {
    PushBack(u32),
    PushFront(u32),
    PopBack,
    PopFront,
    Insert(usize, u32),
    InsertN(usize, usize, u32),
    Remove(usize),
    EraseRange(usize, usize),
    Truncate(usize),
}

fn deque_op() -> impl Strategy<Value = DequeOp> {
    prop_oneof![
        4 => any::<u32>().prop_map(DequeOp::PushBack),
        4 => any::<u32>().prop_map(DequeOp::PushFront),
        2 => Just(DequeOp::PopBack),
        2 => Just(DequeOp::PopFront),
        2 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| DequeOp::Insert(i, v)),
        1 => (any::<usize>(), 0usize..80, any::<u32>()).prop_map(|(i, n, v)| DequeOp::InsertN(i, n, v)),
        2 => any::<usize>().prop_map(DequeOp::Remove),
        1 => (any::<usize>(), 0usize..60).prop_map(|(i, n)| DequeOp::EraseRange(i, n)),
        1 => any::<usize>().prop_map(DequeOp::Truncate),
    ]
}

// ===== TREE PROPERTIES =====

proptest! {
    #[test]
    fn tree_matches_btreeset(ops in prop::collection::vec(tree_op(), 0..400)) {
        let mut tree: RbTree<i16> = RbTree::new();
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                TreeOp::Insert(k) => {
                    let (_, inserted) = tree.insert_unique(k).unwrap();
                    prop_assert_eq!(inserted, model.insert(k));
                }
                TreeOp::Remove(k) => prop_assert_eq!(tree.remove(&k), model.take(&k)),
                TreeOp::PopFirst => prop_assert_eq!(tree.pop_first(), model.pop_first()),
                TreeOp::PopLast => prop_assert_eq!(tree.pop_last(), model.pop_last()),
                TreeOp::RemoveRange(lo, hi) => {
                    let expected = model.range(lo..hi).count();
                    model.retain(|k| !(lo..hi).contains(k));
                    prop_assert_eq!(tree.erase_range(lo..hi), expected);
                }
            }
            prop_assert!(tree.verify().is_ok());
        }

        prop_assert_eq!(tree.len(), model.len());
        prop_assert!(tree.iter().eq(model.iter()));
        prop_assert!(tree.iter().rev().eq(model.iter().rev()));
    }

    #[test]
    fn multimap_keeps_insertion_order(pairs in prop::collection::vec((0u8..16, any::<u32>()), 0..300)) {
        let mut map: TreeMultiMap<u8, u32> = TreeMultiMap::new();
        let mut model: BTreeMap<u8, Vec<u32>> = BTreeMap::new();
        for &(k, v) in &pairs {
            map.insert(k, v).unwrap();
            model.entry(k).or_default().push(v);
        }

        let flattened: Vec<(u8, u32)> = model
            .iter()
            .flat_map(|(&k, vs)| vs.iter().map(move |&v| (k, v)))
            .collect();
        prop_assert_eq!(map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(), flattened);
        for (k, vs) in &model {
            prop_assert_eq!(map.count(k), vs.len());
            prop_assert!(map.get_all(k).eq(vs.iter()));
        }
        prop_assert!(map.as_tree().verify().is_ok());
    }

    #[test]
    fn bounds_match_btreeset(keys in prop::collection::btree_set(any::<i32>(), 0..200), probe in any::<i32>()) {
        let set: TreeSet<i32> = keys.iter().copied().collect();

        prop_assert_eq!(set.lower_bound(&probe).get(), keys.range(probe..).next());
        let above = keys.range((std::ops::Bound::Excluded(probe), std::ops::Bound::Unbounded)).next();
        prop_assert_eq!(set.upper_bound(&probe).get(), above);
        prop_assert!(set.range(..probe).eq(keys.range(..probe)));
    }

    #[test]
    fn tree_clone_is_independent(keys in prop::collection::vec(any::<u16>(), 0..200)) {
        let mut original: TreeSet<u16> = keys.iter().copied().collect();
        let copy = original.try_clone().unwrap();
        original.clear();

        let model: BTreeSet<u16> = keys.into_iter().collect();
        prop_assert!(copy.iter().eq(model.iter()));
        prop_assert!(copy.as_tree().verify().is_ok());
    }
}

// ===== DEQUE PROPERTIES =====

proptest! {
    #[test]
    fn deque_matches_vecdeque(ops in prop::collection::vec(deque_op(), 0..300)) {
        let mut deque: Deque<u32> = Deque::new();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                DequeOp::PushBack(v) => {
                    deque.push_back(v).unwrap();
                    model.push_back(v);
                }
                DequeOp::PushFront(v) => {
                    deque.push_front(v).unwrap();
                    model.push_front(v);
                }
                DequeOp::PopBack => prop_assert_eq!(deque.pop_back(), model.pop_back()),
                DequeOp::PopFront => prop_assert_eq!(deque.pop_front(), model.pop_front()),
                DequeOp::Insert(i, v) => {
                    let i = i % (model.len() + 1);
                    deque.insert(i, v).unwrap();
                    model.insert(i, v);
                }
                DequeOp::InsertN(i, n, v) => {
                    let i = i % (model.len() + 1);
                    deque.insert_n(i, n, v).unwrap();
                    for _ in 0..n {
                        model.insert(i, v);
                    }
                }
                DequeOp::Remove(i) => {
                    let i = if model.is_empty() { 0 } else { i % model.len() };
                    prop_assert_eq!(deque.remove(i), model.remove(i));
                }
                DequeOp::EraseRange(i, n) => {
                    let first = i % (model.len() + 1);
                    let last = (first + n).min(model.len());
                    deque.erase_range(first..last).unwrap();
                    model.drain(first..last);
                }
                DequeOp::Truncate(len) => {
                    let len = len % (model.len() + 1);
                    deque.truncate(len);
                    model.truncate(len);
                }
            }
            prop_assert_eq!(deque.len(), model.len());
            prop_assert_eq!(deque.front(), model.front());
            prop_assert_eq!(deque.back(), model.back());
        }

        prop_assert!(deque.iter().eq(model.iter()));
        prop_assert!(deque.iter().rev().eq(model.iter().rev()));
    }

    #[test]
    fn deque_indexing_matches(items in prop::collection::vec(any::<u64>(), 0..2000), front in 0usize..600) {
        let mut deque: Deque<u64> = Deque::new();
        for &item in items.iter().take(front).rev() {
            deque.push_front(item).unwrap();
        }
        for &item in items.iter().skip(front) {
            deque.push_back(item).unwrap();
        }

        prop_assert_eq!(deque.len(), items.len());
        for (i, item) in items.iter().enumerate() {
            prop_assert_eq!(&deque[i], item);
        }
        prop_assert!(deque.get(items.len()).is_none());
    }
}

// ===== CURSOR PROPERTIES =====

proptest! {
    #[test]
    fn deque_cursor_arithmetic(len in 0usize..3000, a in any::<usize>(), b in any::<usize>()) {
        let deque: Deque<u32> = (0..len as u32).collect();
        let a = (a % (len + 1)) as isize;
        let b = (b % (len + 1)) as isize;

        let first = deque.begin() + a;
        let second = deque.begin() + b;
        prop_assert_eq!(second - first, b - a);
        prop_assert_eq!(first + (b - a), second);
        prop_assert_eq!(distance(&first, &second), b - a);
        prop_assert_eq!(first < second, a < b);
        prop_assert_eq!(deque.end() - deque.begin(), len as isize);
        if (a as usize) < len {
            prop_assert_eq!(first.get(), Some(&(a as u32)));
        } else {
            prop_assert!(first.is_end());
        }
    }

    #[test]
    fn tree_cursor_walks_both_ways(keys in prop::collection::btree_set(any::<i32>(), 1..200), steps in 0usize..400) {
        let set: TreeSet<i32> = keys.iter().copied().collect();
        let tree = set.as_tree();
        let ring = keys.len() + 1;

        let forward = next(&tree.begin(), steps as isize);
        let expected = keys.iter().nth(steps % ring);
        prop_assert_eq!(forward.get(), expected);

        let back = prev(&forward, steps as isize);
        prop_assert_eq!(back, tree.begin());
        prop_assert_eq!(distance(&tree.begin(), &tree.end()), keys.len() as isize);
    }
}
