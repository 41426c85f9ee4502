//! Tree nodes and the link-level red-black algorithms.
//!
//! Every function here works on raw node pointers and trusts the caller to pass
//! nodes of one well-formed tree. The root is the only node without a parent.

use core::ptr::NonNull;

pub(crate) type Link<V> = Option<NonNull<Node<V>>>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Color {
    Red,
    Black,
}

pub(crate) struct Node<V> {
    pub(crate) parent: Link<V>,
    pub(crate) left: Link<V>,
    pub(crate) right: Link<V>,
    pub(crate) color: Color,
    pub(crate) value: V,
}

impl<V> Node<V> {
    pub(crate) fn new(value: V) -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            color: Color::Red,
            value,
        }
    }
}

// Field access through raw pointers. Node references are never held across a
// relink, so aliasing stays sound.
macro_rules! n {
    ($node:expr) => {
        (*$node.as_ptr())
    };
}

#[inline]
pub(crate) unsafe fn is_red<V>(link: Link<V>) -> bool {
    link.is_some_and(|node| unsafe { n!(node).color == Color::Red })
}

#[inline]
unsafe fn set_color<V>(link: Link<V>, color: Color) {
    if let Some(node) = link {
        unsafe { n!(node).color = color };
    }
}

pub(crate) unsafe fn minimum<V>(mut x: NonNull<Node<V>>) -> NonNull<Node<V>> {
    while let Some(left) = unsafe { n!(x).left } {
        x = left;
    }
    x
}

pub(crate) unsafe fn maximum<V>(mut x: NonNull<Node<V>>) -> NonNull<Node<V>> {
    while let Some(right) = unsafe { n!(x).right } {
        x = right;
    }
    x
}

/// In-order successor; `None` after the last node.
pub(crate) unsafe fn successor<V>(mut x: NonNull<Node<V>>) -> Link<V> {
    unsafe {
        if let Some(right) = n!(x).right {
            return Some(minimum(right));
        }
        while let Some(parent) = n!(x).parent {
            if n!(parent).left == Some(x) {
                return Some(parent);
            }
            x = parent;
        }
        None
    }
}

/// In-order predecessor; `None` before the first node.
pub(crate) unsafe fn predecessor<V>(mut x: NonNull<Node<V>>) -> Link<V> {
    unsafe {
        if let Some(left) = n!(x).left {
            return Some(maximum(left));
        }
        while let Some(parent) = n!(x).parent {
            if n!(parent).right == Some(x) {
                return Some(parent);
            }
            x = parent;
        }
        None
    }
}

/// Point `parent`'s link to `old` (or the root, for no parent) at `new`.
unsafe fn replace_child<V>(parent: Link<V>, old: NonNull<Node<V>>, new: Link<V>, root: &mut Link<V>) {
    match parent {
        None => *root = new,
        Some(p) => unsafe {
            if n!(p).left == Some(old) {
                n!(p).left = new;
            } else {
                n!(p).right = new;
            }
        },
    }
}

/// Rotate `x` down to the left; its right child takes its place.
pub(crate) unsafe fn rotate_left<V>(x: NonNull<Node<V>>, root: &mut Link<V>) {
    unsafe {
        let Some(y) = n!(x).right else { return };
        n!(x).right = n!(y).left;
        if let Some(inner) = n!(y).left {
            n!(inner).parent = Some(x);
        }
        n!(y).parent = n!(x).parent;
        replace_child(n!(x).parent, x, Some(y), root);
        n!(y).left = Some(x);
        n!(x).parent = Some(y);
    }
}

/// Rotate `x` down to the right; its left child takes its place.
pub(crate) unsafe fn rotate_right<V>(x: NonNull<Node<V>>, root: &mut Link<V>) {
    unsafe {
        let Some(y) = n!(x).left else { return };
        n!(x).left = n!(y).right;
        if let Some(inner) = n!(y).right {
            n!(inner).parent = Some(x);
        }
        n!(y).parent = n!(x).parent;
        replace_child(n!(x).parent, x, Some(y), root);
        n!(y).right = Some(x);
        n!(x).parent = Some(y);
    }
}

/// Restore the red-black invariants after linking the fresh node `x`.
///
/// Red uncle: recolor and continue from the grandparent. Black uncle on the
/// near side: rotate into the far case. Black uncle on the far side: recolor
/// and rotate at the grandparent, which ends the fixup.
pub(crate) unsafe fn insert_rebalance<V>(mut x: NonNull<Node<V>>, root: &mut Link<V>) {
    unsafe {
        n!(x).color = Color::Red;
        while let Some(mut parent) = n!(x).parent {
            if n!(parent).color == Color::Black {
                break;
            }
            // A red parent is never the root.
            let Some(grand) = n!(parent).parent else { break };
            if n!(grand).left == Some(parent) {
                let uncle = n!(grand).right;
                if is_red(uncle) {
                    n!(parent).color = Color::Black;
                    set_color(uncle, Color::Black);
                    n!(grand).color = Color::Red;
                    x = grand;
                    continue;
                }
                if n!(parent).right == Some(x) {
                    x = parent;
                    rotate_left(x, root);
                    let Some(p) = n!(x).parent else { break };
                    parent = p;
                }
                n!(parent).color = Color::Black;
                n!(grand).color = Color::Red;
                rotate_right(grand, root);
            } else {
                let uncle = n!(grand).left;
                if is_red(uncle) {
                    n!(parent).color = Color::Black;
                    set_color(uncle, Color::Black);
                    n!(grand).color = Color::Red;
                    x = grand;
                    continue;
                }
                if n!(parent).left == Some(x) {
                    x = parent;
                    rotate_right(x, root);
                    let Some(p) = n!(x).parent else { break };
                    parent = p;
                }
                n!(parent).color = Color::Black;
                n!(grand).color = Color::Red;
                rotate_left(grand, root);
            }
            break;
        }
        set_color(*root, Color::Black);
    }
}

/// Unlink `z` and rebalance. The caller frees `z` afterwards.
///
/// A node with two children trades places with its in-order successor, so
/// cursors to every other node stay valid. The cached extremes are updated when
/// `z` was one of them.
pub(crate) unsafe fn erase_rebalance<V>(
    z: NonNull<Node<V>>,
    root: &mut Link<V>,
    leftmost: &mut Link<V>,
    rightmost: &mut Link<V>,
) {
    unsafe {
        let (z_left, z_right) = (n!(z).left, n!(z).right);
        let (x, mut xp) = match (z_left, z_right) {
            (Some(zl), Some(zr)) => {
                // y takes z's place; x takes y's place.
                let y = minimum(zr);
                let x = n!(y).right;
                n!(zl).parent = Some(y);
                n!(y).left = Some(zl);
                let xp = if y != zr {
                    let yp = n!(y).parent;
                    if let Some(x) = x {
                        n!(x).parent = yp;
                    }
                    if let Some(yp) = yp {
                        n!(yp).left = x;
                    }
                    n!(y).right = Some(zr);
                    n!(zr).parent = Some(y);
                    yp
                } else {
                    Some(y)
                };
                replace_child(n!(z).parent, z, Some(y), root);
                n!(y).parent = n!(z).parent;
                core::mem::swap(&mut n!(y).color, &mut n!(z).color);
                (x, xp)
            }
            _ => {
                let x = z_left.or(z_right);
                let xp = n!(z).parent;
                if let Some(x) = x {
                    n!(x).parent = xp;
                }
                replace_child(xp, z, x, root);
                if *leftmost == Some(z) {
                    *leftmost = match x {
                        Some(x) => Some(minimum(x)),
                        None => xp,
                    };
                }
                if *rightmost == Some(z) {
                    *rightmost = match x {
                        Some(x) => Some(maximum(x)),
                        None => xp,
                    };
                }
                (x, xp)
            }
        };

        // z now carries the color of the position that was physically removed.
        if n!(z).color == Color::Red {
            return;
        }

        let mut x = x;
        while x != *root && !is_red(x) {
            let Some(p) = xp else { break };
            if x == n!(p).left {
                let Some(mut sibling) = n!(p).right else { break };
                if n!(sibling).color == Color::Red {
                    n!(sibling).color = Color::Black;
                    n!(p).color = Color::Red;
                    rotate_left(p, root);
                    let Some(s) = n!(p).right else { break };
                    sibling = s;
                }
                if !is_red(n!(sibling).left) && !is_red(n!(sibling).right) {
                    n!(sibling).color = Color::Red;
                    x = Some(p);
                    xp = n!(p).parent;
                } else {
                    if !is_red(n!(sibling).right) {
                        set_color(n!(sibling).left, Color::Black);
                        n!(sibling).color = Color::Red;
                        rotate_right(sibling, root);
                        let Some(s) = n!(p).right else { break };
                        sibling = s;
                    }
                    n!(sibling).color = n!(p).color;
                    n!(p).color = Color::Black;
                    set_color(n!(sibling).right, Color::Black);
                    rotate_left(p, root);
                    break;
                }
            } else {
                let Some(mut sibling) = n!(p).left else { break };
                if n!(sibling).color == Color::Red {
                    n!(sibling).color = Color::Black;
                    n!(p).color = Color::Red;
                    rotate_right(p, root);
                    let Some(s) = n!(p).left else { break };
                    sibling = s;
                }
                if !is_red(n!(sibling).left) && !is_red(n!(sibling).right) {
                    n!(sibling).color = Color::Red;
                    x = Some(p);
                    xp = n!(p).parent;
                } else {
                    if !is_red(n!(sibling).left) {
                        set_color(n!(sibling).right, Color::Black);
                        n!(sibling).color = Color::Red;
                        rotate_left(sibling, root);
                        let Some(s) = n!(p).left else { break };
                        sibling = s;
                    }
                    n!(sibling).color = n!(p).color;
                    n!(p).color = Color::Black;
                    set_color(n!(sibling).left, Color::Black);
                    rotate_right(p, root);
                    break;
                }
            }
        }
        set_color(x, Color::Black);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::vec::Vec;

    fn leak(value: i32) -> NonNull<Node<i32>> {
        NonNull::from(Box::leak(Box::new(Node::new(value))))
    }

    unsafe fn free(x: Link<i32>) {
        if let Some(node) = x {
            unsafe {
                free(n!(node).left);
                free(n!(node).right);
                drop(Box::from_raw(node.as_ptr()));
            }
        }
    }

    unsafe fn in_order(root: Link<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut cur = root.map(|r| unsafe { minimum(r) });
        while let Some(node) = cur {
            unsafe {
                out.push(n!(node).value);
                cur = successor(node);
            }
        }
        out
    }

    // Plain BST insert followed by the fixup.
    unsafe fn insert(root: &mut Link<i32>, value: i32) -> NonNull<Node<i32>> {
        let z = leak(value);
        unsafe {
            let mut parent = None;
            let mut cur = *root;
            while let Some(node) = cur {
                parent = Some(node);
                cur = if value < n!(node).value { n!(node).left } else { n!(node).right };
            }
            n!(z).parent = parent;
            match parent {
                None => *root = Some(z),
                Some(p) if value < n!(p).value => n!(p).left = Some(z),
                Some(p) => n!(p).right = Some(z),
            }
            insert_rebalance(z, root);
        }
        z
    }

    unsafe fn black_height(x: Link<i32>) -> usize {
        match x {
            None => 1,
            Some(node) => unsafe {
                if n!(node).color == Color::Red {
                    assert!(!is_red(n!(node).left) && !is_red(n!(node).right));
                }
                let left = black_height(n!(node).left);
                assert_eq!(left, black_height(n!(node).right));
                left + usize::from(n!(node).color == Color::Black)
            },
        }
    }

    #[test]
    fn test_rotations_preserve_order() {
        let mut root = None;
        unsafe {
            let a = insert(&mut root, 2);
            insert(&mut root, 1);
            insert(&mut root, 3);
            rotate_left(a, &mut root);
            assert_eq!(n!(root.unwrap()).value, 3);
            assert_eq!(in_order(root), [1, 2, 3]);
            rotate_right(root.unwrap(), &mut root);
            assert_eq!(n!(root.unwrap()).value, 2);
            assert_eq!(in_order(root), [1, 2, 3]);
            free(root);
        }
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let mut root = None;
        unsafe {
            for i in 0..1024 {
                insert(&mut root, i);
            }
            assert!(!is_red(root));
            // 1024 nodes: black height is at most log2(n + 1) + 1.
            assert!(black_height(root) <= 12);
            assert_eq!(in_order(root), (0..1024).collect::<Vec<_>>());
            free(root);
        }
    }

    #[test]
    fn test_erase_every_shape() {
        for victim in 0..64 {
            let mut root = None;
            let mut nodes = Vec::new();
            unsafe {
                for i in [32, 16, 48, 8, 24, 40, 56, 4, 12, 20, 28, 36, 44, 52, 60] {
                    nodes.push(insert(&mut root, i));
                }
                for i in 0..64 {
                    if i % 4 != 0 {
                        nodes.push(insert(&mut root, i));
                    }
                }
                let mut leftmost = root.map(|r| minimum(r));
                let mut rightmost = root.map(|r| maximum(r));
                let Some(&z) = nodes.iter().find(|node| n!(node).value == victim) else {
                    free(root);
                    continue;
                };
                erase_rebalance(z, &mut root, &mut leftmost, &mut rightmost);
                drop(Box::from_raw(z.as_ptr()));

                assert!(!is_red(root));
                black_height(root);
                let expected: Vec<i32> = (1..64).filter(|&i| i != victim).collect();
                assert_eq!(in_order(root), expected);
                assert_eq!(leftmost, root.map(|r| minimum(r)));
                assert_eq!(rightmost, root.map(|r| maximum(r)));
                free(root);
            }
        }
    }

    #[test]
    fn test_neighbours() {
        let mut root = None;
        unsafe {
            let nodes: Vec<_> = [5, 3, 8, 1, 4, 7, 9].iter().map(|&v| insert(&mut root, v)).collect();
            let five = nodes[0];
            assert_eq!(successor(five).map(|node| n!(node).value), Some(7));
            assert_eq!(predecessor(five).map(|node| n!(node).value), Some(4));
            assert_eq!(successor(maximum(five)), None);
            assert_eq!(predecessor(minimum(five)), None);
            free(root);
        }
    }
}
