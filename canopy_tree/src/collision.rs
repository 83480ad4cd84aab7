// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! All-pairs overlap enumeration.

use alloc::vec::Vec;

use canopy_geom::Aabb;
use hashbrown::HashSet;

use crate::BoxTree;
use crate::proxy::Proxy;
use crate::query::STACK_CAPACITY;

/// Lazy enumeration of overlapping item pairs, see [`BoxTree::collisions`].
pub struct Collisions<'a, T, F, S> {
    tree: &'a BoxTree<T, F, S>,
    approx: bool,
    /// Next leaf slot to probe with.
    cursor: usize,
    /// Leaf being probed with, and the box it probes with.
    current: Option<(Proxy, Aabb)>,
    stack: Vec<Proxy>,
    seen: HashSet<(Proxy, Proxy)>,
}

impl<T, F, S> core::fmt::Debug for Collisions<'_, T, F, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collisions")
            .field("approx", &self.approx)
            .field("cursor", &self.cursor)
            .field("reported", &self.seen.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T, F, S> Collisions<'a, T, F, S>
where
    F: Fn(&T) -> Aabb,
{
    /// Move to the next linked leaf and seed the stack with the root.
    fn advance(&mut self) -> bool {
        let tree: &'a BoxTree<T, F, S> = self.tree;
        let leaves = tree.arena.leaves();
        while self.cursor < leaves.len() {
            let idx = self.cursor;
            self.cursor += 1;
            let leaf = &leaves[idx];
            let Some(item) = leaf.item.as_ref() else {
                continue;
            };
            if leaf.parent.is_free() {
                continue;
            }
            let probe = if self.approx {
                leaf.bbox
            } else {
                (tree.extract)(item)
            };
            self.stack.clear();
            self.stack.push(tree.root);
            self.current = Some((Proxy::leaf(idx), probe));
            return true;
        }
        false
    }
}

impl<'a, T, F, S> Iterator for Collisions<'a, T, F, S>
where
    F: Fn(&T) -> Aabb,
{
    type Item = (&'a T, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree: &'a BoxTree<T, F, S> = self.tree;
        let arena = &tree.arena;
        loop {
            let Some((me, probe)) = self.current else {
                if self.advance() {
                    continue;
                }
                return None;
            };
            while let Some(p) = self.stack.pop() {
                if p.is_branch() {
                    let b = arena.branch(p);
                    if probe.intersects(&b.bbox) {
                        if !b.child1.is_free() {
                            self.stack.push(b.child1);
                        }
                        if !b.child2.is_free() {
                            self.stack.push(b.child2);
                        }
                    }
                    continue;
                }
                if p == me || !p.is_leaf() {
                    continue;
                }
                let leaf = arena.leaf(p);
                let Some(other) = leaf.item.as_ref() else {
                    continue;
                };
                if !probe.intersects(&leaf.bbox) {
                    continue;
                }
                if !self.approx && !probe.intersects(&(tree.extract)(other)) {
                    continue;
                }
                let pair = if me < p { (me, p) } else { (p, me) };
                if self.seen.insert(pair) {
                    let first = arena.leaf(pair.0).item.as_ref();
                    let second = arena.leaf(pair.1).item.as_ref();
                    if let (Some(first), Some(second)) = (first, second) {
                        return Some((first, second));
                    }
                }
            }
            self.current = None;
        }
    }
}

impl<T, F, S> BoxTree<T, F, S>
where
    F: Fn(&T) -> Aabb,
{
    /// Lazily enumerate every pair of distinct items whose boxes overlap.
    ///
    /// Each pair is reported once, in slot order of its two leaves. With `approx` set the
    /// fattened leaf boxes are compared; otherwise the precise boxes are.
    ///
    /// Items whose box contains NaN never collide.
    ///
    /// ```
    /// use canopy_tree::{Aabb, BoxTree};
    ///
    /// let boxes = [
    ///     Aabb::new(0.0, 0.0, 2.0, 2.0),
    ///     Aabb::new(1.0, 1.0, 3.0, 3.0),
    ///     Aabb::new(9.0, 9.0, 10.0, 10.0),
    /// ];
    /// let mut tree = BoxTree::new(|&i: &usize| boxes[i]);
    /// for i in 0..3 {
    ///     tree.add(i);
    /// }
    /// let pairs: Vec<_> = tree.collisions(false).collect();
    /// assert_eq!(pairs, [(&0, &1)]);
    /// ```
    pub fn collisions(&self, approx: bool) -> Collisions<'_, T, F, S> {
        Collisions {
            tree: self,
            approx,
            cursor: 0,
            current: None,
            stack: Vec::with_capacity(STACK_CAPACITY),
            seen: HashSet::new(),
        }
    }

    /// Call `f` for each overlapping pair until it returns `false`.
    pub fn collisions_with(&self, approx: bool, mut f: impl FnMut(&T, &T) -> bool) {
        for (a, b) in self.collisions(approx) {
            if !f(a, b) {
                break;
            }
        }
    }
}
