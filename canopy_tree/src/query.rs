// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack-based box, point, and ray queries.

use alloc::vec::Vec;

use canopy_geom::{Aabb, Ray, RayHit};
use kurbo::Point;

use crate::BoxTree;
use crate::proxy::Proxy;

/// Initial capacity of traversal stacks.
pub(crate) const STACK_CAPACITY: usize = 256;

/// Shape a query searches with.
///
/// Branches are pruned with [`Probe::overlaps`]; leaves that survive are tested with
/// [`Probe::hit`], which also produces the per-item result.
pub trait Probe {
    /// What a successful leaf test reports.
    type Hit;

    /// Whether anything under a node with box `bbox` can be hit.
    fn overlaps(&self, bbox: &Aabb) -> bool;

    /// Test a leaf or item box.
    fn hit(&self, bbox: &Aabb) -> Option<Self::Hit>;
}

impl Probe for Aabb {
    type Hit = ();

    #[inline]
    fn overlaps(&self, bbox: &Aabb) -> bool {
        self.intersects(bbox)
    }

    #[inline]
    fn hit(&self, bbox: &Aabb) -> Option<()> {
        self.intersects(bbox).then_some(())
    }
}

impl Probe for Point {
    type Hit = ();

    #[inline]
    fn overlaps(&self, bbox: &Aabb) -> bool {
        bbox.contains_point(*self)
    }

    #[inline]
    fn hit(&self, bbox: &Aabb) -> Option<()> {
        bbox.contains_point(*self).then_some(())
    }
}

impl Probe for Ray {
    type Hit = RayHit;

    #[inline]
    fn overlaps(&self, bbox: &Aabb) -> bool {
        self.intersect(bbox).is_some()
    }

    #[inline]
    fn hit(&self, bbox: &Aabb) -> Option<RayHit> {
        self.intersect(bbox)
    }
}

/// Lazy query over a [`BoxTree`], see [`BoxTree::query`].
pub struct Query<'a, T, F, S, P> {
    tree: &'a BoxTree<T, F, S>,
    probe: P,
    approx: bool,
    stack: Vec<Proxy>,
}

impl<T, F, S, P: core::fmt::Debug> core::fmt::Debug for Query<'_, T, F, S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Query")
            .field("probe", &self.probe)
            .field("approx", &self.approx)
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T, F, S, P> Iterator for Query<'a, T, F, S, P>
where
    F: Fn(&T) -> Aabb,
    P: Probe,
{
    type Item = (&'a T, P::Hit);

    fn next(&mut self) -> Option<Self::Item> {
        let tree: &'a BoxTree<T, F, S> = self.tree;
        let arena = &tree.arena;
        while let Some(p) = self.stack.pop() {
            if p.is_leaf() {
                let leaf = arena.leaf(p);
                let Some(item) = leaf.item.as_ref() else {
                    continue;
                };
                let Some(hit) = self.probe.hit(&leaf.bbox) else {
                    continue;
                };
                if self.approx {
                    return Some((item, hit));
                }
                if let Some(hit) = self.probe.hit(&(tree.extract)(item)) {
                    return Some((item, hit));
                }
            } else if p.is_branch() {
                let b = arena.branch(p);
                if self.probe.overlaps(&b.bbox) {
                    if !b.child1.is_free() {
                        self.stack.push(b.child1);
                    }
                    if !b.child2.is_free() {
                        self.stack.push(b.child2);
                    }
                }
            }
        }
        None
    }
}

impl<T, F, S> BoxTree<T, F, S>
where
    F: Fn(&T) -> Aabb,
{
    /// Lazily find every item hit by `probe`.
    ///
    /// With `approx` set, an item is reported as soon as its fattened leaf box is hit; otherwise
    /// its precise box is extracted and tested as well. Order is unspecified.
    pub fn query<P: Probe>(&self, probe: P, approx: bool) -> Query<'_, T, F, S, P> {
        let mut stack = Vec::with_capacity(STACK_CAPACITY);
        if !self.root.is_free() {
            stack.push(self.root);
        }
        Query {
            tree: self,
            probe,
            approx,
            stack,
        }
    }

    /// Items whose box intersects `bbox`.
    ///
    /// ```
    /// use canopy_tree::{Aabb, BoxTree};
    ///
    /// let boxes = [Aabb::new(0.0, 0.0, 1.0, 1.0), Aabb::new(4.0, 4.0, 5.0, 5.0)];
    /// let mut tree = BoxTree::new(|&i: &usize| boxes[i]);
    /// tree.add(0);
    /// tree.add(1);
    /// let hits: Vec<_> = tree.query_box(Aabb::new(0.5, 0.5, 2.0, 2.0), false).collect();
    /// assert_eq!(hits, [&0]);
    /// ```
    pub fn query_box(&self, bbox: Aabb, approx: bool) -> impl Iterator<Item = &T> + '_ {
        self.query(bbox, approx).map(|(item, ())| item)
    }

    /// Items whose box contains `point`.
    pub fn query_point(&self, point: Point, approx: bool) -> impl Iterator<Item = &T> + '_ {
        self.query(point, approx).map(|(item, ())| item)
    }

    /// Items hit by `ray`, with the entry point into each.
    ///
    /// Hits are not sorted by distance.
    pub fn query_ray(&self, ray: Ray, approx: bool) -> Query<'_, T, F, S, Ray> {
        self.query(ray, approx)
    }

    /// Call `f` for each item whose box intersects `bbox` until it returns `false`.
    pub fn query_box_with(&self, bbox: Aabb, approx: bool, mut f: impl FnMut(&T) -> bool) {
        for item in self.query_box(bbox, approx) {
            if !f(item) {
                break;
            }
        }
    }

    /// Call `f` for each item whose box contains `point` until it returns `false`.
    pub fn query_point_with(&self, point: Point, approx: bool, mut f: impl FnMut(&T) -> bool) {
        for item in self.query_point(point, approx) {
            if !f(item) {
                break;
            }
        }
    }

    /// Call `f` for each item hit by `ray` until it returns `false`.
    ///
    /// Returns whether any item was hit.
    pub fn query_ray_with(
        &self,
        ray: Ray,
        approx: bool,
        mut f: impl FnMut(&T, RayHit) -> bool,
    ) -> bool {
        let mut any = false;
        for (item, hit) in self.query_ray(ray, approx) {
            any = true;
            if !f(item, hit) {
                break;
            }
        }
        any
    }
}
