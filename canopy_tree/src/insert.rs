// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linking leaves into the hierarchy: sibling selection, splitting, and rebalancing.

use canopy_geom::Aabb;

use crate::BoxTree;
use crate::proxy::Proxy;

impl<T, F, S> BoxTree<T, F, S> {
    /// Box of a leaf or branch.
    #[inline]
    pub(crate) fn bbox_of(&self, p: Proxy) -> Aabb {
        if p.is_leaf() {
            self.arena.leaf(p).bbox
        } else {
            self.arena.branch(p).bbox
        }
    }

    /// Subtree height: 0 for an empty slot, 1 for a leaf.
    #[inline]
    pub(crate) fn height_of(&self, p: Proxy) -> u32 {
        if p.is_free() {
            0
        } else if p.is_leaf() {
            1
        } else {
            self.arena.branch(p).height
        }
    }

    #[inline]
    pub(crate) fn parent_of(&self, p: Proxy) -> Proxy {
        if p.is_leaf() {
            self.arena.leaf(p).parent
        } else {
            self.arena.branch(p).parent
        }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, p: Proxy, parent: Proxy) {
        if p.is_leaf() {
            self.arena.leaf_mut(p).parent = parent;
        } else {
            self.arena.branch_mut(p).parent = parent;
        }
    }

    /// Point whichever child slot of `branch` holds `old` at `new`.
    pub(crate) fn replace_child(&mut self, branch: Proxy, old: Proxy, new: Proxy) {
        let b = self.arena.branch_mut(branch);
        if b.child1 == old {
            b.child1 = new;
        } else {
            debug_assert_eq!(b.child2, old, "{old} is not a child of {branch}");
            b.child2 = new;
        }
    }

    /// Put `new` where `old` hangs: under `old`'s parent, or at the root.
    fn replace_in_parent(&mut self, parent: Proxy, old: Proxy, new: Proxy) {
        if parent.is_free() {
            self.root = new;
        } else {
            self.replace_child(parent, old, new);
        }
    }

    /// Recompute the box and height of `branch` from its children.
    ///
    /// A branch with a single child bounds it with the margin, like a fresh root.
    fn refit(&mut self, branch: Proxy) {
        let b = self.arena.branch(branch);
        let (c1, c2) = (b.child1, b.child2);
        let bbox = match (c1.is_free(), c2.is_free()) {
            (false, false) => self.bbox_of(c1).union(&self.bbox_of(c2)),
            (false, true) => self.bbox_of(c1).grown(self.options.margin),
            (true, false) => self.bbox_of(c2).grown(self.options.margin),
            (true, true) => b.bbox,
        };
        let height = 1 + self.height_of(c1).max(self.height_of(c2));
        let b = self.arena.branch_mut(branch);
        b.bbox = bbox;
        b.height = height;
    }

    /// Whether linking a detached leaf with box `bbox` allocates a branch.
    ///
    /// It does unless the box is NaN or the root still has an empty child slot.
    pub(crate) fn insert_needs_branch(&self, bbox: &Aabb) -> bool {
        if bbox.has_nan() {
            return false;
        }
        if self.root.is_free() {
            return true;
        }
        let root = self.arena.branch(self.root);
        !root.child1.is_free() && !root.child2.is_free()
    }

    /// Link a detached leaf into the hierarchy.
    ///
    /// Leaves whose box has a NaN coordinate stay detached.
    pub(crate) fn insert_leaf(&mut self, leaf: Proxy) {
        let leaf_box = self.arena.leaf(leaf).bbox;
        debug_assert!(self.arena.leaf(leaf).parent.is_free(), "{leaf} is already linked");
        if leaf_box.has_nan() {
            log::warn!("{leaf} has a NaN box and stays out of the tree");
            return;
        }

        if self.root.is_free() {
            let root = self.arena.allocate_branch();
            let b = self.arena.branch_mut(root);
            b.child1 = leaf;
            b.bbox = leaf_box.grown(self.options.margin);
            b.height = 2;
            self.arena.leaf_mut(leaf).parent = root;
            self.root = root;
            return;
        }

        let mut index = self.root;
        loop {
            let b = self.arena.branch(index);
            let (c1, c2, bbox) = (b.child1, b.child2, b.bbox);

            if c1.is_free() || c2.is_free() {
                self.fill_free_slot(index, leaf, &leaf_box);
                return;
            }

            let combined = bbox.union(&leaf_box);
            let combined_perimeter = combined.perimeter();
            // Cost of making a new parent for this node and the leaf.
            let cost = 2.0 * combined_perimeter;
            // Minimum cost of pushing the leaf further down the tree.
            let inherit = 2.0 * (combined_perimeter - bbox.perimeter());
            let cost1 = inherit + self.descend_cost(c1, &leaf_box);
            let cost2 = inherit + self.descend_cost(c2, &leaf_box);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost2 < cost1 { c2 } else { c1 };
            if index.is_leaf() {
                break;
            }
        }

        self.split(index, leaf, leaf_box);
    }

    /// Growth in perimeter caused by adding `leaf_box` under `child`.
    #[inline]
    fn descend_cost(&self, child: Proxy, leaf_box: &Aabb) -> f64 {
        let child_box = self.bbox_of(child);
        leaf_box.union(&child_box).perimeter() - child_box.perimeter()
    }

    /// Put `leaf` into the empty child slot of a branch that has only one child.
    fn fill_free_slot(&mut self, branch: Proxy, leaf: Proxy, leaf_box: &Aabb) {
        let b = self.arena.branch_mut(branch);
        if b.child1.is_free() {
            b.child1 = leaf;
        } else {
            b.child2 = leaf;
        }
        let grew = !b.bbox.contains(leaf_box);
        if grew {
            b.bbox = b.bbox.union(leaf_box);
        }
        let parent = b.parent;
        self.arena.leaf_mut(leaf).parent = branch;
        let (c1, c2) = {
            let b = self.arena.branch(branch);
            (b.child1, b.child2)
        };
        let height = 1 + self.height_of(c1).max(self.height_of(c2));
        self.arena.branch_mut(branch).height = height;
        if grew {
            self.fix_upwards(parent);
        }
    }

    /// Give `sibling` and `leaf` a new common parent in `sibling`'s place.
    fn split(&mut self, sibling: Proxy, leaf: Proxy, leaf_box: Aabb) {
        let old_parent = self.parent_of(sibling);
        let sibling_box = self.bbox_of(sibling);
        let sibling_height = self.height_of(sibling);

        let new_parent = self.arena.allocate_branch();
        let b = self.arena.branch_mut(new_parent);
        b.parent = old_parent;
        b.child1 = sibling;
        b.child2 = leaf;
        b.bbox = leaf_box.union(&sibling_box);
        b.height = 1 + sibling_height;

        self.replace_in_parent(old_parent, sibling, new_parent);
        self.set_parent(sibling, new_parent);
        self.arena.leaf_mut(leaf).parent = new_parent;

        self.fix_upwards(new_parent);
    }

    /// Balance and refit every branch from `index` up to the root.
    pub(crate) fn fix_upwards(&mut self, mut index: Proxy) {
        while !index.is_free() {
            index = self.balance(index);
            self.refit(index);
            index = self.arena.branch(index).parent;
        }
    }

    /// Rotate the taller grandchild subtree up when the children of `a` differ in height by
    /// more than one. Returns the branch now in `a`'s place.
    ///
    /// Subtrees next to a leaf are never rotated: both children of `a` and both children of
    /// the promoted one must be branches.
    fn balance(&mut self, a: Proxy) -> Proxy {
        let node = self.arena.branch(a);
        let (b, c) = (node.child1, node.child2);
        if !b.is_branch() || !c.is_branch() {
            return a;
        }
        let hb = self.arena.branch(b).height;
        let hc = self.arena.branch(c).height;
        let (up, stay, up_was_child2) = if hc > hb + 1 {
            (c, b, true)
        } else if hb > hc + 1 {
            (b, c, false)
        } else {
            return a;
        };
        let u = self.arena.branch(up);
        if !u.child1.is_branch() || !u.child2.is_branch() {
            return a;
        }
        log::trace!("rotating {up} above {a}");
        self.rotate_up(a, up, stay, up_was_child2);
        up
    }

    /// Move `up` (a child of `a`) into `a`'s place; `a` becomes `up`'s first child and keeps
    /// `stay`. Of `up`'s children the taller stays under `up`, the shorter moves to `a` in the
    /// slot `up` vacated. `up_was_child2` names that slot.
    fn rotate_up(&mut self, a: Proxy, up: Proxy, stay: Proxy, up_was_child2: bool) {
        let (f, g) = {
            let u = self.arena.branch(up);
            (u.child1, u.child2)
        };
        let grand = self.arena.branch(a).parent;

        // `up` takes `a`'s place.
        self.arena.branch_mut(up).child1 = a;
        self.arena.branch_mut(up).parent = grand;
        self.arena.branch_mut(a).parent = up;
        self.replace_in_parent(grand, a, up);

        let (keep, give) = if self.height_of(f) > self.height_of(g) {
            (f, g)
        } else {
            (g, f)
        };
        self.arena.branch_mut(up).child2 = keep;
        if up_was_child2 {
            self.arena.branch_mut(a).child2 = give;
        } else {
            self.arena.branch_mut(a).child1 = give;
        }
        self.set_parent(give, a);

        let a_box = self.bbox_of(stay).union(&self.bbox_of(give));
        let a_height = 1 + self.height_of(stay).max(self.height_of(give));
        {
            let n = self.arena.branch_mut(a);
            n.bbox = a_box;
            n.height = a_height;
        }
        let up_box = a_box.union(&self.bbox_of(keep));
        let up_height = 1 + a_height.max(self.height_of(keep));
        let n = self.arena.branch_mut(up);
        n.bbox = up_box;
        n.height = up_height;
    }
}

#[cfg(test)]
mod tests {
    use crate::proxy::Proxy;
    use crate::testing::{TestTree, item, row, tree, tree_with};
    use crate::{Aabb, Checks, Options};

    #[test]
    fn second_item_fills_the_root() {
        let mut t = tree();
        t.add(item(0, 0.0, 0.0, 1.0, 1.0));
        t.add(item(1, 4.0, 0.0, 5.0, 1.0));
        assert_eq!(t.branch_count(), 1);
        assert_eq!(t.height(), 2);
        let root = t.arena.branch(t.root);
        assert!(root.child1.is_leaf() && root.child2.is_leaf());
        assert!(root.bbox.contains(&Aabb::new(0.0, 0.0, 5.0, 1.0)));
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn third_item_splits() {
        let mut t = tree();
        for a in row(3) {
            t.add(a);
        }
        assert_eq!(t.branch_count(), 2);
        assert_eq!(t.height(), 3);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn sorted_insertions_keep_invariants() {
        let mut t = tree_with(Options::default().with_capacity(16).with_growth(|c| c * 2));
        for a in row(1024) {
            t.add(a);
            t.validate(Checks::HEIGHTS | Checks::BOXES).unwrap();
        }
        assert_eq!(t.branch_count(), 1023);
        assert_eq!(t.len(), 1024);
        t.validate(Checks::all()).unwrap();
    }

    fn unit_leaf(t: &mut TestTree, id: u32) -> Proxy {
        let x = f64::from(id) * 2.0;
        t.arena.allocate_leaf(Aabb::new(x, 0.0, x + 1.0, 1.0), item(id, x, 0.0, x + 1.0, 1.0))
    }

    fn join(t: &mut TestTree, c1: Proxy, c2: Proxy) -> Proxy {
        let p = t.arena.allocate_branch();
        let bbox = t.bbox_of(c1).union(&t.bbox_of(c2));
        let height = 1 + t.height_of(c1).max(t.height_of(c2));
        let b = t.arena.branch_mut(p);
        b.child1 = c1;
        b.child2 = c2;
        b.bbox = bbox;
        b.height = height;
        t.set_parent(c1, p);
        t.set_parent(c2, p);
        p
    }

    /// `a` over a height-2 branch and a height-4 branch whose first child is `f`.
    fn lopsided(t: &mut TestTree, f: Proxy) -> (Proxy, Proxy) {
        let (l0, l1, l2, l3, l4) = (
            unit_leaf(t, 0),
            unit_leaf(t, 1),
            unit_leaf(t, 2),
            unit_leaf(t, 3),
            unit_leaf(t, 4),
        );
        let b = join(t, l0, l1);
        let g1 = join(t, l2, l3);
        let g = join(t, g1, l4);
        let c = join(t, f, g);
        let a = join(t, b, c);
        t.root = a;
        (a, c)
    }

    #[test]
    fn promoted_branch_with_a_leaf_child_is_not_rotated() {
        let mut t = tree();
        let f = unit_leaf(&mut t, 5);
        let (a, c) = lopsided(&mut t, f);
        assert_eq!(t.height(), 5);
        assert_eq!(t.balance(a), a);
        assert_eq!(t.root, a);
        assert_eq!(t.arena.branch(a).child2, c);
        assert_eq!(t.arena.branch(c).child1, f);
        assert_eq!(t.parent_of(f), c);
        t.validate(Checks::BOXES | Checks::HEIGHTS | Checks::PARENTS).unwrap();
    }

    #[test]
    fn promoted_branch_over_branches_is_rotated() {
        let mut t = tree();
        let (l5, l6) = (unit_leaf(&mut t, 5), unit_leaf(&mut t, 6));
        let f = join(&mut t, l5, l6);
        let (a, c) = lopsided(&mut t, f);
        assert_eq!(t.balance(a), c);
        assert_eq!(t.root, c);
        // The taller grandchild stays under `c`, the shorter one moves under `a`.
        assert_eq!(t.arena.branch(c).child1, a);
        assert_eq!(t.arena.branch(a).child2, f);
        assert_eq!(t.height(), 4);
        t.validate(Checks::BOXES | Checks::HEIGHTS | Checks::PARENTS).unwrap();
    }

    #[test]
    fn nan_leaves_stay_detached() {
        let mut t = tree();
        let bad = item(7, f64::NAN, 0.0, 1.0, 1.0);
        assert!(t.add(bad));
        assert!(t.contains(&bad));
        assert_eq!(t.branch_count(), 0);
        assert_eq!(t.height(), 0);
        t.add(item(8, 0.0, 0.0, 1.0, 1.0));
        t.validate(Checks::all()).unwrap();
        assert!(t.remove(&bad));
        assert!(!t.contains(&bad));
        assert_eq!(t.len(), 1);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn fix_upwards_keeps_boxes_tight_after_split() {
        let mut t = tree_with(Options::default().with_margin(0.0));
        t.add(item(0, 0.0, 0.0, 1.0, 1.0));
        t.add(item(1, 2.0, 0.0, 3.0, 1.0));
        t.add(item(2, 10.0, 10.0, 11.0, 11.0));
        let root = t.arena.branch(t.root);
        assert_eq!(root.bbox, Aabb::new(0.0, 0.0, 11.0, 11.0));
    }
}
