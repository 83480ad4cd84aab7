// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unlinking leaves and moving them.

use core::hash::{BuildHasher, Hash};

use canopy_geom::Aabb;
use kurbo::Vec2;

use crate::proxy::Proxy;
use crate::{BoxTree, Error};

impl<T, F, S> BoxTree<T, F, S> {
    /// Unlink `leaf` from the hierarchy, collapsing its parent.
    ///
    /// Only heights are corrected on the way up; boxes are left as they are (they still bound
    /// their subtrees) and no rotations happen. Detached leaves are ignored.
    pub(crate) fn detach_leaf(&mut self, leaf: Proxy) {
        let parent = self.arena.leaf(leaf).parent;
        if parent.is_free() {
            return;
        }
        self.arena.leaf_mut(leaf).parent = Proxy::FREE;

        let p = self.arena.branch(parent);
        let sibling = if p.child1 == leaf { p.child2 } else { p.child1 };
        let grand = p.parent;

        if grand.is_free() {
            debug_assert_eq!(parent, self.root, "parentless branch {parent} is not the root");
            if sibling.is_free() {
                self.arena.free_branch(parent);
                self.root = Proxy::FREE;
            } else if sibling.is_leaf() {
                // Back to a root over a single leaf; its box still covers the sibling.
                self.replace_child(parent, leaf, Proxy::FREE);
                self.arena.branch_mut(parent).height = 2;
            } else {
                self.arena.branch_mut(sibling).parent = Proxy::FREE;
                self.root = sibling;
                self.arena.free_branch(parent);
            }
            return;
        }

        self.replace_child(grand, parent, sibling);
        self.set_parent(sibling, grand);
        self.arena.free_branch(parent);

        let mut index = grand;
        while !index.is_free() {
            let b = self.arena.branch(index);
            let (c1, c2, parent) = (b.child1, b.child2, b.parent);
            let height = 1 + self.height_of(c1).max(self.height_of(c2));
            if height == b.height {
                break;
            }
            self.arena.branch_mut(index).height = height;
            index = parent;
        }
    }
}

impl<T, F, S> BoxTree<T, F, S>
where
    T: Eq + Hash,
    F: Fn(&T) -> Aabb,
    S: BuildHasher,
{
    /// Move `leaf` so that it covers `fresh`, unless its box already does.
    ///
    /// The new box is `fresh` grown by the margin, stretched in the direction the item moved.
    pub(crate) fn update_leaf(&mut self, leaf: Proxy, fresh: Aabb) -> Result<bool, Error> {
        let current = self.arena.leaf(leaf).bbox;
        if current.contains(&fresh) {
            return Ok(false);
        }
        // A detached NaN leaf has no meaningful center to move away from.
        let moved = if current.has_nan() {
            Vec2::ZERO
        } else {
            fresh.center() - current.center()
        };
        let fat = fresh.union(&fresh.grown(self.options.margin).translated(moved));

        // Detaching a linked leaf frees a branch or leaves an empty root slot, so only a
        // detached leaf can need a fresh branch to be linked back in.
        if self.arena.leaf(leaf).parent.is_free() && self.insert_needs_branch(&fat) {
            self.arena.reserve_branch(self.options.growth)?;
        }
        self.detach_leaf(leaf);
        self.arena.leaf_mut(leaf).bbox = fat;
        self.insert_leaf(leaf);
        self.debug_validate();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{item, row, tree, tree_with};
    use crate::{Aabb, Checks, Options};

    #[test]
    fn removing_from_a_two_leaf_root_keeps_the_root() {
        let mut t = tree();
        let a = item(0, 0.0, 0.0, 1.0, 1.0);
        let b = item(1, 4.0, 0.0, 5.0, 1.0);
        t.add(a);
        t.add(b);
        let root = t.root;
        assert!(t.remove(&a));
        assert_eq!(t.root, root);
        assert_eq!(t.height(), 2);
        assert_eq!(t.branch_count(), 1);
        t.validate(Checks::all()).unwrap();

        // The free slot is reused by the next insertion.
        t.add(item(2, 8.0, 0.0, 9.0, 1.0));
        assert_eq!(t.branch_count(), 1);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn removing_the_last_item_empties_the_tree() {
        let mut t = tree();
        let a = item(0, 0.0, 0.0, 1.0, 1.0);
        t.add(a);
        assert!(t.remove(&a));
        assert!(t.root.is_free());
        assert_eq!(t.branch_count(), 0);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn sibling_branch_becomes_root() {
        let mut t = tree_with(Options::default().with_margin(0.0));
        t.add(item(0, 0.0, 0.0, 1.0, 1.0));
        t.add(item(1, 2.0, 0.0, 3.0, 1.0));
        let far = item(2, 100.0, 100.0, 101.0, 101.0);
        t.add(far);
        assert_eq!(t.height(), 3);
        assert!(t.remove(&far));
        assert_eq!(t.height(), 2);
        assert_eq!(t.branch_count(), 1);
        assert!(t.arena.branch(t.root).parent.is_free());
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn removal_only_fixes_heights() {
        let mut t = tree();
        for a in row(64) {
            t.add(a);
        }
        let root_box = t.arena.branch(t.root).bbox;
        for a in row(64).filter(|a| a.id % 2 == 0) {
            assert!(t.remove(&a));
            t.validate(Checks::all()).unwrap();
        }
        assert_eq!(t.len(), 32);
        // Boxes are never shrunk by removal; the root is the old root or one of its descendants.
        assert!(root_box.contains(&t.arena.branch(t.root).bbox));
    }

    #[test]
    fn update_fast_path_keeps_box() {
        let mut t = tree_with(Options::default().with_margin(1.0));
        t.add(item(0, 0.0, 0.0, 2.0, 2.0));
        let before = t.get_box(&item(0, 0.0, 0.0, 0.0, 0.0)).unwrap();
        assert!(!t.update(&item(0, 0.25, 0.25, 2.25, 2.25)));
        assert_eq!(t.get_box(&item(0, 0.0, 0.0, 0.0, 0.0)), Some(before));
        // The stored value is not replaced by update.
        assert_eq!(
            t.get(&item(0, 0.0, 0.0, 0.0, 0.0)).map(|a| a.bbox),
            Some(Aabb::new(0.0, 0.0, 2.0, 2.0))
        );
    }

    #[test]
    fn update_stretches_along_motion() {
        let mut t = tree_with(Options::default().with_margin(1.0));
        t.add(item(0, 0.0, 0.0, 2.0, 2.0));
        t.add(item(1, 10.0, 10.0, 12.0, 12.0));
        // Fattened: (-0.5, -0.5, 2.5, 2.5), centred on (1, 1). Move right by 4.
        assert!(t.update(&item(0, 4.0, 0.0, 6.0, 2.0)));
        // grown: (3.5, -0.5, 6.5, 2.5), translated by (4, 0): (7.5, -0.5, 10.5, 2.5),
        // union with the fresh box.
        assert_eq!(
            t.get_box(&item(0, 0.0, 0.0, 0.0, 0.0)),
            Some(Aabb::new(4.0, -0.5, 10.5, 2.5))
        );
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn update_of_missing_item_is_a_no_op() {
        let mut t = tree();
        t.add(item(0, 0.0, 0.0, 1.0, 1.0));
        assert!(!t.update(&item(5, 3.0, 3.0, 4.0, 4.0)));
        assert!(!t.contains(&item(5, 0.0, 0.0, 0.0, 0.0)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn update_relinks_nan_leaves() {
        let mut t = tree();
        t.add(item(0, f64::NAN, 0.0, 1.0, 1.0));
        assert_eq!(t.branch_count(), 0);
        assert!(t.update(&item(0, 0.0, 0.0, 1.0, 1.0)));
        assert_eq!(t.branch_count(), 1);
        t.validate(Checks::all()).unwrap();
        // And a linked leaf that turns NaN is unlinked.
        assert!(t.update(&item(0, f64::NAN, f64::NAN, 1.0, 1.0)));
        assert_eq!(t.branch_count(), 0);
        assert!(t.contains(&item(0, 0.0, 0.0, 0.0, 0.0)));
        t.validate(Checks::all()).unwrap();
    }
}
