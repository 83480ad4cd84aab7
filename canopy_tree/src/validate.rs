// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural invariant checks.

use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};

use thiserror::Error;

use crate::BoxTree;
use crate::proxy::Proxy;
use crate::query::STACK_CAPACITY;
use crate::tree::leaf_hash;

bitflags::bitflags! {
    /// Invariant families checked by [`BoxTree::validate`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Checks: u8 {
        /// Every branch box contains the boxes of its children.
        const BOXES      = 0b0000_0001;
        /// Every branch height is one more than its tallest child.
        const HEIGHTS    = 0b0000_0010;
        /// Parent links mirror child links, the root has no parent, and children are in use.
        const PARENTS    = 0b0000_0100;
        /// Free lists hold only unused slots, have no cycles, and cover every unused slot.
        const FREE_LISTS = 0b0000_1000;
        /// The item index and the leaves agree.
        const INDEX      = 0b0001_0000;
    }
}

/// A broken structural invariant, reported by [`BoxTree::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root branch has a parent.
    #[error("root {root} has parent {parent}")]
    RootHasParent {
        /// The root.
        root: Proxy,
        /// Its parent link.
        parent: Proxy,
    },
    /// A child's box sticks out of its parent's box.
    #[error("box of {child} is not inside the box of {branch}")]
    BoxNotContained {
        /// The parent branch.
        branch: Proxy,
        /// The child.
        child: Proxy,
    },
    /// A child's parent link does not point back at the branch that holds it.
    #[error("{node} links to parent {found} but hangs under {expected}")]
    ParentMismatch {
        /// The child.
        node: Proxy,
        /// The branch holding it.
        expected: Proxy,
        /// Its parent link.
        found: Proxy,
    },
    /// A cached height is stale.
    #[error("{branch} has height {found}, expected {expected}")]
    HeightMismatch {
        /// The branch.
        branch: Proxy,
        /// One more than its tallest child.
        expected: u32,
        /// The stored height.
        found: u32,
    },
    /// The hierarchy references a slot that is not in use.
    #[error("{node} is linked into the tree but not in use")]
    UnusedNode {
        /// The slot.
        node: Proxy,
    },
    /// A slot on a free list is in use.
    #[error("{node} is on a free list but in use")]
    UsedNodeOnFreeList {
        /// The slot.
        node: Proxy,
    },
    /// Following a free list visits more slots than the arena has.
    #[error("free list starting at {head} does not terminate")]
    FreeListCycle {
        /// Head of the list.
        head: Proxy,
    },
    /// A free list does not cover exactly the unused slots.
    #[error("free list starting at {head} has {found} slots, expected {expected}")]
    FreeListCount {
        /// Head of the list.
        head: Proxy,
        /// Capacity minus live nodes.
        expected: usize,
        /// Slots on the list.
        found: usize,
    },
    /// An index entry points at a leaf that does not hold a matching item.
    #[error("index entry {node} does not resolve to its own leaf")]
    IndexMismatch {
        /// The leaf the entry points at.
        node: Proxy,
    },
    /// The index and the leaf arena disagree on the item count.
    #[error("index holds {indexed} items but {live} leaves are in use")]
    IndexCount {
        /// Entries in the index.
        indexed: usize,
        /// Leaves in use.
        live: usize,
    },
}

impl<T, F, S> BoxTree<T, F, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    /// Walk the whole structure and report the first broken invariant among `checks`.
    ///
    /// This is `O(capacity)` and has no side effects. With the `validate` feature, debug builds
    /// run it with [`Checks::all`] after every mutation.
    pub fn validate(&self, checks: Checks) -> Result<(), InvariantViolation> {
        if checks.intersects(Checks::BOXES | Checks::HEIGHTS | Checks::PARENTS) {
            self.validate_hierarchy(checks)?;
        }
        if checks.contains(Checks::FREE_LISTS) {
            self.validate_free_lists()?;
        }
        if checks.contains(Checks::INDEX) {
            self.validate_index()?;
        }
        Ok(())
    }

    fn validate_hierarchy(&self, checks: Checks) -> Result<(), InvariantViolation> {
        if self.root.is_free() {
            return Ok(());
        }
        if checks.contains(Checks::PARENTS) {
            let parent = self.arena.branch(self.root).parent;
            if !parent.is_free() {
                return Err(InvariantViolation::RootHasParent {
                    root: self.root,
                    parent,
                });
            }
        }

        let mut stack = Vec::with_capacity(STACK_CAPACITY);
        stack.push(self.root);
        while let Some(branch) = stack.pop() {
            let b = self.arena.branch(branch);
            if !b.used {
                return Err(InvariantViolation::UnusedNode { node: branch });
            }
            for child in [b.child1, b.child2] {
                if child.is_free() {
                    continue;
                }
                if checks.contains(Checks::PARENTS) {
                    let used = if child.is_leaf() {
                        self.arena.leaf(child).item.is_some()
                    } else {
                        self.arena.branch(child).used
                    };
                    if !used {
                        return Err(InvariantViolation::UnusedNode { node: child });
                    }
                    let found = self.parent_of(child);
                    if found != branch {
                        return Err(InvariantViolation::ParentMismatch {
                            node: child,
                            expected: branch,
                            found,
                        });
                    }
                }
                if checks.contains(Checks::BOXES) && !b.bbox.contains(&self.bbox_of(child)) {
                    return Err(InvariantViolation::BoxNotContained { branch, child });
                }
                if child.is_branch() {
                    stack.push(child);
                }
            }
            if checks.contains(Checks::HEIGHTS) {
                let expected = 1 + self.height_of(b.child1).max(self.height_of(b.child2));
                if expected != b.height {
                    return Err(InvariantViolation::HeightMismatch {
                        branch,
                        expected,
                        found: b.height,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_free_lists(&self) -> Result<(), InvariantViolation> {
        let branches = self.arena.branches();
        walk_free_list(
            self.arena.free_branches,
            branches.len(),
            branches.len() - self.arena.branch_count(),
            |p| (branches[p.index()].used, branches[p.index()].parent),
        )?;
        let leaves = self.arena.leaves();
        walk_free_list(
            self.arena.free_leaves,
            leaves.len(),
            leaves.len() - self.arena.leaf_count(),
            |p| (leaves[p.index()].item.is_some(), leaves[p.index()].parent),
        )
    }

    fn validate_index(&self) -> Result<(), InvariantViolation> {
        let live = self.arena.leaf_count();
        if self.index.len() != live {
            return Err(InvariantViolation::IndexCount {
                indexed: self.index.len(),
                live,
            });
        }
        for &node in self.index.iter() {
            let leaf = self.arena.leaf(node);
            let Some(item) = leaf.item.as_ref() else {
                return Err(InvariantViolation::IndexMismatch { node });
            };
            let hash = leaf_hash(&self.hasher, leaf);
            let resolved = self
                .index
                .find(hash, |&p| self.arena.leaf(p).item.as_ref() == Some(item));
            if resolved != Some(&node) {
                return Err(InvariantViolation::IndexMismatch { node });
            }
        }
        Ok(())
    }
}

/// Follow a free list; `slot` returns whether a slot is in use and its link.
fn walk_free_list(
    head: Proxy,
    capacity: usize,
    expected: usize,
    slot: impl Fn(Proxy) -> (bool, Proxy),
) -> Result<(), InvariantViolation> {
    let mut found = 0;
    let mut p = head;
    while !p.is_free() {
        if found >= capacity {
            return Err(InvariantViolation::FreeListCycle { head });
        }
        let (used, next) = slot(p);
        if used {
            return Err(InvariantViolation::UsedNodeOnFreeList { node: p });
        }
        found += 1;
        p = next;
    }
    if found != expected {
        return Err(InvariantViolation::FreeListCount {
            head,
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, row, tree};

    #[test]
    fn fresh_and_populated_trees_are_valid() {
        let mut t = tree();
        t.validate(Checks::all()).unwrap();
        for a in row(100) {
            t.add(a);
        }
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn detects_stale_height() {
        let mut t = tree();
        for a in row(8) {
            t.add(a);
        }
        let root = t.root;
        t.arena.branch_mut(root).height += 1;
        assert!(matches!(
            t.validate(Checks::HEIGHTS),
            Err(InvariantViolation::HeightMismatch { branch, .. }) if branch == root
        ));
        // Other families do not look at heights.
        t.validate(Checks::BOXES | Checks::PARENTS).unwrap();
    }

    #[test]
    fn detects_shrunk_box() {
        let mut t = tree();
        for a in row(8) {
            t.add(a);
        }
        let root = t.root;
        t.arena.branch_mut(root).bbox = crate::Aabb::ZERO;
        assert!(matches!(
            t.validate(Checks::BOXES),
            Err(InvariantViolation::BoxNotContained { branch, .. }) if branch == root
        ));
    }

    #[test]
    fn detects_broken_parent_link() {
        let mut t = tree();
        for a in row(4) {
            t.add(a);
        }
        let child = t.arena.branch(t.root).child1;
        t.set_parent(child, Proxy::FREE);
        assert!(matches!(
            t.validate(Checks::PARENTS),
            Err(InvariantViolation::ParentMismatch { node, .. }) if node == child
        ));
    }

    #[test]
    fn detects_free_list_cycle() {
        let mut t = tree();
        let head = t.arena.free_leaves;
        t.arena.leaf_mut(head).parent = head;
        assert_eq!(
            t.validate(Checks::FREE_LISTS),
            Err(InvariantViolation::FreeListCycle { head })
        );
    }

    #[test]
    fn detects_short_free_list() {
        let mut t = tree();
        t.add(item(0, 0.0, 0.0, 1.0, 1.0));
        let head = t.arena.free_branches;
        t.arena.branch_mut(head).parent = Proxy::FREE;
        assert!(matches!(
            t.validate(Checks::FREE_LISTS),
            Err(InvariantViolation::FreeListCount { found: 1, .. })
        ));
    }

    #[test]
    fn violations_render() {
        let v = InvariantViolation::HeightMismatch {
            branch: Proxy::branch(3),
            expected: 4,
            found: 5,
        };
        assert_eq!(alloc::format!("{v}"), "branch 3 has height 5, expected 4");
    }
}
