// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node storage: two growable slot arrays with intrusive free lists.
//!
//! Slots never move. A free slot keeps the proxy of the next free slot in its `parent` field,
//! and the list heads live in [`Arena::free_branches`] and [`Arena::free_leaves`].

use alloc::vec::Vec;

use canopy_geom::Aabb;

use crate::Error;
use crate::proxy::Proxy;

/// Largest slot count either arena can have.
pub(crate) const MAX_CAPACITY: usize = Proxy::MAX_INDEX + 1;

/// Internal node.
#[derive(Clone, Debug)]
pub(crate) struct Branch {
    pub(crate) bbox: Aabb,
    /// Parent branch, or the next free branch while unused.
    pub(crate) parent: Proxy,
    pub(crate) child1: Proxy,
    pub(crate) child2: Proxy,
    pub(crate) height: u32,
    pub(crate) used: bool,
}

impl Branch {
    const fn unused(next: Proxy) -> Self {
        Self {
            bbox: Aabb::ZERO,
            parent: next,
            child1: Proxy::FREE,
            child2: Proxy::FREE,
            height: 0,
            used: false,
        }
    }
}

/// Item-holding node. A leaf is in use exactly when it holds an item.
#[derive(Clone, Debug)]
pub(crate) struct Leaf<T> {
    /// Fattened box.
    pub(crate) bbox: Aabb,
    /// Parent branch; [`Proxy::FREE`] for a detached leaf, the next free leaf while unused.
    pub(crate) parent: Proxy,
    pub(crate) item: Option<T>,
}

impl<T> Leaf<T> {
    const fn unused(next: Proxy) -> Self {
        Self {
            bbox: Aabb::ZERO,
            parent: next,
            item: None,
        }
    }
}

pub(crate) struct Arena<T> {
    branches: Vec<Branch>,
    leaves: Vec<Leaf<T>>,
    pub(crate) free_branches: Proxy,
    pub(crate) free_leaves: Proxy,
    branch_count: usize,
    leaf_count: usize,
}

impl<T> core::fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("branches", &self.branch_count)
            .field("branch_capacity", &self.branches.len())
            .field("leaves", &self.leaf_count)
            .field("leaf_capacity", &self.leaves.len())
            .finish_non_exhaustive()
    }
}

/// Ask `growth` for the capacity that follows `current`.
fn next_capacity(current: usize, growth: fn(usize) -> usize) -> Result<usize, Error> {
    let proposed = growth(current);
    if proposed <= current {
        return Err(Error::GrowthNotIncreasing { current, proposed });
    }
    if proposed > MAX_CAPACITY {
        return Err(Error::CapacityOverflow {
            requested: proposed,
        });
    }
    Ok(proposed)
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(leaves: usize, branches: usize) -> Self {
        let mut arena = Self {
            branches: Vec::new(),
            leaves: Vec::new(),
            free_branches: Proxy::FREE,
            free_leaves: Proxy::FREE,
            branch_count: 0,
            leaf_count: 0,
        };
        arena.grow_leaves(leaves);
        arena.grow_branches(branches);
        arena
    }

    /// Drop every node and relink all slots at the current capacities.
    pub(crate) fn reset(&mut self) {
        let leaves = self.leaves.len();
        let branches = self.branches.len();
        *self = Self::with_capacity(leaves, branches);
    }

    pub(crate) fn leaf_capacity(&self) -> usize {
        self.leaves.len()
    }

    pub(crate) fn branch_capacity(&self) -> usize {
        self.branches.len()
    }

    pub(crate) fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub(crate) fn branch_count(&self) -> usize {
        self.branch_count
    }

    #[inline]
    pub(crate) fn branch(&self, p: Proxy) -> &Branch {
        debug_assert!(p.is_branch(), "{p} is not a branch");
        &self.branches[p.index()]
    }

    #[inline]
    pub(crate) fn branch_mut(&mut self, p: Proxy) -> &mut Branch {
        debug_assert!(p.is_branch(), "{p} is not a branch");
        &mut self.branches[p.index()]
    }

    #[inline]
    pub(crate) fn leaf(&self, p: Proxy) -> &Leaf<T> {
        debug_assert!(p.is_leaf(), "{p} is not a leaf");
        &self.leaves[p.index()]
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, p: Proxy) -> &mut Leaf<T> {
        debug_assert!(p.is_leaf(), "{p} is not a leaf");
        &mut self.leaves[p.index()]
    }

    pub(crate) fn leaves(&self) -> &[Leaf<T>] {
        &self.leaves
    }

    pub(crate) fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Make sure the next [`Arena::allocate_leaf`] finds a free slot.
    pub(crate) fn reserve_leaf(&mut self, growth: fn(usize) -> usize) -> Result<(), Error> {
        if self.free_leaves.is_free() {
            let capacity = next_capacity(self.leaves.len(), growth)?;
            self.grow_leaves(capacity);
        }
        Ok(())
    }

    /// Make sure the next [`Arena::allocate_branch`] finds a free slot.
    pub(crate) fn reserve_branch(&mut self, growth: fn(usize) -> usize) -> Result<(), Error> {
        if self.free_branches.is_free() {
            let capacity = next_capacity(self.branches.len(), growth)?;
            self.grow_branches(capacity);
        }
        Ok(())
    }

    /// Grow the leaf array to `capacity` slots and push the new tail onto the free list.
    ///
    /// Does nothing when `capacity` is not larger than the current one. Callers check
    /// `capacity <= MAX_CAPACITY`.
    pub(crate) fn grow_leaves(&mut self, capacity: usize) {
        let old = self.leaves.len();
        if capacity <= old {
            return;
        }
        if old > 0 {
            log::debug!("growing leaf arena from {old} to {capacity} slots");
        }
        let head = self.free_leaves;
        self.leaves.reserve_exact(capacity - old);
        for i in old..capacity {
            let next = if i + 1 < capacity {
                Proxy::leaf(i + 1)
            } else {
                head
            };
            self.leaves.push(Leaf::unused(next));
        }
        self.free_leaves = Proxy::leaf(old);
    }

    /// Branch counterpart of [`Arena::grow_leaves`].
    pub(crate) fn grow_branches(&mut self, capacity: usize) {
        let old = self.branches.len();
        if capacity <= old {
            return;
        }
        if old > 0 {
            log::debug!("growing branch arena from {old} to {capacity} slots");
        }
        let head = self.free_branches;
        self.branches.reserve_exact(capacity - old);
        for i in old..capacity {
            let next = if i + 1 < capacity {
                Proxy::branch(i + 1)
            } else {
                head
            };
            self.branches.push(Branch::unused(next));
        }
        self.free_branches = Proxy::branch(old);
    }

    /// Pop a free leaf and store `item` and `bbox` in it. The leaf starts detached.
    ///
    /// The free list must be non-empty; see [`Arena::reserve_leaf`].
    pub(crate) fn allocate_leaf(&mut self, bbox: Aabb, item: T) -> Proxy {
        let p = self.free_leaves;
        debug_assert!(p.is_leaf(), "leaf arena exhausted; reserve first");
        let leaf = &mut self.leaves[p.index()];
        self.free_leaves = leaf.parent;
        *leaf = Leaf {
            bbox,
            parent: Proxy::FREE,
            item: Some(item),
        };
        self.leaf_count += 1;
        p
    }

    /// Pop a free branch. It starts with no parent, no children, and height 0.
    ///
    /// The free list must be non-empty; see [`Arena::reserve_branch`].
    pub(crate) fn allocate_branch(&mut self) -> Proxy {
        let p = self.free_branches;
        debug_assert!(p.is_branch(), "branch arena exhausted; reserve first");
        let branch = &mut self.branches[p.index()];
        self.free_branches = branch.parent;
        *branch = Branch::unused(Proxy::FREE);
        branch.used = true;
        self.branch_count += 1;
        p
    }

    /// Return a leaf to the free list, handing back its item.
    pub(crate) fn free_leaf(&mut self, p: Proxy) -> Option<T> {
        let head = self.free_leaves;
        let leaf = &mut self.leaves[p.index()];
        let item = leaf.item.take();
        *leaf = Leaf::unused(head);
        self.free_leaves = p;
        self.leaf_count -= 1;
        item
    }

    pub(crate) fn free_branch(&mut self, p: Proxy) {
        let head = self.free_branches;
        self.branches[p.index()] = Branch::unused(head);
        self.free_branches = p;
        self.branch_count -= 1;
    }
}
