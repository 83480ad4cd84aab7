// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The box tree: item index, configuration, and the collection surface.

use core::hash::{BuildHasher, Hash};

use canopy_geom::Aabb;
use hashbrown::{DefaultHashBuilder, HashTable};

use crate::Error;
use crate::arena::{Arena, Leaf, MAX_CAPACITY};
use crate::proxy::Proxy;

/// Smallest initial capacity accepted by [`Options::capacity`].
pub const MIN_CAPACITY: usize = 16;

/// Default [`Options::growth`]: add 256 slots.
pub fn default_growth(capacity: usize) -> usize {
    capacity.saturating_add(256)
}

/// Construction parameters for a [`BoxTree`].
///
/// ```
/// use canopy_tree::Options;
///
/// let opts = Options::default().with_margin(0.5).with_capacity(64);
/// assert_eq!(opts.margin, 0.5);
/// assert_eq!(opts.capacity, 64);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Fattening margin. Leaf boxes are the item box grown by this much in width and in
    /// height, half on each side.
    pub margin: f64,
    /// Initial slot count of both arenas. Values below [`MIN_CAPACITY`] are raised to it.
    pub capacity: usize,
    /// Capacity to grow to when an arena runs out of slots. Must return a value larger than its
    /// argument.
    pub growth: fn(usize) -> usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            margin: 1.0 / 32.0,
            capacity: 256,
            growth: default_growth,
        }
    }
}

impl Options {
    /// Set [`Options::margin`].
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Set [`Options::capacity`].
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set [`Options::growth`].
    pub fn with_growth(mut self, growth: fn(usize) -> usize) -> Self {
        self.growth = growth;
        self
    }
}

/// A dynamic bounding volume hierarchy over items of type `T`.
///
/// `extract` computes an item's precise box. It must return the same box for an unchanged item;
/// call [`BoxTree::update`] after an item moves. Items are identified by their `Eq` and `Hash`
/// impls, hashed through `S`, so their identity must stay stable while they are stored. There is
/// no separate comparer: to store items under a different notion of equality, wrap them in a
/// newtype that implements it (see [`BoxTree::with_options_and_hasher`]).
///
/// Writes take `&mut self`; for shared access from several threads see `SyncBoxTree` (feature
/// `sync`).
pub struct BoxTree<T, F, S = DefaultHashBuilder> {
    pub(crate) arena: Arena<T>,
    pub(crate) root: Proxy,
    pub(crate) index: HashTable<Proxy>,
    pub(crate) hasher: S,
    pub(crate) extract: F,
    pub(crate) options: Options,
}

impl<T, F, S> core::fmt::Debug for BoxTree<T, F, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoxTree")
            .field("len", &self.index.len())
            .field("height", &self.height())
            .field("root", &self.root)
            .field("margin", &self.options.margin)
            .field("arena", &self.arena)
            .finish_non_exhaustive()
    }
}

/// Hash of the item stored in `leaf`.
pub(crate) fn leaf_hash<T: Hash, S: BuildHasher>(hasher: &S, leaf: &Leaf<T>) -> u64 {
    match &leaf.item {
        Some(item) => hasher.hash_one(item),
        None => 0,
    }
}

impl<T, F> BoxTree<T, F>
where
    F: Fn(&T) -> Aabb,
{
    /// Create an empty tree with default [`Options`].
    ///
    /// ```
    /// use canopy_geom::Aabb;
    /// use canopy_tree::BoxTree;
    ///
    /// let boxes = [Aabb::new(0.0, 0.0, 1.0, 1.0), Aabb::new(4.0, 4.0, 5.0, 5.0)];
    /// let mut tree = BoxTree::new(|&i: &usize| boxes[i]);
    /// assert!(tree.add(0));
    /// assert!(tree.add(1));
    /// assert!(!tree.add(1));
    /// assert_eq!(tree.len(), 2);
    /// ```
    pub fn new(extract: F) -> Self {
        Self::with_options(extract, Options::default())
    }

    /// Create an empty tree with the given options.
    pub fn with_options(extract: F, options: Options) -> Self {
        Self::with_options_and_hasher(extract, options, DefaultHashBuilder::default())
    }
}

impl<T, F, S> BoxTree<T, F, S> {
    /// Create an empty tree that hashes items with `hasher`.
    ///
    /// `hasher` only decides how an item's `Hash` output is mixed; equality always comes from
    /// `T: Eq`. Two items are the same entry when they compare equal, and `Hash` must agree with
    /// that. A key that compares by something other than the item's own `Eq` goes in a newtype:
    ///
    /// ```
    /// use core::hash::{Hash, Hasher};
    ///
    /// use canopy_geom::Aabb;
    /// use canopy_tree::{BoxTree, Options};
    /// use hashbrown::DefaultHashBuilder;
    ///
    /// /// A label compared without regard to ASCII case.
    /// #[derive(Clone, Debug)]
    /// struct Label(&'static str, Aabb);
    ///
    /// impl PartialEq for Label {
    ///     fn eq(&self, other: &Self) -> bool {
    ///         self.0.eq_ignore_ascii_case(other.0)
    ///     }
    /// }
    ///
    /// impl Eq for Label {}
    ///
    /// impl Hash for Label {
    ///     fn hash<H: Hasher>(&self, state: &mut H) {
    ///         for b in self.0.bytes() {
    ///             state.write_u8(b.to_ascii_lowercase());
    ///         }
    ///     }
    /// }
    ///
    /// let mut tree = BoxTree::with_options_and_hasher(
    ///     |l: &Label| l.1,
    ///     Options::default(),
    ///     DefaultHashBuilder::default(),
    /// );
    /// assert!(tree.add(Label("Tree", Aabb::new(0.0, 0.0, 1.0, 1.0))));
    /// assert!(!tree.add(Label("TREE", Aabb::new(0.0, 0.0, 1.0, 1.0))));
    /// assert!(tree.add_or_update(Label("tree", Aabb::new(9.0, 9.0, 10.0, 10.0))));
    /// assert_eq!(tree.len(), 1);
    /// assert_eq!(tree.get(&Label("tReE", Aabb::ZERO)).map(|l| l.0), Some("tree"));
    /// ```
    pub fn with_options_and_hasher(extract: F, options: Options, hasher: S) -> Self {
        let capacity = options.capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        let options = Options {
            capacity,
            ..options
        };
        Self {
            arena: Arena::with_capacity(capacity, capacity),
            root: Proxy::FREE,
            index: HashTable::with_capacity(capacity),
            hasher,
            extract,
            options,
        }
    }

    /// Options the tree was built with (capacity after clamping).
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Fattening margin.
    pub fn margin(&self) -> f64 {
        self.options.margin
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tree stores no items.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of leaves in use; equals [`BoxTree::len`].
    pub fn leaf_count(&self) -> usize {
        self.arena.leaf_count()
    }

    /// Number of branches in use.
    pub fn branch_count(&self) -> usize {
        self.arena.branch_count()
    }

    /// Number of leaf slots, used or free.
    pub fn leaf_capacity(&self) -> usize {
        self.arena.leaf_capacity()
    }

    /// Number of branch slots, used or free.
    pub fn branch_capacity(&self) -> usize {
        self.arena.branch_capacity()
    }

    /// Grow the leaf arena to at least `capacity` slots ahead of a burst of insertions.
    ///
    /// Never shrinks.
    pub fn set_leaf_capacity(&mut self, capacity: usize) -> Result<(), Error> {
        if capacity > MAX_CAPACITY {
            return Err(Error::CapacityOverflow {
                requested: capacity,
            });
        }
        self.arena.grow_leaves(capacity);
        Ok(())
    }

    /// Grow the branch arena to at least `capacity` slots. Never shrinks.
    pub fn set_branch_capacity(&mut self, capacity: usize) -> Result<(), Error> {
        if capacity > MAX_CAPACITY {
            return Err(Error::CapacityOverflow {
                requested: capacity,
            });
        }
        self.arena.grow_branches(capacity);
        Ok(())
    }

    /// Height of the root branch; `0` for an empty tree.
    ///
    /// A tree holding one item has height 2: the root branch over a single leaf.
    pub fn height(&self) -> u32 {
        if self.root.is_free() {
            0
        } else {
            self.arena.branch(self.root).height
        }
    }

    /// Remove every item. Capacities are kept.
    pub fn clear(&mut self) {
        log::debug!("clearing box tree with {} items", self.index.len());
        self.arena.reset();
        self.index.clear();
        self.root = Proxy::FREE;
    }

    /// Iterate over all stored items in slot order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            leaves: self.arena.leaves().iter(),
        }
    }
}

impl<T, F, S> BoxTree<T, F, S>
where
    T: Eq + Hash,
    F: Fn(&T) -> Aabb,
    S: BuildHasher,
{
    /// Leaf holding an item equal to `item`.
    pub(crate) fn find(&self, item: &T) -> Option<Proxy> {
        let hash = self.hasher.hash_one(item);
        self.index
            .find(hash, |&p| self.arena.leaf(p).item.as_ref() == Some(item))
            .copied()
    }

    /// Whether an item equal to `item` is stored.
    pub fn contains(&self, item: &T) -> bool {
        self.find(item).is_some()
    }

    /// The stored item equal to `item`.
    pub fn get(&self, item: &T) -> Option<&T> {
        let leaf = self.find(item)?;
        self.arena.leaf(leaf).item.as_ref()
    }

    /// The fattened box stored for `item`.
    ///
    /// This contains the item's precise box as of its last [`add`](Self::add) or
    /// [`update`](Self::update), grown by the margin.
    pub fn get_box(&self, item: &T) -> Option<Aabb> {
        self.find(item).map(|leaf| self.arena.leaf(leaf).bbox)
    }

    /// Insert `item`. Returns `false`, leaving the tree unchanged, when an equal item is
    /// already stored.
    ///
    /// # Panics
    ///
    /// Panics if the arenas need to grow and [`Options::growth`] does not return a larger
    /// capacity. Use [`BoxTree::try_add`] to handle that case.
    pub fn add(&mut self, item: T) -> bool {
        match self.try_add(item) {
            Ok(added) => added,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// Insert `item`, reporting growth failures.
    pub fn try_add(&mut self, item: T) -> Result<bool, Error> {
        let hash = self.hasher.hash_one(&item);
        if self
            .index
            .find(hash, |&p| self.arena.leaf(p).item.as_ref() == Some(&item))
            .is_some()
        {
            return Ok(false);
        }
        let growth = self.options.growth;
        let bbox = (self.extract)(&item).grown(self.options.margin);
        self.arena.reserve_leaf(growth)?;
        if self.insert_needs_branch(&bbox) {
            self.arena.reserve_branch(growth)?;
        }

        let leaf = self.arena.allocate_leaf(bbox, item);
        let hasher = &self.hasher;
        let arena = &self.arena;
        self.index
            .insert_unique(hash, leaf, |&p| leaf_hash(hasher, arena.leaf(p)));
        self.insert_leaf(leaf);
        self.debug_validate();
        Ok(true)
    }

    /// Remove the item equal to `item`. Returns `false` when there is none.
    pub fn remove(&mut self, item: &T) -> bool {
        self.take(item).is_some()
    }

    /// Remove the item equal to `item` and return the stored value.
    pub fn take(&mut self, item: &T) -> Option<T> {
        let hash = self.hasher.hash_one(item);
        let arena = &self.arena;
        let entry = self
            .index
            .find_entry(hash, |&p| arena.leaf(p).item.as_ref() == Some(item))
            .ok()?;
        let (leaf, _) = entry.remove();
        self.detach_leaf(leaf);
        let stored = self.arena.free_leaf(leaf);
        self.debug_validate();
        stored
    }

    /// Refresh the box of the stored item equal to `item`, using `item` to compute it.
    ///
    /// Returns `false` when no equal item is stored, or when the stored fattened box still
    /// contains the fresh box; the tree is not touched in either case. Otherwise the leaf is
    /// moved and `true` is returned.
    ///
    /// The stored value is kept; see [`BoxTree::add_or_update`] to replace it.
    ///
    /// # Panics
    ///
    /// Panics if the branch arena needs to grow and [`Options::growth`] fails.
    pub fn update(&mut self, item: &T) -> bool {
        match self.try_update(item) {
            Ok(moved) => moved,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// [`BoxTree::update`], reporting growth failures.
    pub fn try_update(&mut self, item: &T) -> Result<bool, Error> {
        let Some(leaf) = self.find(item) else {
            return Ok(false);
        };
        let fresh = (self.extract)(item);
        self.update_leaf(leaf, fresh)
    }

    /// Store `item`, replacing an equal stored value and refreshing its box, or insert it.
    ///
    /// Returns `true` when the item was inserted or its leaf moved.
    ///
    /// # Panics
    ///
    /// Panics if an arena needs to grow and [`Options::growth`] fails.
    pub fn add_or_update(&mut self, item: T) -> bool {
        match self.try_add_or_update(item) {
            Ok(changed) => changed,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// [`BoxTree::add_or_update`], reporting growth failures.
    pub fn try_add_or_update(&mut self, item: T) -> Result<bool, Error> {
        let Some(leaf) = self.find(&item) else {
            return self.try_add(item);
        };
        let fresh = (self.extract)(&item);
        let moved = self.update_leaf(leaf, fresh)?;
        self.arena.leaf_mut(leaf).item = Some(item);
        Ok(moved)
    }

    #[inline]
    pub(crate) fn debug_validate(&self) {
        #[cfg(all(debug_assertions, feature = "validate"))]
        if let Err(err) = self.validate(crate::Checks::all()) {
            panic!("box tree invariant violated: {err}");
        }
    }
}

/// Iterator over stored items, see [`BoxTree::iter`].
#[derive(Clone, Debug)]
pub struct Iter<'a, T> {
    leaves: core::slice::Iter<'a, Leaf<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.leaves.find_map(|leaf| leaf.item.as_ref())
    }
}

impl<'a, T, F, S> IntoIterator for &'a BoxTree<T, F, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Checks;
    use crate::testing::{TestTree, item, row, tree, tree_with};
    use alloc::vec::Vec;
    use kurbo::Point;

    #[test]
    fn capacity_is_clamped() {
        let t = tree_with(Options::default().with_capacity(3));
        assert_eq!(t.leaf_capacity(), MIN_CAPACITY);
        assert_eq!(t.branch_capacity(), MIN_CAPACITY);
        assert_eq!(t.options().capacity, MIN_CAPACITY);
        assert_eq!(t.height(), 0);
    }

    #[test]
    fn add_is_idempotent() {
        let mut t = tree();
        assert!(t.add(item(1, 0.0, 0.0, 1.0, 1.0)));
        let before = t.get_box(&item(1, 0.0, 0.0, 0.0, 0.0));
        // Equal by id, even with a different box.
        assert!(!t.add(item(1, 5.0, 5.0, 6.0, 6.0)));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get_box(&item(1, 0.0, 0.0, 0.0, 0.0)), before);
        assert_eq!(
            t.get(&item(1, 0.0, 0.0, 0.0, 0.0)).map(|i| i.bbox),
            Some(Aabb::new(0.0, 0.0, 1.0, 1.0))
        );
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn stored_box_is_fattened() {
        let mut t = tree_with(Options::default().with_margin(1.0));
        let a = item(1, 0.0, 0.0, 2.0, 2.0);
        assert!(t.add(a));
        assert_eq!(t.get_box(&a), Some(Aabb::new(-0.5, -0.5, 2.5, 2.5)));
        assert_eq!(t.height(), 2);
        assert_eq!(t.branch_count(), 1);
        assert_eq!(t.leaf_count(), 1);
    }

    #[test]
    fn take_returns_stored_value() {
        let mut t = tree();
        let a = item(4, 0.0, 0.0, 1.0, 1.0);
        t.add(a);
        assert_eq!(t.take(&a).map(|i| i.bbox), Some(a.bbox));
        assert_eq!(t.take(&a), None);
        assert!(!t.remove(&a));
        assert!(t.is_empty());
        assert_eq!(t.branch_count(), 0);
        assert_eq!(t.height(), 0);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn add_or_update_replaces_the_stored_value() {
        let mut t = tree();
        assert!(t.add_or_update(item(1, 0.0, 0.0, 1.0, 1.0)));
        // Still inside the fattened box: nothing moves, but the value is replaced.
        assert!(!t.add_or_update(item(1, 0.0, 0.0, 1.0, 1.01)));
        assert_eq!(
            t.get(&item(1, 0.0, 0.0, 0.0, 0.0)).map(|i| i.bbox),
            Some(Aabb::new(0.0, 0.0, 1.0, 1.01))
        );
        assert!(t.add_or_update(item(1, 10.0, 10.0, 11.0, 11.0)));
        let stored = t.get_box(&item(1, 0.0, 0.0, 0.0, 0.0)).unwrap();
        assert!(stored.contains(&Aabb::new(10.0, 10.0, 11.0, 11.0)));
        assert_eq!(t.len(), 1);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut t = tree_with(Options::default().with_capacity(16).with_growth(|c| c + 2));
        for a in row(20) {
            t.add(a);
        }
        let leaves = t.leaf_capacity();
        let branches = t.branch_capacity();
        assert!(leaves >= 20);
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.height(), 0);
        assert_eq!(t.leaf_capacity(), leaves);
        assert_eq!(t.branch_capacity(), branches);
        assert_eq!(t.iter().count(), 0);
        t.validate(Checks::all()).unwrap();
        assert!(t.add(item(0, 0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn capacity_setters_grow_only() {
        let mut t = tree();
        t.set_leaf_capacity(1000).unwrap();
        t.set_branch_capacity(10).unwrap();
        assert_eq!(t.leaf_capacity(), 1000);
        assert_eq!(t.branch_capacity(), 256);
        assert_eq!(
            t.set_leaf_capacity(usize::MAX),
            Err(Error::CapacityOverflow {
                requested: usize::MAX
            })
        );
        t.validate(Checks::FREE_LISTS).unwrap();
    }

    #[test]
    fn failing_growth_leaves_items_untouched() {
        let mut t = tree_with(Options::default().with_capacity(16).with_growth(|c| c));
        for a in row(16) {
            assert_eq!(t.try_add(a), Ok(true));
        }
        let extra = item(99, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            t.try_add(extra),
            Err(Error::GrowthNotIncreasing {
                current: 16,
                proposed: 16
            })
        );
        assert_eq!(t.len(), 16);
        assert!(!t.contains(&extra));
        t.validate(Checks::all()).unwrap();
    }

    /// 17 linked items with room for more leaves but none for branches.
    fn full_branches() -> TestTree {
        let mut t = tree_with(Options::default().with_capacity(16).with_growth(|c| c));
        t.set_leaf_capacity(32).unwrap();
        for a in row(17) {
            assert_eq!(t.try_add(a), Ok(true));
        }
        assert_eq!(t.branch_count(), 16);
        assert_eq!(t.branch_capacity(), 16);
        t
    }

    #[test]
    fn relinking_reuses_the_detached_branch() {
        let mut t = full_branches();
        assert_eq!(t.try_update(&item(3, 500.0, 500.0, 501.0, 501.0)), Ok(true));
        assert_eq!(
            t.try_add_or_update(item(4, 900.0, 900.0, 901.0, 901.0)),
            Ok(true)
        );
        assert_eq!(t.branch_capacity(), 16);
        let ids: Vec<u32> = t
            .query_point(Point::new(900.5, 900.5), false)
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, [4]);
        assert_eq!(t.query_point(Point::new(500.5, 500.5), false).count(), 1);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    fn failed_relink_keeps_the_stored_value() {
        let mut t = full_branches();
        let nan = item(50, f64::NAN, 0.0, 1.0, 1.0);
        // A NaN leaf stays detached, so it takes no branch.
        assert_eq!(t.try_add(nan), Ok(true));
        assert_eq!(
            t.try_add_or_update(item(50, 300.0, 0.0, 301.0, 1.0)),
            Err(Error::GrowthNotIncreasing {
                current: 16,
                proposed: 16
            })
        );
        let stored = t.get(&nan).unwrap();
        assert!(stored.bbox.has_nan());
        assert!(t.get_box(&nan).unwrap().has_nan());
        assert_eq!(t.len(), 18);
        assert_eq!(t.query_point(Point::new(300.5, 0.5), false).count(), 0);
        t.validate(Checks::all()).unwrap();
    }

    #[test]
    #[should_panic(expected = "box tree growth failed")]
    fn add_panics_on_bad_growth() {
        let mut t = tree_with(Options::default().with_capacity(16).with_growth(|c| c - 1));
        for a in row(17) {
            t.add(a);
        }
    }

    #[test]
    fn iter_visits_each_item_once() {
        let mut t = tree();
        for a in row(10) {
            t.add(a);
        }
        t.remove(&item(3, 0.0, 0.0, 0.0, 0.0));
        let mut ids: Vec<u32> = (&t).into_iter().map(|a| a.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, [0, 1, 2, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn debug_is_concise() {
        let t = tree();
        let s = alloc::format!("{t:?}");
        assert!(s.starts_with("BoxTree"));
        assert!(s.contains("len: 0"));
    }
}
