// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`BoxTree`] behind a reader/writer lock.

use core::hash::{BuildHasher, Hash};

use canopy_geom::{Aabb, Ray, RayHit};
use hashbrown::DefaultHashBuilder;
use kurbo::Point;
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::{BoxTree, Error, Options};

/// A [`BoxTree`] that can be shared between threads.
///
/// Reads take a shared lock. Mutations check for presence under an upgradable lock and upgrade
/// to an exclusive lock only when the structure actually changes, so the check and the change
/// happen atomically.
///
/// Lazy traversals go through [`SyncBoxTree::read`]: the returned guard keeps the shared lock
/// for as long as the iteration runs.
///
/// # Deadlocks
///
/// The lock is not reentrant. While a guard from [`SyncBoxTree::read`] or
/// [`SyncBoxTree::write`] is alive, or inside a callback passed to one of the `*_with` methods,
/// the same thread must not call a mutating method of the same `SyncBoxTree`.
///
/// ```
/// use canopy_tree::{Aabb, SyncBoxTree};
/// use std::sync::Arc;
///
/// let tree = Arc::new(SyncBoxTree::new(|&i: &u32| {
///     let x = f64::from(i) * 2.0;
///     Aabb::new(x, 0.0, x + 1.0, 1.0)
/// }));
/// let workers: Vec<_> = (0..4u32)
///     .map(|w| {
///         let tree = Arc::clone(&tree);
///         std::thread::spawn(move || {
///             for i in 0..25 {
///                 tree.add(w * 25 + i);
///             }
///         })
///     })
///     .collect();
/// for w in workers {
///     w.join().unwrap();
/// }
/// assert_eq!(tree.len(), 100);
/// assert_eq!(tree.read().query_box(Aabb::new(0.0, 0.0, 3.0, 1.0), false).count(), 2);
/// ```
pub struct SyncBoxTree<T, F, S = DefaultHashBuilder> {
    inner: RwLock<BoxTree<T, F, S>>,
}

impl<T, F, S> core::fmt::Debug for SyncBoxTree<T, F, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("SyncBoxTree");
        match self.inner.try_read() {
            Some(tree) => d.field("tree", &*tree),
            None => d.field("tree", &"<locked>"),
        };
        d.finish()
    }
}

impl<T, F> SyncBoxTree<T, F>
where
    F: Fn(&T) -> Aabb,
{
    /// Create an empty tree with default [`Options`].
    pub fn new(extract: F) -> Self {
        Self::from(BoxTree::new(extract))
    }

    /// Create an empty tree with the given options.
    pub fn with_options(extract: F, options: Options) -> Self {
        Self::from(BoxTree::with_options(extract, options))
    }
}

impl<T, F, S> From<BoxTree<T, F, S>> for SyncBoxTree<T, F, S> {
    fn from(tree: BoxTree<T, F, S>) -> Self {
        Self {
            inner: RwLock::new(tree),
        }
    }
}

impl<T, F, S> SyncBoxTree<T, F, S> {
    /// Take a shared lock for lazy queries and iteration.
    pub fn read(&self) -> RwLockReadGuard<'_, BoxTree<T, F, S>> {
        self.inner.read()
    }

    /// Take the exclusive lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, BoxTree<T, F, S>> {
        self.inner.write()
    }

    /// Unwrap the plain tree.
    pub fn into_inner(self) -> BoxTree<T, F, S> {
        self.inner.into_inner()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the tree stores no items.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl<T, F, S> SyncBoxTree<T, F, S>
where
    T: Eq + Hash,
    F: Fn(&T) -> Aabb,
    S: BuildHasher,
{
    /// See [`BoxTree::contains`].
    pub fn contains(&self, item: &T) -> bool {
        self.inner.read().contains(item)
    }

    /// See [`BoxTree::get_box`].
    pub fn get_box(&self, item: &T) -> Option<Aabb> {
        self.inner.read().get_box(item)
    }

    /// See [`BoxTree::add`].
    ///
    /// # Panics
    ///
    /// Panics if the arenas need to grow and [`Options::growth`] fails.
    pub fn add(&self, item: T) -> bool {
        match self.try_add(item) {
            Ok(added) => added,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// See [`BoxTree::try_add`].
    pub fn try_add(&self, item: T) -> Result<bool, Error> {
        let tree = self.inner.upgradable_read();
        if tree.contains(&item) {
            return Ok(false);
        }
        RwLockUpgradableReadGuard::upgrade(tree).try_add(item)
    }

    /// See [`BoxTree::remove`].
    pub fn remove(&self, item: &T) -> bool {
        self.take(item).is_some()
    }

    /// See [`BoxTree::take`].
    pub fn take(&self, item: &T) -> Option<T> {
        let tree = self.inner.upgradable_read();
        if !tree.contains(item) {
            return None;
        }
        RwLockUpgradableReadGuard::upgrade(tree).take(item)
    }

    /// See [`BoxTree::update`].
    ///
    /// # Panics
    ///
    /// Panics if the branch arena needs to grow and [`Options::growth`] fails.
    pub fn update(&self, item: &T) -> bool {
        match self.try_update(item) {
            Ok(moved) => moved,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// See [`BoxTree::try_update`].
    ///
    /// The exclusive lock is only taken when the leaf has to move.
    pub fn try_update(&self, item: &T) -> Result<bool, Error> {
        let tree = self.inner.upgradable_read();
        let Some(leaf) = tree.find(item) else {
            return Ok(false);
        };
        let fresh = (tree.extract)(item);
        if tree.arena.leaf(leaf).bbox.contains(&fresh) {
            return Ok(false);
        }
        RwLockUpgradableReadGuard::upgrade(tree).update_leaf(leaf, fresh)
    }

    /// See [`BoxTree::add_or_update`].
    ///
    /// # Panics
    ///
    /// Panics if an arena needs to grow and [`Options::growth`] fails.
    pub fn add_or_update(&self, item: T) -> bool {
        match self.inner.write().try_add_or_update(item) {
            Ok(changed) => changed,
            Err(err) => panic!("box tree growth failed: {err}"),
        }
    }

    /// See [`BoxTree::query_box_with`]. Holds the shared lock while `f` runs.
    pub fn query_box_with(&self, bbox: Aabb, approx: bool, f: impl FnMut(&T) -> bool) {
        self.inner.read().query_box_with(bbox, approx, f);
    }

    /// See [`BoxTree::query_point_with`]. Holds the shared lock while `f` runs.
    pub fn query_point_with(&self, point: Point, approx: bool, f: impl FnMut(&T) -> bool) {
        self.inner.read().query_point_with(point, approx, f);
    }

    /// See [`BoxTree::query_ray_with`]. Holds the shared lock while `f` runs.
    pub fn query_ray_with(&self, ray: Ray, approx: bool, f: impl FnMut(&T, RayHit) -> bool) -> bool {
        self.inner.read().query_ray_with(ray, approx, f)
    }

    /// See [`BoxTree::collisions_with`]. Holds the shared lock while `f` runs.
    pub fn collisions_with(&self, approx: bool, f: impl FnMut(&T, &T) -> bool) {
        self.inner.read().collisions_with(approx, f);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    use super::*;
    use crate::Checks;
    use crate::testing::{Item, item, tree};

    #[test]
    fn behaves_like_the_plain_tree() {
        let t = SyncBoxTree::from(tree());
        let a = item(0, 0.0, 0.0, 1.0, 1.0);
        assert!(t.add(a));
        assert!(!t.add(a));
        assert!(t.contains(&a));
        assert!(!t.update(&item(0, 0.0, 0.0, 1.0, 1.0)));
        assert!(t.update(&item(0, 5.0, 5.0, 6.0, 6.0)));
        assert!(t.get_box(&a).unwrap().contains(&Aabb::new(5.0, 5.0, 6.0, 6.0)));
        assert!(t.add_or_update(item(1, 9.0, 9.0, 10.0, 10.0)));

        let mut hits = Vec::new();
        t.query_point_with(Point::new(9.5, 9.5), false, |i: &Item| {
            hits.push(i.id);
            true
        });
        assert_eq!(hits, [1]);

        assert_eq!(t.take(&a).map(|i| i.id), Some(0));
        assert!(!t.remove(&a));
        assert_eq!(t.len(), 1);
        t.read().validate(Checks::all()).unwrap();
        t.clear();
        assert!(t.is_empty());
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let t = Arc::new(SyncBoxTree::from(tree()));
        let writers: Vec<_> = (0..4u32)
            .map(|w| {
                let t = Arc::clone(&t);
                thread::spawn(move || {
                    for i in 0..50 {
                        let id = w * 50 + i;
                        let x = f64::from(id) * 2.0;
                        t.add(item(id, x, 0.0, x + 1.0, 1.0));
                        // Every writer also moves the shared item.
                        t.add_or_update(item(1000, x, 5.0, x + 1.0, 6.0));
                    }
                })
            })
            .collect();
        let reader = {
            let t = Arc::clone(&t);
            thread::spawn(move || {
                for _ in 0..50 {
                    let guard = t.read();
                    let n = guard.iter().count();
                    assert_eq!(n, guard.len());
                }
            })
        };
        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(t.len(), 201);
        let tree = Arc::try_unwrap(t).unwrap().into_inner();
        tree.validate(Checks::all()).unwrap();
        assert_eq!(tree.collisions(false).count(), 0);
    }
}
