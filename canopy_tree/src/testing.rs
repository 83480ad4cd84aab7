// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixtures shared by the unit tests.

use core::hash::{Hash, Hasher};

use canopy_geom::Aabb;

use crate::{BoxTree, Options};

/// Test item: identified by `id` alone, so a moved copy compares equal to the stored one.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Item {
    pub(crate) id: u32,
    pub(crate) bbox: Aabb,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

pub(crate) fn item(id: u32, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Item {
    Item {
        id,
        bbox: Aabb::new(min_x, min_y, max_x, max_y),
    }
}

fn item_box(item: &Item) -> Aabb {
    item.bbox
}

pub(crate) type TestTree = BoxTree<Item, fn(&Item) -> Aabb>;

pub(crate) fn tree() -> TestTree {
    tree_with(Options::default())
}

pub(crate) fn tree_with(options: Options) -> TestTree {
    BoxTree::with_options(item_box as fn(&Item) -> Aabb, options)
}

/// A row of `n` unit boxes along the x axis, one unit apart.
pub(crate) fn row(n: u32) -> impl Iterator<Item = Item> {
    (0..n).map(|i| {
        let x = f64::from(i) * 2.0;
        item(i, x, 0.0, x + 1.0, 1.0)
    })
}
