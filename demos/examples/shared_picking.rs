// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tree shared between threads: one thread edits, others pick with rays and viewports.
//!
//! Run:
//! - `cargo run -p canopy_demos --example shared_picking`

use std::sync::Arc;
use std::thread;

use canopy_geom::{Aabb, Ray};
use canopy_tree::SyncBoxTree;
use kurbo::{Point, Vec2};

const ROW_H: f64 = 20.0;
const WIDTH: f64 = 200.0;

/// A list row, identified by its index and carrying its own box.
#[derive(Clone, Copy, Debug)]
struct Row {
    index: u32,
    bbox: Aabb,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Row {}

impl core::hash::Hash for Row {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

fn row(index: u32, indent: f64) -> Row {
    let y = f64::from(index) * ROW_H;
    Row {
        index,
        bbox: Aabb::new(indent, y, WIDTH, y + ROW_H),
    }
}

fn main() {
    let tree = Arc::new(SyncBoxTree::new(|r: &Row| r.bbox));

    let editor = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for i in 0..1000 {
                tree.add(row(i, 0.0));
            }
            // Indent every tenth row; the stored value is replaced with the new one.
            for i in (0..1000).step_by(10) {
                tree.add_or_update(row(i, 40.0));
            }
        })
    };
    editor.join().expect("editor thread panicked");

    let pickers: Vec<_> = [0.0, 30.0, 200.0, 600.0]
        .into_iter()
        .map(|scroll| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                let viewport = Aabb::new(0.0, scroll, WIDTH, scroll + 100.0);
                let mut visible: Vec<u32> = tree
                    .read()
                    .query_box(viewport, false)
                    .map(|r| r.index)
                    .collect();
                visible.sort_unstable();

                // A ray along the left edge only hits rows that are not indented.
                let ray = Ray::new(Point::new(10.0, scroll), Vec2::new(0.0, 1.0));
                let mut nearest: Option<(u32, f64)> = None;
                tree.query_ray_with(ray, false, |r, hit| {
                    if nearest.is_none_or(|(_, d)| hit.distance < d) {
                        nearest = Some((r.index, hit.distance));
                    }
                    true
                });
                (scroll, visible, nearest)
            })
        })
        .collect();

    for picker in pickers {
        let (scroll, visible, nearest) = picker.join().expect("picker thread panicked");
        println!("scroll={scroll:.1} -> visible rows {visible:?}, first row under the cursor {nearest:?}");
    }
    println!("{:?}", tree.read());
}
