// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broad-phase loop: bodies drift, the tree is updated, and overlapping pairs are reported.
//!
//! Run:
//! - `cargo run -p canopy_demos --example broad_phase`

use core::cell::RefCell;

use canopy_geom::Aabb;
use canopy_tree::{BoxTree, Options};
use kurbo::{Point, Vec2};

#[derive(Clone, Copy, Debug)]
struct Body {
    center: Point,
    velocity: Vec2,
    radius: f64,
}

impl Body {
    fn bbox(&self) -> Aabb {
        Aabb::from_center_size(self.center, 2.0 * self.radius, 2.0 * self.radius)
    }
}

fn main() {
    let bodies: RefCell<Vec<Body>> = RefCell::new(
        (0..64_u32)
            .map(|i| {
                let (row, col) = (f64::from(i / 8), f64::from(i % 8));
                Body {
                    center: Point::new(col * 10.0, row * 10.0),
                    velocity: Vec2::new(row - 3.5, col - 3.5) * 0.25,
                    radius: 2.0 + f64::from(i % 3),
                }
            })
            .collect(),
    );

    let mut tree = BoxTree::with_options(
        |&i: &usize| bodies.borrow()[i].bbox(),
        Options::default().with_margin(1.0).with_capacity(32),
    );
    for i in 0..bodies.borrow().len() {
        tree.add(i);
    }
    println!(
        "{} bodies, height {}, {} branches",
        tree.len(),
        tree.height(),
        tree.branch_count()
    );

    for step in 0..8 {
        for body in bodies.borrow_mut().iter_mut() {
            body.center += body.velocity;
        }
        let mut moved = 0;
        for i in 0..bodies.borrow().len() {
            if tree.update(&i) {
                moved += 1;
            }
        }

        let mut pairs: Vec<(usize, usize)> = tree
            .collisions(false)
            .map(|(&a, &b)| (a.min(b), a.max(b)))
            .collect();
        pairs.sort_unstable();
        println!(
            "step {step}: {moved} leaves moved, height {}, {} overlapping pairs {:?}",
            tree.height(),
            pairs.len(),
            &pairs[..pairs.len().min(6)]
        );
    }

    let probe = Point::new(35.0, 35.0);
    let under: Vec<_> = tree.query_point(probe, false).collect();
    println!("bodies under {probe:?}: {under:?}");
}
