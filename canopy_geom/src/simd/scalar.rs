// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Portable box kernels.

use kurbo::{Point, Vec2};

use crate::Aabb;

#[inline(always)]
fn min(a: f64, b: f64) -> f64 {
    if a < b { a } else { b }
}

#[inline(always)]
fn max(a: f64, b: f64) -> f64 {
    if a > b { a } else { b }
}

/// Smallest box containing `a` and `b`.
#[inline]
pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
    Aabb::new(
        min(a.min_x, b.min_x),
        min(a.min_y, b.min_y),
        max(a.max_x, b.max_x),
        max(a.max_y, b.max_y),
    )
}

/// Whether `a` and `b` overlap.
#[inline]
pub fn intersects(a: &Aabb, b: &Aabb) -> bool {
    a.min_x <= b.max_x && a.min_y <= b.max_y && b.min_x <= a.max_x && b.min_y <= a.max_y
}

/// Whether `inner` lies inside `outer`.
#[inline]
pub fn contains(outer: &Aabb, inner: &Aabb) -> bool {
    outer.min_x <= inner.min_x
        && outer.min_y <= inner.min_y
        && inner.max_x <= outer.max_x
        && inner.max_y <= outer.max_y
}

/// Whether `p` lies inside `a`.
#[inline]
pub fn contains_point(a: &Aabb, p: Point) -> bool {
    a.min_x <= p.x && a.min_y <= p.y && p.x <= a.max_x && p.y <= a.max_y
}

/// `a` moved by `offset`.
#[inline]
pub fn translated(a: &Aabb, offset: Vec2) -> Aabb {
    Aabb::new(
        a.min_x + offset.x,
        a.min_y + offset.y,
        a.max_x + offset.x,
        a.max_y + offset.y,
    )
}

/// `a` grown by `margin`, half on each side.
#[inline]
pub fn grown(a: &Aabb, margin: f64) -> Aabb {
    let half = margin * 0.5;
    Aabb::new(a.min_x - half, a.min_y - half, a.max_x + half, a.max_y + half)
}
