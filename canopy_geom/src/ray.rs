// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rays and the slab test.

use kurbo::{Point, Vec2};

use crate::Aabb;

/// Direction components with a magnitude below this are treated as parallel to the slab.
pub const PARALLEL_EPSILON: f64 = 1e-7;

/// A half-infinite ray.
///
/// The direction need not be normalized; [`RayHit::distance`] is measured in multiples of it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Point,
    /// Direction of travel.
    pub direction: Vec2,
}

/// Where a ray enters a box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the entry point; `0` when the origin is inside the box.
    pub distance: f64,
    /// Entry point, `origin + direction * distance`.
    pub point: Point,
}

impl Ray {
    /// Create a ray.
    #[inline]
    pub const fn new(origin: Point, direction: Vec2) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Slab test against `bbox`.
    ///
    /// Returns the entry point, or `None` when the ray misses the box or the box lies
    /// entirely behind the origin. Boxes or rays with NaN coordinates never hit.
    pub fn intersect(&self, bbox: &Aabb) -> Option<RayHit> {
        if bbox.has_nan()
            || self.origin.x.is_nan()
            || self.origin.y.is_nan()
            || self.direction.x.is_nan()
            || self.direction.y.is_nan()
        {
            return None;
        }

        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        let axes = [
            (self.origin.x, self.direction.x, bbox.min_x, bbox.max_x),
            (self.origin.y, self.direction.y, bbox.min_y, bbox.max_y),
        ];
        for (origin, dir, lo, hi) in axes {
            if dir < PARALLEL_EPSILON && dir > -PARALLEL_EPSILON {
                // Parallel: the origin must already be between the slabs.
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            if t1 > t_min {
                t_min = t1;
            }
            if t2 < t_max {
                t_max = t2;
            }
            if t_min > t_max {
                return None;
            }
        }

        Some(RayHit {
            distance: t_min,
            point: self.at(t_min),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_from_outside() {
        let ray = Ray::new(Point::new(-5.0, 0.0), Vec2::new(1.0, 0.0));
        let hit = ray.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).unwrap();
        assert_eq!(hit.distance, 4.0);
        assert_eq!(hit.point, Point::new(-1.0, 0.0));
    }

    #[test]
    fn origin_inside_reports_zero() {
        let ray = Ray::new(Point::new(0.5, 0.5), Vec2::new(0.0, -3.0));
        let hit = ray.intersect(&Aabb::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.point, Point::new(0.5, 0.5));
    }

    #[test]
    fn box_behind_origin_is_missed() {
        let ray = Ray::new(Point::new(5.0, 0.0), Vec2::new(1.0, 0.0));
        assert!(ray.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let ray = Ray::new(Point::new(-5.0, 2.0), Vec2::new(1.0, 0.0));
        assert!(ray.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).is_none());
        let grazing = Ray::new(Point::new(-5.0, 1.0), Vec2::new(1.0, 0.0));
        assert!(grazing.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).is_some());
    }

    #[test]
    fn unnormalized_direction_scales_distance() {
        let ray = Ray::new(Point::new(0.0, -4.0), Vec2::new(0.0, 2.0));
        let hit = ray.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).unwrap();
        assert_eq!(hit.distance, 1.5);
        assert_eq!(hit.point, Point::new(0.0, -1.0));
    }

    #[test]
    fn diagonal_miss() {
        let ray = Ray::new(Point::new(-3.0, 0.0), Vec2::new(1.0, 1.0));
        assert!(ray.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn nan_never_hits() {
        let ray = Ray::new(Point::new(-5.0, 0.0), Vec2::new(1.0, 0.0));
        assert!(ray.intersect(&Aabb::new(f64::NAN, -1.0, 1.0, 1.0)).is_none());
        let bad = Ray::new(Point::new(f64::NAN, 0.0), Vec2::new(1.0, 0.0));
        assert!(bad.intersect(&Aabb::new(-1.0, -1.0, 1.0, 1.0)).is_none());
    }
}
