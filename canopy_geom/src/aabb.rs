// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned bounding box.

use kurbo::{Point, Rect, Vec2};

use crate::simd::native;

/// Axis-aligned bounding box in 2D, `f64` coordinates.
///
/// Intervals are closed: two boxes that share only an edge intersect, and a box contains itself.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum x (left)
    pub min_x: f64,
    /// Minimum y (top)
    pub min_y: f64,
    /// Maximum x (right)
    pub max_x: f64,
    /// Maximum y (bottom)
    pub max_y: f64,
}

impl Aabb {
    /// The zero-sized box at the origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new box from min/max coordinates.
    ///
    /// Coordinates are stored as given; see [`Aabb::normalized`] for inverted input.
    #[inline]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a box from its minimum and maximum corners.
    #[inline]
    pub const fn from_points(min: Point, max: Point) -> Self {
        Self::new(min.x, min.y, max.x, max.y)
    }

    /// Create a box centered on `center` with the given width and height.
    pub fn from_center_size(center: Point, width: f64, height: f64) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(center.x - hw, center.y - hh, center.x + hw, center.y + hh)
    }

    /// Minimum corner.
    #[inline]
    pub const fn min(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Maximum corner.
    #[inline]
    pub const fn max(&self) -> Point {
        Point::new(self.max_x, self.max_y)
    }

    /// Width (`max_x - min_x`); negative for inverted boxes.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height (`max_y - min_y`); negative for inverted boxes.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Perimeter, `2 * (width + height)`.
    ///
    /// This is the cost metric used when choosing where to insert into a tree.
    #[inline]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    /// Area, `width * height`.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Smallest box containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        native::union(self, other)
    }

    /// Whether the two boxes overlap (closed intervals).
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        native::intersects(self, other)
    }

    /// Whether `other` lies entirely inside `self` (closed intervals).
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        native::contains(self, other)
    }

    /// Whether the point lies inside `self` (closed intervals).
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        native::contains_point(self, point)
    }

    /// This box moved by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec2) -> Self {
        native::translated(self, offset)
    }

    /// This box grown by `margin` in width and in height.
    ///
    /// Half of the margin is applied on each side. A negative margin shrinks the box.
    #[inline]
    pub fn grown(&self, margin: f64) -> Self {
        native::grown(self, margin)
    }

    /// Whether any coordinate is NaN.
    #[inline]
    pub fn has_nan(&self) -> bool {
        self.min_x.is_nan() || self.min_y.is_nan() || self.max_x.is_nan() || self.max_y.is_nan()
    }

    /// Whether every coordinate is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// The same box with inverted axes swapped so that `min <= max`.
    pub fn normalized(&self) -> Self {
        let (min_x, max_x) = if self.min_x > self.max_x {
            (self.max_x, self.min_x)
        } else {
            (self.min_x, self.max_x)
        };
        let (min_y, max_y) = if self.min_y > self.max_y {
            (self.max_y, self.min_y)
        } else {
            (self.min_y, self.max_y)
        };
        Self::new(min_x, min_y, max_x, max_y)
    }

    /// Convert to a Kurbo rectangle.
    #[inline]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<Rect> for Aabb {
    fn from(r: Rect) -> Self {
        Self::new(r.x0, r.y0, r.x1, r.y1)
    }
}

impl From<Aabb> for Rect {
    fn from(b: Aabb) -> Self {
        b.to_rect()
    }
}
