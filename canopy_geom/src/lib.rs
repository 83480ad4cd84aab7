// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Geom: axis-aligned boxes and rays for broad-phase queries.
//!
//! This crate holds the small amount of geometry that a dynamic box tree needs:
//!
//! - [`Aabb`]: an `f64` axis-aligned bounding box with union, overlap and containment tests,
//!   perimeter and area, translation, and margin growth.
//! - [`Ray`] and [`RayHit`]: a slab-tested ray and the entry point it reports.
//! - [`simd`]: the box kernels behind [`Aabb`], with an SSE2 path on `x86_64` and a scalar path
//!   everywhere else. Both paths produce identical bits, NaN included.
//!
//! Points and vectors are [`kurbo::Point`] and [`kurbo::Vec2`]; boxes convert to and from
//! [`kurbo::Rect`].
//!
//! ## NaN boxes
//!
//! A box with a NaN coordinate never overlaps, contains, or is contained by anything.
//! Union with such a box is not meaningful; use [`Aabb::has_nan`] to screen input first.
//!
//! # Example
//!
//! ```rust
//! use canopy_geom::{Aabb, Ray};
//! use kurbo::{Point, Vec2};
//!
//! let a = Aabb::new(0.0, 0.0, 2.0, 2.0);
//! let b = Aabb::new(1.0, 1.0, 3.0, 3.0);
//! assert!(a.intersects(&b));
//! assert_eq!(a.union(&b), Aabb::new(0.0, 0.0, 3.0, 3.0));
//!
//! // Growth is split evenly between both sides.
//! assert_eq!(a.grown(1.0), Aabb::new(-0.5, -0.5, 2.5, 2.5));
//!
//! let ray = Ray::new(Point::new(-1.0, 1.0), Vec2::new(1.0, 0.0));
//! let hit = ray.intersect(&a).unwrap();
//! assert_eq!(hit.distance, 1.0);
//! assert_eq!(hit.point, Point::new(0.0, 1.0));
//! ```
//!
//! This crate is `no_std`.

#![no_std]

mod aabb;
mod ray;
pub mod simd;

pub use aabb::Aabb;
pub use ray::{PARALLEL_EPSILON, Ray, RayHit};
