// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Tree: a dynamic bounding volume hierarchy for broad-phase queries.
//!
//! [`BoxTree`] stores items together with a fattened axis-aligned box and answers:
//!
//! - box, point, and ray queries ([`BoxTree::query_box`], [`BoxTree::query_point`],
//!   [`BoxTree::query_ray`], or the generic [`BoxTree::query`] over any [`Probe`]);
//! - all-pairs overlap enumeration ([`BoxTree::collisions`]).
//!
//! Items are plain values identified by `Eq`/`Hash`. A caller-supplied function extracts each
//! item's precise box; the tree keeps that box grown by a margin, so small movements reported
//! through [`BoxTree::update`] usually do not touch the hierarchy at all.
//!
//! ## Structure
//!
//! Branches and leaves live in two arenas addressed by [`Proxy`] handles; unused slots are
//! threaded into free lists. Insertion picks the sibling that grows the total perimeter the
//! least and restores balance with AVL-style rotations between branch subtrees on the way back
//! up. Removal only fixes heights. Branch boxes always contain their children, but may be
//! looser than needed.
//!
//! Items whose box contains NaN are stored but never linked into the hierarchy; queries and
//! collision enumeration skip them until an update gives them a real box.
//!
//! ## Checking invariants
//!
//! [`BoxTree::validate`] walks the structure and reports the first broken invariant from a
//! selection of [`Checks`]. With the `validate` feature, debug builds run every check after
//! each mutation.
//!
//! ## Features
//!
//! - `std` (default): forwards to Kurbo.
//! - `libm`: `no_std` float math through Kurbo.
//! - `sync`: [`SyncBoxTree`], the tree behind a `parking_lot` reader/writer lock.
//! - `validate`: invariant checks after every mutation in debug builds.
//!
//! ## Logging
//!
//! The crate logs through [`log`]: arena growth and clearing at `debug`, rotations at `trace`,
//! and NaN boxes left out of the hierarchy at `warn`.
//!
//! # Example
//!
//! ```rust
//! use canopy_tree::{Aabb, BoxTree, Options};
//! use core::cell::Cell;
//! use kurbo::Point;
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! struct Body(usize);
//!
//! let positions = [(0.0, 0.0), (1.5, 0.5), (10.0, 10.0)].map(|(x, y)| Cell::new(Point::new(x, y)));
//! let mut tree = BoxTree::with_options(
//!     |b: &Body| Aabb::from_center_size(positions[b.0].get(), 2.0, 2.0),
//!     Options::default().with_margin(0.5),
//! );
//! for i in 0..3 {
//!     tree.add(Body(i));
//! }
//!
//! let pairs: Vec<_> = tree.collisions(false).collect();
//! assert_eq!(pairs, [(&Body(0), &Body(1))]);
//!
//! let hits: Vec<_> = tree.query_point(Point::new(-0.5, 0.0), false).collect();
//! assert_eq!(hits, [&Body(0)]);
//!
//! // Move a body: the extractor sees the new position, `update` refits its leaf.
//! positions[2].set(Point::new(1.0, 1.0));
//! assert!(tree.update(&Body(2)));
//! assert_eq!(tree.collisions(false).count(), 3);
//!
//! // A nudge that stays inside the fattened box leaves the hierarchy alone.
//! positions[2].set(Point::new(0.9, 1.0));
//! assert!(!tree.update(&Body(2)));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod arena;
mod collision;
mod error;
mod insert;
mod proxy;
mod query;
mod remove;
#[cfg(feature = "sync")]
mod sync;
#[cfg(test)]
mod testing;
mod tree;
mod validate;

pub use canopy_geom::{Aabb, Ray, RayHit};

pub use collision::Collisions;
pub use error::Error;
pub use proxy::Proxy;
pub use query::{Probe, Query};
#[cfg(feature = "sync")]
pub use sync::SyncBoxTree;
pub use tree::{BoxTree, Iter, MIN_CAPACITY, Options, default_growth};
pub use validate::{Checks, InvariantViolation};
