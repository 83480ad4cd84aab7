// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SSE2 box kernels for `x86_64`.
//!
//! Lane 0 carries x and lane 1 carries y. Only register-to-register intrinsics are used.

#![allow(
    unsafe_code,
    unused_unsafe,
    reason = "SSE2 intrinsics; safe to call on toolchains that know the feature is enabled"
)]

use core::arch::x86_64::{
    __m128d, _mm_add_pd, _mm_and_pd, _mm_cmple_pd, _mm_cvtsd_f64, _mm_max_pd, _mm_min_pd,
    _mm_movemask_pd, _mm_set_pd, _mm_set1_pd, _mm_sub_pd, _mm_unpackhi_pd,
};

use kurbo::{Point, Vec2};

use crate::Aabb;

#[inline(always)]
fn mins(a: &Aabb) -> __m128d {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { _mm_set_pd(a.min_y, a.min_x) }
}

#[inline(always)]
fn maxs(a: &Aabb) -> __m128d {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { _mm_set_pd(a.max_y, a.max_x) }
}

#[inline(always)]
fn pair(x: f64, y: f64) -> __m128d {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { _mm_set_pd(y, x) }
}

#[inline(always)]
fn lanes(v: __m128d) -> (f64, f64) {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { (_mm_cvtsd_f64(v), _mm_cvtsd_f64(_mm_unpackhi_pd(v, v))) }
}

#[inline(always)]
fn from_lanes(lo: __m128d, hi: __m128d) -> Aabb {
    let (min_x, min_y) = lanes(lo);
    let (max_x, max_y) = lanes(hi);
    Aabb::new(min_x, min_y, max_x, max_y)
}

/// Both lanes of `a <= b` and `c <= d` hold.
#[inline(always)]
fn all_le(a: __m128d, b: __m128d, c: __m128d, d: __m128d) -> bool {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    unsafe { _mm_movemask_pd(_mm_and_pd(_mm_cmple_pd(a, b), _mm_cmple_pd(c, d))) == 0b11 }
}

/// Smallest box containing `a` and `b`.
#[inline]
pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    let (lo, hi) = unsafe { (_mm_min_pd(mins(a), mins(b)), _mm_max_pd(maxs(a), maxs(b))) };
    from_lanes(lo, hi)
}

/// Whether `a` and `b` overlap.
#[inline]
pub fn intersects(a: &Aabb, b: &Aabb) -> bool {
    all_le(mins(a), maxs(b), mins(b), maxs(a))
}

/// Whether `inner` lies inside `outer`.
#[inline]
pub fn contains(outer: &Aabb, inner: &Aabb) -> bool {
    all_le(mins(outer), mins(inner), maxs(inner), maxs(outer))
}

/// Whether `p` lies inside `a`.
#[inline]
pub fn contains_point(a: &Aabb, p: Point) -> bool {
    let p = pair(p.x, p.y);
    all_le(mins(a), p, p, maxs(a))
}

/// `a` moved by `offset`.
#[inline]
pub fn translated(a: &Aabb, offset: Vec2) -> Aabb {
    let d = pair(offset.x, offset.y);
    // SAFETY: SSE2 is part of the x86_64 baseline.
    let (lo, hi) = unsafe { (_mm_add_pd(mins(a), d), _mm_add_pd(maxs(a), d)) };
    from_lanes(lo, hi)
}

/// `a` grown by `margin`, half on each side.
#[inline]
pub fn grown(a: &Aabb, margin: f64) -> Aabb {
    // SAFETY: SSE2 is part of the x86_64 baseline.
    let (lo, hi) = unsafe {
        let half = _mm_set1_pd(margin * 0.5);
        (_mm_sub_pd(mins(a), half), _mm_add_pd(maxs(a), half))
    };
    from_lanes(lo, hi)
}
