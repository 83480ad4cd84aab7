// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box kernels with a compile-time selected SIMD path.
//!
//! Every kernel exists twice:
//!
//! - [`scalar`]: portable code, always compiled.
//! - `sse2`: `x86_64` with SSE2 (part of the architecture baseline). The minimum corner and the
//!   maximum corner each travel in one 128-bit register.
//!
//! [`native`] re-exports the best set for the target. [`Aabb`](crate::Aabb) methods call
//! [`native`], so the choice is invisible to callers.
//!
//! The two paths agree bit for bit on every input, NaN and signed zero included: the scalar
//! `min`/`max` use the same operand order as `minpd`/`maxpd` (the second operand wins when the
//! comparison is false), and the predicates use ordered `<=` comparisons.

pub mod scalar;

#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
pub mod sse2;

#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
pub use sse2 as native;

// Fallback to scalar if no SIMD available
#[cfg(not(all(target_arch = "x86_64", target_feature = "sse2")))]
pub use scalar as native;
