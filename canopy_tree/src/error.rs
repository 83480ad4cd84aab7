// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors.

use thiserror::Error;

/// Errors from growing the node arenas.
///
/// Both variants are caller bugs in the [`Options`](crate::Options) or in an explicit capacity
/// request. When one is returned the set of stored items is unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The growth function did not return a capacity larger than the current one.
    #[error("growth function returned {proposed}, which does not exceed the current capacity {current}")]
    GrowthNotIncreasing {
        /// Capacity passed to the growth function.
        current: usize,
        /// Capacity it returned.
        proposed: usize,
    },
    /// The requested capacity cannot be addressed by a [`Proxy`](crate::Proxy).
    #[error("capacity {requested} exceeds the largest addressable slot count")]
    CapacityOverflow {
        /// The capacity that was asked for.
        requested: usize,
    },
}
