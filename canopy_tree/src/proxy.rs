// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tagged node handles.

use core::fmt;

/// Handle to a branch slot, a leaf slot, or nothing.
///
/// A proxy packs a node reference into one `u32`:
///
/// - [`Proxy::FREE`] (`u32::MAX`) refers to nothing. It terminates free lists and marks empty
///   child slots and the parent of the root.
/// - Bit 31 set: the low 31 bits index the leaf arena.
/// - Bit 31 clear: the low 31 bits index the branch arena.
///
/// Proxies order by their raw value, so every branch sorts before every leaf. The ordering is
/// only used to put collision pairs into a canonical order.
///
/// Proxies show up in [`InvariantViolation`](crate::InvariantViolation) reports; they cannot be
/// built outside this crate.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Proxy(u32);

const LEAF_BIT: u32 = 0x8000_0000;

impl Proxy {
    /// Refers to nothing.
    pub const FREE: Self = Self(u32::MAX);

    /// Largest slot index a proxy can address in either arena.
    ///
    /// `0x7FFF_FFFF` is unavailable because the leaf proxy for it would equal [`Proxy::FREE`].
    pub const MAX_INDEX: usize = 0x7FFF_FFFE;

    #[allow(
        clippy::cast_possible_truncation,
        reason = "arena capacities are capped at MAX_INDEX + 1"
    )]
    pub(crate) const fn branch(idx: usize) -> Self {
        debug_assert!(idx <= Self::MAX_INDEX, "branch index out of range");
        Self(idx as u32)
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "arena capacities are capped at MAX_INDEX + 1"
    )]
    pub(crate) const fn leaf(idx: usize) -> Self {
        debug_assert!(idx <= Self::MAX_INDEX, "leaf index out of range");
        Self(idx as u32 | LEAF_BIT)
    }

    /// Whether this proxy refers to nothing.
    #[inline]
    pub const fn is_free(self) -> bool {
        self.0 == u32::MAX
    }

    /// Whether this proxy refers to a leaf slot.
    #[inline]
    pub const fn is_leaf(self) -> bool {
        !self.is_free() && self.0 & LEAF_BIT != 0
    }

    /// Whether this proxy refers to a branch slot.
    #[inline]
    pub const fn is_branch(self) -> bool {
        self.0 & LEAF_BIT == 0
    }

    /// Slot index within the arena the proxy refers to.
    ///
    /// Meaningless for [`Proxy::FREE`].
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & !LEAF_BIT) as usize
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_free() {
            f.write_str("free")
        } else if self.is_leaf() {
            write!(f, "leaf {}", self.index())
        } else {
            write!(f, "branch {}", self.index())
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proxy({self})")
    }
}
