// SPDX-License-Identifier: GPL-3.0-only

/// Source of request counts for the idle-shutdown monitor
pub trait HitSampler: Send + Sync {
    /// Return the hits recorded since the previous call and reset to zero
    fn take(&self) -> u64;
}
