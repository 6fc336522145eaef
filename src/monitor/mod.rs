// SPDX-License-Identifier: GPL-3.0-only
pub mod idle;
pub mod stats;
pub mod traits;

pub use idle::{IdleShutdownMonitor, ShutdownReason};
pub use stats::HitCounter;
