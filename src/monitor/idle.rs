// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::monitor::traits::HitSampler;
use crate::registry::{Registry, WarehouseSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Number of consecutive sampling intervals without a hit
    Active(u32),
    ShuttingDown,
}

/// Why the host is being asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Idle,
    Signal,
}

/// Idle-detection state machine, advanced once per sampled interval
#[derive(Debug, Clone)]
pub struct IdleTracker {
    state: MonitorState,
    threshold: u32,
}

impl IdleTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: MonitorState::Active(0),
            threshold: threshold.max(1),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Feed one interval's hit count. Returns `true` only on the tick that
    /// moves the tracker into `ShuttingDown`.
    pub fn observe(&mut self, hits: u64) -> bool {
        let MonitorState::Active(idle) = self.state else {
            return false;
        };

        let idle = if hits == 0 { idle + 1 } else { 0 };
        if idle >= self.threshold {
            self.state = MonitorState::ShuttingDown;
            true
        } else {
            self.state = MonitorState::Active(idle);
            false
        }
    }
}

pub struct IdleShutdownMonitor {
    sampler: Arc<dyn HitSampler>,
    registry: Arc<dyn Registry>,
    interval: Duration,
    tracker: IdleTracker,
}

impl IdleShutdownMonitor {
    pub fn new(
        sampler: Arc<dyn HitSampler>,
        registry: Arc<dyn Registry>,
        interval: Duration,
        threshold: u32,
    ) -> Self {
        Self {
            sampler,
            registry,
            interval,
            tracker: IdleTracker::new(threshold),
        }
    }

    /// Sample hits every interval until the idle threshold is reached or the
    /// host cancels.
    ///
    /// On the idle transition the warehouse summary is logged, `shutdown`
    /// receives [`ShutdownReason::Idle`] and the summary is returned. A host
    /// cancellation returns `None` without touching `shutdown`.
    pub async fn run(
        mut self,
        shutdown: oneshot::Sender<ShutdownReason>,
        cancel: CancellationToken,
    ) -> Option<Vec<WarehouseSummary>> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, threshold = self.tracker.threshold, "Idle monitor started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(state = ?self.tracker.state(), "Idle monitor stopped by host");
                    return None;
                }
                _ = ticker.tick() => {}
            }

            let hits = self.sampler.take();
            debug!(hits, "API hits in last interval");

            if self.tracker.observe(hits) {
                let summaries = self.registry.warehouse_summaries();
                log_summary(&summaries);
                info!("No requests for {} intervals, shutting down", self.tracker.threshold);

                if shutdown.send(ShutdownReason::Idle).is_err() {
                    warn!("Shutdown receiver dropped before idle notification");
                }
                return Some(summaries);
            }
        }
    }
}

fn log_summary(summaries: &[WarehouseSummary]) {
    let mut total_units: u64 = 0;
    for summary in summaries {
        total_units += summary.units_received;
        info!(
            warehouse_id = summary.warehouse_id,
            units_received = summary.units_received,
            suppliers = summary.supplier_count,
            "Warehouse"
        );
    }
    info!(warehouses = summaries.len(), total_units, "Total warehouse units");
}
