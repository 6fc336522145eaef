// SPDX-License-Identifier: GPL-3.0-only
use std::sync::atomic::{AtomicU64, Ordering};

use crate::monitor::traits::HitSampler;

/// Lock-free count of inbound API calls since the last sample
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicU64,
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.hits.fetch_add(1, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub fn current(&self) -> u64 {
        self.hits.load(Ordering::Acquire)
    }
}

impl HitSampler for HitCounter {
    fn take(&self) -> u64 {
        self.hits.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_resets() {
        let counter = HitCounter::new();
        counter.record();
        counter.record();
        assert_eq!(counter.current(), 2);
        assert_eq!(counter.take(), 2);
        assert_eq!(counter.take(), 0);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let counter = Arc::new(HitCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.record();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.take(), 8000);
    }
}
