//! ## vaktprov-core::time
//! **Virtual clock for scripted timeouts**
//!
//! Timeouts in a scenario never sleep: a satisfied timeout event advances
//! this clock instead, so a run is deterministic and as fast as the code
//! under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared nanosecond counter. Clones observe the same time; use
/// [`VirtualClock::fork`] for an independent copy.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    #[inline]
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }

    #[inline]
    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }

    pub fn advance_by(&self, by: Duration) {
        self.advance(u64::try_from(by.as_nanos()).unwrap_or(u64::MAX));
    }

    /// New clock starting at the current time, not shared with `self`.
    pub fn fork(&self) -> Self {
        Self::new(self.now_ns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let clock = VirtualClock::new(0);
        clock.advance(500);
        assert_eq!(clock.now_ns(), 500);
        clock.advance_by(Duration::from_micros(1));
        assert_eq!(clock.now(), Duration::from_nanos(1500));
    }

    #[test]
    fn test_clones_share_forks_do_not() {
        let clock = VirtualClock::new(100);
        let shared = clock.clone();
        let forked = clock.fork();
        clock.advance(50);
        assert_eq!(shared.now_ns(), 150);
        assert_eq!(forked.now_ns(), 100);
    }
}
