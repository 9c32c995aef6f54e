//! Waiting between bridge cycles.
//!
//! After a successful cycle the next one starts on the next wall-clock
//! instant divisible by the interval (every minute on the minute for an
//! interval of 60). After a failure the bridge simply waits one interval.

use std::time::Duration;

use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// Source of wall-clock time and sleeping.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current Unix time in whole seconds.
    fn unix_time(&self) -> i64;

    async fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How to wait before the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Until the next interval boundary (after a complete cycle).
    Aligned,
    /// One full interval (after a failed cycle).
    Fixed,
}

/// Whether `unix_time` falls on an interval boundary.
pub fn is_boundary(unix_time: i64, interval_secs: u32) -> bool {
    unix_time.rem_euclid(i64::from(interval_secs.max(1))) == 0
}

/// Computes and performs the sleeps between cycles.
#[derive(Debug, Clone)]
pub struct IntervalScheduler<K> {
    clock: K,
    interval_secs: u32,
}

impl<K: Clock> IntervalScheduler<K> {
    pub fn new(clock: K, interval_secs: u32) -> Self {
        Self {
            clock,
            interval_secs,
        }
    }

    pub async fn wait(&self, wait: Wait) {
        match wait {
            Wait::Aligned => self.wait_for_boundary().await,
            Wait::Fixed => self.wait_fixed().await,
        }
    }

    /// Sleep at least one second, then until the Unix time is a multiple of
    /// the interval.
    pub async fn wait_for_boundary(&self) {
        info!(
            interval_secs = self.interval_secs,
            "Waiting for the next interval boundary"
        );

        self.clock.sleep(TICK).await;
        while !is_boundary(self.clock.unix_time(), self.interval_secs) {
            self.clock.sleep(TICK).await;
        }

        debug!(unix_time = self.clock.unix_time(), "Reached interval boundary");
    }

    /// Sleep one full interval without alignment.
    pub async fn wait_fixed(&self) {
        debug!(interval_secs = self.interval_secs, "Retrying after fixed delay");
        self.clock
            .sleep(Duration::from_secs(u64::from(self.interval_secs)))
            .await;
    }
}
