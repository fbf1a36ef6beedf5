//! Permit pool rate limiter
//!
//! A fixed-capacity pool that starts full. Every request consumes one permit;
//! a background task hands one permit back per refill interval and never lets
//! the pool grow past its capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Steady-rate permit pool
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
    refill_interval: Duration,
    refiller: JoinHandle<()>,
}

impl RateLimiter {
    /// Create a limiter holding `capacity` permits, returning one every
    /// `refill_interval`.
    ///
    /// A capacity of zero is treated as one. Must be called from within a
    /// tokio runtime; the refill task stops when the limiter is dropped.
    pub fn new(capacity: usize, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        let refill_interval = refill_interval.max(Duration::from_millis(1));
        let permits = Arc::new(Semaphore::new(capacity));
        let refiller = tokio::spawn(refill(Arc::clone(&permits), capacity, refill_interval));

        Self {
            permits,
            capacity,
            refill_interval,
            refiller,
        }
    }

    /// Create a limiter admitting `permits_per_second` requests per second
    pub fn per_second(permits_per_second: u32) -> Self {
        let rate = permits_per_second.max(1);
        Self::new(rate as usize, Duration::from_millis(1000) / rate)
    }

    /// Wait until a permit is free and consume it
    pub async fn acquire(&self) {
        // The semaphore is never closed, so acquisition only fails if that changes.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }

    /// Permits currently available
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Maximum number of permits in the pool
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time between permit releases
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refiller.abort();
    }
}

/// Release one permit per interval, capped at `capacity`.
///
/// Only this task adds permits, so the check-then-add cannot overshoot.
async fn refill(permits: Arc<Semaphore>, capacity: usize, every: Duration) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if permits.available_permits() < capacity {
            permits.add_permits(1);
        }
    }
}
