// Minimum-interval gate between consecutive calls to the search API
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

// Time source for the gate; swapped for a manual clock in tests
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct RateLimiter<C: Clock = TokioClock> {
    clock: C,
    min_interval: Duration,
    // When the previous call finished
    last_finished: Option<Instant>,
}

impl RateLimiter<TokioClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, TokioClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            clock,
            min_interval,
            last_finished: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // Wait until at least `min_interval` has passed since the previous call
    // finished. Call durations never count towards the gap.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_finished {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limit wait");
                self.clock.sleep(wait).await;
            }
        }
    }

    // Mark the call started by the last acquire as finished, success or not
    pub fn record_call(&mut self) {
        self.last_finished = Some(self.clock.now());
    }
}

// Lets a test share one clock between the limiter and a fake client
#[async_trait]
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

#[cfg(test)]
pub mod manual_clock {
    use super::*;
    use parking_lot::Mutex;

    // Clock whose time only moves when slept on or advanced explicitly
    pub struct ManualClock {
        origin: Instant,
        offset: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        pub fn advance(&self, duration: Duration) {
            *self.offset.lock() += duration;
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().clone()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + *self.offset.lock()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
            self.advance(duration);
        }
    }
}
