use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Time source abstraction so rate limiting is testable without real
/// sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Enforces a minimum spacing between calls. Component-scoped state: each
/// source client owns its own limiter, nothing is process-global.
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
            clock,
        }
    }

    /// Block until at least `min_interval` has passed since the previous
    /// call. The lock is held across the sleep, which also serializes
    /// concurrent callers.
    pub fn wait(&self) {
        let mut last = self.last_call.lock();

        if let Some(previous) = *last {
            let elapsed = self.clock.now().duration_since(previous);
            if elapsed < self.min_interval {
                self.clock.sleep(self.min_interval - elapsed);
            }
        }

        *last = Some(self.clock.now());
    }
}
