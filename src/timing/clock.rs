//! Time Sources
//!
//! The scheduler never reads the system clock directly. It goes through a
//! [`Clock`] handle injected at construction so tests can drive time by hand.

use parking_lot::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Monotonic and wall-clock time source with bounded sleeping.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time as Unix seconds (used for published state).
    fn wall_time(&self) -> f64;

    /// Suspend the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by [`Instant`], [`SystemTime`] and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Hand-driven clock. Sleeping advances time instantly.
#[derive(Debug)]
pub struct ManualClock {
    /// Instant corresponding to offset zero
    base: Instant,
    /// Wall-clock seconds corresponding to offset zero
    wall_base: f64,
    /// Time advanced so far
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a manual clock starting at the given wall-clock second.
    pub fn new(wall_base: f64) -> Self {
        ManualClock {
            base: Instant::now(),
            wall_base,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Advance time by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }

    /// Advance time by fractional seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(super::secs_to_duration(secs));
    }

    /// Time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_700_000_000.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn wall_time(&self) -> f64 {
        self.wall_base + self.offset.lock().as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
