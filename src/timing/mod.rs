//! Clocks & Frame Pacing
//!
//! Time sources and pacing primitives shared by the scheduler loop and the
//! scroll engine:
//! - [`Clock`]: injectable monotonic/wall time source with bounded sleeps
//! - [`FrameClock`]: per-frame delta measurement with clamping and an fps estimate
//! - [`FrameBudget`]: soft fps ceiling that skips frames instead of sleeping

pub mod clock;
pub mod frame_budget;
pub mod frame_clock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frame_budget::FrameBudget;
pub use frame_clock::FrameClock;

use crate::config::MAX_DURATION_SECS;
use std::time::Duration;

/// Largest frame delta (seconds) accepted before clamping.
///
/// A stalled frame longer than this is treated as this long so the
/// animation never visibly jumps.
pub const DEFAULT_MAX_DELTA_SECS: f64 = 0.1;

/// Default frame rate a scroll engine expects to be driven at.
pub const DEFAULT_TARGET_FPS: f64 = 125.0;

/// Convert seconds to a [`Duration`] that is always representable.
///
/// Negative and NaN values give zero; anything above
/// [`MAX_DURATION_SECS`](crate::config::MAX_DURATION_SECS) is clamped.
pub fn secs_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(seconds.min(MAX_DURATION_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_duration_is_total() {
        assert_eq!(secs_to_duration(1.5), Duration::from_millis(1500));
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        let week = Duration::from_secs(7 * 24 * 3600);
        assert_eq!(secs_to_duration(1e300), week);
        assert_eq!(secs_to_duration(f64::INFINITY), week);
    }
}
