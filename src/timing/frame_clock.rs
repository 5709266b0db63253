//! Frame Delta Clock
//!
//! Measures wall-clock time between processed frames. Deltas are clamped so
//! a stalled frame cannot produce a visible jump, and an exponentially
//! smoothed frame rate is kept for diagnostics.

use super::DEFAULT_MAX_DELTA_SECS;
use crate::config::positive_or;
use std::time::Instant;

/// EMA factor applied to each new fps observation.
const FPS_ALPHA: f64 = 0.1;

/// Frame delta source
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Start of the previous processed frame
    last_tick: Option<Instant>,
    /// Maximum delta handed out, in seconds
    max_delta: f64,
    /// Smoothed frames per second (0 until two frames were seen)
    fps: f64,
    /// Frames processed since the last reset
    frame_count: u64,
}

impl FrameClock {
    /// Create a frame clock with the given delta ceiling (seconds).
    ///
    /// Non-positive ceilings fall back to [`DEFAULT_MAX_DELTA_SECS`] with a
    /// warning.
    pub fn new(max_delta: f64) -> Self {
        let max_delta = positive_or(max_delta, DEFAULT_MAX_DELTA_SECS, "max_delta");
        FrameClock {
            last_tick: None,
            max_delta,
            fps: 0.0,
            frame_count: 0,
        }
    }

    /// Record a frame at `now` and return the clamped delta in seconds.
    ///
    /// The first frame after creation or [`reset`](Self::reset) yields 0.
    pub fn tick(&mut self, now: Instant) -> f64 {
        self.frame_count += 1;
        let Some(last) = self.last_tick.replace(now) else {
            return 0.0;
        };

        let raw = now.saturating_duration_since(last).as_secs_f64();
        if raw > 0.0 {
            let observed = 1.0 / raw;
            self.fps = if self.fps == 0.0 {
                observed
            } else {
                FPS_ALPHA * observed + (1.0 - FPS_ALPHA) * self.fps
            };
        }
        raw.min(self.max_delta)
    }

    /// Forget the previous frame so the next delta starts from zero
    pub fn reset(&mut self) {
        self.last_tick = None;
        self.fps = 0.0;
        self.frame_count = 0;
    }

    /// Get the smoothed frame rate
    pub fn get_fps(&self) -> f64 {
        self.fps
    }

    /// Get the number of frames processed since the last reset
    pub fn get_frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the delta ceiling in seconds
    pub fn get_max_delta(&self) -> f64 {
        self.max_delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELTA_SECS)
    }
}
