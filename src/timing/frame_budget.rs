//! Soft FPS Ceiling
//!
//! A frame arriving sooner than `1 / max_fps` after the last processed frame
//! start is skipped rather than delayed. Blocking sleeps here would add
//! jitter to the scheduler loop that drives us.

use super::{secs_to_duration, DEFAULT_TARGET_FPS};
use crate::config::{ceiling_or_unlimited, rate_or};
use std::time::{Duration, Instant};

/// Per-unit frame budget
#[derive(Debug, Clone, Copy)]
pub struct FrameBudget {
    /// Rate the unit expects to be driven at
    target_fps: f64,
    /// Hard ceiling (0 = unlimited)
    max_fps: f64,
    /// Start of the last processed frame
    last_frame_start: Option<Instant>,
    /// Frames skipped by the ceiling since the last reset
    skipped: u64,
}

impl FrameBudget {
    /// Create a budget. A `max_fps` of zero disables the ceiling; invalid
    /// values are replaced with a warning.
    pub fn new(target_fps: f64, max_fps: f64) -> Self {
        FrameBudget {
            target_fps: rate_or(target_fps, DEFAULT_TARGET_FPS, "target_fps"),
            max_fps: ceiling_or_unlimited(max_fps, "max_fps"),
            last_frame_start: None,
            skipped: 0,
        }
    }

    /// Decide whether a frame starting at `now` should be processed.
    ///
    /// Returns `false` (skip) when the ceiling is active and the previous
    /// processed frame started less than one ceiling interval ago.
    pub fn should_process(&mut self, now: Instant) -> bool {
        if let (Some(interval), Some(last)) = (self.min_interval(), self.last_frame_start) {
            if now.saturating_duration_since(last) < interval {
                self.skipped += 1;
                return false;
            }
        }
        self.last_frame_start = Some(now);
        true
    }

    /// Minimum spacing between processed frames, if a ceiling is set
    pub fn min_interval(&self) -> Option<Duration> {
        (self.max_fps > 0.0).then(|| secs_to_duration(1.0 / self.max_fps))
    }

    /// Interval matching the target frame rate
    pub fn target_interval(&self) -> Duration {
        secs_to_duration(1.0 / self.target_fps)
    }

    /// Forget the last frame start (`force_clear`)
    pub fn reset(&mut self) {
        self.last_frame_start = None;
        self.skipped = 0;
    }

    /// Get the number of frames skipped since the last reset
    pub fn get_skipped(&self) -> u64 {
        self.skipped
    }

    /// Get the frame rate ceiling (0 = unlimited)
    pub fn get_max_fps(&self) -> f64 {
        self.max_fps
    }

    /// Get the start of the last processed frame
    pub fn last_frame_start(&self) -> Option<Instant> {
        self.last_frame_start
    }
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FPS, 0.0)
    }
}
