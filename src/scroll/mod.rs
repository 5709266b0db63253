//! Sub-Pixel Scroll Animation
//!
//! Moves a pre-composed wide image across a fixed viewport using elapsed
//! wall-clock time, so the apparent speed does not depend on how often the
//! engine is driven. Position is tracked as `f64` pixels and only rounded
//! when a frame is extracted.
//!
//! Each frame:
//! 1. [`FrameBudget`] drops frames arriving faster than the fps ceiling
//! 2. [`FrameClock`] measures and clamps the delta
//! 3. [`DeltaWindow`] averages the last N deltas
//! 4. the position advances and is normalized according to [`LoopMode`]

pub mod delta_window;
pub mod image;

pub use delta_window::DeltaWindow;
pub use image::ComposedImage;

use crate::config::{ceiling_or_unlimited, positive_or, rate_or};
use crate::timing::{FrameBudget, FrameClock, DEFAULT_MAX_DELTA_SECS, DEFAULT_TARGET_FPS};
use serde::Deserialize;
use std::time::Instant;

/// What happens when the scroll position reaches the end of the content.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Jump back to 0 (the fractional overshoot is dropped)
    Continuous,
    /// Scroll once until the content's right edge meets the viewport's, then stop
    Single,
    /// Wrap by modulo, keeping the fractional overshoot
    #[default]
    Modulo,
}

impl LoopMode {
    /// Whether extraction should stitch the image's head after its tail
    pub fn wraps(self) -> bool {
        !matches!(self, LoopMode::Single)
    }
}

/// Scroll engine settings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    /// Speed in pixels per second
    pub velocity_px_per_s: f64,
    /// Visible width in pixels
    pub viewport_width: u32,
    /// End-of-content policy
    pub loop_mode: LoopMode,
    /// Largest delta (seconds) applied in one frame
    pub max_delta: f64,
    /// Number of deltas averaged (0 or 1 disables smoothing)
    pub smoothing_window: usize,
    /// Frame rate the engine is expected to be driven at
    pub target_fps: f64,
    /// Soft frame rate ceiling (0 = unlimited)
    pub max_fps: f64,
    /// Extra fraction added to duration estimates
    pub duration_buffer: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            velocity_px_per_s: 50.0,
            viewport_width: 128,
            loop_mode: LoopMode::Modulo,
            max_delta: DEFAULT_MAX_DELTA_SECS,
            smoothing_window: 4,
            target_fps: DEFAULT_TARGET_FPS,
            max_fps: 0.0,
            duration_buffer: 0.1,
        }
    }
}

impl ScrollConfig {
    /// Override the scroll speed
    pub fn velocity(mut self, px_per_s: f64) -> Self {
        self.velocity_px_per_s = px_per_s;
        self
    }

    /// Override the viewport width
    pub fn viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = width;
        self
    }

    /// Override the loop mode
    pub fn loop_mode(mut self, mode: LoopMode) -> Self {
        self.loop_mode = mode;
        self
    }

    /// Override the smoothing window length
    pub fn smoothing_window(mut self, samples: usize) -> Self {
        self.smoothing_window = samples;
        self
    }

    /// Override the soft fps ceiling
    pub fn max_fps(mut self, fps: f64) -> Self {
        self.max_fps = fps;
        self
    }

    /// Replace invalid values, warning about each.
    ///
    /// A negative or non-finite velocity stops the scroll; an invalid ceiling
    /// disables it.
    pub fn sanitized(mut self) -> Self {
        if !self.velocity_px_per_s.is_finite() || self.velocity_px_per_s < 0.0 {
            log::warn!(
                "Invalid scroll velocity {}; using 0",
                self.velocity_px_per_s
            );
            self.velocity_px_per_s = 0.0;
        }
        self.max_delta = positive_or(self.max_delta, DEFAULT_MAX_DELTA_SECS, "scroll.max_delta");
        self.target_fps = rate_or(self.target_fps, DEFAULT_TARGET_FPS, "scroll.target_fps");
        self.max_fps = ceiling_or_unlimited(self.max_fps, "scroll.max_fps");
        if !self.duration_buffer.is_finite() || self.duration_buffer < 0.0 {
            let fallback = ScrollConfig::default().duration_buffer;
            log::warn!(
                "Invalid scroll.duration_buffer {}; using {}",
                self.duration_buffer,
                fallback
            );
            self.duration_buffer = fallback;
        }
        self
    }
}

/// Animation state of one scrolling unit
#[derive(Debug, Clone)]
pub struct ScrollState {
    /// Left edge of the viewport within the content, in pixels
    pub position: f64,
    /// Width of the composed content
    pub content_width: u32,
    /// End-of-content policy
    pub loop_mode: LoopMode,
    /// Speed in pixels per second
    pub velocity_px_per_s: f64,
    /// Recent deltas used for smoothing
    pub delta_window: DeltaWindow,
}

/// Result of one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStep {
    /// Position after the move
    pub position: f64,
    /// Whether this frame finished a pass over the content
    pub cycle_completed: bool,
}

/// Frame-rate independent scroll engine
#[derive(Debug, Clone)]
pub struct ScrollEngine {
    config: ScrollConfig,
    state: ScrollState,
    budget: FrameBudget,
    clock: FrameClock,
    image: Option<ComposedImage>,
    /// Completed passes since the last reset
    cycles: u32,
    /// Single-pass animation reached its end
    halted: bool,
}

impl ScrollEngine {
    /// Create an engine with no content
    pub fn new(config: ScrollConfig) -> Self {
        let config = config.sanitized();
        ScrollEngine {
            state: ScrollState {
                position: 0.0,
                content_width: 0,
                loop_mode: config.loop_mode,
                velocity_px_per_s: config.velocity_px_per_s,
                delta_window: DeltaWindow::new(config.smoothing_window),
            },
            budget: FrameBudget::new(config.target_fps, config.max_fps),
            clock: FrameClock::new(config.max_delta),
            image: None,
            cycles: 0,
            halted: false,
            config,
        }
    }

    /// Install a new composed image and restart from position 0
    pub fn set_content(&mut self, image: ComposedImage) {
        self.state.content_width = image.width();
        self.image = Some(image);
        self.reset();
    }

    /// Set the content width without an image (geometry-only animation)
    pub fn set_content_width(&mut self, width: u32) {
        self.image = None;
        self.state.content_width = width;
        self.reset();
    }

    /// Restart the animation (`force_clear`): position, pacing and smoothing
    pub fn reset(&mut self) {
        self.state.position = 0.0;
        self.state.delta_window.clear();
        self.budget.reset();
        self.clock.reset();
        self.cycles = 0;
        self.halted = false;
    }

    /// Drive the engine from wall-clock time.
    ///
    /// Returns `None` when the frame is skipped by the fps ceiling.
    pub fn update(&mut self, now: Instant) -> Option<ScrollStep> {
        if !self.budget.should_process(now) {
            return None;
        }
        let delta = self.clock.tick(now);
        Some(self.advance(delta))
    }

    /// Move by `delta_seconds` of elapsed time
    pub fn advance(&mut self, delta_seconds: f64) -> ScrollStep {
        let width = f64::from(self.state.content_width);
        if self.halted || width <= 0.0 {
            return ScrollStep {
                position: self.state.position,
                cycle_completed: false,
            };
        }

        let clamped = if delta_seconds.is_finite() {
            delta_seconds.clamp(0.0, self.clock.get_max_delta())
        } else {
            0.0
        };
        let smoothed = self.state.delta_window.push(clamped);
        let mut position = self.state.position + self.state.velocity_px_per_s * smoothed;
        let mut cycle_completed = false;

        match self.state.loop_mode {
            LoopMode::Modulo => {
                if position >= width {
                    position = position.rem_euclid(width);
                    // rem_euclid can round up to `width` for tiny negative remainders
                    if position >= width {
                        position = 0.0;
                    }
                    cycle_completed = true;
                }
            }
            LoopMode::Continuous => {
                if position >= width {
                    position = 0.0;
                    cycle_completed = true;
                }
            }
            LoopMode::Single => {
                let end = self.single_pass_end();
                if position >= end {
                    position = end;
                    self.halted = true;
                    cycle_completed = true;
                }
            }
        }

        self.state.position = position;
        if cycle_completed {
            self.cycles += 1;
        }
        ScrollStep {
            position,
            cycle_completed,
        }
    }

    /// Viewport-sized frame at the current position (`None` without an image)
    pub fn extract_visible(&self) -> Option<ComposedImage> {
        self.image.as_ref().map(|image| {
            image.extract_visible(
                self.state.position,
                self.config.viewport_width,
                self.state.loop_mode.wraps(),
            )
        })
    }

    /// Time needed for one pass, padded by the configured buffer and clamped
    /// to `[min_duration, max_duration]` (seconds).
    pub fn estimated_duration(&self, min_duration: f64, max_duration: f64) -> f64 {
        let max_duration = max_duration.max(min_duration);
        let velocity = self.state.velocity_px_per_s;
        if velocity <= 0.0 {
            return max_duration;
        }
        let distance = match self.state.loop_mode {
            LoopMode::Single => self.single_pass_end(),
            LoopMode::Continuous | LoopMode::Modulo => f64::from(self.state.content_width),
        };
        let buffer = self.config.duration_buffer.max(0.0);
        ((distance / velocity) * (1.0 + buffer)).clamp(min_duration, max_duration)
    }

    /// Whether at least one pass finished since the last reset
    pub fn is_cycle_complete(&self) -> bool {
        self.cycles > 0
    }

    /// Completed passes since the last reset
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Whether a single-pass animation has stopped
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current position in pixels
    pub fn position(&self) -> f64 {
        self.state.position
    }

    /// Current animation state
    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    /// Engine settings
    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Frames dropped by the fps ceiling since the last reset
    pub fn skipped_frames(&self) -> u64 {
        self.budget.get_skipped()
    }

    fn single_pass_end(&self) -> f64 {
        (f64::from(self.state.content_width) - f64::from(self.config.viewport_width)).max(0.0)
    }
}
