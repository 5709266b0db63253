//! Scheduler Configuration
//!
//! Loaded from JSON; every field has a default. Invalid numeric values are
//! never fatal: [`SchedulerConfig::sanitized`] swaps them for safe defaults
//! and logs a warning for each one.

use crate::scroll::ScrollConfig;
use crate::timing::secs_to_duration;
use crate::{Result, SchedulerError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Base display duration when neither provider nor config names one (seconds)
pub const DEFAULT_DISPLAY_DURATION: f64 = 15.0;

/// Process-wide ceiling on dynamic durations (seconds)
pub const DEFAULT_DYNAMIC_DURATION_CAP: f64 = 180.0;

/// Slack before an early cycle-complete exit is honoured (seconds)
pub const DEFAULT_GRACE_PERIOD: f64 = 0.5;

/// Update rate of the high-rate display loop
pub const DEFAULT_HIGH_RATE_FPS: f64 = 125.0;

/// Polling interval of the normal display loop (seconds)
pub const DEFAULT_NORMAL_INTERVAL: f64 = 1.0;

/// How often live priority is re-checked while a unit is displayed (seconds)
pub const DEFAULT_LIVE_CHECK_INTERVAL: f64 = 1.0;

/// Ceiling on every duration and interval the scheduler accepts (seconds).
///
/// Larger values are clamped so they always fit a [`Duration`] and an
/// `Instant` offset.
pub const MAX_DURATION_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Lowest loop rate accepted (frames per second)
pub const MIN_RATE_FPS: f64 = 1.0 / MAX_DURATION_SECS;

/// Provider circuit breaker settings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures before a provider is skipped
    pub failure_threshold: u32,
    /// Seconds a failing provider stays skipped
    pub cooldown: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: 60.0,
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Base duration for modes without a configured one (seconds)
    pub default_duration: f64,
    /// Per-mode base durations (seconds)
    pub mode_durations: HashMap<String, f64>,
    /// Global dynamic duration ceiling (seconds)
    pub dynamic_duration_cap: f64,
    /// Early-exit grace period (seconds)
    pub grace_period: f64,
    /// High-rate loop frequency
    pub high_rate_fps: f64,
    /// Normal loop polling interval (seconds)
    pub normal_interval: f64,
    /// Live priority re-check interval during display (seconds)
    pub live_check_interval: f64,
    /// Provider circuit breaker
    pub health: HealthConfig,
    /// Scroll defaults handed to scrolling providers
    pub scroll: ScrollConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DISPLAY_DURATION,
            mode_durations: HashMap::new(),
            dynamic_duration_cap: DEFAULT_DYNAMIC_DURATION_CAP,
            grace_period: DEFAULT_GRACE_PERIOD,
            high_rate_fps: DEFAULT_HIGH_RATE_FPS,
            normal_interval: DEFAULT_NORMAL_INTERVAL,
            live_check_interval: DEFAULT_LIVE_CHECK_INTERVAL,
            health: HealthConfig::default(),
            scroll: ScrollConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Set the fallback base duration
    pub fn default_duration(mut self, seconds: f64) -> Self {
        self.default_duration = seconds;
        self
    }

    /// Set the base duration for one mode
    pub fn mode_duration(mut self, mode: impl Into<String>, seconds: f64) -> Self {
        self.mode_durations.insert(mode.into(), seconds);
        self
    }

    /// Set the global dynamic duration ceiling
    pub fn dynamic_duration_cap(mut self, seconds: f64) -> Self {
        self.dynamic_duration_cap = seconds;
        self
    }

    /// Set the early-exit grace period
    pub fn grace_period(mut self, seconds: f64) -> Self {
        self.grace_period = seconds;
        self
    }

    /// Set the normal loop interval
    pub fn normal_interval(mut self, seconds: f64) -> Self {
        self.normal_interval = seconds;
        self
    }

    /// Set the high-rate loop frequency
    pub fn high_rate_fps(mut self, fps: f64) -> Self {
        self.high_rate_fps = fps;
        self
    }

    /// Set the live priority re-check interval
    pub fn live_check_interval(mut self, seconds: f64) -> Self {
        self.live_check_interval = seconds;
        self
    }

    /// Replace invalid values with defaults, warning about each
    pub fn sanitized(mut self) -> Self {
        self.default_duration = positive_or(
            self.default_duration,
            DEFAULT_DISPLAY_DURATION,
            "default_duration",
        );
        let fallback = self.default_duration;
        for (mode, seconds) in self.mode_durations.iter_mut() {
            *seconds = positive_or(*seconds, fallback, &format!("mode_durations.{mode}"));
        }
        self.dynamic_duration_cap = positive_or(
            self.dynamic_duration_cap,
            DEFAULT_DYNAMIC_DURATION_CAP,
            "dynamic_duration_cap",
        );
        if !self.grace_period.is_finite() || self.grace_period < 0.0 {
            log::warn!(
                "Invalid grace_period {}; using {}",
                self.grace_period,
                DEFAULT_GRACE_PERIOD
            );
            self.grace_period = DEFAULT_GRACE_PERIOD;
        } else {
            self.grace_period = at_most(self.grace_period, MAX_DURATION_SECS, "grace_period");
        }
        self.high_rate_fps = rate_or(self.high_rate_fps, DEFAULT_HIGH_RATE_FPS, "high_rate_fps");
        self.normal_interval = positive_or(
            self.normal_interval,
            DEFAULT_NORMAL_INTERVAL,
            "normal_interval",
        );
        self.live_check_interval = positive_or(
            self.live_check_interval,
            DEFAULT_LIVE_CHECK_INTERVAL,
            "live_check_interval",
        );
        if self.health.failure_threshold == 0 {
            log::warn!("health.failure_threshold must be at least 1; using 1");
            self.health.failure_threshold = 1;
        }
        self.health.cooldown = positive_or(
            self.health.cooldown,
            HealthConfig::default().cooldown,
            "health.cooldown",
        );
        self.scroll = self.scroll.sanitized();
        self
    }

    /// Configured base duration for a mode (seconds)
    pub fn base_duration_for(&self, mode: &str) -> f64 {
        self.mode_durations
            .get(mode)
            .copied()
            .unwrap_or(self.default_duration)
    }

    /// Sleep interval of the high-rate loop
    pub fn high_rate_interval(&self) -> Duration {
        secs_to_duration(1.0 / self.high_rate_fps)
    }

    /// Sleep interval of the normal loop
    pub fn normal_interval_duration(&self) -> Duration {
        secs_to_duration(self.normal_interval)
    }

    /// Live priority re-check interval
    pub fn live_check_duration(&self) -> Duration {
        secs_to_duration(self.live_check_interval)
    }
}

/// Return `value` if finite and > 0, otherwise warn and return `fallback`.
///
/// Values above [`MAX_DURATION_SECS`] are clamped with a warning.
pub(crate) fn positive_or(value: f64, fallback: f64, name: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        at_most(value, MAX_DURATION_SECS, name)
    } else {
        log::warn!("Invalid {} {}; using {}", name, value, fallback);
        fallback
    }
}

/// Like [`positive_or`] for rates: rates below [`MIN_RATE_FPS`] are raised
pub(crate) fn rate_or(value: f64, fallback: f64, name: &str) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        log::warn!("Invalid {} {}; using {}", name, value, fallback);
        fallback
    } else if value < MIN_RATE_FPS {
        log::warn!("{} {} is below {}; clamping", name, value, MIN_RATE_FPS);
        MIN_RATE_FPS
    } else {
        value
    }
}

/// Validate an optional fps ceiling: invalid values disable it (0)
pub(crate) fn ceiling_or_unlimited(value: f64, name: &str) -> f64 {
    if value == 0.0 {
        0.0
    } else if !value.is_finite() || value < 0.0 {
        log::warn!("Invalid {} {}; disabling the ceiling", name, value);
        0.0
    } else {
        rate_or(value, 0.0, name)
    }
}

fn at_most(value: f64, max: f64, name: &str) -> f64 {
    if value > max {
        log::warn!("{} {} exceeds {}; clamping", name, value, max);
        max
    } else {
        value
    }
}
