//! Dynamic Display Durations
//!
//! Decides how long a content unit stays active. Static units get exactly
//! their base duration. Dynamic units get a window derived from the
//! provider's cycle length, bounded by the provider cap and the global cap,
//! and may leave early once the provider reports a complete cycle.

use crate::config::{
    positive_or, SchedulerConfig, DEFAULT_DISPLAY_DURATION, DEFAULT_DYNAMIC_DURATION_CAP,
};
use crate::provider::ContentProvider;
use crate::timing::secs_to_duration;
use std::time::Duration;

/// Duration window for one activation of a unit (seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicDurationContext {
    /// Earliest time the unit may leave
    pub min_duration: f64,
    /// Ceiling in force for this unit
    pub max_duration: f64,
    /// Time at which the unit must leave
    pub target_duration: f64,
    /// Whether early exit on cycle completion is allowed
    pub dynamic: bool,
}

/// Decision taken by the display loop after each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Keep displaying
    Continue,
    /// Cycle complete after the minimum plus grace
    CycleComplete,
    /// Target duration reached
    Deadline,
}

impl DynamicDurationContext {
    /// Fixed window: `min = target = max = base`
    pub fn fixed(base: f64) -> Self {
        DynamicDurationContext {
            min_duration: base,
            max_duration: base,
            target_duration: base,
            dynamic: false,
        }
    }

    /// Target duration as a [`Duration`]
    pub fn target(&self) -> Duration {
        secs_to_duration(self.target_duration)
    }

    /// Decide whether the unit should leave after `elapsed`.
    ///
    /// `cycle_complete` is only consulted for dynamic windows once the
    /// minimum plus `grace` has passed.
    pub fn exit_decision(
        &self,
        elapsed: Duration,
        grace: Duration,
        cycle_complete: impl FnOnce() -> bool,
    ) -> ExitDecision {
        let elapsed = elapsed.as_secs_f64();
        if elapsed >= self.target_duration {
            return ExitDecision::Deadline;
        }
        if self.dynamic && elapsed >= self.min_duration + grace.as_secs_f64() && cycle_complete()
        {
            return ExitDecision::CycleComplete;
        }
        ExitDecision::Continue
    }
}

/// Computes [`DynamicDurationContext`]s from configuration and provider answers
#[derive(Debug, Clone)]
pub struct DurationCalculator {
    global_cap: f64,
    grace_period: Duration,
}

impl DurationCalculator {
    /// Build from (sanitized) scheduler settings
    pub fn new(config: &SchedulerConfig) -> Self {
        DurationCalculator {
            global_cap: positive_or(
                config.dynamic_duration_cap,
                DEFAULT_DYNAMIC_DURATION_CAP,
                "dynamic_duration_cap",
            ),
            grace_period: secs_to_duration(config.grace_period),
        }
    }

    /// Grace period applied before an early exit
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Global ceiling (seconds)
    pub fn global_cap(&self) -> f64 {
        self.global_cap
    }

    /// Resolve the window for `mode` of `provider`.
    ///
    /// `base_duration` is the static per-mode duration; a non-positive value
    /// is replaced by `fallback` with a warning. Both are clamped to
    /// [`MAX_DURATION_SECS`](crate::config::MAX_DURATION_SECS).
    pub fn resolve(
        &self,
        provider: &dyn ContentProvider,
        mode: &str,
        base_duration: f64,
        fallback: f64,
    ) -> DynamicDurationContext {
        let fallback = positive_or(fallback, DEFAULT_DISPLAY_DURATION, "fallback duration");
        let base = positive_or(base_duration, fallback, &format!("duration for '{mode}'"));
        if !provider.supports_dynamic_duration() {
            return DynamicDurationContext::fixed(base);
        }

        let plugin_cap = provider.dynamic_duration_cap().filter(|cap| {
            let valid = cap.is_finite() && *cap > 0.0;
            if !valid {
                log::warn!(
                    "Ignoring invalid dynamic duration cap {} from '{}'",
                    cap,
                    provider.provider_id()
                );
            }
            valid
        });
        let chosen_cap = plugin_cap.map_or(self.global_cap, |cap| cap.min(self.global_cap));

        let cycle = match provider.cycle_duration(mode) {
            Ok(cycle) => cycle.filter(|c| c.is_finite() && *c > 0.0),
            Err(e) => {
                log::warn!(
                    "Cycle duration query failed for '{}': {}",
                    provider.provider_id(),
                    e
                );
                None
            }
        };

        let target = cycle.map_or(chosen_cap, |c| c.min(chosen_cap));
        let min_duration = base;
        let context = DynamicDurationContext {
            min_duration,
            max_duration: chosen_cap.max(min_duration),
            target_duration: target.max(min_duration),
            dynamic: true,
        };
        log::debug!(
            "Dynamic duration for '{}': min {:.1}s target {:.1}s max {:.1}s",
            mode,
            context.min_duration,
            context.target_duration,
            context.max_duration
        );
        context
    }

    /// Ask the provider whether its cycle is complete; errors count as "not complete"
    pub fn cycle_complete(provider: &dyn ContentProvider) -> bool {
        match provider.is_cycle_complete() {
            Ok(done) => done,
            Err(e) => {
                log::warn!(
                    "Cycle completion query failed for '{}': {}",
                    provider.provider_id(),
                    e
                );
                false
            }
        }
    }
}
