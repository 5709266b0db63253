//! Paced display loop for one activation of a unit

use super::{ActiveUnit, ModeScheduler, UnitSource};
use crate::duration::{DurationCalculator, DynamicDurationContext, ExitDecision};
use crate::provider::{Capabilities, DisplayOutcome, ProviderError};

/// How a display window ended
#[derive(Debug, Clone, PartialEq)]
pub(super) enum WindowEnd {
    /// Target duration reached
    Completed,
    /// Dynamic unit reported a full cycle after its minimum
    CycleComplete,
    /// A command, expiration or live change needs a new resolution
    Preempted,
    /// First `display()` returned nothing to show
    NoContent,
    /// `display()` returned an error
    Failed(ProviderError),
    /// Stop or run deadline
    Interrupted,
}

impl ModeScheduler {
    /// Activate `active` and drive it until its window closes
    pub(super) fn display_unit(&mut self, active: &ActiveUnit) -> WindowEnd {
        let unit = &active.unit;
        let Some(provider) = self.registry.provider(unit.provider_id()) else {
            return WindowEnd::Failed(ProviderError::Unavailable(format!(
                "provider '{}' is not registered",
                unit.provider_id()
            )));
        };

        let base = provider
            .display_duration(unit.mode_id())
            .unwrap_or_else(|| self.config.base_duration_for(unit.mode_id()));
        let window = self.durations.resolve(
            provider,
            unit.mode_id(),
            base,
            self.config.default_duration,
        );
        let high_rate = provider.capabilities().contains(Capabilities::HIGH_RATE);
        let dynamic = window.dynamic;

        let force_clear = self.pending_redraw || self.last_displayed.as_ref() != Some(unit);
        self.pending_redraw = false;
        if force_clear {
            self.stats.activations += 1;
            log::info!(
                "Showing {} ({}) for {:.1}s",
                unit,
                source_name(active.source),
                window.target_duration
            );
        }

        if dynamic {
            if self.last_dynamic_unit.as_ref() != Some(unit) {
                if let Some(provider) = self.registry.provider_mut(unit.provider_id()) {
                    provider.reset_cycle_state();
                }
                self.last_dynamic_unit = Some(unit.clone());
            }
        } else {
            self.last_dynamic_unit = None;
        }

        self.last_displayed = Some(unit.clone());
        self.rotation.set_active_mode(Some(unit.clone()));
        self.paced_loop(active, window, force_clear, high_rate)
    }

    fn paced_loop(
        &mut self,
        active: &ActiveUnit,
        window: DynamicDurationContext,
        mut force_clear: bool,
        high_rate: bool,
    ) -> WindowEnd {
        let unit = &active.unit;
        let interval = if high_rate {
            self.config.high_rate_interval()
        } else {
            self.config.normal_interval_duration()
        };
        let grace = self.durations.grace_period();
        let target = window.target();
        let started = self.clock.now();
        self.last_live_check = Some(started);
        let mut first_frame = true;

        loop {
            if self.should_stop() {
                return WindowEnd::Interrupted;
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= target {
                return WindowEnd::Completed;
            }
            if self.preemption_pending(active) {
                return WindowEnd::Preempted;
            }

            let result = match self.registry.provider_mut(unit.provider_id()) {
                Some(provider) => provider.display(unit.mode_id(), force_clear),
                None => Err(ProviderError::Unavailable(unit.provider_id().to_string())),
            };
            force_clear = false;

            match DisplayOutcome::from_result(result) {
                DisplayOutcome::Failed(error) => return WindowEnd::Failed(error),
                DisplayOutcome::NoContent if first_frame => return WindowEnd::NoContent,
                DisplayOutcome::Shown | DisplayOutcome::NoContent => {
                    if first_frame {
                        self.health.record_success(unit.provider_id());
                        self.shown_this_pass = true;
                        first_frame = false;
                    }
                }
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            let provider = self.registry.provider(unit.provider_id());
            let decision = window.exit_decision(elapsed, grace, || {
                provider.is_some_and(DurationCalculator::cycle_complete)
            });
            match decision {
                ExitDecision::CycleComplete => {
                    log::debug!("{} finished its cycle after {:?}", unit, elapsed);
                    return WindowEnd::CycleComplete;
                }
                ExitDecision::Deadline => return WindowEnd::Completed,
                ExitDecision::Continue => {}
            }

            if let Some(background) = self.background.as_mut() {
                background.tick();
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            let nap = self.bounded(interval.min(target.saturating_sub(elapsed)));
            self.clock.sleep(nap);
        }
    }

    /// Check the external signals that end a window early
    fn preemption_pending(&mut self, active: &ActiveUnit) -> bool {
        let command = self.poll_on_demand();
        let expired = self.check_expiration();
        if command || expired {
            return true;
        }
        if active.source == UnitSource::OnDemand {
            return false;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_live_check {
            if now.saturating_duration_since(last) < self.config.live_check_duration() {
                return false;
            }
        }
        self.last_live_check = Some(now);

        let live = self.live_gate.find_live_unit(
            &self.registry,
            self.health.as_ref(),
            self.rotation.skipped_providers(),
        );
        match active.source {
            UnitSource::Rotation { .. } => {
                if let Some(live) = &live {
                    log::info!("Live content from {} preempts {}", live, active.unit);
                }
                live.is_some()
            }
            UnitSource::Live => live.as_ref() != Some(&active.unit),
            UnitSource::OnDemand => false,
        }
    }
}

fn source_name(source: UnitSource) -> &'static str {
    match source {
        UnitSource::OnDemand => "on-demand",
        UnitSource::Live => "live",
        UnitSource::Rotation { .. } => "rotation",
    }
}
