//! Shared fakes for scheduler integration tests

#![allow(dead_code)]

use display_scheduler::{
    Capabilities, ContentProvider, ManualClock, ModeScheduler, ProviderError, ProviderRegistry,
    SchedulerConfig,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Every `display()` call as `(mode, force_clear)`
#[derive(Debug, Clone, Default)]
pub struct DisplayLog {
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

impl DisplayLog {
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }

    /// Modes in the order they were activated (calls with `force_clear`)
    pub fn activations(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, clear)| *clear)
            .map(|(mode, _)| mode.clone())
            .collect()
    }

    pub fn count(&self, mode: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == mode).count()
    }
}

/// Provider whose answers are set up front
pub struct Scripted {
    id: String,
    modes: Vec<String>,
    capabilities: Capabilities,
    duration: Option<f64>,
    cap: Option<f64>,
    cycle: Option<f64>,
    cycle_error: bool,
    failing: bool,
    empty_modes: HashSet<String>,
    live: Arc<AtomicBool>,
    live_modes: Vec<String>,
    cycle_complete: Arc<AtomicBool>,
    resets: Arc<AtomicU32>,
    log: DisplayLog,
}

impl Scripted {
    pub fn new(id: &str, modes: &[&str]) -> Self {
        Scripted {
            id: id.to_string(),
            modes: modes.iter().map(|m| m.to_string()).collect(),
            capabilities: Capabilities::empty(),
            duration: None,
            cap: None,
            cycle: None,
            cycle_error: false,
            failing: false,
            empty_modes: HashSet::new(),
            live: Arc::new(AtomicBool::new(false)),
            live_modes: Vec::new(),
            cycle_complete: Arc::new(AtomicBool::new(false)),
            resets: Arc::new(AtomicU32::new(0)),
            log: DisplayLog::default(),
        }
    }

    /// Every display call fails
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `mode` has nothing to show
    pub fn empty(mut self, mode: &str) -> Self {
        self.empty_modes.insert(mode.to_string());
        self
    }

    /// Provider-specified base duration for every mode
    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// `is_cycle_complete()` always errors
    pub fn cycle_error(mut self) -> Self {
        self.cycle_error = true;
        self
    }

    /// Drive with the high-rate loop
    pub fn high_rate(mut self) -> Self {
        self.capabilities |= Capabilities::HIGH_RATE;
        self
    }

    /// Dynamic duration with the given cap and cycle length
    pub fn dynamic(mut self, cap: Option<f64>, cycle: Option<f64>) -> Self {
        self.capabilities |= Capabilities::DYNAMIC_DURATION;
        self.cap = cap;
        self.cycle = cycle;
        self
    }

    /// Live priority controlled through the returned flag
    pub fn live(mut self, live_modes: &[&str]) -> Self {
        self.capabilities |= Capabilities::LIVE_PRIORITY;
        self.live_modes = live_modes.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn live_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    pub fn cycle_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cycle_complete)
    }

    pub fn resets(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.resets)
    }

    pub fn log(&self) -> DisplayLog {
        self.log.clone()
    }
}

impl ContentProvider for Scripted {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn modes(&self) -> Vec<String> {
        self.modes.clone()
    }

    fn display(&mut self, mode: &str, force_clear: bool) -> Result<bool, ProviderError> {
        self.log.calls.lock().push((mode.to_string(), force_clear));
        if self.failing {
            return Err(ProviderError::display(format!("{mode} exploded")));
        }
        Ok(!self.empty_modes.contains(mode))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn display_duration(&self, _mode: &str) -> Option<f64> {
        self.duration
    }

    fn dynamic_duration_cap(&self) -> Option<f64> {
        self.cap
    }

    fn cycle_duration(&self, _mode: &str) -> Result<Option<f64>, ProviderError> {
        Ok(self.cycle)
    }

    fn is_cycle_complete(&self) -> Result<bool, ProviderError> {
        if self.cycle_error {
            return Err(ProviderError::query("cycle state unavailable"));
        }
        Ok(self.cycle_complete.load(Ordering::Relaxed))
    }

    fn reset_cycle_state(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        self.cycle_complete.store(false, Ordering::Relaxed);
    }

    fn has_live_priority(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    fn has_live_content(&self) -> Result<bool, ProviderError> {
        Ok(self.live.load(Ordering::Relaxed))
    }

    fn live_modes(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.live_modes.clone())
    }
}

/// Scheduler over `providers` with a hand-driven clock
pub fn scheduler_with(
    providers: Vec<Scripted>,
    config: SchedulerConfig,
) -> (ModeScheduler, Arc<ManualClock>) {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(Box::new(provider));
    }
    let clock = Arc::new(ManualClock::default());
    let scheduler = ModeScheduler::new(registry, config, clock.clone());
    (scheduler, clock)
}

/// 5-second static units, 1-second normal loop
pub fn five_second_config() -> SchedulerConfig {
    SchedulerConfig::default()
        .default_duration(5.0)
        .normal_interval(1.0)
}
