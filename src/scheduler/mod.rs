//! Mode Scheduler
//!
//! Decides which content unit is on the display and for how long.
//!
//! # Precedence
//!
//! 1. An active on-demand session
//! 2. A provider reporting live priority with live content
//! 3. The rotation unit at the current index
//!
//! Live priority and on-demand sessions never move the rotation index, so
//! when they end the display returns to the unit they interrupted.
//!
//! # Ticks
//!
//! One [`tick`](ModeScheduler::tick) polls the command channel, checks
//! session expiration, publishes the session state, resolves the active
//! unit, computes its duration window and runs the paced display loop until
//! the window closes. Rotation advances afterwards unless the window was
//! preempted, interrupted, or the unit did not come from rotation.

mod display_loop;
pub mod rotation;

pub use rotation::RotationState;

use crate::config::{SchedulerConfig, MAX_DURATION_SECS};
use crate::duration::DurationCalculator;
use crate::live::LivePriorityGate;
use crate::on_demand::{
    CommandReceiver, OnDemandAction, OnDemandError, OnDemandRequest, OnDemandSession,
    StatePublisher,
};
use crate::provider::health::{CircuitBreaker, PluginHealthGate};
use crate::provider::{ContentUnit, ProviderError, ProviderRegistry};
use crate::timing::Clock;
use display_loop::WindowEnd;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Background maintenance serviced between display frames
pub trait BackgroundTick: Send {
    /// Run one slice of background work; must return promptly
    fn tick(&mut self);
}

impl<F> BackgroundTick for F
where
    F: FnMut() + Send,
{
    fn tick(&mut self) {
        self()
    }
}

/// Cooperative stop signal, observed at the next pacing tick
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Check if a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// What selected the active unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSource {
    /// An on-demand session
    OnDemand,
    /// Live priority preemption
    Live,
    /// Ordinary rotation at `index`
    Rotation {
        /// Rotation index of the unit
        index: usize,
    },
}

/// Resolved unit together with what selected it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUnit {
    /// The unit to display
    pub unit: ContentUnit,
    /// Why it was chosen
    pub source: UnitSource,
}

/// Coarse scheduler state, as of the last tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing to display
    #[default]
    Idle,
    /// Showing rotation units
    Rotating,
    /// A live unit interrupted rotation
    LivePreempted,
    /// An on-demand session is running
    OnDemand,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Rotating => "rotating",
            SchedulerState::LivePreempted => "live",
            SchedulerState::OnDemand => "on-demand",
        };
        f.write_str(name)
    }
}

/// Counters for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Scheduler ticks run
    pub ticks: u64,
    /// Units activated with a fresh redraw
    pub activations: u64,
    /// Rotation index advances
    pub rotation_advances: u64,
    /// Display windows cut short by a higher-priority unit
    pub preemptions: u64,
    /// Failed `display()` calls
    pub display_failures: u64,
}

/// Result of one [`ModeScheduler::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing registered or resolvable
    Idle,
    /// The unit ran for its whole window
    Completed(ContentUnit),
    /// A dynamic unit finished its cycle and left early
    CycleComplete(ContentUnit),
    /// A higher-priority unit or a command took over
    Preempted(ContentUnit),
    /// The provider had nothing to show
    NoContent(ContentUnit),
    /// The provider failed while displaying
    Failed(ContentUnit, ProviderError),
    /// The health gate skipped the provider
    Skipped(ContentUnit),
    /// Stop requested or run deadline reached
    Interrupted,
}

/// Cooperative display scheduler.
///
/// Owns the provider registry, the rotation state and the on-demand
/// session. Everything runs on the caller's thread; the only inbound
/// signals are the [`CommandReceiver`] slot and the [`StopHandle`].
pub struct ModeScheduler {
    registry: ProviderRegistry,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    durations: DurationCalculator,
    live_gate: LivePriorityGate,
    health: Box<dyn PluginHealthGate>,
    background: Option<Box<dyn BackgroundTick>>,
    publisher: Option<Box<dyn StatePublisher>>,
    commands: Option<CommandReceiver>,
    rotation: RotationState,
    session: OnDemandSession,
    state: SchedulerState,
    stats: SchedulerStats,
    stop: StopHandle,
    deadline: Option<Instant>,
    last_displayed: Option<ContentUnit>,
    last_dynamic_unit: Option<ContentUnit>,
    pending_redraw: bool,
    shown_this_pass: bool,
    idle_pass: bool,
    last_live_check: Option<Instant>,
}

impl ModeScheduler {
    /// Create a scheduler over every unit in `registry`.
    ///
    /// The configuration is sanitized first. Provider health defaults to a
    /// [`CircuitBreaker`] built from `config.health`.
    pub fn new(registry: ProviderRegistry, config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let config = config.sanitized();
        let rotation = RotationState::new(registry.units().to_vec());
        let health = Box::new(CircuitBreaker::new(&config.health, Arc::clone(&clock)));
        log::info!(
            "Scheduler ready: {} unit(s) from {} provider(s)",
            rotation.len(),
            registry.provider_ids_in_rotation_order().len()
        );

        ModeScheduler {
            durations: DurationCalculator::new(&config),
            registry,
            config,
            clock,
            live_gate: LivePriorityGate::new(),
            health,
            background: None,
            publisher: None,
            commands: None,
            rotation,
            session: OnDemandSession::new(),
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
            stop: StopHandle::new(),
            deadline: None,
            last_displayed: None,
            last_dynamic_unit: None,
            pending_redraw: true,
            shown_this_pass: false,
            idle_pass: false,
            last_live_check: None,
        }
    }

    /// Replace the provider health gate
    pub fn with_health(mut self, health: impl PluginHealthGate + 'static) -> Self {
        self.health = Box::new(health);
        self
    }

    /// Service `background` between display frames
    pub fn with_background(mut self, background: impl BackgroundTick + 'static) -> Self {
        self.background = Some(Box::new(background));
        self
    }

    /// Publish on-demand state through `publisher`
    pub fn with_state_publisher(mut self, publisher: impl StatePublisher + 'static) -> Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    /// Read on-demand commands from `receiver`
    pub fn with_command_receiver(mut self, receiver: CommandReceiver) -> Self {
        self.commands = Some(receiver);
        self
    }

    /// Handle that stops [`run`](Self::run_for) loops started without an explicit handle
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Coarse state as of the last tick
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Monitoring counters
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// On-demand session
    pub fn session(&self) -> &OnDemandSession {
        &self.session
    }

    /// Rotation state
    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    /// Registered providers
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Effective (sanitized) configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Take at most one pending command and apply it.
    ///
    /// Returns `true` when a session was started, replaced or ended, i.e.
    /// when the unit selection must be re-resolved.
    pub fn poll_on_demand(&mut self) -> bool {
        let Some(request) = self.commands.as_mut().and_then(|rx| rx.poll()) else {
            return false;
        };
        log::debug!("On-demand request '{}': {:?}", request.request_id, request.action);

        let changed = match &request.action {
            OnDemandAction::Start => match self.resolve_request(&request) {
                Ok(unit) => {
                    self.start_session(unit, &request);
                    true
                }
                Err(e) => {
                    self.reject(&request, e);
                    false
                }
            },
            OnDemandAction::Stop => {
                let ended = self.end_session("stopped");
                if !ended {
                    log::debug!("Stop request '{}' with no active session", request.request_id);
                }
                ended
            }
            OnDemandAction::Unknown(action) => {
                self.reject(&request, OnDemandError::InvalidAction(action.clone()));
                false
            }
        };
        self.publish_state();
        changed
    }

    /// End a bounded session whose time is up.
    ///
    /// Returns `true` when a session was ended.
    pub fn check_expiration(&mut self) -> bool {
        if !self.session.is_expired(self.clock.now()) {
            return false;
        }
        let ended = self.end_session("expired");
        self.publish_state();
        ended
    }

    /// Unit that should be on the display now
    pub fn resolve_active_unit(&self) -> Option<ActiveUnit> {
        if self.session.is_active() {
            if let Some(unit) = self.session.unit() {
                return Some(ActiveUnit {
                    unit: unit.clone(),
                    source: UnitSource::OnDemand,
                });
            }
        }

        if let Some(unit) = self.live_gate.find_live_unit(
            &self.registry,
            self.health.as_ref(),
            self.rotation.skipped_providers(),
        ) {
            return Some(ActiveUnit {
                unit,
                source: UnitSource::Live,
            });
        }

        self.rotation.current().map(|unit| ActiveUnit {
            unit: unit.clone(),
            source: UnitSource::Rotation {
                index: self.rotation.current_index(),
            },
        })
    }

    /// Move rotation to the next unit, skipping providers failed this pass
    pub fn advance_rotation(&mut self) -> Option<ContentUnit> {
        let passes = self.rotation.passes();
        let next = self.rotation.advance().cloned();
        if let Some(unit) = &next {
            self.stats.rotation_advances += 1;
            self.pending_redraw = true;
            log::debug!(
                "Rotation advanced to {} (index {})",
                unit,
                self.rotation.current_index()
            );
        }
        if self.rotation.passes() != passes {
            self.idle_pass = !self.shown_this_pass;
            self.shown_this_pass = false;
        }
        next
    }

    /// Run one full scheduler tick
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;
        if self.should_stop() {
            return TickOutcome::Interrupted;
        }

        self.poll_on_demand();
        self.check_expiration();
        self.publish_state();

        let Some(active) = self.resolve_active_unit() else {
            self.state = SchedulerState::Idle;
            self.rotation.set_active_mode(None);
            log::debug!("No unit to display");
            self.idle_sleep();
            return TickOutcome::Idle;
        };
        self.state = match active.source {
            UnitSource::OnDemand => SchedulerState::OnDemand,
            UnitSource::Live => SchedulerState::LivePreempted,
            UnitSource::Rotation { .. } => SchedulerState::Rotating,
        };

        let unit = active.unit.clone();
        if matches!(active.source, UnitSource::Rotation { .. })
            && self.health.should_skip(unit.provider_id())
        {
            log::debug!("Health gate skipping {}", unit);
            self.rotation.skip_provider(unit.provider_id());
            self.advance_rotation();
            self.pace_after_pass();
            return TickOutcome::Skipped(unit);
        }

        let end = self.display_unit(&active);
        let outcome = self.handle_window_end(&active, end);
        self.pace_after_pass();
        outcome
    }

    /// Tick until `stop` is requested
    pub fn run(&mut self, stop: &StopHandle) -> SchedulerStats {
        self.stop = stop.clone();
        while !self.should_stop() {
            self.tick();
        }
        log::info!("Scheduler stopped after {} tick(s)", self.stats.ticks);
        self.stats
    }

    /// Tick for `duration` of clock time, or until stopped
    pub fn run_for(&mut self, duration: Duration) -> SchedulerStats {
        self.deadline = Some(self.clock.now() + duration);
        while !self.should_stop() {
            self.tick();
        }
        self.deadline = None;
        log::info!("Scheduler ran {:?}: {:?}", duration, self.stats);
        self.stats
    }

    fn resolve_request(&self, request: &OnDemandRequest) -> Result<ContentUnit, OnDemandError> {
        if let Some(duration) = request.duration {
            if !duration.is_finite() {
                return Err(OnDemandError::InvalidPayload(format!(
                    "duration {duration} is not a number"
                )));
            }
            if duration > MAX_DURATION_SECS {
                return Err(OnDemandError::InvalidPayload(format!(
                    "duration {duration} exceeds {MAX_DURATION_SECS} seconds"
                )));
            }
        }

        let provider_id = request.provider_id.as_deref().filter(|p| !p.is_empty());
        if let Some(provider_id) = provider_id {
            if !self.registry.contains_provider(provider_id) {
                return Err(OnDemandError::UnknownProvider(provider_id.to_string()));
            }
        }

        match request.mode.as_deref().filter(|m| !m.is_empty()) {
            Some(mode) => {
                let unit = self
                    .registry
                    .unit(mode)
                    .ok_or_else(|| OnDemandError::UnknownMode(mode.to_string()))?;
                match provider_id {
                    Some(provider_id) if unit.provider_id() != provider_id => {
                        Err(OnDemandError::ModeProviderMismatch {
                            mode: mode.to_string(),
                            provider_id: provider_id.to_string(),
                        })
                    }
                    _ => Ok(unit.clone()),
                }
            }
            None => {
                let provider_id = provider_id.ok_or(OnDemandError::MissingTarget)?;
                self.registry
                    .first_unit_of(provider_id)
                    .cloned()
                    .ok_or_else(|| OnDemandError::UnknownProvider(provider_id.to_string()))
            }
        }
    }

    fn start_session(&mut self, unit: ContentUnit, request: &OnDemandRequest) {
        let resume = (!self.rotation.is_empty()).then(|| self.rotation.current_index());
        log::info!(
            "On-demand session for {} ({})",
            unit,
            match (request.pinned, request.duration) {
                (true, _) => "pinned".to_string(),
                (false, Some(d)) if d > 0.0 => format!("{d:.1}s"),
                _ => "until stopped".to_string(),
            }
        );
        self.session.start(
            unit,
            request.duration,
            request.pinned,
            resume,
            self.clock.now(),
            self.clock.wall_time(),
        );
    }

    fn end_session(&mut self, event: &str) -> bool {
        if !self.session.is_active() {
            return false;
        }
        let resume = self.session.end(event);
        log::info!("On-demand session {}", event);
        if let Some(index) = resume {
            self.rotation.restore(index);
        }
        self.pending_redraw = true;
        true
    }

    fn fail_session(&mut self, error: &ProviderError) {
        let resume = self
            .session
            .fail(&OnDemandError::DisplayFailed(error.to_string()));
        log::warn!("On-demand session ended: {}", error);
        if let Some(index) = resume {
            self.rotation.restore(index);
        }
        self.pending_redraw = true;
        self.publish_state();
    }

    fn reject(&mut self, request: &OnDemandRequest, error: OnDemandError) {
        log::warn!(
            "Rejected on-demand request '{}' ({}): {}",
            request.request_id,
            error.code(),
            error
        );
        self.session.reject(&error);
    }

    fn publish_state(&mut self) {
        if let Some(publisher) = self.publisher.as_mut() {
            let state = self.session.to_state(self.clock.now());
            publisher.publish(&state);
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.is_stopped() || self.deadline.is_some_and(|d| self.clock.now() >= d)
    }

    /// Bound a sleep by the run deadline
    fn bounded(&self, nap: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => nap.min(deadline.saturating_duration_since(self.clock.now())),
            None => nap,
        }
    }

    fn idle_sleep(&self) {
        let nap = self.bounded(self.config.normal_interval_duration());
        self.clock.sleep(nap);
    }

    fn pace_after_pass(&mut self) {
        if std::mem::take(&mut self.idle_pass) {
            log::debug!("Nothing displayable in the last pass; idling");
            self.idle_sleep();
        }
    }

    fn handle_window_end(&mut self, active: &ActiveUnit, end: WindowEnd) -> TickOutcome {
        let unit = active.unit.clone();
        let from_rotation = matches!(active.source, UnitSource::Rotation { .. });

        match end {
            WindowEnd::Completed => {
                self.finish_window(&unit, from_rotation);
                TickOutcome::Completed(unit)
            }
            WindowEnd::CycleComplete => {
                self.finish_window(&unit, from_rotation);
                TickOutcome::CycleComplete(unit)
            }
            WindowEnd::Preempted => {
                self.stats.preemptions += 1;
                log::debug!("{} preempted", unit);
                TickOutcome::Preempted(unit)
            }
            WindowEnd::Interrupted => TickOutcome::Interrupted,
            WindowEnd::NoContent => {
                self.health.record_success(unit.provider_id());
                if from_rotation {
                    self.advance_rotation();
                } else {
                    self.idle_sleep();
                }
                TickOutcome::NoContent(unit)
            }
            WindowEnd::Failed(error) => {
                self.stats.display_failures += 1;
                log::warn!("{} failed: {}", unit, error);
                self.health.record_failure(unit.provider_id(), &error);
                match active.source {
                    UnitSource::OnDemand => self.fail_session(&error),
                    UnitSource::Live => self.rotation.skip_provider(unit.provider_id()),
                    UnitSource::Rotation { .. } => {
                        self.rotation.skip_provider(unit.provider_id());
                        self.advance_rotation();
                    }
                }
                TickOutcome::Failed(unit, error)
            }
        }
    }

    /// Advance after a full window, unless the unit is held by live priority
    fn finish_window(&mut self, unit: &ContentUnit, from_rotation: bool) {
        if from_rotation && !self.provider_is_live(unit.provider_id()) {
            self.advance_rotation();
        }
    }

    fn provider_is_live(&self, provider_id: &str) -> bool {
        self.registry
            .provider(provider_id)
            .is_some_and(|p| self.live_gate.is_live(p))
    }
}

impl fmt::Debug for ModeScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeScheduler")
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("rotation", &self.rotation)
            .field("session", &self.session)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
