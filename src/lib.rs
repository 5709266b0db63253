//! Display Scheduling Engine
//!
//! A cooperative real-time scheduler that decides which content unit (a
//! provider-exposed display mode) is active on a matrix display, for how
//! long, and under which preemption rules, plus a frame-paced scroll engine
//! that animates a wide composed image at sub-pixel precision independent
//! of the call rate.
//!
//! # Features
//! - Ordered rotation of content units with per-mode durations
//! - Live-priority preemption reported by providers
//! - Externally issued on-demand sessions (timed or pinned)
//! - Dynamic durations derived from provider cycle lengths and caps
//! - Provider health gating with whole-provider skip on failure
//! - Time-based scrolling with delta clamping, smoothing and a soft fps ceiling
//!
//! # Crate feature flags
//! - `demo` (default): the `display-scheduler` binary (enables `env_logger`)
//!
//! # Quick start
//! ```no_run
//! use display_scheduler::{
//!     ContentProvider, ModeScheduler, ProviderError, ProviderRegistry, SchedulerConfig,
//!     SystemClock,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Clock;
//!
//! impl ContentProvider for Clock {
//!     fn provider_id(&self) -> &str {
//!         "clock"
//!     }
//!     fn modes(&self) -> Vec<String> {
//!         vec!["clock".into()]
//!     }
//!     fn display(&mut self, _mode: &str, _force_clear: bool) -> Result<bool, ProviderError> {
//!         Ok(true)
//!     }
//! }
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register(Box::new(Clock));
//! let mut scheduler =
//!     ModeScheduler::new(registry, SchedulerConfig::default(), Arc::new(SystemClock));
//! scheduler.run_for(Duration::from_secs(30));
//! ```

#![warn(missing_docs)]

pub mod config; // Scheduler Configuration
pub mod duration; // Dynamic Display Durations
pub mod live; // Live Priority Preemption
pub mod on_demand; // On-Demand Override Sessions
pub mod provider; // Content Provider Capabilities
pub mod scheduler; // Mode Scheduler
pub mod scroll; // Sub-Pixel Scroll Animation
pub mod timing; // Clocks & Frame Pacing

pub use config::{HealthConfig, SchedulerConfig};
pub use duration::{DurationCalculator, DynamicDurationContext, ExitDecision};
pub use live::LivePriorityGate;
pub use on_demand::{
    command_channel, CommandReceiver, CommandSender, OnDemandAction, OnDemandError,
    OnDemandRequest, OnDemandSession, OnDemandState, SessionStatus, SharedState,
    StatePublisher,
};
pub use provider::health::{AlwaysHealthy, CircuitBreaker, PluginHealthGate};
pub use provider::{
    Capabilities, ContentProvider, ContentUnit, DisplayOutcome, ProviderError, ProviderRegistry,
};
pub use scheduler::{
    ActiveUnit, BackgroundTick, ModeScheduler, RotationState, SchedulerState, SchedulerStats,
    StopHandle, TickOutcome, UnitSource,
};
pub use scroll::{ComposedImage, DeltaWindow, LoopMode, ScrollConfig, ScrollEngine, ScrollStep};
pub use timing::{Clock, FrameBudget, FrameClock, ManualClock, SystemClock};

/// Error types for scheduler setup and configuration
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// Invalid or unreadable configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SchedulerError {
    /// Converts a String into `SchedulerError::Other`.
    ///
    /// Prefer `SchedulerError::Config(msg)` when the failure is a configuration problem.
    fn from(msg: String) -> Self {
        SchedulerError::Other(msg)
    }
}

impl From<&str> for SchedulerError {
    /// Converts a string slice into `SchedulerError::Other`.
    fn from(msg: &str) -> Self {
        SchedulerError::Other(msg.to_string())
    }
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
