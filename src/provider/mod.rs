//! Content Provider Capabilities
//!
//! Providers (plugins) expose one or more display modes. The scheduler only
//! talks to them through [`ContentProvider`], whose optional capabilities all
//! carry default bodies, so no runtime feature probing is ever needed.
//!
//! # Trait shape
//!
//! - `provider_id`, `modes`, `display` are required
//! - everything else defaults to "capability absent"
//! - calls that can fail return `Result<_, ProviderError>`; the scheduler
//!   degrades an error to the capability's safe default

pub mod health;

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Optional behaviours a provider advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Continuously animating; drive with the high-rate loop
        const HIGH_RATE = 0b0000_0001;
        /// Display time follows the provider's cycle length
        const DYNAMIC_DURATION = 0b0000_0010;
        /// May preempt rotation with live content
        const LIVE_PRIORITY = 0b0000_0100;
    }
}

/// Error reported by a provider call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider failed while rendering
    #[error("Display failed: {0}")]
    Display(String),

    /// The provider could not answer a capability query
    #[error("Capability query failed: {0}")]
    Query(String),

    /// The provider's backing data is unavailable
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Creates a display error
    pub fn display(reason: impl Into<String>) -> Self {
        ProviderError::Display(reason.into())
    }

    /// Creates a capability query error
    pub fn query(reason: impl Into<String>) -> Self {
        ProviderError::Query(reason.into())
    }
}

/// One selectable display mode owned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUnit {
    mode_id: String,
    provider_id: String,
}

impl ContentUnit {
    /// Create a unit handle
    pub fn new(mode_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        ContentUnit {
            mode_id: mode_id.into(),
            provider_id: provider_id.into(),
        }
    }

    /// Mode identifier
    pub fn mode_id(&self) -> &str {
        &self.mode_id
    }

    /// Owning provider identifier
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }
}

impl fmt::Display for ContentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.mode_id)
    }
}

/// Outcome of one `display()` call, as the scheduler branches on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// Content was drawn
    Shown,
    /// Nothing to show right now (not a failure)
    NoContent,
    /// The provider failed
    Failed(ProviderError),
}

impl DisplayOutcome {
    /// Classify a raw provider result
    pub fn from_result(result: Result<bool, ProviderError>) -> Self {
        match result {
            Ok(true) => DisplayOutcome::Shown,
            Ok(false) => DisplayOutcome::NoContent,
            Err(e) => DisplayOutcome::Failed(e),
        }
    }
}

/// Content provider interface.
///
/// Only [`provider_id`](Self::provider_id), [`modes`](Self::modes) and
/// [`display`](Self::display) are required.
pub trait ContentProvider: Send {
    /// Stable provider identifier
    fn provider_id(&self) -> &str;

    /// Declared display modes, in rotation order
    fn modes(&self) -> Vec<String>;

    /// Draw `mode`. `force_clear` is set when the unit has just become active
    /// and any per-unit animation state must restart.
    ///
    /// Returns `Ok(false)` when there is nothing to show.
    fn display(&mut self, mode: &str, force_clear: bool) -> Result<bool, ProviderError>;

    /// Advertised optional behaviours
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Base display duration for `mode` in seconds.
    ///
    /// `None` falls back to the scheduler's per-mode configuration.
    fn display_duration(&self, _mode: &str) -> Option<f64> {
        None
    }

    /// Whether display time follows the provider's cycle length
    fn supports_dynamic_duration(&self) -> bool {
        self.capabilities().contains(Capabilities::DYNAMIC_DURATION)
    }

    /// Provider-specific ceiling on dynamic durations (seconds)
    fn dynamic_duration_cap(&self) -> Option<f64> {
        None
    }

    /// Time needed to show all of `mode`'s content once (seconds)
    fn cycle_duration(&self, _mode: &str) -> Result<Option<f64>, ProviderError> {
        Ok(None)
    }

    /// Whether one full pass of the content has been shown
    fn is_cycle_complete(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    /// Restart cycle tracking
    fn reset_cycle_state(&mut self) {}

    /// Whether the provider currently claims live priority
    fn has_live_priority(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }

    /// Whether the provider currently has live content to show
    fn has_live_content(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }

    /// Modes that show the live content, most preferred first
    fn live_modes(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Providers and the content units they registered.
///
/// Registration order defines rotation order.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn ContentProvider>>,
    units: Vec<ContentUnit>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider and all of its declared modes.
    ///
    /// Returns the number of units added. A provider id that is already
    /// registered, or a mode id already taken, is skipped with a warning.
    pub fn register(&mut self, provider: Box<dyn ContentProvider>) -> usize {
        let provider_id = provider.provider_id().to_string();
        if self.contains_provider(&provider_id) {
            log::warn!("Provider '{}' already registered; ignoring", provider_id);
            return 0;
        }

        let mut added = 0;
        for mode in provider.modes() {
            if self.unit(&mode).is_some() {
                log::warn!(
                    "Mode '{}' of provider '{}' already registered; ignoring",
                    mode,
                    provider_id
                );
                continue;
            }
            self.units.push(ContentUnit::new(mode, provider_id.clone()));
            added += 1;
        }
        log::debug!("Registered provider '{}' with {} mode(s)", provider_id, added);
        self.providers.push(provider);
        added
    }

    /// All registered units in rotation order
    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    /// Look up a unit by mode id
    pub fn unit(&self, mode_id: &str) -> Option<&ContentUnit> {
        self.units.iter().find(|u| u.mode_id() == mode_id)
    }

    /// First declared unit of a provider
    pub fn first_unit_of(&self, provider_id: &str) -> Option<&ContentUnit> {
        self.units.iter().find(|u| u.provider_id() == provider_id)
    }

    /// Check if a provider is registered
    pub fn contains_provider(&self, provider_id: &str) -> bool {
        self.providers.iter().any(|p| p.provider_id() == provider_id)
    }

    /// Shared access to a provider
    pub fn provider(&self, provider_id: &str) -> Option<&dyn ContentProvider> {
        self.providers
            .iter()
            .find(|p| p.provider_id() == provider_id)
            .map(|p| p.as_ref())
    }

    /// Exclusive access to a provider
    pub fn provider_mut(&mut self, provider_id: &str) -> Option<&mut Box<dyn ContentProvider>> {
        self.providers
            .iter_mut()
            .find(|p| p.provider_id() == provider_id)
    }

    /// Provider ids in rotation-mode order (order of their first unit)
    pub fn provider_ids_in_rotation_order(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for unit in &self.units {
            if !ids.contains(&unit.provider_id()) {
                ids.push(unit.provider_id());
            }
        }
        ids
    }

    /// Number of registered units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if no units are registered
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.len())
            .field("units", &self.units)
            .finish()
    }
}
