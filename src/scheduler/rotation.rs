//! Rotation order and pass bookkeeping

use crate::provider::ContentUnit;
use std::collections::HashSet;

/// Position in the ordered rotation of content units.
///
/// A pass runs from index 0 to the last unit. Providers that failed during
/// a pass are skipped for the rest of it; wrapping back to index 0 starts a
/// new pass and forgets them.
#[derive(Debug, Clone, Default)]
pub struct RotationState {
    units: Vec<ContentUnit>,
    current_index: usize,
    active_mode: Option<ContentUnit>,
    skipped_providers: HashSet<String>,
    advances: u64,
    passes: u64,
}

impl RotationState {
    /// Create a rotation over `units`, starting at index 0
    pub fn new(units: Vec<ContentUnit>) -> Self {
        RotationState {
            units,
            ..Self::default()
        }
    }

    /// Unit at the current index
    pub fn current(&self) -> Option<&ContentUnit> {
        self.units.get(self.current_index)
    }

    /// Current index (0 when empty)
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Units in rotation order
    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if there is nothing to rotate through
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit currently on the display, whatever selected it
    pub fn active_mode(&self) -> Option<&ContentUnit> {
        self.active_mode.as_ref()
    }

    pub(crate) fn set_active_mode(&mut self, unit: Option<ContentUnit>) {
        self.active_mode = unit;
    }

    /// Total number of advances so far
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Number of completed passes (wraps back to index 0)
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Providers skipped for the rest of the current pass
    pub fn skipped_providers(&self) -> &HashSet<String> {
        &self.skipped_providers
    }

    /// Check if a provider is skipped in the current pass
    pub fn is_skipped(&self, provider_id: &str) -> bool {
        self.skipped_providers.contains(provider_id)
    }

    /// Skip every unit of `provider_id` until the pass ends
    pub fn skip_provider(&mut self, provider_id: &str) {
        if self.skipped_providers.insert(provider_id.to_string()) {
            log::debug!("Skipping provider '{}' for the rest of this pass", provider_id);
        }
    }

    /// Move to the next unit whose provider is not skipped.
    ///
    /// Wrapping to index 0 starts a new pass, so the loop always terminates
    /// within one full cycle.
    pub fn advance(&mut self) -> Option<&ContentUnit> {
        if self.units.is_empty() {
            return None;
        }
        let len = self.units.len();
        for _ in 0..len {
            self.current_index = (self.current_index + 1) % len;
            if self.current_index == 0 {
                self.passes += 1;
                self.skipped_providers.clear();
            }
            let provider_id = self.units[self.current_index].provider_id();
            if !self.skipped_providers.contains(provider_id) {
                break;
            }
        }
        self.advances += 1;
        self.units.get(self.current_index)
    }

    /// Skip the current unit's provider for this pass, then advance
    pub fn advance_past_provider(&mut self) -> Option<&ContentUnit> {
        if let Some(provider_id) = self.current().map(|u| u.provider_id().to_string()) {
            self.skip_provider(&provider_id);
        }
        self.advance()
    }

    /// Jump back to a previously captured index.
    ///
    /// Out-of-range indices are ignored and `false` is returned.
    pub fn restore(&mut self, index: usize) -> bool {
        if index < self.units.len() {
            self.current_index = index;
            true
        } else {
            log::warn!(
                "Cannot resume rotation at index {} ({} units); staying at {}",
                index,
                self.units.len(),
                self.current_index
            );
            false
        }
    }
}
