//! Live Priority Preemption
//!
//! Providers that advertise [`Capabilities::LIVE_PRIORITY`] may claim the
//! display without an external command, for example while a game they track
//! is in progress. The gate walks providers in rotation-mode order and
//! returns the first live unit it can resolve.

use crate::provider::health::PluginHealthGate;
use crate::provider::{Capabilities, ContentProvider, ContentUnit, ProviderRegistry};
use std::collections::HashSet;

/// Suffix of mode ids that show live content by naming convention
pub const LIVE_MODE_SUFFIX: &str = "_live";

/// Finds units that must preempt rotation
#[derive(Debug, Clone, Copy, Default)]
pub struct LivePriorityGate;

impl LivePriorityGate {
    /// Create a gate
    pub fn new() -> Self {
        LivePriorityGate
    }

    /// First live unit across all providers, in rotation-mode order.
    ///
    /// Providers the health gate skips, and providers listed in `excluded`
    /// (failed earlier in the current pass), are not consulted.
    pub fn find_live_unit(
        &self,
        registry: &ProviderRegistry,
        health: &dyn PluginHealthGate,
        excluded: &HashSet<String>,
    ) -> Option<ContentUnit> {
        for provider_id in registry.provider_ids_in_rotation_order() {
            if excluded.contains(provider_id) || health.should_skip(provider_id) {
                continue;
            }
            let Some(provider) = registry.provider(provider_id) else {
                continue;
            };
            if let Some(unit) = self.live_unit_of(registry, provider) {
                return Some(unit);
            }
        }
        None
    }

    /// Live unit of one provider, if it currently claims priority
    pub fn live_unit_of(
        &self,
        registry: &ProviderRegistry,
        provider: &dyn ContentProvider,
    ) -> Option<ContentUnit> {
        if !self.is_live(provider) {
            return None;
        }
        let provider_id = provider.provider_id();

        let declared = match provider.live_modes() {
            Ok(modes) => modes,
            Err(e) => {
                log::warn!("Live mode query failed for '{}': {}", provider_id, e);
                return None;
            }
        };
        let owned = |mode: &str| {
            registry
                .unit(mode)
                .filter(|unit| unit.provider_id() == provider_id)
                .cloned()
        };

        if let Some(unit) = declared.iter().find_map(|mode| owned(mode.as_str())) {
            return Some(unit);
        }

        let fallback = registry
            .units()
            .iter()
            .find(|unit| unit.provider_id() == provider_id && is_live_mode_name(unit.mode_id()))
            .cloned();
        if fallback.is_none() {
            log::debug!(
                "Provider '{}' is live but none of its modes {:?} resolve",
                provider_id,
                declared
            );
        }
        fallback
    }

    /// Whether a provider reports both live priority and live content.
    ///
    /// Query errors are logged and count as "not live".
    pub fn is_live(&self, provider: &dyn ContentProvider) -> bool {
        if !provider
            .capabilities()
            .contains(Capabilities::LIVE_PRIORITY)
        {
            return false;
        }
        let provider_id = provider.provider_id();
        let priority = provider.has_live_priority().unwrap_or_else(|e| {
            log::warn!("Live priority query failed for '{}': {}", provider_id, e);
            false
        });
        if !priority {
            return false;
        }
        provider.has_live_content().unwrap_or_else(|e| {
            log::warn!("Live content query failed for '{}': {}", provider_id, e);
            false
        })
    }
}

/// Whether a mode id follows the live naming convention
pub fn is_live_mode_name(mode_id: &str) -> bool {
    mode_id == "live" || mode_id.ends_with(LIVE_MODE_SUFFIX)
}
