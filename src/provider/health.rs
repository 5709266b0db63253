//! Provider Health Gating
//!
//! The scheduler asks the gate before dispatching to a provider and reports
//! the outcome of every display attempt back to it.

use super::ProviderError;
use crate::config::HealthConfig;
use crate::timing::{secs_to_duration, Clock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Health gate consulted around every display attempt
pub trait PluginHealthGate: Send {
    /// Whether dispatch to this provider should be skipped right now
    fn should_skip(&self, provider_id: &str) -> bool;

    /// A display attempt succeeded (including "no content")
    fn record_success(&mut self, provider_id: &str);

    /// A display attempt failed
    fn record_failure(&mut self, provider_id: &str, error: &ProviderError);
}

/// Gate that never skips anything
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

impl PluginHealthGate for AlwaysHealthy {
    fn should_skip(&self, _provider_id: &str) -> bool {
        false
    }

    fn record_success(&mut self, _provider_id: &str) {}

    fn record_failure(&mut self, _provider_id: &str, _error: &ProviderError) {}
}

#[derive(Debug, Clone, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_error: Option<String>,
}

/// Per-provider circuit breaker.
///
/// Opens after `failure_threshold` consecutive failures and skips the
/// provider for `cooldown`. Once the cooldown passes one trial attempt is
/// let through: a success closes the breaker, a failure re-opens it.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    providers: HashMap<String, ProviderHealth>,
}

impl CircuitBreaker {
    /// Create a breaker from health settings
    pub fn new(config: &HealthConfig, clock: Arc<dyn Clock>) -> Self {
        CircuitBreaker {
            failure_threshold: config.failure_threshold.max(1),
            cooldown: secs_to_duration(config.cooldown),
            clock,
            providers: HashMap::new(),
        }
    }

    /// Consecutive failures recorded for a provider
    pub fn consecutive_failures(&self, provider_id: &str) -> u32 {
        self.providers
            .get(provider_id)
            .map_or(0, |h| h.consecutive_failures)
    }

    /// Last failure message recorded for a provider
    pub fn last_error(&self, provider_id: &str) -> Option<&str> {
        self.providers
            .get(provider_id)
            .and_then(|h| h.last_error.as_deref())
    }
}

impl PluginHealthGate for CircuitBreaker {
    fn should_skip(&self, provider_id: &str) -> bool {
        let Some(health) = self.providers.get(provider_id) else {
            return false;
        };
        match health.opened_at {
            Some(opened) => self.clock.now().saturating_duration_since(opened) < self.cooldown,
            None => false,
        }
    }

    fn record_success(&mut self, provider_id: &str) {
        if let Some(health) = self.providers.get_mut(provider_id) {
            if health.opened_at.is_some() {
                log::info!("Provider '{}' recovered; closing circuit", provider_id);
            }
            health.consecutive_failures = 0;
            health.opened_at = None;
        }
    }

    fn record_failure(&mut self, provider_id: &str, error: &ProviderError) {
        let now = self.clock.now();
        let health = self.providers.entry(provider_id.to_string()).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_error = Some(error.to_string());

        if health.consecutive_failures >= self.failure_threshold {
            if health.opened_at.is_none() {
                log::warn!(
                    "Provider '{}' failed {} times in a row; skipping for {:?}",
                    provider_id,
                    health.consecutive_failures,
                    self.cooldown
                );
            }
            health.opened_at = Some(now);
        }
    }
}
