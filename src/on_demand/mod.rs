//! On-Demand Override Sessions
//!
//! An externally issued command can pin one mode to the display, either for
//! a bounded time or until stopped. While a session is active, rotation and
//! live priority are suspended; when it ends, rotation resumes at the index
//! captured when the session started.

pub mod channel;

pub use channel::{command_channel, CommandReceiver, CommandSender, SharedState, StatePublisher};

use crate::provider::ContentUnit;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, Instant};

/// Requested on-demand action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnDemandAction {
    /// Start (or replace) a session
    Start,
    /// End the active session
    Stop,
    /// Anything else; rejected with `invalid_action`
    Unknown(String),
}

impl OnDemandAction {
    fn as_str(&self) -> &str {
        match self {
            OnDemandAction::Start => "start",
            OnDemandAction::Stop => "stop",
            OnDemandAction::Unknown(other) => other,
        }
    }
}

impl Serialize for OnDemandAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OnDemandAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let action = String::deserialize(deserializer)?;
        Ok(match action.as_str() {
            "start" => OnDemandAction::Start,
            "stop" => OnDemandAction::Stop,
            _ => OnDemandAction::Unknown(action),
        })
    }
}

/// Inbound command payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandRequest {
    /// Unique per command; repeats are ignored
    pub request_id: String,
    /// What to do
    pub action: OnDemandAction,
    /// Provider whose first mode should be shown when `mode` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Mode to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Seconds; omitted or <= 0 means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Stay until explicitly stopped
    #[serde(default)]
    pub pinned: bool,
}

impl OnDemandRequest {
    /// Start request for an explicit mode
    pub fn start_mode(request_id: impl Into<String>, mode: impl Into<String>) -> Self {
        OnDemandRequest {
            request_id: request_id.into(),
            action: OnDemandAction::Start,
            provider_id: None,
            mode: Some(mode.into()),
            duration: None,
            pinned: false,
        }
    }

    /// Start request for a provider's first declared mode
    pub fn start_provider(request_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        OnDemandRequest {
            provider_id: Some(provider_id.into()),
            mode: None,
            ..Self::start_mode(request_id, "")
        }
    }

    /// Stop request
    pub fn stop(request_id: impl Into<String>) -> Self {
        OnDemandRequest {
            request_id: request_id.into(),
            action: OnDemandAction::Stop,
            provider_id: None,
            mode: None,
            duration: None,
            pinned: false,
        }
    }

    /// Bound the session to `seconds`
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Pin the session until stopped
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

/// Session status as published
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session
    #[default]
    Idle,
    /// A session is running
    Active,
    /// The last command was rejected or the session failed
    Error,
}

/// Rejection reasons for on-demand commands
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OnDemandError {
    /// Action was neither `start` nor `stop`
    #[error("Unsupported action '{0}'")]
    InvalidAction(String),

    /// Neither `mode` nor `provider_id` given
    #[error("Start request names neither a mode nor a provider")]
    MissingTarget,

    /// `provider_id` is not registered
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    /// `mode` is not registered
    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    /// `mode` belongs to a different provider than `provider_id`
    #[error("Mode '{mode}' does not belong to provider '{provider_id}'")]
    ModeProviderMismatch {
        /// Requested mode
        mode: String,
        /// Requested provider
        provider_id: String,
    },

    /// The on-demand unit failed while displaying
    #[error("On-demand display failed: {0}")]
    DisplayFailed(String),

    /// Payload could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl OnDemandError {
    /// Machine-readable error code for the published state
    pub fn code(&self) -> &'static str {
        match self {
            OnDemandError::InvalidAction(_) => "invalid_action",
            OnDemandError::MissingTarget => "missing_target",
            OnDemandError::UnknownProvider(_) => "unknown_provider",
            OnDemandError::UnknownMode(_) => "unknown_mode",
            OnDemandError::ModeProviderMismatch { .. } => "mode_provider_mismatch",
            OnDemandError::DisplayFailed(_) => "display_failed",
            OnDemandError::InvalidPayload(_) => "invalid_payload",
        }
    }
}

/// Published session snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnDemandState {
    /// Whether a session is running
    pub active: bool,
    /// Mode being shown
    pub mode: Option<String>,
    /// Owner of the mode being shown
    pub provider_id: Option<String>,
    /// Unix seconds when the session started
    pub requested_at: Option<f64>,
    /// Unix seconds when the session ends (`None` if unbounded)
    pub expires_at: Option<f64>,
    /// Requested length in seconds (`None` if unbounded)
    pub duration: Option<f64>,
    /// Whether the session is pinned
    pub pinned: bool,
    /// Session status
    pub status: SessionStatus,
    /// Error code of the last rejection or failure
    pub error: Option<String>,
    /// Last lifecycle event (`started`, `stopped`, `expired`, `rejected`, `failed`)
    pub last_event: Option<String>,
    /// Seconds left (`None` if unbounded, 0 when inactive)
    pub remaining: Option<f64>,
}

/// On-demand session owned by the scheduler
#[derive(Debug, Clone, Default)]
pub struct OnDemandSession {
    active: bool,
    unit: Option<ContentUnit>,
    requested_at: Option<Instant>,
    requested_at_wall: Option<f64>,
    expires_at: Option<Instant>,
    duration: Option<f64>,
    pinned: bool,
    status: SessionStatus,
    error: Option<String>,
    last_event: Option<String>,
    rotation_resume_index: Option<usize>,
}

impl OnDemandSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate for `unit`.
    ///
    /// `duration` of `None` or <= 0, or `pinned`, makes the session unbounded.
    /// So does a duration too large to be added to `now`.
    /// `resume_index` is only captured when no session was already running,
    /// so replacing a session still resumes where rotation was interrupted.
    pub fn start(
        &mut self,
        unit: ContentUnit,
        duration: Option<f64>,
        pinned: bool,
        resume_index: Option<usize>,
        now: Instant,
        wall_now: f64,
    ) {
        let expiry = duration
            .filter(|d| !pinned && d.is_finite() && *d > 0.0)
            .and_then(|d| {
                let expires_at = Duration::try_from_secs_f64(d)
                    .ok()
                    .and_then(|span| now.checked_add(span));
                if expires_at.is_none() {
                    log::warn!("On-demand duration {d}s is out of range; running unbounded");
                }
                expires_at.map(|at| (d, at))
            });
        let resume = if self.active {
            self.rotation_resume_index
        } else {
            resume_index
        };

        self.active = true;
        self.unit = Some(unit);
        self.requested_at = Some(now);
        self.requested_at_wall = Some(wall_now);
        self.expires_at = expiry.map(|(_, at)| at);
        self.duration = expiry.map(|(d, _)| d);
        self.pinned = pinned;
        self.status = SessionStatus::Active;
        self.error = None;
        self.last_event = Some("started".to_string());
        self.rotation_resume_index = resume;
    }

    /// End the session, recording `event`. Returns the captured resume index.
    pub fn end(&mut self, event: &str) -> Option<usize> {
        let resume = self.rotation_resume_index;
        self.clear();
        self.status = SessionStatus::Idle;
        self.error = None;
        self.last_event = Some(event.to_string());
        resume
    }

    /// End the session because its unit failed. Returns the resume index.
    pub fn fail(&mut self, error: &OnDemandError) -> Option<usize> {
        let resume = self.rotation_resume_index;
        self.clear();
        self.status = SessionStatus::Error;
        self.error = Some(error.code().to_string());
        self.last_event = Some("failed".to_string());
        resume
    }

    /// Record a rejected command without touching a running session
    pub fn reject(&mut self, error: &OnDemandError) {
        if !self.active {
            self.status = SessionStatus::Error;
        }
        self.error = Some(error.code().to_string());
        self.last_event = Some("rejected".to_string());
    }

    /// Whether a bounded session has run out at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.active && self.expires_at.is_some_and(|at| now >= at)
    }

    /// Time left at `now` (`None` if unbounded, zero when inactive)
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if !self.active {
            return Some(Duration::ZERO);
        }
        self.expires_at
            .map(|at| at.saturating_duration_since(now))
    }

    /// Snapshot for publication
    pub fn to_state(&self, now: Instant) -> OnDemandState {
        OnDemandState {
            active: self.active,
            mode: self.unit.as_ref().map(|u| u.mode_id().to_string()),
            provider_id: self.unit.as_ref().map(|u| u.provider_id().to_string()),
            requested_at: self.requested_at_wall,
            expires_at: self
                .requested_at_wall
                .zip(self.duration)
                .map(|(start, d)| start + d),
            duration: self.duration,
            pinned: self.pinned,
            status: self.status,
            error: self.error.clone(),
            last_event: self.last_event.clone(),
            remaining: self.remaining(now).map(|d| d.as_secs_f64()),
        }
    }

    /// When the running session started
    pub fn requested_at(&self) -> Option<Instant> {
        self.requested_at
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Unit being shown
    pub fn unit(&self) -> Option<&ContentUnit> {
        self.unit.as_ref()
    }

    /// Session status
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Error code of the last rejection or failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Last lifecycle event
    pub fn last_event(&self) -> Option<&str> {
        self.last_event.as_deref()
    }

    /// Whether the session is pinned
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// When the session ends (`None` if unbounded or inactive)
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Rotation index to resume at when the session ends
    pub fn rotation_resume_index(&self) -> Option<usize> {
        self.rotation_resume_index
    }

    fn clear(&mut self) {
        self.active = false;
        self.unit = None;
        self.requested_at = None;
        self.requested_at_wall = None;
        self.expires_at = None;
        self.duration = None;
        self.pinned = false;
        self.rotation_resume_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit() -> ContentUnit {
        ContentUnit::new("weather_forecast", "weather")
    }

    #[test]
    fn test_bounded_session_expires() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        session.start(unit(), Some(30.0), false, Some(2), start, 1000.0);

        assert!(session.is_active());
        assert!(!session.is_expired(start + Duration::from_secs(29)));
        assert!(session.is_expired(start + Duration::from_secs(30)));

        let state = session.to_state(start + Duration::from_secs(10));
        assert_eq!(state.status, SessionStatus::Active);
        assert_eq!(state.expires_at, Some(1030.0));
        assert_relative_eq!(state.remaining.unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pinned_and_non_positive_durations_are_unbounded() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        session.start(unit(), Some(30.0), true, None, start, 0.0);
        assert_eq!(session.expires_at(), None);
        assert_eq!(session.remaining(start), None);

        session.start(unit(), Some(-1.0), false, None, start, 0.0);
        assert_eq!(session.expires_at(), None);
        assert!(!session.is_expired(start + Duration::from_secs(3600)));
    }

    #[test]
    fn test_out_of_range_duration_runs_unbounded() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        for duration in [1e300, 1e19] {
            session.start(unit(), Some(duration), false, None, start, 0.0);
            assert!(session.is_active());
            assert_eq!(session.expires_at(), None);
            assert_eq!(session.remaining(start), None);
        }
    }

    #[test]
    fn test_end_clears_fields_and_returns_resume_index() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        session.start(unit(), Some(5.0), false, Some(3), start, 0.0);

        assert_eq!(session.end("stopped"), Some(3));
        let state = session.to_state(start);
        assert!(!state.active);
        assert_eq!(state.mode, None);
        assert_eq!(state.expires_at, None);
        assert_eq!(state.remaining, Some(0.0));
        assert_eq!(state.status, SessionStatus::Idle);
        assert_eq!(state.last_event.as_deref(), Some("stopped"));
    }

    #[test]
    fn test_replacing_session_keeps_original_resume_index() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        session.start(unit(), None, false, Some(1), start, 0.0);
        session.start(ContentUnit::new("clock", "clock"), None, false, Some(4), start, 0.0);
        assert_eq!(session.rotation_resume_index(), Some(1));
        assert_eq!(session.unit().map(|u| u.mode_id()), Some("clock"));
    }

    #[test]
    fn test_reject_when_idle_sets_error_status() {
        let mut session = OnDemandSession::new();
        session.reject(&OnDemandError::UnknownMode("nope".into()));
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.error(), Some("unknown_mode"));
        assert!(!session.is_active());
    }

    #[test]
    fn test_reject_keeps_running_session() {
        let start = Instant::now();
        let mut session = OnDemandSession::new();
        session.start(unit(), None, true, Some(0), start, 0.0);
        session.reject(&OnDemandError::MissingTarget);
        assert!(session.is_active());
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.error(), Some("missing_target"));
    }

    #[test]
    fn test_state_json_shape() {
        let json = serde_json::to_value(OnDemandState::default()).unwrap();
        for key in [
            "active",
            "mode",
            "provider_id",
            "requested_at",
            "expires_at",
            "duration",
            "pinned",
            "status",
            "error",
            "last_event",
            "remaining",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_unknown_action_deserializes() {
        let request: OnDemandRequest =
            serde_json::from_str(r#"{"request_id":"x","action":"pause"}"#).unwrap();
        assert_eq!(request.action, OnDemandAction::Unknown("pause".into()));
    }
}
