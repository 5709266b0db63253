//! On-Demand Command Channel
//!
//! Single-producer/single-consumer slot carrying [`OnDemandRequest`]s into
//! the scheduler and [`OnDemandState`] snapshots out of it. A newer request
//! overwrites one that has not been picked up yet (last write wins); the
//! scheduler observes it at its next pacing tick, not instantly.

use super::{OnDemandRequest, OnDemandState};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Create a connected sender/receiver pair
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let slot = Arc::new(Mutex::new(None));
    (
        CommandSender {
            slot: Arc::clone(&slot),
        },
        CommandReceiver {
            slot,
            last_request_id: None,
        },
    )
}

/// Producer side, held by whatever accepts external commands
#[derive(Debug)]
pub struct CommandSender {
    slot: Arc<Mutex<Option<OnDemandRequest>>>,
}

impl CommandSender {
    /// Post a request, replacing any request not yet taken
    pub fn send(&self, request: OnDemandRequest) {
        let mut slot = self.slot.lock();
        if let Some(dropped) = slot.replace(request) {
            log::debug!(
                "On-demand request '{}' superseded before it was read",
                dropped.request_id
            );
        }
    }

    /// Parse a JSON request payload and post it
    pub fn send_json(&self, payload: &str) -> Result<()> {
        let request: OnDemandRequest = serde_json::from_str(payload)?;
        self.send(request);
        Ok(())
    }
}

/// Consumer side, owned by the scheduler
#[derive(Debug)]
pub struct CommandReceiver {
    slot: Arc<Mutex<Option<OnDemandRequest>>>,
    last_request_id: Option<String>,
}

impl CommandReceiver {
    /// Take the pending request, dropping repeats of the last `request_id`
    pub fn poll(&mut self) -> Option<OnDemandRequest> {
        let request = self.slot.lock().take()?;
        if self.last_request_id.as_deref() == Some(request.request_id.as_str()) {
            log::debug!("Ignoring duplicate on-demand request '{}'", request.request_id);
            return None;
        }
        self.last_request_id = Some(request.request_id.clone());
        Some(request)
    }

    /// Id of the last request handed out
    pub fn last_request_id(&self) -> Option<&str> {
        self.last_request_id.as_deref()
    }
}

/// Sink for published on-demand state
pub trait StatePublisher: Send {
    /// Store the latest state snapshot
    fn publish(&mut self, state: &OnDemandState);
}

/// In-memory publisher readable from other threads
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Option<OnDemandState>>>,
}

impl SharedState {
    /// Create an empty state cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Option<OnDemandState> {
        self.inner.lock().clone()
    }

    /// Latest published snapshot as JSON
    pub fn latest_json(&self) -> Result<Option<String>> {
        match self.latest() {
            Some(state) => Ok(Some(serde_json::to_string(&state)?)),
            None => Ok(None),
        }
    }
}

impl StatePublisher for SharedState {
    fn publish(&mut self, state: &OnDemandState) {
        *self.inner.lock() = Some(state.clone());
    }
}
