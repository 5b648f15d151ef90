//! Local notification dispatcher seam.
//!
//! The platform dispatcher registers triggers by id, each with one absolute fire
//! time and an optional daily/weekly repeat. It does not deduplicate ids on its own
//! behalf; callers cancel before they create.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pulse_core::{NotificationContent, PulseError, PulseResult, TriggerHandle, TriggerRequest};
use tokio::sync::Mutex;

#[async_trait]
pub trait TriggerDispatcher: Send + Sync {
    async fn create_trigger(&self, request: &TriggerRequest) -> PulseResult<TriggerHandle>;

    /// Cancelling an id that was never registered is not an error.
    async fn cancel_trigger(&self, id: &str) -> PulseResult<()>;

    /// Withdraw an already-delivered notification with this id.
    async fn cancel_notification(&self, id: &str) -> PulseResult<()>;

    async fn display_immediate(&self, content: &NotificationContent) -> PulseResult<()>;
}

/// One recorded dispatcher interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCall {
    Create(String),
    CancelTrigger(String),
    CancelNotification(String),
    Display(String),
}

#[derive(Debug, Default)]
struct DispatcherState {
    live: BTreeMap<String, TriggerRequest>,
    calls: Vec<DispatchCall>,
    displayed: Vec<NotificationContent>,
    permission_denied: bool,
    fail_cancels: bool,
    /// Creates still allowed before registrations start failing.
    creates_left: Option<usize>,
}

/// In-process dispatcher that keeps live triggers in memory and records every call
/// in order.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    state: Mutex<DispatcherState>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously registered triggers (e.g. loaded from disk).
    pub fn with_live(triggers: impl IntoIterator<Item = TriggerRequest>) -> Self {
        let live = triggers.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            state: Mutex::new(DispatcherState {
                live,
                ..DispatcherState::default()
            }),
        }
    }

    /// Reject registrations and displays, as when the user has not granted permission.
    pub async fn deny_permission(&self) {
        self.state.lock().await.permission_denied = true;
    }

    /// Accept the next `n` registrations, then reject the rest.
    pub async fn fail_creates_after(&self, n: usize) {
        self.state.lock().await.creates_left = Some(n);
    }

    /// Undo [`Self::fail_creates_after`].
    pub async fn allow_creates(&self) {
        self.state.lock().await.creates_left = None;
    }

    /// Make every cancel call fail.
    pub async fn fail_cancels(&self) {
        self.state.lock().await.fail_cancels = true;
    }

    pub async fn calls(&self) -> Vec<DispatchCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Live triggers ordered by id.
    pub async fn live_triggers(&self) -> Vec<TriggerRequest> {
        self.state.lock().await.live.values().cloned().collect()
    }

    pub async fn displayed(&self) -> Vec<NotificationContent> {
        self.state.lock().await.displayed.clone()
    }
}

#[async_trait]
impl TriggerDispatcher for MemoryDispatcher {
    async fn create_trigger(&self, request: &TriggerRequest) -> PulseResult<TriggerHandle> {
        let mut state = self.state.lock().await;
        state.calls.push(DispatchCall::Create(request.id.clone()));
        if state.permission_denied {
            return Err(PulseError::Dispatcher("notification permission not granted".into()));
        }
        match state.creates_left {
            Some(0) => {
                let reason = format!("trigger limit reached at {}", request.id);
                return Err(PulseError::Dispatcher(reason));
            }
            Some(n) => state.creates_left = Some(n - 1),
            None => {}
        }
        state.live.insert(request.id.clone(), request.clone());
        Ok(TriggerHandle::new(request.id.clone()))
    }

    async fn cancel_trigger(&self, id: &str) -> PulseResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(DispatchCall::CancelTrigger(id.to_string()));
        if state.fail_cancels {
            return Err(PulseError::Dispatcher(format!("cancel rejected for {id}")));
        }
        state.live.remove(id);
        Ok(())
    }

    async fn cancel_notification(&self, id: &str) -> PulseResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(DispatchCall::CancelNotification(id.to_string()));
        if state.fail_cancels {
            return Err(PulseError::Dispatcher(format!("cancel rejected for {id}")));
        }
        Ok(())
    }

    async fn display_immediate(&self, content: &NotificationContent) -> PulseResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(DispatchCall::Display(content.title.clone()));
        if state.permission_denied {
            return Err(PulseError::Dispatcher("notification permission not granted".into()));
        }
        state.displayed.push(content.clone());
        Ok(())
    }
}
