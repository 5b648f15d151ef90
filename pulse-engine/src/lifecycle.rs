//! Reminder lifecycle: cancel-before-create scheduling against the dispatcher.
//!
//! `schedule` first cancels everything the reminder id may have been registered
//! under, then registers the new plan. The two steps are not atomic: a crash in
//! between leaves the id unscheduled until the next reschedule, which is safe to
//! repeat because cancellation is idempotent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulse_core::{
    cancel_candidates, plan_triggers, NotificationContent, PendingNotification, PulseResult,
    ReminderSpec, TriggerHandle, TriggerRequest,
};
use tracing::{debug, info, warn};

use crate::dispatcher::TriggerDispatcher;
use crate::store::{paths, require_user, DocumentStore, Query, SetOptions};

#[derive(Clone)]
pub struct ReminderLifecycle {
    dispatcher: Arc<dyn TriggerDispatcher>,
    store: Arc<dyn DocumentStore>,
}

impl ReminderLifecycle {
    pub fn new(dispatcher: Arc<dyn TriggerDispatcher>, store: Arc<dyn DocumentStore>) -> Self {
        Self { dispatcher, store }
    }

    /// Replace whatever is registered under `spec.id` with a fresh plan.
    ///
    /// Returns an empty list when `spec` resolves to nothing (e.g. a one-shot in
    /// the past). Dispatcher rejections are returned to the caller; triggers
    /// registered before a rejection stay live.
    pub async fn schedule(
        &self,
        spec: &ReminderSpec,
        content: &NotificationContent,
        now: DateTime<Utc>,
    ) -> PulseResult<Vec<TriggerHandle>> {
        self.cancel([spec.id.as_str()]).await;

        let plan = plan_triggers(spec, content, now);
        if plan.is_empty() {
            debug!(reminder_id = %spec.id, "nothing to schedule");
            return Ok(Vec::new());
        }

        let mut handles = Vec::with_capacity(plan.len());
        for request in &plan {
            let handle = self.dispatcher.create_trigger(request).await?;
            self.record_pending(request).await;
            handles.push(handle);
        }

        info!(
            reminder_id = %spec.id,
            triggers = handles.len(),
            first_fire_at = %plan[0].fire_at,
            "reminder scheduled"
        );
        Ok(handles)
    }

    /// Best-effort cancel of each id and its weekday variants. Never fails.
    pub async fn cancel<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            for candidate in cancel_candidates(id.as_ref()) {
                self.cancel_one(&candidate).await;
            }
        }
    }

    /// Upcoming notifications recorded for the signed-in user, soonest first.
    pub async fn list_pending(&self) -> PulseResult<Vec<PendingNotification>> {
        let uid = require_user(self.store.as_ref())?;
        let docs = self
            .store
            .query(&paths::notifications(&uid), Query::default())
            .await?;

        let mut pending = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match serde_json::from_value::<PendingNotification>(doc) {
                Ok(p) => pending.push(p),
                Err(e) => {
                    warn!(trigger_id = %id, error = %e, "skipping unreadable pending notification")
                }
            }
        }
        pending.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn cancel_one(&self, id: &str) {
        if let Err(e) = self.dispatcher.cancel_trigger(id).await {
            warn!(trigger_id = %id, error = %e, "cancel trigger failed");
        }
        if let Err(e) = self.dispatcher.cancel_notification(id).await {
            warn!(trigger_id = %id, error = %e, "cancel notification failed");
        }
        self.forget_pending(id).await;
    }

    async fn record_pending(&self, request: &TriggerRequest) {
        if let Err(e) = self.try_record_pending(request).await {
            warn!(trigger_id = %request.id, error = %e, "failed to record pending notification");
        }
    }

    async fn try_record_pending(&self, request: &TriggerRequest) -> PulseResult<()> {
        let uid = require_user(self.store.as_ref())?;
        let doc = serde_json::to_value(PendingNotification::from(request))?;
        self.store
            .set(&paths::notification(&uid, &request.id), doc, SetOptions::default())
            .await
    }

    async fn forget_pending(&self, id: &str) {
        let Some(uid) = self.store.current_user() else {
            return;
        };
        if let Err(e) = self.store.delete(&paths::notification(&uid, id)).await {
            warn!(trigger_id = %id, error = %e, "failed to delete pending notification");
        }
    }
}
