//! Reminder specs and trigger planning for local notification delivery.
//!
//! A [`ReminderSpec`] says *when* a logical reminder fires; [`plan_triggers`] turns it
//! into the concrete dispatcher registrations, including per-weekday fan-out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, PulseResult};
use crate::recurrence::{resolve_next, Recurrence};
use crate::time::{next_daily_instant, next_weekly_instant, weekday_index, TimeOfDay};

/// Repeat modes the local dispatcher supports natively. There is no monthly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatFrequency {
    None,
    Daily,
    Weekly,
}

/// What a reminder is about; carried in notification data and pending records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Habit,
    DailyExpense,
    WeeklyReport,
    MonthlyReport,
    RecurringTransaction,
    GoalPayday,
    AiRecommendation,
    Streak,
    Milestone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSpec {
    pub id: String,
    pub time_of_day: TimeOfDay,
    pub time_zone: Tz,
    pub recurrence: Recurrence,
    pub lead_minutes: u32,
    /// Earliest instant the first firing may take.
    pub not_before: Option<DateTime<Utc>>,
}

impl ReminderSpec {
    pub fn new(
        id: impl Into<String>,
        time_of_day: TimeOfDay,
        time_zone: Tz,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            id: id.into(),
            time_of_day,
            time_zone,
            recurrence,
            lead_minutes: 0,
            not_before: None,
        }
    }

    pub fn with_lead_minutes(mut self, minutes: u32) -> Self {
        self.lead_minutes = minutes;
        self
    }

    pub fn not_before(mut self, floor: DateTime<Utc>) -> Self {
        self.not_before = Some(floor);
        self
    }
}

/// Title, body and routing data shown when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl NotificationContent {
    pub fn new(kind: ReminderKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// One registration to hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub id: String,
    pub fire_at: DateTime<Utc>,
    pub repeat: RepeatFrequency,
    pub content: NotificationContent,
}

/// Handle returned by the dispatcher. Only its id is meaningful to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerHandle(String);

impl TriggerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Display-only record of an upcoming notification, kept in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNotification {
    pub id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
    pub repeat: RepeatFrequency,
}

impl From<&TriggerRequest> for PendingNotification {
    fn from(req: &TriggerRequest) -> Self {
        Self {
            id: req.id.clone(),
            kind: req.content.kind,
            title: req.content.title.clone(),
            body: req.content.body.clone(),
            fire_at: req.fire_at,
            repeat: req.repeat,
        }
    }
}

/// Trigger id for one weekday of a fanned-out weekly reminder.
pub fn weekday_trigger_id(base: &str, day: Weekday) -> String {
    format!("{}-{}", base, weekday_index(day))
}

/// Every trigger id a logical reminder may have been registered under: the bare id
/// plus its seven weekday variants.
pub fn cancel_candidates(base: &str) -> Vec<String> {
    let mut ids = Vec::with_capacity(8);
    ids.push(base.to_string());
    ids.extend((0..7u8).map(|i| format!("{}-{}", base, i)));
    ids
}

/// Reject a user-chosen key (habit or transaction id) that looks like a weekday
/// variant. Cancelling the reminder for `a` also cancels `{a}-0` through `{a}-6`,
/// so a key like `a-1` would be cancelled along with `a`.
pub fn check_reminder_key(key: &str) -> PulseResult<()> {
    let clashes = key
        .rsplit_once('-')
        .is_some_and(|(_, suffix)| matches!(suffix, "0" | "1" | "2" | "3" | "4" | "5" | "6"));
    if clashes {
        return Err(PulseError::InvalidReminderKey(key.to_string()));
    }
    Ok(())
}

/// Plan the dispatcher registrations for `spec` as of `now`.
///
/// - Daily: one `Daily` trigger under the bare id.
/// - Weekly on all seven days: collapsed to one `Daily` trigger under the bare id.
/// - Weekly on a subset: one `Weekly` trigger per day, id `"{id}-{weekday}"`.
/// - Monthly and one-shot: one non-repeating trigger; monthly reminders must be
///   re-armed by the caller after they fire.
///
/// Returns an empty plan when there is nothing to schedule.
pub fn plan_triggers(
    spec: &ReminderSpec,
    content: &NotificationContent,
    now: DateTime<Utc>,
) -> Vec<TriggerRequest> {
    let reference = spec.not_before.map_or(now, |floor| floor.max(now));
    let request = |id: String, fire_at: DateTime<Utc>, repeat: RepeatFrequency| TriggerRequest {
        id,
        fire_at,
        repeat,
        content: content.clone(),
    };

    match &spec.recurrence {
        Recurrence::Weekly(days) if days.len() >= 7 => {
            let fire_at =
                next_daily_instant(spec.time_of_day, spec.time_zone, spec.lead_minutes, reference);
            vec![request(spec.id.clone(), fire_at, RepeatFrequency::Daily)]
        }
        Recurrence::Weekly(days) => days
            .iter()
            .map(|day| {
                let fire_at = next_weekly_instant(
                    spec.time_of_day,
                    *day,
                    spec.time_zone,
                    spec.lead_minutes,
                    reference,
                );
                request(weekday_trigger_id(&spec.id, *day), fire_at, RepeatFrequency::Weekly)
            })
            .collect(),
        Recurrence::Daily => resolve_next(spec, now)
            .map(|at| vec![request(spec.id.clone(), at, RepeatFrequency::Daily)])
            .unwrap_or_default(),
        Recurrence::MonthlyOn(_) | Recurrence::OneShot(_) => resolve_next(spec, now)
            .map(|at| vec![request(spec.id.clone(), at, RepeatFrequency::None)])
            .unwrap_or_default(),
    }
}
