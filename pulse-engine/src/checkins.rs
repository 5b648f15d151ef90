//! Check-in service: persists habit toggles and answers check-in queries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use pulse_core::{checkin, local_date, CheckIn, HabitSeed, PulseError, PulseResult};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::store::{paths, require_user, DocumentStore, Query, SetOptions};

/// Pause before re-reading a just-written check-in; the store does not promise
/// read-after-write.
pub const DEFAULT_REREAD_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn DocumentStore>,
    reread_delay: Duration,
}

impl CheckInService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            reread_delay: DEFAULT_REREAD_DELAY,
        }
    }

    pub fn with_reread_delay(mut self, delay: Duration) -> Self {
        self.reread_delay = delay;
        self
    }

    pub async fn get(&self, habit_id: &str, date: NaiveDate) -> PulseResult<Option<CheckIn>> {
        let uid = require_user(self.store.as_ref())?;
        self.read(&paths::check_in(&uid, habit_id, date)).await
    }

    /// Toggle today's check-in, where "today" is `now` in the habit's zone.
    pub async fn toggle_today(
        &self,
        habit_id: &str,
        seed: HabitSeed,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> PulseResult<CheckIn> {
        self.toggle(habit_id, local_date(now, tz), seed).await
    }

    /// Flip the check-in for `date` and return the document as stored.
    ///
    /// Errors propagate: a toggle that did not persist must reach the user.
    pub async fn toggle(
        &self,
        habit_id: &str,
        date: NaiveDate,
        seed: HabitSeed,
    ) -> PulseResult<CheckIn> {
        let uid = require_user(self.store.as_ref())?;
        let path = paths::check_in(&uid, habit_id, date);

        let current = self.read(&path).await?;
        let next = checkin::toggle(current.as_ref(), habit_id, date, seed);

        let options = if next.completed {
            SetOptions::merge().stamp("completedAt")
        } else {
            SetOptions::merge()
        };
        self.store
            .set(&path, serde_json::to_value(&next)?, options)
            .await?;

        if !self.reread_delay.is_zero() {
            tokio::time::sleep(self.reread_delay).await;
        }
        let stored = self
            .read(&path)
            .await?
            .ok_or_else(|| PulseError::missing(path.clone()))?;

        self.record_streak(&uid, habit_id, &stored).await;

        info!(
            habit_id,
            date = %date,
            completed = stored.completed,
            points = stored.points,
            streak = stored.streak,
            "check-in toggled"
        );
        Ok(stored)
    }

    /// Seed for a toggle on `today`, derived from yesterday's document and the
    /// best streak recorded on the habit.
    pub async fn seed_from_history(
        &self,
        habit_id: &str,
        target: u32,
        today: NaiveDate,
    ) -> PulseResult<HabitSeed> {
        let uid = require_user(self.store.as_ref())?;
        let habit_best = self
            .store
            .get(&paths::habit(&uid, habit_id))
            .await?
            .and_then(|doc| doc.get("bestStreak").and_then(Value::as_u64))
            .map_or(0, |best| u32::try_from(best).unwrap_or(u32::MAX));
        let yesterday = self.get(habit_id, today - Days::new(1)).await?;
        let current = self.get(habit_id, today).await?;
        Ok(checkin::seed_from_days(
            target,
            habit_best,
            yesterday.as_ref(),
            current.as_ref(),
        ))
    }

    /// Most recent check-ins for a habit, newest first.
    pub async fn recent(&self, habit_id: &str, limit: usize) -> PulseResult<Vec<CheckIn>> {
        let uid = require_user(self.store.as_ref())?;
        let docs = self
            .store
            .query(&paths::check_ins(&uid, habit_id), Query::newest_first(limit))
            .await?;
        docs.into_iter()
            .map(|(_, doc)| serde_json::from_value(doc).map_err(PulseError::from))
            .collect()
    }

    /// Whether any of the user's habits has a completed check-in on `date`.
    pub async fn any_completed_on(&self, date: NaiveDate) -> PulseResult<bool> {
        let uid = require_user(self.store.as_ref())?;
        let habits = self.store.query(&paths::habits(&uid), Query::default()).await?;
        for (habit_id, _) in habits {
            match self.read(&paths::check_in(&uid, &habit_id, date)).await {
                Ok(Some(c)) if c.completed => return Ok(true),
                Ok(_) => {}
                Err(e) => warn!(habit_id = %habit_id, error = %e, "unreadable check-in"),
            }
        }
        Ok(false)
    }

    /// Merge the streak snapshot onto the habit document. The check-in itself is
    /// already stored, so a failure here is only logged.
    async fn record_streak(&self, uid: &str, habit_id: &str, check_in: &CheckIn) {
        let doc = json!({
            "currentStreak": check_in.streak,
            "bestStreak": check_in.best_streak,
        });
        if let Err(e) = self
            .store
            .set(&paths::habit(uid, habit_id), doc, SetOptions::merge())
            .await
        {
            warn!(habit_id, error = %e, "failed to record streak on habit");
        }
    }

    async fn read(&self, path: &str) -> PulseResult<Option<CheckIn>> {
        match self.store.get(path).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}
