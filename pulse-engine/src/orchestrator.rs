//! Reminder policies: decide when each kind of reminder fires and what it says,
//! then hand it to the lifecycle manager.
//!
//! Scheduling failures never escape a policy; they are logged and the policy
//! returns no handles.

use chrono::{DateTime, Days, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use pulse_core::{
    check_reminder_key, local_date, local_to_utc, start_of_local_day, weekday_from_index,
    Frequency, NotificationContent, OneShot, Recurrence, ReminderKind, ReminderSpec, TimeOfDay,
    TriggerHandle,
};
use tracing::{debug, warn};

use crate::checkins::CheckInService;
use crate::lifecycle::ReminderLifecycle;
use crate::settings::ReminderSettings;

pub const DAILY_EXPENSE_ID: &str = "daily-expense";
pub const WEEKLY_REPORT_ID: &str = "weekly-report";
pub const MONTHLY_REPORT_ID: &str = "monthly-report";
pub const AI_RECOMMENDATION_ID: &str = "ai-recommendation";

/// Habit ids ending in `-0` through `-6` are refused by
/// [`ReminderOrchestrator::schedule_habit_reminder`]: they would collide with the
/// weekday variants of another habit's reminder.
pub fn habit_reminder_id(habit_id: &str) -> String {
    format!("habit-{habit_id}")
}

pub fn streak_reminder_id(habit_id: &str) -> String {
    format!("streak-{habit_id}")
}

pub fn recurring_reminder_id(transaction_id: &str) -> String {
    format!("recurring-{transaction_id}")
}

pub fn payday_reminder_id(day: u32) -> String {
    format!("goal-payday-{day}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitReminder {
    pub habit_id: String,
    pub name: String,
    pub time: TimeOfDay,
    /// `None` means every day.
    pub weekdays: Option<Vec<Weekday>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTransaction {
    pub id: String,
    pub name: String,
    /// Minor currency units.
    pub amount: i64,
    pub next_due: NaiveDate,
    pub frequency: Frequency,
    pub reminder_days: u32,
}

#[derive(Clone)]
pub struct ReminderOrchestrator {
    lifecycle: ReminderLifecycle,
    check_ins: CheckInService,
    settings: ReminderSettings,
    tz: Tz,
}

impl ReminderOrchestrator {
    pub fn new(
        lifecycle: ReminderLifecycle,
        check_ins: CheckInService,
        settings: ReminderSettings,
        tz: Tz,
    ) -> Self {
        Self {
            lifecycle,
            check_ins,
            settings,
            tz,
        }
    }

    pub fn lifecycle(&self) -> &ReminderLifecycle {
        &self.lifecycle
    }

    pub fn settings(&self) -> &ReminderSettings {
        &self.settings
    }

    /// Daily, or on the selected weekdays, a few minutes before the habit's time.
    pub async fn schedule_habit_reminder(
        &self,
        habit: &HabitReminder,
        now: DateTime<Utc>,
    ) -> Vec<TriggerHandle> {
        if let Err(e) = check_reminder_key(&habit.habit_id) {
            warn!(habit_id = %habit.habit_id, error = %e, "habit reminder not scheduled");
            return Vec::new();
        }
        let recurrence = match &habit.weekdays {
            Some(days) => Recurrence::weekly(days.iter().copied()),
            None => Recurrence::Daily,
        };
        let spec = ReminderSpec::new(
            habit_reminder_id(&habit.habit_id),
            habit.time,
            self.tz,
            recurrence,
        )
        .with_lead_minutes(self.settings.habit_lead_minutes);
        let content = NotificationContent::new(
            ReminderKind::Habit,
            format!("Time for {}", habit.name),
            format!("{} is coming up at {}.", habit.name, habit.time),
        )
        .with_data("habitId", habit.habit_id.clone());
        self.arm(spec, content, now).await
    }

    /// Drop every reminder tied to a habit (used when the habit is deleted).
    pub async fn cancel_habit_reminders(&self, habit_id: &str) {
        self.lifecycle
            .cancel([habit_reminder_id(habit_id), streak_reminder_id(habit_id)])
            .await;
    }

    /// Evening nudge to log expenses; starts tomorrow if the user already checked
    /// in a habit today.
    pub async fn schedule_daily_expense_reminder(&self, now: DateTime<Utc>) -> Vec<TriggerHandle> {
        let today = local_date(now, self.tz);
        let engaged = match self.check_ins.any_completed_on(today).await {
            Ok(engaged) => engaged,
            Err(e) => {
                warn!(error = %e, "could not read today's check-ins; assuming none");
                false
            }
        };

        let mut spec = ReminderSpec::new(
            DAILY_EXPENSE_ID,
            self.settings.expense_time,
            self.tz,
            Recurrence::Daily,
        );
        if engaged {
            spec = spec.not_before(start_of_local_day(today + Days::new(1), self.tz));
        }
        let content = NotificationContent::new(
            ReminderKind::DailyExpense,
            "Log today's expenses",
            "Take a minute to record what you spent today.",
        );
        self.arm(spec, content, now).await
    }

    /// Repeating weekly summary (Monday morning by default).
    pub async fn schedule_weekly_report(&self, now: DateTime<Utc>) -> Vec<TriggerHandle> {
        let weekday = match weekday_from_index(self.settings.weekly_report_weekday) {
            Ok(day) => day,
            Err(e) => {
                warn!(error = %e, "weekly report not scheduled");
                return Vec::new();
            }
        };
        let spec = ReminderSpec::new(
            WEEKLY_REPORT_ID,
            self.settings.report_time,
            self.tz,
            Recurrence::weekly([weekday]),
        );
        let content = NotificationContent::new(
            ReminderKind::WeeklyReport,
            "Your weekly report is ready",
            "See how your spending and habits went last week.",
        );
        self.arm(spec, content, now).await
    }

    /// First of next month. One-shot: re-armed by [`Self::rearm_one_shots`].
    pub async fn schedule_monthly_report(&self, now: DateTime<Utc>) -> Vec<TriggerHandle> {
        let spec = ReminderSpec::new(
            MONTHLY_REPORT_ID,
            self.settings.report_time,
            self.tz,
            Recurrence::MonthlyOn(1),
        );
        let content = NotificationContent::new(
            ReminderKind::MonthlyReport,
            "Your monthly report is ready",
            "A new month: review last month's spending and progress.",
        );
        self.arm(spec, content, now).await
    }

    /// `reminder_days` before the next due date still ahead of `now`.
    pub async fn schedule_recurring_transaction_reminder(
        &self,
        txn: &RecurringTransaction,
        now: DateTime<Utc>,
    ) -> Vec<TriggerHandle> {
        if let Err(e) = check_reminder_key(&txn.id) {
            warn!(transaction_id = %txn.id, error = %e, "recurring reminder not scheduled");
            return Vec::new();
        }
        let spec = ReminderSpec::new(
            recurring_reminder_id(&txn.id),
            self.settings.recurring_time,
            self.tz,
            Recurrence::OneShot(OneShot::Due {
                due: txn.next_due,
                lead_days: txn.reminder_days,
                frequency: txn.frequency,
            }),
        );
        let when = match txn.reminder_days {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {n} days"),
        };
        let content = NotificationContent::new(
            ReminderKind::RecurringTransaction,
            format!("Upcoming: {}", txn.name),
            format!("{} of {} is due {}.", txn.name, format_amount(txn.amount), when),
        )
        .with_data("transactionId", txn.id.clone());
        self.arm(spec, content, now).await
    }

    pub async fn cancel_recurring_transaction_reminder(&self, transaction_id: &str) {
        self.lifecycle.cancel([recurring_reminder_id(transaction_id)]).await;
    }

    /// One one-shot reminder per configured payday, replacing any earlier set.
    ///
    /// Paydays are clamped to 1..=28; the sweep still covers days up to 31 so ids
    /// left behind by unclamped configurations are removed too.
    pub async fn schedule_goal_payday_reminders(&self, now: DateTime<Utc>) -> Vec<TriggerHandle> {
        self.lifecycle.cancel((1..=31).map(payday_reminder_id)).await;

        let mut handles = Vec::new();
        for day in self.settings.payday_days() {
            let spec = ReminderSpec::new(
                payday_reminder_id(day),
                self.settings.payday_time,
                self.tz,
                Recurrence::MonthlyOn(day),
            );
            let content = NotificationContent::new(
                ReminderKind::GoalPayday,
                "Payday: fund your goals",
                "Set aside something for your savings goals today.",
            );
            handles.extend(self.arm(spec, content, now).await);
        }
        handles
    }

    pub async fn schedule_ai_recommendation_reminder(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<TriggerHandle> {
        let spec = ReminderSpec::new(
            AI_RECOMMENDATION_ID,
            self.settings.ai_recommendation_time,
            self.tz,
            Recurrence::Daily,
        );
        let content = NotificationContent::new(
            ReminderKind::AiRecommendation,
            "New tips for you",
            "Your assistant has fresh suggestions based on your recent activity.",
        );
        self.arm(spec, content, now).await
    }

    /// Tonight's warning for a live streak that has not been extended today.
    ///
    /// Cancelled instead when there is no streak at risk or the time has passed.
    pub async fn schedule_streak_reminder(
        &self,
        habit_id: &str,
        habit_name: &str,
        now: DateTime<Utc>,
    ) -> Vec<TriggerHandle> {
        let id = streak_reminder_id(habit_id);
        let today = local_date(now, self.tz);

        let at_risk = match self.streak_at_risk(habit_id, today).await {
            Ok(streak) => streak,
            Err(e) => {
                warn!(habit_id, error = %e, "could not read streak; skipping reminder");
                None
            }
        };
        let Some(streak) = at_risk else {
            debug!(habit_id, "no streak at risk");
            self.lifecycle.cancel([id.as_str()]).await;
            return Vec::new();
        };

        let fire_at = local_to_utc(today.and_time(self.settings.streak_time.as_naive()), self.tz);
        let spec = ReminderSpec::new(
            id,
            self.settings.streak_time,
            self.tz,
            Recurrence::OneShot(OneShot::At(fire_at)),
        );
        let content = NotificationContent::new(
            ReminderKind::Streak,
            format!("Keep your {streak}-day streak"),
            format!("You haven't checked in {habit_name} today."),
        )
        .with_data("habitId", habit_id.to_string());
        self.arm(spec, content, now).await
    }

    /// Re-arm the one-shot stand-ins for monthly repeats; call on app foreground.
    pub async fn rearm_one_shots(&self, now: DateTime<Utc>) -> Vec<TriggerHandle> {
        let mut handles = self.schedule_monthly_report(now).await;
        handles.extend(self.schedule_goal_payday_reminders(now).await);
        handles
    }

    /// Current streak if it would be lost by not checking in today.
    async fn streak_at_risk(
        &self,
        habit_id: &str,
        today: NaiveDate,
    ) -> pulse_core::PulseResult<Option<u32>> {
        if let Some(c) = self.check_ins.get(habit_id, today).await? {
            if c.completed {
                return Ok(None);
            }
        }
        let seed = self.check_ins.seed_from_history(habit_id, 0, today).await?;
        Ok((seed.current_streak > 0).then_some(seed.current_streak))
    }

    async fn arm(
        &self,
        spec: ReminderSpec,
        content: NotificationContent,
        now: DateTime<Utc>,
    ) -> Vec<TriggerHandle> {
        match self.lifecycle.schedule(&spec, &content, now).await {
            Ok(handles) => handles,
            Err(e) => {
                warn!(reminder_id = %spec.id, error = %e, "failed to schedule reminder");
                Vec::new()
            }
        }
    }
}

/// Minor units as a decimal amount, e.g. 123456 -> "1234.56".
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
