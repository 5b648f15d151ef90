//! pulse-core: scheduling math, check-in transitions and milestone detection for
//! the Pulse habit & finance tracker.

pub mod checkin;
pub mod error;
pub mod milestones;
pub mod recurrence;
pub mod reminders;
pub mod time;

pub use checkin::{
    base_points, completion_points, seed_from_days, streak_after_uncheck, toggle, CheckIn,
    HabitSeed,
};
pub use error::{PulseError, PulseResult};
pub use milestones::{
    detect_crossings, percent_funded, unnotified_crossings, Goal, MILESTONES,
};
pub use recurrence::{next_due_instant, resolve_next, Frequency, OneShot, Recurrence};
pub use reminders::{
    cancel_candidates, check_reminder_key, plan_triggers, weekday_trigger_id, NotificationContent,
    PendingNotification, ReminderKind, ReminderSpec, RepeatFrequency, TriggerHandle,
    TriggerRequest,
};
pub use time::{
    local_date, local_to_utc, next_daily_instant, next_monthly_instant, next_weekly_instant,
    parse_zone, start_of_local_day, weekday_from_index, weekday_index, zone_offset_millis,
    TimeOfDay,
};
