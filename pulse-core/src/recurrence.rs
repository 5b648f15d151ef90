//! Recurrence resolution: the next firing instant for a reminder's repetition pattern.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::reminders::ReminderSpec;
use crate::time::{
    local_to_utc, next_daily_instant, next_monthly_instant, next_weekly_instant, weekday_index,
    TimeOfDay,
};

/// Upper bound on period advances when searching for a due-date reminder slot.
pub const MAX_DUE_ADVANCES: u32 = 24;

/// Period of an externally scheduled obligation (recurring transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// `anchor` moved forward by `periods` whole periods.
    ///
    /// Always measured from the anchor so month-end dates do not drift
    /// (Jan 31 -> Feb 28 -> Mar 31).
    pub fn advance(&self, anchor: NaiveDate, periods: u32) -> NaiveDate {
        match self {
            Frequency::Weekly => anchor + Duration::weeks(i64::from(periods)),
            Frequency::Monthly => anchor + Months::new(periods),
            Frequency::Quarterly => anchor + Months::new(periods * 3),
            Frequency::Yearly => anchor + Months::new(periods * 12),
        }
    }
}

/// Non-repeating shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneShot {
    /// Fire once at a fixed instant.
    At(DateTime<Utc>),
    /// Fire `lead_days` before `due`; a passed slot rolls to the next period.
    Due {
        due: NaiveDate,
        lead_days: u32,
        frequency: Frequency,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    /// Sorted, de-duplicated weekdays. Build with [`Recurrence::weekly`].
    Weekly(Vec<Weekday>),
    /// Day of month, clamped to 1..=28 at resolution time.
    MonthlyOn(u32),
    OneShot(OneShot),
}

impl Recurrence {
    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(|d| weekday_index(*d));
        days.dedup();
        Recurrence::Weekly(days)
    }
}

/// Next firing instant for `spec`, strictly after `now` (and after `spec.not_before`).
///
/// `None` means there is nothing to schedule: a one-shot already in the past, an
/// empty weekday set, or a due-date search that ran out of advances. Callers treat
/// it as a no-op.
pub fn resolve_next(spec: &ReminderSpec, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let reference = spec.not_before.map_or(now, |floor| floor.max(now));
    let (time, tz, lead) = (spec.time_of_day, spec.time_zone, spec.lead_minutes);

    match &spec.recurrence {
        Recurrence::Daily => Some(next_daily_instant(time, tz, lead, reference)),
        Recurrence::Weekly(days) => days
            .iter()
            .map(|day| next_weekly_instant(time, *day, tz, lead, reference))
            .min(),
        Recurrence::MonthlyOn(day) => Some(next_monthly_instant(time, *day, tz, lead, reference)),
        Recurrence::OneShot(OneShot::At(at)) => {
            let fire = *at - Duration::minutes(i64::from(lead));
            (fire > reference).then_some(fire)
        }
        Recurrence::OneShot(OneShot::Due {
            due,
            lead_days,
            frequency,
        }) => next_due_instant(*due, *lead_days, *frequency, time, tz, lead, reference),
    }
}

/// Bounded search for the first `due - lead` slot after `now`.
///
/// Month lengths make the lead interact with the period, so each advanced due date
/// is re-tested rather than solved in closed form.
pub fn next_due_instant(
    due: NaiveDate,
    lead_days: u32,
    frequency: Frequency,
    time: TimeOfDay,
    tz: Tz,
    lead_minutes: u32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let lead = Duration::days(i64::from(lead_days)) + Duration::minutes(i64::from(lead_minutes));
    (0..=MAX_DUE_ADVANCES).find_map(|periods| {
        let due_at = frequency.advance(due, periods).and_time(time.as_naive());
        let fire = local_to_utc(due_at, tz) - lead;
        (fire > now).then_some(fire)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_zone;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    fn spec(recurrence: Recurrence) -> ReminderSpec {
        ReminderSpec::new(
            "r1",
            TimeOfDay::at(9, 0),
            parse_zone("America/Chicago").unwrap(),
            recurrence,
        )
    }

    #[test]
    fn test_frequency_advance_does_not_drift() {
        let jan31 = date(2026, 1, 31);
        assert_eq!(Frequency::Monthly.advance(jan31, 1), date(2026, 2, 28));
        assert_eq!(Frequency::Monthly.advance(jan31, 2), date(2026, 3, 31));
        assert_eq!(Frequency::Quarterly.advance(jan31, 1), date(2026, 4, 30));
        assert_eq!(Frequency::Yearly.advance(jan31, 1), date(2027, 1, 31));
        assert_eq!(Frequency::Weekly.advance(jan31, 2), date(2026, 2, 14));
    }

    #[test]
    fn test_weekly_normalizes_days() {
        let r = Recurrence::weekly([Weekday::Fri, Weekday::Mon, Weekday::Fri]);
        assert_eq!(r, Recurrence::Weekly(vec![Weekday::Mon, Weekday::Fri]));
    }

    #[test]
    fn test_resolve_weekly_picks_earliest_day() {
        // Friday 06:00 CST
        let now = utc(2026, 2, 20, 12, 0);
        let s = spec(Recurrence::weekly([Weekday::Mon, Weekday::Sat]));
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 2, 21, 15, 0)));
    }

    #[test]
    fn test_resolve_empty_weekly_is_nothing() {
        let s = spec(Recurrence::Weekly(vec![]));
        assert_eq!(resolve_next(&s, utc(2026, 2, 20, 12, 0)), None);
    }

    #[test]
    fn test_not_before_pushes_first_firing() {
        let now = utc(2026, 2, 20, 12, 0);
        let mut s = spec(Recurrence::Daily);
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 2, 20, 15, 0)));

        s.not_before = Some(utc(2026, 2, 21, 6, 0));
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 2, 21, 15, 0)));
    }

    #[test]
    fn test_one_shot_in_past_is_nothing() {
        let now = utc(2026, 2, 20, 12, 0);
        let s = spec(Recurrence::OneShot(OneShot::At(utc(2026, 2, 20, 11, 0))));
        assert_eq!(resolve_next(&s, now), None);

        let s = spec(Recurrence::OneShot(OneShot::At(utc(2026, 2, 20, 13, 0))));
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 2, 20, 13, 0)));
    }

    #[test]
    fn test_due_rolls_forward_past_stale_periods() {
        let now = utc(2026, 2, 20, 12, 0);
        let s = spec(Recurrence::OneShot(OneShot::Due {
            due: date(2026, 1, 15),
            lead_days: 3,
            frequency: Frequency::Monthly,
        }));
        // Mar 15 minus 3 days, 09:00 CDT
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 3, 12, 14, 0)));
    }

    #[test]
    fn test_due_lead_pushes_current_period_into_past() {
        let now = utc(2026, 2, 20, 12, 0);
        let s = spec(Recurrence::OneShot(OneShot::Due {
            due: date(2026, 2, 22),
            lead_days: 3,
            frequency: Frequency::Monthly,
        }));
        assert_eq!(resolve_next(&s, now), Some(utc(2026, 3, 19, 14, 0)));
    }

    #[test]
    fn test_due_search_exhausts() {
        let now = utc(2026, 2, 20, 12, 0);
        let s = spec(Recurrence::OneShot(OneShot::Due {
            due: date(2020, 1, 1),
            lead_days: 0,
            frequency: Frequency::Weekly,
        }));
        assert_eq!(resolve_next(&s, now), None);
    }
}
