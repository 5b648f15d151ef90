//! Time utilities: wall-clock times in IANA zones resolved to absolute instants.
//!
//! Offsets are always derived from the zone rules for the instant in question,
//! never from a fixed table, so daylight-saving transitions are honored.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, PulseResult};

/// A wall-clock time of day, written as `"HH:MM"` (24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Infallible constructor for constants; out-of-range fields saturate.
    pub fn at(hour: u32, minute: u32) -> Self {
        let secs = hour.min(23) * 3600 + minute.min(59) * 60;
        Self(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = PulseError;

    fn from_str(s: &str) -> PulseResult<Self> {
        let invalid = || PulseError::InvalidTimeOfDay(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = PulseError;

    fn try_from(value: String) -> PulseResult<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Parse an IANA zone identifier like "America/Chicago".
pub fn parse_zone(zone: &str) -> PulseResult<Tz> {
    zone.trim()
        .parse::<Tz>()
        .map_err(|_| PulseError::InvalidTimeZone(zone.to_string()))
}

/// Weekday from its index, Sunday = 0 through Saturday = 6.
pub fn weekday_from_index(index: u8) -> PulseResult<Weekday> {
    Ok(match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        other => return Err(PulseError::InvalidWeekday(other)),
    })
}

/// Index of a weekday, Sunday = 0.
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Difference between the zone's wall clock and UTC at `instant`, in milliseconds.
///
/// Computed by reading the instant's zone-local calendar fields back as if they
/// were UTC and subtracting the original instant.
pub fn zone_offset_millis(instant: DateTime<Utc>, tz: Tz) -> i64 {
    let wall = instant.with_timezone(&tz).naive_local();
    (wall.and_utc() - instant).num_milliseconds()
}

/// The zone-local calendar date of `instant`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Resolve a zone-local wall-clock reading to an instant.
///
/// Ambiguous readings (fall-back hour) take the earliest mapping. Readings inside a
/// spring-forward gap are shifted by the offset in force before the jump, which
/// lands the same distance past the gap.
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let as_utc = local.and_utc();
            as_utc - Duration::milliseconds(zone_offset_millis(as_utc, tz))
        }
    }
}

/// Midnight at the start of `date` in `tz`.
pub fn start_of_local_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

fn occurrence(date: NaiveDate, time: TimeOfDay, tz: Tz, lead: Duration) -> DateTime<Utc> {
    local_to_utc(date.and_time(time.as_naive()), tz) - lead
}

fn lead(lead_minutes: u32) -> Duration {
    Duration::minutes(i64::from(lead_minutes))
}

/// Next instant strictly after `now` at `time` (minus lead) in `tz`, repeating daily.
pub fn next_daily_instant(
    time: TimeOfDay,
    tz: Tz,
    lead_minutes: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let lead = lead(lead_minutes);
    let mut date = local_date(now, tz);
    let mut candidate = occurrence(date, time, tz, lead);
    while candidate <= now {
        date = date + Duration::days(1);
        candidate = occurrence(date, time, tz, lead);
    }
    candidate
}

/// Next instant strictly after `now` on `weekday` at `time` (minus lead) in `tz`.
pub fn next_weekly_instant(
    time: TimeOfDay,
    weekday: Weekday,
    tz: Tz,
    lead_minutes: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let lead = lead(lead_minutes);
    let today = local_date(now, tz);
    let delta = (i64::from(weekday_index(weekday)) - i64::from(weekday_index(today.weekday()))
        + 7)
        % 7;

    let mut date = today + Duration::days(delta);
    let mut candidate = occurrence(date, time, tz, lead);
    // Checked after the lead is applied: the lead alone can push a same-day target
    // into the past.
    while candidate <= now {
        date = date + Duration::days(7);
        candidate = occurrence(date, time, tz, lead);
    }
    candidate
}

/// Next instant strictly after `now` on day-of-month `day` at `time` (minus lead).
///
/// `day` is clamped to 1..=28 so the occurrence exists in every month.
pub fn next_monthly_instant(
    time: TimeOfDay,
    day: u32,
    tz: Tz,
    lead_minutes: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let lead = lead(lead_minutes);
    let day = day.clamp(1, 28);
    let today = local_date(now, tz);
    let mut date = today.with_day(day).unwrap_or(today);
    let mut candidate = occurrence(date, time, tz, lead);
    while candidate <= now {
        date = date + Months::new(1);
        candidate = occurrence(date, time, tz, lead);
    }
    candidate
}
