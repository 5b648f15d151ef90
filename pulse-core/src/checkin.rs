//! Habit check-ins: one document per (habit, local calendar day), toggled between
//! not-completed and completed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Points awarded for a habit whose target carries no point value.
pub const DEFAULT_BASE_POINTS: u32 = 10;
/// Bonus points per full week of streak.
pub const WEEKLY_STREAK_BONUS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub habit_id: String,
    /// Day in the habit's local calendar, stored as "YYYY-MM-DD".
    pub date: NaiveDate,
    pub completed: bool,
    pub points: u32,
    pub streak: u32,
    pub best_streak: u32,
    /// Assigned by the store when the document is written as completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CheckIn {
    /// The implicit state of a day with no document yet.
    pub fn not_started(habit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
            completed: false,
            points: 0,
            streak: 0,
            best_streak: 0,
            completed_at: None,
        }
    }

    /// `completed == false` implies no points and no streak.
    pub fn is_consistent(&self) -> bool {
        self.completed || (self.points == 0 && self.streak == 0)
    }
}

/// Snapshot of the habit used to seed a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSeed {
    /// Base point value of the habit.
    pub target: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

pub fn base_points(target: u32) -> u32 {
    if target == 0 { DEFAULT_BASE_POINTS } else { target }
}

/// Points for completing a habit after `prior_streak` consecutive days.
pub fn completion_points(target: u32, prior_streak: u32) -> u32 {
    base_points(target).saturating_add((prior_streak / 7).saturating_mul(WEEKLY_STREAK_BONUS))
}

/// Streak left behind when a completed day is unchecked.
///
/// Unchecking drops the streak to zero instead of restoring the prior value.
pub fn streak_after_uncheck(_prior_streak: u32) -> u32 {
    0
}

/// Next state for a (habit, day) given its current document.
///
/// A missing document counts as not started. Completion timestamps are left for
/// the store to assign.
pub fn toggle(
    current: Option<&CheckIn>,
    habit_id: &str,
    date: NaiveDate,
    seed: HabitSeed,
) -> CheckIn {
    let current = current
        .cloned()
        .unwrap_or_else(|| CheckIn::not_started(habit_id, date));

    if current.completed {
        CheckIn {
            completed: false,
            points: 0,
            streak: streak_after_uncheck(current.streak),
            best_streak: current.best_streak.max(seed.best_streak),
            completed_at: None,
            ..current
        }
    } else {
        let prior = seed.current_streak;
        let streak = prior.saturating_add(1);
        CheckIn {
            completed: true,
            points: completion_points(seed.target, prior),
            streak,
            best_streak: streak.max(seed.best_streak).max(current.best_streak),
            completed_at: None,
            ..current
        }
    }
}

/// Streak seed derived from the previous day's document.
///
/// A completed yesterday carries its streak forward; anything else starts over.
/// `habit_best` is the best streak recorded on the habit itself, which outlives
/// any gap in the check-in history.
pub fn seed_from_days(
    target: u32,
    habit_best: u32,
    yesterday: Option<&CheckIn>,
    today: Option<&CheckIn>,
) -> HabitSeed {
    let current_streak = yesterday.filter(|c| c.completed).map_or(0, |c| c.streak);
    let best_streak = habit_best
        .max(yesterday.map_or(0, |c| c.best_streak))
        .max(today.map_or(0, |c| c.best_streak));
    HabitSeed {
        target,
        current_streak,
        best_streak,
    }
}
