//! Defaults for reminder policies; loaded from the `[reminders]` config section.

use pulse_core::TimeOfDay;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub habit_lead_minutes: u32,
    pub expense_time: TimeOfDay,
    pub report_time: TimeOfDay,
    /// Sunday = 0.
    pub weekly_report_weekday: u8,
    pub recurring_time: TimeOfDay,
    pub payday_time: TimeOfDay,
    /// Days of month (1-28) to nudge goal contributions.
    pub paydays: Vec<u32>,
    pub ai_recommendation_time: TimeOfDay,
    pub streak_time: TimeOfDay,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            habit_lead_minutes: 5,
            expense_time: TimeOfDay::at(20, 0),
            report_time: TimeOfDay::at(9, 0),
            weekly_report_weekday: 1,
            recurring_time: TimeOfDay::at(9, 0),
            payday_time: TimeOfDay::at(9, 0),
            paydays: vec![5, 10],
            ai_recommendation_time: TimeOfDay::at(12, 0),
            streak_time: TimeOfDay::at(21, 0),
        }
    }
}

impl ReminderSettings {
    /// Configured paydays clamped to 1..=28, sorted, without duplicates.
    pub fn payday_days(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self.paydays.iter().map(|d| (*d).clamp(1, 28)).collect();
        days.sort_unstable();
        days.dedup();
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let s: ReminderSettings =
            serde_json::from_str(r#"{"expense_time": "21:30", "paydays": [1]}"#).unwrap();
        assert_eq!(s.expense_time, TimeOfDay::at(21, 30));
        assert_eq!(s.paydays, vec![1]);
        assert_eq!(s.habit_lead_minutes, 5);
        assert_eq!(s.report_time.to_string(), "09:00");
    }

    #[test]
    fn test_payday_days_clamp_and_dedup() {
        let s = ReminderSettings {
            paydays: vec![30, 5, 28, 0, 5],
            ..ReminderSettings::default()
        };
        assert_eq!(s.payday_days(), vec![1, 5, 28]);
    }
}
