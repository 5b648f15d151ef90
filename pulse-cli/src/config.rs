use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use pulse_core::{check_reminder_key, parse_zone, weekday_from_index, Frequency, TimeOfDay};
use pulse_engine::{HabitReminder, RecurringTransaction, ReminderSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_pulse_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub timezone: String,
    pub reminders: ReminderSettings,
    pub check_in: CheckInSection,
    pub habits: Vec<HabitEntry>,
    pub recurring: Vec<RecurringEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInSection {
    /// Wait between writing a check-in and reading it back.
    pub reread_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitEntry {
    pub id: String,
    pub name: String,
    pub time: TimeOfDay,
    /// 0 = Sunday. Omit for every day.
    pub weekdays: Option<Vec<u8>>,
    #[serde(default)]
    pub target: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringEntry {
    pub id: String,
    pub name: String,
    /// Minor currency units (cents).
    pub amount: i64,
    pub next_due: NaiveDate,
    pub frequency: Frequency,
    #[serde(default)]
    pub reminder_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            timezone: "America/Chicago".to_string(),
            reminders: ReminderSettings::default(),
            check_in: CheckInSection::default(),
            habits: Vec::new(),
            recurring: Vec::new(),
        }
    }
}

impl Default for CheckInSection {
    fn default() -> Self {
        Self {
            reread_delay_ms: 300,
        }
    }
}

impl Config {
    pub fn zone(&self) -> Result<Tz> {
        parse_zone(&self.timezone).with_context(|| format!("timezone in config: {}", self.timezone))
    }

    pub fn habit(&self, id: &str) -> Option<&HabitEntry> {
        self.habits.iter().find(|h| h.id == id)
    }
}

impl HabitEntry {
    pub fn reminder(&self) -> Result<HabitReminder> {
        check_reminder_key(&self.id).with_context(|| format!("habit id {}", self.id))?;
        let weekdays = match &self.weekdays {
            Some(days) => Some(
                days.iter()
                    .map(|d| weekday_from_index(*d))
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("weekdays for habit {}", self.id))?,
            ),
            None => None,
        };
        Ok(HabitReminder {
            habit_id: self.id.clone(),
            name: self.name.clone(),
            time: self.time,
            weekdays,
        })
    }
}

impl From<&RecurringEntry> for RecurringTransaction {
    fn from(e: &RecurringEntry) -> Self {
        RecurringTransaction {
            id: e.id.clone(),
            name: e.name.clone(),
            amount: e.amount,
            next_due: e.next_due,
            frequency: e.frequency,
            reminder_days: e.reminder_days,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_pulse_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    const SAMPLE: &str = r#"
user_id = "u1"
timezone = "Europe/Berlin"

[reminders]
expense_time = "21:15"
paydays = [1, 15]

[[habits]]
id = "run"
name = "Morning run"
time = "06:30"
weekdays = [1, 3, 5]
target = 5

[[habits]]
id = "read"
name = "Read"
time = "22:00"

[[recurring]]
id = "rent"
name = "Rent"
amount = 150000
next_due = "2026-03-01"
frequency = "monthly"
reminder_days = 2
"#;

    #[test]
    fn test_parse_full_config() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.user_id, "u1");
        assert_eq!(cfg.zone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(cfg.reminders.expense_time, TimeOfDay::at(21, 15));
        assert_eq!(cfg.reminders.paydays, vec![1, 15]);
        assert_eq!(cfg.reminders.habit_lead_minutes, 5);
        assert_eq!(cfg.check_in.reread_delay_ms, 300);

        let run = cfg.habit("run").unwrap().reminder().unwrap();
        assert_eq!(run.weekdays, Some(vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]));
        assert_eq!(cfg.habit("read").unwrap().target, 0);
        assert_eq!(cfg.habit("read").unwrap().reminder().unwrap().weekdays, None);

        let rent = RecurringTransaction::from(&cfg.recurring[0]);
        assert_eq!(rent.frequency, Frequency::Monthly);
        assert_eq!(rent.reminder_days, 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.user_id, "local");
        assert_eq!(cfg.timezone, "America/Chicago");
        assert!(cfg.habits.is_empty());
    }

    #[test]
    fn test_bad_weekday_is_rejected() {
        let entry = HabitEntry {
            id: "x".into(),
            name: "X".into(),
            time: TimeOfDay::at(7, 0),
            weekdays: Some(vec![7]),
            target: 0,
        };
        assert!(entry.reminder().is_err());
    }

    #[test]
    fn test_habit_id_shadowing_a_weekday_variant_is_rejected() {
        let entry = HabitEntry {
            id: "run-1".into(),
            name: "Second run".into(),
            time: TimeOfDay::at(18, 0),
            weekdays: None,
            target: 0,
        };
        assert!(entry.reminder().is_err());
    }

    #[test]
    fn test_default_config_serializes() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.reminders, ReminderSettings::default());
    }
}
