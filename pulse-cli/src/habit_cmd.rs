use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use pulse_core::local_date;
use pulse_engine::{paths, require_user, DocumentStore, SetOptions};
use serde_json::json;

use crate::config::Config;
use crate::state::Session;

#[derive(Subcommand, Debug)]
pub enum HabitCommand {
    /// Check a habit in (or undo today's check-in)
    Toggle {
        id: String,

        /// Daily target used for points (defaults to the configured habit's target)
        #[arg(long)]
        target: Option<u32>,

        /// Local date to toggle instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show recent check-ins, newest first
    History {
        id: String,

        #[arg(long, default_value_t = 14)]
        limit: usize,
    },

    /// Delete a habit's document and cancel its reminders
    Delete { id: String },
}

pub async fn run(cmd: HabitCommand, cfg: &Config, session: &Session) -> Result<()> {
    match cmd {
        HabitCommand::Toggle { id, target, date } => toggle(cfg, session, &id, target, date).await,
        HabitCommand::History { id, limit } => history(cfg, session, &id, limit).await,
        HabitCommand::Delete { id } => delete(cfg, session, &id).await,
    }
}

async fn toggle(
    cfg: &Config,
    session: &Session,
    id: &str,
    target: Option<u32>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let tz = cfg.zone()?;
    let now = Utc::now();
    let date = date.unwrap_or_else(|| local_date(now, tz));
    let entry = cfg.habit(id);
    let name = entry.map_or(id, |h| h.name.as_str());
    let target = target.or(entry.map(|h| h.target)).unwrap_or(0);

    let check_ins = session.check_ins(cfg);
    let seed = check_ins.seed_from_history(id, target, date).await?;
    let c = check_ins
        .toggle(id, date, seed)
        .await
        .with_context(|| format!("toggle {id} on {date}"))?;

    let uid = require_user(session.store.as_ref())?;
    session
        .store
        .set(
            &paths::habit(&uid, id),
            json!({
                "id": id,
                "name": name,
                "target": target,
            }),
            SetOptions::merge(),
        )
        .await?;

    if date == local_date(now, tz) {
        let orchestrator = session.orchestrator(cfg)?;
        orchestrator.schedule_streak_reminder(id, name, now).await;
        orchestrator.schedule_daily_expense_reminder(now).await;
    }

    if c.completed {
        println!(
            "{name} checked in for {date}: +{} points, streak {} (best {})",
            c.points, c.streak, c.best_streak
        );
    } else {
        println!("{name} unchecked for {date}; streak reset");
    }
    Ok(())
}

async fn history(cfg: &Config, session: &Session, id: &str, limit: usize) -> Result<()> {
    let recent = session.check_ins(cfg).recent(id, limit).await?;
    if recent.is_empty() {
        println!("No check-ins for {id}");
        return Ok(());
    }
    for c in recent {
        let mark = if c.completed { "x" } else { " " };
        println!(
            "[{mark}] {} points={:>3} streak={:>3} best={:>3}",
            c.date, c.points, c.streak, c.best_streak
        );
    }
    Ok(())
}

async fn delete(cfg: &Config, session: &Session, id: &str) -> Result<()> {
    let uid = require_user(session.store.as_ref())?;
    session.store.delete(&paths::habit(&uid, id)).await?;
    session.orchestrator(cfg)?.cancel_habit_reminders(id).await;
    println!("Deleted habit {id} and cancelled its reminders");
    if cfg.habit(id).is_some() {
        println!("Note: {id} is still listed in config.toml and will be rescheduled on sync");
    }
    Ok(())
}
