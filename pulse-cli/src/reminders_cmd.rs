use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use pulse_engine::RecurringTransaction;

use crate::config::Config;
use crate::state::Session;

#[derive(Subcommand, Debug)]
pub enum RemindersCommand {
    /// Reschedule every reminder from config (habits, reports, bills, paydays)
    Sync,

    /// Re-arm one-shot monthly reminders (monthly report, paydays)
    Rearm,

    /// List pending notifications, soonest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Cancel reminders by id (weekday variants included)
    Cancel {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub async fn run(cmd: RemindersCommand, cfg: &Config, session: &Session) -> Result<()> {
    match cmd {
        RemindersCommand::Sync => sync(cfg, session).await,
        RemindersCommand::Rearm => {
            let handles = session.orchestrator(cfg)?.rearm_one_shots(Utc::now()).await;
            println!("Re-armed {} trigger(s)", handles.len());
            Ok(())
        }
        RemindersCommand::List { limit } => list(cfg, session, limit).await,
        RemindersCommand::Cancel { ids } => {
            session.lifecycle().cancel(&ids).await;
            println!("Cancelled {}", ids.join(", "));
            Ok(())
        }
    }
}

async fn sync(cfg: &Config, session: &Session) -> Result<()> {
    let orchestrator = session.orchestrator(cfg)?;
    let now = Utc::now();
    let mut armed = 0;

    for habit in &cfg.habits {
        let reminder = habit.reminder()?;
        armed += orchestrator.schedule_habit_reminder(&reminder, now).await.len();
        armed += orchestrator
            .schedule_streak_reminder(&habit.id, &habit.name, now)
            .await
            .len();
    }
    for entry in &cfg.recurring {
        let txn = RecurringTransaction::from(entry);
        armed += orchestrator
            .schedule_recurring_transaction_reminder(&txn, now)
            .await
            .len();
    }
    armed += orchestrator.schedule_daily_expense_reminder(now).await.len();
    armed += orchestrator.schedule_weekly_report(now).await.len();
    armed += orchestrator.schedule_ai_recommendation_reminder(now).await.len();
    armed += orchestrator.rearm_one_shots(now).await.len();

    println!("Scheduled {armed} trigger(s)");
    Ok(())
}

async fn list(cfg: &Config, session: &Session, limit: usize) -> Result<()> {
    let tz = cfg.zone()?;
    let pending = session.lifecycle().list_pending().await?;
    if pending.is_empty() {
        println!("No pending reminders. Run `pulse reminders sync`.");
        return Ok(());
    }
    for p in pending.iter().take(limit) {
        println!(
            "{} | {:<24} | {:<6} | {}",
            p.fire_at.with_timezone(&tz).format("%a %Y-%m-%d %H:%M %Z"),
            p.id,
            format!("{:?}", p.repeat).to_lowercase(),
            p.title
        );
    }
    if pending.len() > limit {
        println!("... and {} more", pending.len() - limit);
    }
    Ok(())
}
