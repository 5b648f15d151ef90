use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pulse_core::{
    detect_crossings, next_daily_instant, next_monthly_instant, next_weekly_instant,
    parse_zone, percent_funded, weekday_from_index, TimeOfDay,
};
use tracing_subscriber::EnvFilter;

mod config;
mod goal_cmd;
mod habit_cmd;
mod reminders_cmd;
mod state;

use crate::config::{init_config, load_config};
use crate::goal_cmd::GoalCommand;
use crate::habit_cmd::HabitCommand;
use crate::reminders_cmd::RemindersCommand;
use crate::state::Session;

#[derive(Parser, Debug)]
#[command(name = "pulse", version, about = "Pulse reminders, habit check-ins and goal milestones")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.pulse/config.toml
    Init,

    /// Print the next occurrence of a wall-clock time
    Next {
        /// Time of day, HH:MM
        #[arg(long)]
        time: TimeOfDay,

        /// IANA zone (defaults to the configured timezone)
        #[arg(long)]
        tz: Option<String>,

        /// Weekly on this day (0 = Sunday)
        #[arg(long, conflicts_with = "month_day")]
        weekday: Option<u8>,

        /// Monthly on this day (clamped to 1-28)
        #[arg(long)]
        month_day: Option<u32>,

        /// Minutes before the time
        #[arg(long, default_value_t = 0)]
        lead: u32,
    },

    /// Which milestones a change in amount crosses
    Milestones {
        #[arg(long, allow_negative_numbers = true)]
        before: i64,

        #[arg(long, allow_negative_numbers = true)]
        after: i64,

        #[arg(long)]
        target: i64,
    },

    /// Habit check-ins
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },

    /// Scheduled reminders
    Reminders {
        #[command(subcommand)]
        command: RemindersCommand,
    },

    /// Savings goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Init => init_config()?,

        Command::Next {
            time,
            tz,
            weekday,
            month_day,
            lead,
        } => next(time, tz, weekday, month_day, lead)?,

        Command::Milestones {
            before,
            after,
            target,
        } => {
            println!(
                "{}% -> {}%",
                percent_funded(before, target),
                percent_funded(after, target)
            );
            let crossed = detect_crossings(before, after, target);
            if crossed.is_empty() {
                println!("No milestones crossed");
            }
            for m in crossed {
                println!("Crossed {m}%");
            }
        }

        Command::Habit { command } => {
            let cfg = load_config()?;
            let session = Session::open(&cfg)?;
            habit_cmd::run(command, &cfg, &session).await?;
            session.save().await?;
        }

        Command::Reminders { command } => {
            let cfg = load_config()?;
            let session = Session::open(&cfg)?;
            reminders_cmd::run(command, &cfg, &session).await?;
            session.save().await?;
        }

        Command::Goal { command } => {
            let cfg = load_config()?;
            let session = Session::open(&cfg)?;
            goal_cmd::run(command, &session).await?;
            session.save().await?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by PULSE_LOG, then RUST_LOG, else warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PULSE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn next(
    time: TimeOfDay,
    tz: Option<String>,
    weekday: Option<u8>,
    month_day: Option<u32>,
    lead: u32,
) -> Result<()> {
    let zone = match tz {
        Some(z) => parse_zone(&z)?,
        None => load_config()?.zone()?,
    };
    let now = Utc::now();
    let at: DateTime<Utc> = match (weekday, month_day) {
        (Some(w), _) => {
            let day = weekday_from_index(w).context("--weekday")?;
            next_weekly_instant(time, day, zone, lead, now)
        }
        (None, Some(d)) => next_monthly_instant(time, d, zone, lead, now),
        (None, None) => next_daily_instant(time, zone, lead, now),
    };
    println!("{}", at.with_timezone(&zone).format("%a %Y-%m-%d %H:%M %Z"));
    println!("{}", at.to_rfc3339());
    Ok(())
}
