use anyhow::{bail, Context, Result};
use clap::Subcommand;
use pulse_core::Goal;
use pulse_engine::format_amount;

use crate::state::Session;

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    /// Create (or overwrite) a savings goal
    Create {
        id: String,

        /// Target in minor units (cents)
        #[arg(long)]
        target: i64,

        #[arg(long, default_value = "")]
        name: String,
    },

    /// Add to a goal; negative amounts withdraw
    Contribute {
        id: String,

        /// Minor units (cents)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },

    /// Show a goal's progress
    Show { id: String },
}

pub async fn run(cmd: GoalCommand, session: &Session) -> Result<()> {
    let goals = session.goals();
    match cmd {
        GoalCommand::Create { id, target, name } => {
            if target <= 0 {
                bail!("target must be positive");
            }
            let name = if name.is_empty() { id.clone() } else { name };
            goals.create(&Goal::new(id.clone(), name, target)).await?;
            println!("Created goal {id} with target {}", format_amount(target));
        }
        GoalCommand::Contribute { id, amount } => {
            let out = goals
                .contribute(&id, amount)
                .await
                .with_context(|| format!("contribute to {id}"))?;
            println!(
                "{}: {} -> {} of {} ({}%)",
                out.goal.name,
                format_amount(out.before_amount),
                format_amount(out.goal.current_amount),
                format_amount(out.goal.target_amount),
                out.goal.percent_funded()
            );
            for m in &out.milestones {
                println!("Milestone reached: {m}%");
            }
        }
        GoalCommand::Show { id } => match goals.get(&id).await? {
            Some(goal) => println!(
                "{} ({}): {} of {} ({}%), milestones notified up to {}%",
                goal.name,
                goal.id,
                format_amount(goal.current_amount),
                format_amount(goal.target_amount),
                goal.percent_funded(),
                goal.milestone_watermark
            ),
            None => bail!("no goal named {id}"),
        },
    }
    Ok(())
}
