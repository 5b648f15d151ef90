//! Goal contributions and milestone notifications.

use std::sync::Arc;

use pulse_core::{
    unnotified_crossings, Goal, NotificationContent, PulseError, PulseResult, ReminderKind,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::dispatcher::TriggerDispatcher;
use crate::store::{paths, require_user, DocumentStore, SetOptions};

/// Result of one committed contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionOutcome {
    pub goal: Goal,
    pub before_amount: i64,
    /// Thresholds newly crossed by this contribution, ascending.
    pub milestones: Vec<u8>,
}

#[derive(Clone)]
pub struct GoalService {
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<dyn TriggerDispatcher>,
}

impl GoalService {
    pub fn new(store: Arc<dyn DocumentStore>, dispatcher: Arc<dyn TriggerDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn create(&self, goal: &Goal) -> PulseResult<()> {
        let uid = require_user(self.store.as_ref())?;
        self.store
            .set(&paths::goal(&uid, &goal.id), serde_json::to_value(goal)?, SetOptions::default())
            .await
    }

    pub async fn get(&self, goal_id: &str) -> PulseResult<Option<Goal>> {
        let uid = require_user(self.store.as_ref())?;
        match self.store.get(&paths::goal(&uid, goal_id)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Add `amount` to the goal's running total and notify any new milestones.
    ///
    /// The total, the crossing check and the watermark update happen in one
    /// transaction, so concurrent contributions cannot notify a threshold twice. A
    /// missing goal is an error.
    pub async fn contribute(&self, goal_id: &str, amount: i64) -> PulseResult<ContributionOutcome> {
        let uid = require_user(self.store.as_ref())?;
        let path = paths::goal(&uid, goal_id);

        let missing = path.clone();
        let committed = self
            .store
            .transact(
                &path,
                Box::new(move |current| {
                    let current = current.ok_or_else(|| PulseError::missing(missing))?;
                    let mut goal: Goal = serde_json::from_value(current)?;
                    let before = goal.current_amount;
                    goal.current_amount = before.saturating_add(amount);
                    let crossed = unnotified_crossings(
                        before,
                        goal.current_amount,
                        goal.target_amount,
                        goal.milestone_watermark,
                    );
                    if let Some(top) = crossed.last() {
                        goal.milestone_watermark = *top;
                    }
                    Ok(serde_json::to_value(&goal)?)
                }),
            )
            .await?;

        let before: Goal = serde_json::from_value(committed.before.unwrap_or(Value::Null))?;
        let goal: Goal = serde_json::from_value(committed.after)?;
        let milestones = unnotified_crossings(
            before.current_amount,
            goal.current_amount,
            goal.target_amount,
            before.milestone_watermark,
        );

        info!(
            goal_id,
            amount,
            total = goal.current_amount,
            milestones = ?milestones,
            "goal contribution recorded"
        );

        for milestone in &milestones {
            let content = milestone_content(&goal, *milestone);
            if let Err(e) = self.dispatcher.display_immediate(&content).await {
                warn!(goal_id, milestone, error = %e, "failed to display milestone");
            }
        }

        Ok(ContributionOutcome {
            before_amount: before.current_amount,
            goal,
            milestones,
        })
    }
}

fn milestone_content(goal: &Goal, milestone: u8) -> NotificationContent {
    let name = if goal.name.is_empty() { "your goal" } else { goal.name.as_str() };
    let (title, body) = if milestone >= 100 {
        (
            format!("Goal reached: {name}"),
            format!("You fully funded {name}. Nice work!"),
        )
    } else {
        (
            format!("{milestone}% of {name}"),
            format!("You're {milestone}% of the way to {name}. Keep going!"),
        )
    };
    NotificationContent::new(ReminderKind::Milestone, title, body)
        .with_data("goalId", goal.id.clone())
        .with_data("milestone", milestone.to_string())
}
