//! pulse-engine: the stateful side of Pulse. Trigger and document-store seams,
//! reminder scheduling policies, check-in persistence and goal contributions.

pub mod checkins;
pub mod dispatcher;
pub mod goals;
pub mod lifecycle;
pub mod orchestrator;
pub mod settings;
pub mod store;

pub use checkins::{CheckInService, DEFAULT_REREAD_DELAY};
pub use dispatcher::{DispatchCall, MemoryDispatcher, TriggerDispatcher};
pub use goals::{ContributionOutcome, GoalService};
pub use lifecycle::ReminderLifecycle;
pub use orchestrator::{
    format_amount, habit_reminder_id, payday_reminder_id, recurring_reminder_id,
    streak_reminder_id, HabitReminder, RecurringTransaction, ReminderOrchestrator,
    AI_RECOMMENDATION_ID, DAILY_EXPENSE_ID, MONTHLY_REPORT_ID, WEEKLY_REPORT_ID,
};
pub use settings::ReminderSettings;
pub use store::{
    paths, require_user, DocumentStore, MemoryStore, Order, Query, SetOptions, TxnFn, TxnOutcome,
};
