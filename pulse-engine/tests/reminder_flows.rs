use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use pulse_core::{parse_zone, Frequency, HabitSeed, RepeatFrequency, TimeOfDay};
use pulse_engine::{
    CheckInService, DispatchCall, DocumentStore, HabitReminder, MemoryDispatcher, MemoryStore,
    RecurringTransaction, ReminderLifecycle, ReminderOrchestrator, ReminderSettings, SetOptions,
};
use serde_json::json;

struct Harness {
    dispatcher: Arc<MemoryDispatcher>,
    store: Arc<MemoryStore>,
    check_ins: CheckInService,
    orchestrator: ReminderOrchestrator,
}

fn chicago() -> Tz {
    parse_zone("America/Chicago").unwrap()
}

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Friday 2026-02-20, 06:00 in Chicago.
fn friday_morning() -> DateTime<Utc> {
    utc(2026, 2, 20, 12, 0)
}

fn harness(settings: ReminderSettings) -> Harness {
    let dispatcher = Arc::new(MemoryDispatcher::new());
    let store = Arc::new(MemoryStore::signed_in("u1"));
    let check_ins = CheckInService::new(store.clone()).with_reread_delay(Duration::ZERO);
    let lifecycle = ReminderLifecycle::new(dispatcher.clone(), store.clone());
    let orchestrator = ReminderOrchestrator::new(lifecycle, check_ins.clone(), settings, chicago());
    Harness {
        dispatcher,
        store,
        check_ins,
        orchestrator,
    }
}

fn workout(weekdays: Option<Vec<Weekday>>) -> HabitReminder {
    HabitReminder {
        habit_id: "h1".into(),
        name: "Workout".into(),
        time: TimeOfDay::at(6, 0),
        weekdays,
    }
}

#[tokio::test]
async fn habit_on_selected_weekdays_gets_one_trigger_per_day() {
    let h = harness(ReminderSettings::default());
    let days = vec![Weekday::Mon, Weekday::Wed, Weekday::Fri];
    let handles = h
        .orchestrator
        .schedule_habit_reminder(&workout(Some(days)), friday_morning())
        .await;
    assert_eq!(handles.len(), 3);

    let live = h.dispatcher.live_triggers().await;
    let ids: Vec<&str> = live.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["habit-h1-1", "habit-h1-3", "habit-h1-5"]);
    assert!(live.iter().all(|t| t.repeat == RepeatFrequency::Weekly));

    // 05:55 local; today's slot has already passed so Friday rolls to next week
    assert_eq!(live[0].fire_at, utc(2026, 2, 23, 11, 55));
    assert_eq!(live[1].fire_at, utc(2026, 2, 25, 11, 55));
    assert_eq!(live[2].fire_at, utc(2026, 2, 27, 11, 55));
}

#[tokio::test]
async fn switching_habit_from_weekdays_to_daily_leaves_only_the_daily_trigger() {
    let h = harness(ReminderSettings::default());
    h.orchestrator
        .schedule_habit_reminder(&workout(Some(vec![Weekday::Mon, Weekday::Thu])), friday_morning())
        .await;
    h.orchestrator
        .schedule_habit_reminder(&workout(None), friday_morning())
        .await;

    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "habit-h1");
    assert_eq!(live[0].repeat, RepeatFrequency::Daily);
    assert_eq!(live[0].fire_at, utc(2026, 2, 21, 11, 55));
}

#[tokio::test]
async fn rescheduling_is_idempotent() {
    let h = harness(ReminderSettings::default());
    for _ in 0..3 {
        h.orchestrator.schedule_ai_recommendation_reminder(friday_morning()).await;
        h.orchestrator.schedule_weekly_report(friday_morning()).await;
    }
    let live = h.dispatcher.live_triggers().await;
    let ids: Vec<&str> = live.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["ai-recommendation", "weekly-report-1"]);
    assert_eq!(h.orchestrator.lifecycle().list_pending().await.unwrap().len(), 2);
}

#[tokio::test]
async fn expense_reminder_fires_tonight_when_nothing_checked_in() {
    let h = harness(ReminderSettings::default());
    h.orchestrator.schedule_daily_expense_reminder(friday_morning()).await;

    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "daily-expense");
    assert_eq!(live[0].fire_at, utc(2026, 2, 21, 2, 0));
}

#[tokio::test]
async fn expense_reminder_skips_today_after_a_check_in() {
    let h = harness(ReminderSettings::default());
    h.store
        .set("users/u1/habits/h1", json!({"id": "h1"}), SetOptions::default())
        .await
        .unwrap();
    h.check_ins
        .toggle_today("h1", HabitSeed::default(), chicago(), friday_morning())
        .await
        .unwrap();

    h.orchestrator.schedule_daily_expense_reminder(friday_morning()).await;
    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    // Saturday 20:00 local
    assert_eq!(live[0].fire_at, utc(2026, 2, 22, 2, 0));
}

#[tokio::test]
async fn deleting_a_habit_cancels_its_reminders() {
    let h = harness(ReminderSettings::default());
    h.orchestrator
        .schedule_habit_reminder(&workout(Some(vec![Weekday::Tue, Weekday::Sat])), friday_morning())
        .await;
    assert_eq!(h.dispatcher.live_triggers().await.len(), 2);

    h.orchestrator.cancel_habit_reminders("h1").await;
    assert!(h.dispatcher.live_triggers().await.is_empty());
    assert!(h.orchestrator.lifecycle().list_pending().await.unwrap().is_empty());

    let calls = h.dispatcher.calls().await;
    assert!(calls.contains(&DispatchCall::CancelTrigger("streak-h1-6".into())));
}

#[tokio::test]
async fn recurring_reminder_targets_the_next_future_due_date() {
    let h = harness(ReminderSettings::default());
    let rent = RecurringTransaction {
        id: "rent".into(),
        name: "Rent".into(),
        amount: 150_000,
        next_due: NaiveDate::from_ymd_opt(2026, 2, 22).unwrap(),
        frequency: Frequency::Monthly,
        reminder_days: 3,
    };
    h.orchestrator
        .schedule_recurring_transaction_reminder(&rent, friday_morning())
        .await;

    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "recurring-rent");
    assert_eq!(live[0].repeat, RepeatFrequency::None);
    // Feb 19 is already past; Mar 22 minus three days, 09:00 CDT
    assert_eq!(live[0].fire_at, utc(2026, 3, 19, 14, 0));
    assert_eq!(live[0].content.body, "Rent of 1500.00 is due in 3 days.");

    h.orchestrator.cancel_recurring_transaction_reminder("rent").await;
    assert!(h.dispatcher.live_triggers().await.is_empty());
}

#[tokio::test]
async fn payday_reminders_replace_the_previous_set() {
    let h = harness(ReminderSettings {
        paydays: vec![5, 10],
        ..ReminderSettings::default()
    });
    h.orchestrator.schedule_goal_payday_reminders(friday_morning()).await;

    let h2 = ReminderOrchestrator::new(
        h.orchestrator.lifecycle().clone(),
        h.check_ins.clone(),
        ReminderSettings {
            paydays: vec![15],
            ..ReminderSettings::default()
        },
        chicago(),
    );
    h2.schedule_goal_payday_reminders(friday_morning()).await;

    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "goal-payday-15");
    assert_eq!(live[0].fire_at, utc(2026, 3, 15, 14, 0));
}

#[tokio::test]
async fn rearm_schedules_monthly_one_shots() {
    let h = harness(ReminderSettings {
        paydays: vec![5, 10],
        ..ReminderSettings::default()
    });
    let handles = h.orchestrator.rearm_one_shots(friday_morning()).await;
    assert_eq!(handles.len(), 3);

    let live = h.dispatcher.live_triggers().await;
    let fire = |id: &str| live.iter().find(|t| t.id == id).map(|t| t.fire_at);
    assert_eq!(fire("monthly-report"), Some(utc(2026, 3, 1, 15, 0)));
    assert_eq!(fire("goal-payday-5"), Some(utc(2026, 3, 5, 15, 0)));
    // After the March DST switch
    assert_eq!(fire("goal-payday-10"), Some(utc(2026, 3, 10, 14, 0)));
    assert!(live.iter().all(|t| t.repeat == RepeatFrequency::None));
}

#[tokio::test]
async fn streak_reminder_only_while_streak_is_at_risk() {
    let h = harness(ReminderSettings::default());
    let thursday = NaiveDate::from_ymd_opt(2026, 2, 19).unwrap();
    let seed = HabitSeed {
        target: 10,
        current_streak: 4,
        best_streak: 4,
    };
    h.check_ins.toggle("h1", thursday, seed).await.unwrap();

    h.orchestrator
        .schedule_streak_reminder("h1", "Workout", friday_morning())
        .await;
    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "streak-h1");
    assert_eq!(live[0].fire_at, utc(2026, 2, 21, 3, 0));
    assert_eq!(live[0].content.title, "Keep your 5-day streak");

    // Checking in today removes the risk
    let today_seed = h
        .check_ins
        .seed_from_history("h1", 10, NaiveDate::from_ymd_opt(2026, 2, 20).unwrap())
        .await
        .unwrap();
    h.check_ins
        .toggle_today("h1", today_seed, chicago(), friday_morning())
        .await
        .unwrap();
    h.orchestrator
        .schedule_streak_reminder("h1", "Workout", friday_morning())
        .await;
    assert!(h.dispatcher.live_triggers().await.is_empty());
}

#[tokio::test]
async fn denied_permission_schedules_nothing_and_does_not_panic() {
    let h = harness(ReminderSettings::default());
    h.dispatcher.deny_permission().await;
    let handles = h.orchestrator.schedule_monthly_report(friday_morning()).await;
    assert!(handles.is_empty());
    assert!(h.dispatcher.live_triggers().await.is_empty());
}

#[tokio::test]
async fn paydays_past_the_28th_are_clamped_and_replaced() {
    let h = harness(ReminderSettings {
        paydays: vec![28, 30],
        ..ReminderSettings::default()
    });
    h.orchestrator.schedule_goal_payday_reminders(friday_morning()).await;
    let live = h.dispatcher.live_triggers().await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "goal-payday-28");

    let moved = ReminderOrchestrator::new(
        h.orchestrator.lifecycle().clone(),
        h.check_ins.clone(),
        ReminderSettings {
            paydays: vec![5],
            ..ReminderSettings::default()
        },
        chicago(),
    );
    moved.schedule_goal_payday_reminders(friday_morning()).await;
    let ids: Vec<String> = h.dispatcher.live_triggers().await.into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["goal-payday-5"]);
}

#[tokio::test]
async fn habit_ids_that_look_like_weekday_variants_are_refused() {
    let h = harness(ReminderSettings::default());
    h.orchestrator
        .schedule_habit_reminder(&workout(None), friday_morning())
        .await;
    let clashing = HabitReminder {
        habit_id: "h1-1".into(),
        ..workout(None)
    };
    let handles = h
        .orchestrator
        .schedule_habit_reminder(&clashing, friday_morning())
        .await;
    assert!(handles.is_empty());

    let ids: Vec<String> = h.dispatcher.live_triggers().await.into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["habit-h1"]);
}
