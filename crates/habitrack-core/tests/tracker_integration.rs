//! Integration tests for the habit tracker.
//!
//! Tests the full workflow from backend documents through the store and
//! tracker to the ranked leaderboard, plus change-feed driven refreshes.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use habitrack_core::habit::{parse_completions, parse_habits};
use habitrack_core::{
    ChangeEvent, ChangeFeed, ChangeKind, Collection, CompletionRecord, CoreError, Frequency,
    HabitRecord, HabitTracker, MemoryStore, NewHabit, RankedHabit, ValidationError,
};
use tokio::sync::broadcast;

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
}

fn habit_doc(id: &str, title: &str, streak_count: u32) -> HabitRecord {
    HabitRecord {
        id: id.into(),
        user_id: "alice".into(),
        title: title.into(),
        description: format!("{title} every day"),
        frequency: "daily".into(),
        streak_count,
        last_completed: None,
    }
}

fn completion_doc(id: &str, habit_id: &str, at: &str) -> CompletionRecord {
    CompletionRecord {
        id: id.into(),
        user_id: "alice".into(),
        habit_id: habit_id.into(),
        completed_at: at.into(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_documents_to_leaderboard() {
    init_tracing();

    let habits = parse_habits(vec![
        habit_doc("meditate", "Meditate", 2),
        habit_doc("read", "Read", 3),
        habit_doc("run", "Run", 1),
    ])
    .unwrap();

    let completions = parse_completions(vec![
        // read: three exact days
        completion_doc("r1", "read", "2024-01-01T08:00Z"),
        completion_doc("r2", "read", "2024-01-02T08:00Z"),
        completion_doc("r3", "read", "2024-01-03T08:00Z"),
        // meditate: 2024-01-01, 01-02, 01-05, 01-06
        completion_doc("m1", "meditate", "2024-01-01"),
        completion_doc("m2", "meditate", "2024-01-02"),
        completion_doc("m3", "meditate", "2024-01-05"),
        completion_doc("m4", "meditate", "2024-01-06"),
        // run: a single day
        completion_doc("x1", "run", "2024-01-04T06:30:00.000Z"),
    ])
    .unwrap();

    let tracker = HabitTracker::new(MemoryStore::with_records(habits, completions), "alice");
    let ranked = tracker.refresh().unwrap();

    let order: Vec<(&str, u32, u32, u32)> = ranked
        .iter()
        .map(|r| {
            (
                r.habit.id.as_str(),
                r.stats.current_streak,
                r.stats.best_streak,
                r.stats.total_completions,
            )
        })
        .collect();
    assert_eq!(
        order,
        [("read", 3, 3, 3), ("meditate", 2, 2, 4), ("run", 1, 1, 1)]
    );

    // Seeded caches agree with the recomputed current streaks.
    assert!(tracker.drift().unwrap().is_empty());
}

#[test]
fn test_malformed_document_is_rejected_with_id() {
    let err = parse_completions(vec![
        completion_doc("ok", "read", "2024-01-01T08:00:00Z"),
        completion_doc("bad-7", "read", "1704096000"),
    ])
    .unwrap_err();

    assert!(matches!(
        err,
        ValidationError::InvalidTimestamp { ref record_id, .. } if record_id == "bad-7"
    ));
    let core: CoreError = err.into();
    assert!(core.to_string().contains("bad-7"));
}

#[test]
fn test_ties_use_habit_id_by_default() {
    let habits =
        parse_habits(vec![habit_doc("b", "Bravo", 0), habit_doc("a", "Alpha", 0)]).unwrap();
    let tracker = HabitTracker::new(MemoryStore::with_records(habits, Vec::new()), "alice");

    let ids: Vec<String> = tracker
        .refresh()
        .unwrap()
        .into_iter()
        .map(|r| r.habit.id)
        .collect();
    assert_eq!(ids, ["a", "b"]);
}

#[tokio::test]
async fn test_watch_refreshes_on_own_changes_only() {
    let store = Arc::new(MemoryStore::new());
    let tracker = HabitTracker::new(Arc::clone(&store), "alice");
    let habit = tracker
        .add_habit(NewHabit::new("Read", "10 pages", Frequency::Daily))
        .unwrap();

    let (tx, rx) = broadcast::channel(16);
    tx.send(ChangeEvent {
        kind: ChangeKind::Create,
        collection: Collection::Completions,
        owner: "bob".into(),
        record_id: "someone-else".into(),
    })
    .unwrap();
    tx.send(ChangeEvent {
        kind: ChangeKind::Update,
        collection: Collection::Habits,
        owner: "alice".into(),
        record_id: habit.id.clone(),
    })
    .unwrap();
    drop(tx);

    let mut seen: Vec<Vec<RankedHabit>> = Vec::new();
    let delivered = tracker.watch(rx, |ranked| seen.push(ranked)).await;

    assert_eq!(delivered, 1);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].habit.id, habit.id);
}

#[tokio::test]
async fn test_watch_catches_up_after_lag() {
    let tracker = HabitTracker::new(MemoryStore::new(), "alice");

    let (tx, rx) = broadcast::channel(1);
    for i in 0..3 {
        tx.send(ChangeEvent {
            kind: ChangeKind::Create,
            collection: Collection::Habits,
            owner: "alice".into(),
            record_id: format!("h{i}"),
        })
        .unwrap();
    }
    drop(tx);

    // One refresh for the lag notice, one for the surviving event.
    let delivered = tracker.watch(rx, |_| {}).await;
    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn test_store_feed_drives_refresh() {
    let store = Arc::new(MemoryStore::new());
    let rx = store.subscribe();
    let tracker = HabitTracker::new(Arc::clone(&store), "alice");

    let habit = tracker
        .add_habit(NewHabit::new("Stretch", "5 minutes", Frequency::Daily))
        .unwrap();
    tracker.complete_habit(&habit.id, &at(1, 7)).unwrap();
    tracker.complete_habit(&habit.id, &at(2, 19)).unwrap();

    let mut last_best = 0;
    let mut refreshes = 0;
    // The store keeps its sender alive, so bound the watch in time.
    let _ = tokio::time::timeout(
        std::time::Duration::from_millis(200),
        tracker.watch(rx, |ranked| {
            refreshes += 1;
            last_best = ranked[0].stats.best_streak;
        }),
    )
    .await;

    // create habit, then (completion + habit update) twice
    assert_eq!(refreshes, 5);
    assert_eq!(last_best, 2);
}
