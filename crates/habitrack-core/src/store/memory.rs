//! In-memory completion store with a broadcast change feed.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeFeed, ChangeKind, Collection, CompletionStore};
use crate::error::StoreError;
use crate::habit::{CompletionEvent, Habit};
use crate::timestamp::DayWindow;

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Tables {
    habits: Vec<Habit>,
    completions: Vec<CompletionEvent>,
}

/// Thread-safe store backed by two vectors.
///
/// Every mutation is published on the change feed after the write lands.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    feed: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            feed,
        }
    }

    /// Seed the store without publishing change events.
    ///
    /// Habit ids are unique: a later habit reusing an id already seeded is
    /// dropped with a warning.
    pub fn with_records(habits: Vec<Habit>, completions: Vec<CompletionEvent>) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.lock() {
            for habit in habits {
                if tables.habits.iter().any(|h| h.id == habit.id) {
                    tracing::warn!(habit_id = %habit.id, "dropping seeded habit with duplicate id");
                    continue;
                }
                tables.habits.push(habit);
            }
            tables.completions = completions;
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn publish(&self, kind: ChangeKind, collection: Collection, owner: &str, record_id: &str) {
        // No subscribers is fine.
        let _ = self.feed.send(ChangeEvent {
            kind,
            collection,
            owner: owner.to_string(),
            record_id: record_id.to_string(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

impl CompletionStore for MemoryStore {
    fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .habits
            .iter()
            .filter(|h| h.owner == owner)
            .cloned()
            .collect())
    }

    fn get_habit(&self, owner: &str, habit_id: &str) -> Result<Habit, StoreError> {
        let tables = self.lock()?;
        tables
            .habits
            .iter()
            .find(|h| h.id == habit_id && h.owner == owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(habit_id.to_string()))
    }

    fn list_completions(
        &self,
        owner: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CompletionEvent>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .completions
            .iter()
            .filter(|c| c.owner == owner)
            .filter(|c| since.map_or(true, |s| c.completed_at >= s))
            .cloned()
            .collect())
    }

    fn insert_habit(&self, habit: Habit) -> Result<(), StoreError> {
        let (owner, id) = (habit.owner.clone(), habit.id.clone());
        {
            let mut tables = self.lock()?;
            if tables.habits.iter().any(|h| h.id == id) {
                return Err(StoreError::Duplicate(id));
            }
            tables.habits.push(habit);
        }
        self.publish(ChangeKind::Create, Collection::Habits, &owner, &id);
        Ok(())
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        {
            let mut tables = self.lock()?;
            let slot = tables
                .habits
                .iter_mut()
                .find(|h| h.id == habit.id && h.owner == habit.owner)
                .ok_or_else(|| StoreError::NotFound(habit.id.clone()))?;
            *slot = habit.clone();
        }
        self.publish(ChangeKind::Update, Collection::Habits, &habit.owner, &habit.id);
        Ok(())
    }

    fn delete_habit(&self, owner: &str, habit_id: &str) -> Result<(), StoreError> {
        {
            let mut tables = self.lock()?;
            let before = tables.habits.len();
            tables
                .habits
                .retain(|h| !(h.id == habit_id && h.owner == owner));
            if tables.habits.len() == before {
                return Err(StoreError::NotFound(habit_id.to_string()));
            }
            tables
                .completions
                .retain(|c| !(c.habit_id == habit_id && c.owner == owner));
        }
        self.publish(ChangeKind::Delete, Collection::Habits, owner, habit_id);
        Ok(())
    }

    fn insert_completion(&self, event: CompletionEvent) -> Result<(), StoreError> {
        let (owner, id) = (event.owner.clone(), event.id.clone());
        {
            let mut tables = self.lock()?;
            let habit_owned = tables
                .habits
                .iter()
                .any(|h| h.id == event.habit_id && h.owner == event.owner);
            if !habit_owned {
                return Err(StoreError::NotFound(event.habit_id.clone()));
            }
            tables.completions.push(event);
        }
        self.publish(ChangeKind::Create, Collection::Completions, &owner, &id);
        Ok(())
    }

    fn record_completion(
        &self,
        event: CompletionEvent,
        window: DayWindow,
    ) -> Result<Habit, StoreError> {
        let (owner, id) = (event.owner.clone(), event.id.clone());
        let habit = {
            let mut tables = self.lock()?;
            let Tables { habits, completions } = &mut *tables;

            let habit = habits
                .iter_mut()
                .find(|h| h.id == event.habit_id && h.owner == event.owner)
                .ok_or_else(|| StoreError::NotFound(event.habit_id.clone()))?;
            let done = completions.iter().any(|c| {
                c.habit_id == event.habit_id
                    && c.owner == event.owner
                    && window.contains(c.completed_at)
            });
            if done {
                return Err(StoreError::AlreadyCompleted {
                    habit_id: event.habit_id,
                });
            }

            habit.streak_count = habit.streak_count.saturating_add(1);
            habit.last_completed = Some(event.completed_at);
            let updated = habit.clone();
            completions.push(event);
            updated
        };
        self.publish(ChangeKind::Create, Collection::Completions, &owner, &id);
        self.publish(ChangeKind::Update, Collection::Habits, &owner, &habit.id);
        Ok(habit)
    }
}
