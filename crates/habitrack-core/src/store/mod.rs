//! Completion store seam.
//!
//! The real store is a hosted document database reached through its SDK;
//! this crate only defines the shape it must have ([`CompletionStore`]) and
//! the realtime change notifications it emits ([`ChangeEvent`]).
//! [`MemoryStore`] implements both in-process for tests and offline use.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::habit::{CompletionEvent, Habit};
use crate::streak::is_completed_in_window;
use crate::timestamp::DayWindow;

/// Source of habits and completions for one user.
///
/// Every read is scoped by `owner`; implementations must never return
/// another user's records.
pub trait CompletionStore {
    fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError>;

    fn get_habit(&self, owner: &str, habit_id: &str) -> Result<Habit, StoreError>;

    /// Completions for `owner`, optionally only those at or after `since`.
    fn list_completions(
        &self,
        owner: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CompletionEvent>, StoreError>;

    /// Completions for a single habit.
    fn list_habit_completions(
        &self,
        owner: &str,
        habit_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CompletionEvent>, StoreError> {
        let mut events = self.list_completions(owner, since)?;
        events.retain(|e| e.habit_id == habit_id);
        Ok(events)
    }

    fn insert_habit(&self, habit: Habit) -> Result<(), StoreError>;

    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError>;

    /// Remove a habit together with its completions.
    fn delete_habit(&self, owner: &str, habit_id: &str) -> Result<(), StoreError>;

    fn insert_completion(&self, event: CompletionEvent) -> Result<(), StoreError>;

    /// Store `event` unless its habit already has a completion in `window`,
    /// then bump the habit's cached `streak_count` and set `last_completed`.
    ///
    /// Returns the updated habit. The default runs the check and both writes
    /// one after another; stores that can do them under one lock or
    /// transaction should override it.
    fn record_completion(
        &self,
        event: CompletionEvent,
        window: DayWindow,
    ) -> Result<Habit, StoreError> {
        let mut habit = self.get_habit(&event.owner, &event.habit_id)?;
        let today = self.list_habit_completions(&event.owner, &event.habit_id, Some(window.start))?;
        if is_completed_in_window(&today, window.start, window.end) {
            return Err(StoreError::AlreadyCompleted {
                habit_id: event.habit_id,
            });
        }

        habit.streak_count = habit.streak_count.saturating_add(1);
        habit.last_completed = Some(event.completed_at);
        self.insert_completion(event)?;
        self.update_habit(&habit)?;
        Ok(habit)
    }
}

/// Stores that push realtime change notifications.
pub trait ChangeFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

impl<T: CompletionStore + ?Sized> CompletionStore for Arc<T> {
    fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, StoreError> {
        (**self).list_habits(owner)
    }

    fn get_habit(&self, owner: &str, habit_id: &str) -> Result<Habit, StoreError> {
        (**self).get_habit(owner, habit_id)
    }

    fn list_completions(
        &self,
        owner: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CompletionEvent>, StoreError> {
        (**self).list_completions(owner, since)
    }

    fn list_habit_completions(
        &self,
        owner: &str,
        habit_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CompletionEvent>, StoreError> {
        (**self).list_habit_completions(owner, habit_id, since)
    }

    fn insert_habit(&self, habit: Habit) -> Result<(), StoreError> {
        (**self).insert_habit(habit)
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        (**self).update_habit(habit)
    }

    fn delete_habit(&self, owner: &str, habit_id: &str) -> Result<(), StoreError> {
        (**self).delete_habit(owner, habit_id)
    }

    fn insert_completion(&self, event: CompletionEvent) -> Result<(), StoreError> {
        (**self).insert_completion(event)
    }

    fn record_completion(
        &self,
        event: CompletionEvent,
        window: DayWindow,
    ) -> Result<Habit, StoreError> {
        (**self).record_completion(event, window)
    }
}

impl<T: ChangeFeed + ?Sized> ChangeFeed for Arc<T> {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        (**self).subscribe()
    }
}

/// Kind of document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    /// Map a backend event name such as
    /// `databases.*.collections.*.documents.*.create` to its kind.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.rsplit('.').next()? {
            "create" => Some(ChangeKind::Create),
            "update" => Some(ChangeKind::Update),
            "delete" => Some(ChangeKind::Delete),
            _ => None,
        }
    }

    /// First recognised kind in a list of event names.
    pub fn from_event_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        names.iter().find_map(|n| Self::from_event_name(n.as_ref()))
    }
}

/// Which collection a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Habits,
    Completions,
}

/// A realtime notification that a document changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub collection: Collection,
    pub owner: String,
    pub record_id: String,
}
