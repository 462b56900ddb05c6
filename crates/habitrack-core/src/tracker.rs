//! Habit tracker: the fetch → compute → rank cycle for one user.
//!
//! `HabitTracker` sits between a [`CompletionStore`] and whatever presents
//! the results. It owns no cached state of its own; every query re-reads
//! the store and recomputes from raw completion history.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::config::StreakConfig;
use crate::error::{ConfigError, Result};
use crate::habit::{CompletionEvent, Habit, NewHabit};
use crate::store::{ChangeEvent, CompletionStore};
use crate::streak::{rank_habits, RankedHabit, StreakEngine, TieBreak};
use crate::timestamp::DayWindow;

/// A habit whose cached `streak_count` disagrees with its recomputed streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakDrift {
    pub habit_id: String,
    pub title: String,
    pub cached: u32,
    pub recomputed: u32,
}

pub struct HabitTracker<S> {
    store: S,
    owner: String,
    engine: StreakEngine,
    tie_break: TieBreak,
}

impl<S: CompletionStore> HabitTracker<S> {
    /// Tracker with the default engine and tie-break.
    pub fn new(store: S, owner: impl Into<String>) -> Self {
        Self {
            store,
            owner: owner.into(),
            engine: StreakEngine::default(),
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_config(
        store: S,
        owner: impl Into<String>,
        config: &StreakConfig,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            store,
            owner: owner.into(),
            engine: config.engine()?,
            tie_break: config.tie_break,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &StreakEngine {
        &self.engine
    }

    /// Validate and store a new habit owned by this user.
    pub fn add_habit(&self, new_habit: NewHabit) -> Result<Habit> {
        let habit = new_habit.into_habit(Uuid::new_v4().to_string(), self.owner.clone())?;
        self.store.insert_habit(habit.clone())?;
        tracing::info!(habit_id = %habit.id, frequency = %habit.frequency, "habit created");
        Ok(habit)
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        self.store.delete_habit(&self.owner, habit_id)?;
        tracing::info!(habit_id, "habit deleted");
        Ok(())
    }

    /// Record a completion at `now`.
    ///
    /// At most one completion per habit per local day (as seen from `now`'s
    /// timezone). On success the habit's cached `streak_count` is bumped and
    /// `last_completed` set to `now`. The day check and both writes go
    /// through [`CompletionStore::record_completion`].
    ///
    /// # Errors
    /// [`StoreError::NotFound`](crate::error::StoreError::NotFound) for an
    /// unknown habit, [`StoreError::AlreadyCompleted`](crate::error::StoreError::AlreadyCompleted)
    /// if today's window already has one.
    pub fn complete_habit<Tz: TimeZone>(
        &self,
        habit_id: &str,
        now: &DateTime<Tz>,
    ) -> Result<CompletionEvent> {
        let window = DayWindow::local_day(now);
        let event = CompletionEvent {
            id: Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            owner: self.owner.clone(),
            completed_at: now.with_timezone(&Utc),
        };

        let habit = self
            .store
            .record_completion(event.clone(), window)
            .inspect_err(|e| tracing::debug!(habit_id, error = %e, "completion rejected"))?;

        tracing::info!(habit_id, streak_count = habit.streak_count, "habit completed");
        Ok(event)
    }

    /// Ids of habits with a completion inside `now`'s local day.
    pub fn completed_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<BTreeSet<String>> {
        let window = DayWindow::local_day(now);
        let events = self.store.list_completions(&self.owner, Some(window.start))?;
        Ok(events
            .into_iter()
            .filter(|e| window.contains(e.completed_at))
            .map(|e| e.habit_id)
            .collect())
    }

    /// Re-read habits and completions, recompute stats, and rank by best streak.
    pub fn refresh(&self) -> Result<Vec<RankedHabit>> {
        let habits = self.store.list_habits(&self.owner)?;
        let completions = self.store.list_completions(&self.owner, None)?;
        let stats = self.engine.compute_all(&habits, &completions);
        Ok(rank_habits(stats, self.tie_break))
    }

    /// Habits whose cached counter differs from the recomputed current streak.
    ///
    /// Read-only: the cache is never rewritten here.
    pub fn drift(&self) -> Result<Vec<StreakDrift>> {
        let habits = self.store.list_habits(&self.owner)?;
        let completions = self.store.list_completions(&self.owner, None)?;

        let drifted: Vec<StreakDrift> = self
            .engine
            .compute_all(&habits, &completions)
            .into_iter()
            .filter(|(habit, stats)| habit.streak_count != stats.current_streak)
            .map(|(habit, stats)| StreakDrift {
                habit_id: habit.id,
                title: habit.title,
                cached: habit.streak_count,
                recomputed: stats.current_streak,
            })
            .collect();

        for d in &drifted {
            tracing::warn!(
                habit_id = %d.habit_id,
                cached = d.cached,
                recomputed = d.recomputed,
                "streak_count drifted from completion history"
            );
        }
        Ok(drifted)
    }

    /// Consume a change feed, refreshing on every change that belongs to
    /// this user and handing the new ranking to `on_refresh`.
    ///
    /// Refresh failures are logged and the watch continues. A lagged
    /// receiver triggers one catch-up refresh. Returns the number of
    /// refreshes delivered once the feed closes.
    pub async fn watch<F>(
        &self,
        mut changes: broadcast::Receiver<ChangeEvent>,
        mut on_refresh: F,
    ) -> usize
    where
        F: FnMut(Vec<RankedHabit>),
    {
        let mut delivered = 0;
        loop {
            match changes.recv().await {
                Ok(change) => {
                    if change.owner != self.owner {
                        continue;
                    }
                    tracing::debug!(
                        kind = ?change.kind,
                        collection = ?change.collection,
                        record_id = %change.record_id,
                        "change received"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed lagged; refreshing once");
                }
                Err(RecvError::Closed) => break,
            }

            match self.refresh() {
                Ok(ranked) => {
                    delivered += 1;
                    on_refresh(ranked);
                }
                Err(e) => tracing::warn!(error = %e, "refresh after change failed"),
            }
        }
        tracing::info!(refreshes = delivered, "change feed closed");
        delivered
    }
}
