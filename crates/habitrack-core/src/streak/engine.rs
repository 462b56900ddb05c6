//! Streak computation over a habit's completion history.
//!
//! A streak is a maximal run of completions where each completion follows
//! the previous one by at most `tolerance_days` (fractional days, inclusive).
//! The default tolerance of 1.5 days lets a daily habit done one morning and
//! the following evening still count as consecutive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;
use crate::habit::{CompletionEvent, Habit};

/// Default gap threshold between consecutive completions, in days.
pub const DEFAULT_TOLERANCE_DAYS: f64 = 1.5;

const NANOS_PER_DAY: f64 = 86_400_000_000_000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Streak statistics derived from a habit's completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Run length still alive as of the most recent completion
    pub current_streak: u32,
    /// Longest run ever observed
    pub best_streak: u32,
    /// Number of completions
    pub total_completions: u32,
}

/// Stateless streak calculator.
///
/// Holds only the gap tolerance; every method is a pure function of its
/// arguments, so one engine can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakEngine {
    tolerance_days: f64,
}

impl Default for StreakEngine {
    fn default() -> Self {
        Self {
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
        }
    }
}

impl StreakEngine {
    /// Create an engine with the default 1.5-day tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom tolerance.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidValue`] if `tolerance_days` is
    /// negative, NaN or infinite.
    pub fn with_tolerance(tolerance_days: f64) -> Result<Self, ValidationError> {
        if !tolerance_days.is_finite() || tolerance_days < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "tolerance_days".to_string(),
                message: format!(
                    "must be a finite, non-negative number of days, got {tolerance_days}"
                ),
            });
        }
        Ok(Self { tolerance_days })
    }

    pub fn tolerance_days(&self) -> f64 {
        self.tolerance_days
    }

    /// Compute streak statistics for one habit's completions.
    ///
    /// Input order does not matter; events are sorted by `completed_at`
    /// internally. Callers are expected to pass events for a single habit;
    /// use [`StreakEngine::compute_streak_checked`] to enforce that.
    pub fn compute_streak(&self, events: &[CompletionEvent]) -> StreakStats {
        self.compute_from_instants(events.iter().map(|e| e.completed_at))
    }

    /// Like [`StreakEngine::compute_streak`], but rejects events that belong
    /// to another habit or another owner.
    ///
    /// # Errors
    /// Returns the first mismatching record as
    /// [`ValidationError::HabitMismatch`] or [`ValidationError::OwnerMismatch`].
    pub fn compute_streak_checked(
        &self,
        habit: &Habit,
        events: &[CompletionEvent],
    ) -> Result<StreakStats, ValidationError> {
        for event in events {
            if event.habit_id != habit.id {
                return Err(ValidationError::HabitMismatch {
                    record_id: event.id.clone(),
                    expected: habit.id.clone(),
                    found: event.habit_id.clone(),
                });
            }
            if event.owner != habit.owner {
                return Err(ValidationError::OwnerMismatch {
                    record_id: event.id.clone(),
                    expected: habit.owner.clone(),
                    found: event.owner.clone(),
                });
            }
        }
        Ok(self.compute_streak(events))
    }

    /// Core walk over raw instants.
    pub fn compute_from_instants<I>(&self, instants: I) -> StreakStats
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut times: Vec<DateTime<Utc>> = instants.into_iter().collect();
        if times.is_empty() {
            return StreakStats::default();
        }
        times.sort();

        let mut run_length: u32 = 0;
        let mut best_streak: u32 = 0;
        let mut previous: Option<DateTime<Utc>> = None;

        for &instant in &times {
            run_length = match previous {
                Some(prev) if self.continues_run(prev, instant) => run_length.saturating_add(1),
                _ => 1,
            };
            best_streak = best_streak.max(run_length);
            previous = Some(instant);
        }

        StreakStats {
            current_streak: run_length,
            best_streak,
            total_completions: u32::try_from(times.len()).unwrap_or(u32::MAX),
        }
    }

    /// Compute stats for every habit, grouping `events` by habit id.
    ///
    /// Events whose habit is not in `habits` are ignored. Output preserves
    /// the order of `habits`.
    pub fn compute_all(
        &self,
        habits: &[Habit],
        events: &[CompletionEvent],
    ) -> Vec<(Habit, StreakStats)> {
        let mut by_habit: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
        for event in events {
            by_habit
                .entry(event.habit_id.as_str())
                .or_default()
                .push(event.completed_at);
        }

        let results: Vec<(Habit, StreakStats)> = habits
            .iter()
            .map(|habit| {
                let stats = by_habit
                    .remove(habit.id.as_str())
                    .map(|times| self.compute_from_instants(times))
                    .unwrap_or_default();
                (habit.clone(), stats)
            })
            .collect();

        if !by_habit.is_empty() {
            tracing::debug!(
                orphaned_habits = by_habit.len(),
                "ignoring completions for habits not in the current set"
            );
        }
        tracing::debug!(
            habits = results.len(),
            completions = events.len(),
            tolerance_days = self.tolerance_days,
            "computed streak stats"
        );

        results
    }

    /// Gap in fractional days, compared inclusively against the tolerance.
    fn continues_run(&self, previous: DateTime<Utc>, next: DateTime<Utc>) -> bool {
        gap_days(previous, next) <= self.tolerance_days
    }
}

/// Signed difference `next - previous` in fractional days.
///
/// Nanosecond resolution; gaps too large for an `i64` of nanoseconds
/// (about 292 years) fall back to milliseconds.
pub fn gap_days(previous: DateTime<Utc>, next: DateTime<Utc>) -> f64 {
    let delta = next - previous;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_DAY,
        None => delta.num_milliseconds() as f64 / MILLIS_PER_DAY,
    }
}

/// Whether any event's `completed_at` lies in `[window_start, window_end)`.
pub fn is_completed_in_window(
    events: &[CompletionEvent],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    events
        .iter()
        .any(|e| window_start <= e.completed_at && e.completed_at < window_end)
}
