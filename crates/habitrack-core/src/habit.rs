//! Habit and completion types.
//!
//! Two layers live here: the raw records exactly as the backend's document
//! store returns them (string timestamps, string frequency), and the typed
//! [`Habit`] / [`CompletionEvent`] the rest of the crate works with.
//! Conversion is the only place timestamps are parsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::timestamp::parse_timestamp;

/// How often a habit is meant to be done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Capitalised form for badges.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(ValidationError::InvalidFrequency(s.to_string())),
        }
    }
}

/// A user-defined recurring task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub owner: String,
    /// Cached current streak. Recomputed stats win when the two disagree.
    pub streak_count: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

/// A single timestamped completion of a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: String,
    pub habit_id: String,
    pub owner: String,
    pub completed_at: DateTime<Utc>,
}

/// Form input for creating a habit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHabit {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
}

impl NewHabit {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        frequency: Frequency,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            frequency,
        }
    }

    /// Both text fields are required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        Ok(())
    }

    /// Materialise a fresh habit with an empty streak.
    pub fn into_habit(
        self,
        id: impl Into<String>,
        owner: impl Into<String>,
    ) -> Result<Habit, ValidationError> {
        self.validate()?;
        Ok(Habit {
            id: id.into(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            frequency: self.frequency,
            owner: owner.into(),
            streak_count: 0,
            last_completed: None,
        })
    }
}

/// Habit document as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub frequency: String,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub last_completed: Option<String>,
}

/// Completion document as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    pub habit_id: String,
    pub completed_at: String,
}

impl TryFrom<HabitRecord> for Habit {
    type Error = ValidationError;

    fn try_from(record: HabitRecord) -> Result<Self, Self::Error> {
        let frequency = record.frequency.parse()?;
        let last_completed = match record.last_completed.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(&record.id, raw)?),
        };
        Ok(Habit {
            id: record.id,
            title: record.title,
            description: record.description,
            frequency,
            owner: record.user_id,
            streak_count: record.streak_count,
            last_completed,
        })
    }
}

impl TryFrom<CompletionRecord> for CompletionEvent {
    type Error = ValidationError;

    fn try_from(record: CompletionRecord) -> Result<Self, Self::Error> {
        let completed_at = parse_timestamp(&record.id, &record.completed_at)?;
        Ok(CompletionEvent {
            id: record.id,
            habit_id: record.habit_id,
            owner: record.user_id,
            completed_at,
        })
    }
}

impl From<&Habit> for HabitRecord {
    fn from(habit: &Habit) -> Self {
        HabitRecord {
            id: habit.id.clone(),
            user_id: habit.owner.clone(),
            title: habit.title.clone(),
            description: habit.description.clone(),
            frequency: habit.frequency.to_string(),
            streak_count: habit.streak_count,
            last_completed: habit.last_completed.map(|t| t.to_rfc3339()),
        }
    }
}

impl From<&CompletionEvent> for CompletionRecord {
    fn from(event: &CompletionEvent) -> Self {
        CompletionRecord {
            id: event.id.clone(),
            user_id: event.owner.clone(),
            habit_id: event.habit_id.clone(),
            completed_at: event.completed_at.to_rfc3339(),
        }
    }
}

/// Parse a batch of completion records, stopping at the first malformed one.
pub fn parse_completions<I>(records: I) -> Result<Vec<CompletionEvent>, ValidationError>
where
    I: IntoIterator<Item = CompletionRecord>,
{
    records.into_iter().map(CompletionEvent::try_from).collect()
}

/// Parse a batch of habit records, stopping at the first malformed one.
pub fn parse_habits<I>(records: I) -> Result<Vec<Habit>, ValidationError>
where
    I: IntoIterator<Item = HabitRecord>,
{
    records.into_iter().map(Habit::try_from).collect()
}
