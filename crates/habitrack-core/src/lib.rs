//! # Habitrack Core Library
//!
//! This library provides the core logic for the habitrack habit tracker.
//! Persistence, authentication and realtime delivery belong to a hosted
//! backend; this crate owns the part that needs to be right: turning raw
//! completion history into streak statistics and a leaderboard.
//!
//! ## Architecture
//!
//! - **Streak Engine**: Pure, clock-free computation of current streak, best
//!   streak and total completions, plus best-streak ranking
//! - **Habit Model**: Typed habits and completions, parsed from the backend's
//!   string-timestamped documents
//! - **Store**: The `CompletionStore` seam and its change feed, with an
//!   in-memory implementation
//! - **Tracker**: Per-user fetch, compute and rank cycle, completion
//!   recording, and cache drift reporting
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: Streak computation
//! - [`HabitTracker`]: Application-level orchestration over a store
//! - [`CompletionStore`]: Trait for habit/completion persistence
//! - [`Config`]: Application configuration management

pub mod config;
pub mod error;
pub mod habit;
pub mod store;
pub mod streak;
pub mod timestamp;
pub mod tracker;

pub use config::{BackendConfig, Config, StreakConfig};
pub use error::{ConfigError, CoreError, Result, StoreError, ValidationError};
pub use habit::{CompletionEvent, CompletionRecord, Frequency, Habit, HabitRecord, NewHabit};
pub use store::{ChangeEvent, ChangeFeed, ChangeKind, Collection, CompletionStore, MemoryStore};
pub use streak::{
    is_completed_in_window, rank_habits, RankedHabit, StreakEngine, StreakStats, TieBreak,
};
pub use timestamp::{parse_timestamp, DayWindow};
pub use tracker::{HabitTracker, StreakDrift};
