//! Streak engine for habitrack
//!
//! Pure computation only: completion history in, streak statistics and a
//! best-streak leaderboard out. Nothing here performs I/O or reads the
//! clock.

mod engine;
mod ranking;

pub use engine::{
    gap_days, is_completed_in_window, StreakEngine, StreakStats, DEFAULT_TOLERANCE_DAYS,
};

pub use ranking::{rank_habits, RankedHabit, TieBreak};
