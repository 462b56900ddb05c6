//! Cross-habit ranking by best streak.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::engine::StreakStats;
use crate::habit::Habit;

/// Secondary ordering for habits with equal best streaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Habit id ascending
    #[default]
    HabitId,
    /// Title ascending, then habit id
    Title,
    /// Keep the caller's order
    InputOrder,
}

impl TieBreak {
    fn compare(&self, a: &Habit, b: &Habit) -> Ordering {
        match self {
            TieBreak::HabitId => a.id.cmp(&b.id),
            TieBreak::Title => a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)),
            TieBreak::InputOrder => Ordering::Equal,
        }
    }
}

/// One row of the streak leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHabit {
    /// 1-based position
    pub rank: usize,
    pub habit: Habit,
    pub stats: StreakStats,
}

/// Order habits by `best_streak` descending.
///
/// The sort is stable, so [`TieBreak::InputOrder`] keeps ties in the order
/// they were supplied.
pub fn rank_habits<I>(entries: I, tie_break: TieBreak) -> Vec<RankedHabit>
where
    I: IntoIterator<Item = (Habit, StreakStats)>,
{
    let mut rows: Vec<(Habit, StreakStats)> = entries.into_iter().collect();
    rows.sort_by(|(ha, sa), (hb, sb)| {
        sb.best_streak
            .cmp(&sa.best_streak)
            .then_with(|| tie_break.compare(ha, hb))
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, (habit, stats))| RankedHabit {
            rank: i + 1,
            habit,
            stats,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::Frequency;

    fn entry(id: &str, title: &str, best: u32) -> (Habit, StreakStats) {
        (
            Habit {
                id: id.into(),
                title: title.into(),
                description: String::new(),
                frequency: Frequency::Daily,
                owner: "u1".into(),
                streak_count: 0,
                last_completed: None,
            },
            StreakStats {
                current_streak: best,
                best_streak: best,
                total_completions: best,
            },
        )
    }

    fn bests(ranked: &[RankedHabit]) -> Vec<u32> {
        ranked.iter().map(|r| r.stats.best_streak).collect()
    }

    #[test]
    fn orders_by_best_streak_descending() {
        let ranked = rank_habits(
            vec![entry("a", "A", 3), entry("b", "B", 7), entry("c", "C", 1)],
            TieBreak::default(),
        );
        assert_eq!(bests(&ranked), [7, 3, 1]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn ties_broken_by_habit_id() {
        let ranked = rank_habits(
            vec![entry("z", "First", 2), entry("a", "Second", 2)],
            TieBreak::HabitId,
        );
        assert_eq!(ranked[0].habit.id, "a");
    }

    #[test]
    fn ties_broken_by_title() {
        let ranked = rank_habits(
            vec![entry("1", "Walk", 2), entry("2", "Read", 2)],
            TieBreak::Title,
        );
        assert_eq!(ranked[0].habit.title, "Read");
    }

    #[test]
    fn input_order_tie_break_is_stable() {
        let ranked = rank_habits(
            vec![entry("z", "Z", 2), entry("m", "M", 5), entry("a", "A", 2)],
            TieBreak::InputOrder,
        );
        let ids: Vec<&str> = ranked.iter().map(|r| r.habit.id.as_str()).collect();
        assert_eq!(ids, ["m", "z", "a"]);
    }

    #[test]
    fn empty_input_ranks_nothing() {
        assert!(rank_habits(Vec::new(), TieBreak::default()).is_empty());
    }
}
