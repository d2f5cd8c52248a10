//! Habit completion streak policy.
//!
//! Pure: given a habit and "now", decides the next streak counters and
//! completion stamp. Days are compared after truncating both timestamps to
//! UTC midnight.
//!
//! # Invariants
//! - A second completion on the same day changes nothing.
//! - `longest_streak` never decreases and is `>= current_streak` after any
//!   completion.

use crate::model::habit::Habit;
use chrono::{DateTime, TimeDelta, Utc};

/// Exactly one day between consecutive completions keeps a streak alive.
pub const STREAK_GAP_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// Already completed on this day; habit returned unchanged.
    AlreadyCompletedToday,
    /// First recorded completion.
    Started,
    /// Previous completion was yesterday.
    Continued,
    /// Any other gap; streak restarts at one.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub habit: Habit,
    pub outcome: StreakOutcome,
}

impl Completion {
    /// `true` when nothing changed and nothing needs persisting.
    pub fn is_noop(&self) -> bool {
        self.outcome == StreakOutcome::AlreadyCompletedToday
    }
}

pub fn compute_completion(habit: &Habit, now: DateTime<Utc>) -> Completion {
    let today = day_start(now);
    let last_day = habit.last_completed_date.map(day_start);

    let outcome = match last_day {
        Some(last) if last == today => {
            return Completion {
                habit: habit.clone(),
                outcome: StreakOutcome::AlreadyCompletedToday,
            };
        }
        None => StreakOutcome::Started,
        Some(last) if today - last == TimeDelta::milliseconds(STREAK_GAP_MS) => {
            StreakOutcome::Continued
        }
        Some(_) => StreakOutcome::Reset,
    };

    let mut next = habit.clone();
    next.current_streak = match outcome {
        StreakOutcome::Reset => 1,
        _ => habit.current_streak.saturating_add(1),
    };
    next.last_completed_date = Some(now);
    if next.current_streak > next.longest_streak {
        next.longest_streak = next.current_streak;
    }

    Completion {
        habit: next,
        outcome,
    }
}

/// Truncates a timestamp to midnight of its UTC day.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(at, |midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::{compute_completion, day_start, StreakOutcome};
    use crate::model::habit::{Frequency, Habit};
    use crate::model::ActorId;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
    }

    fn habit(current: u32, longest: u32, last: Option<DateTime<Utc>>) -> Habit {
        Habit {
            id: None,
            user_id: ActorId::new("u1"),
            name: "meditate".to_string(),
            description: None,
            frequency: Frequency::Daily,
            created_at: at(1, 6),
            current_streak: current,
            longest_streak: longest,
            last_completed_date: last,
            color: None,
        }
    }

    #[test]
    fn first_completion_starts_streak_and_stamps_full_timestamp() {
        let now = at(10, 19);
        let completion = compute_completion(&habit(0, 0, None), now);
        assert_eq!(completion.outcome, StreakOutcome::Started);
        assert_eq!(completion.habit.current_streak, 1);
        assert_eq!(completion.habit.longest_streak, 1);
        assert_eq!(completion.habit.last_completed_date, Some(now));
    }

    #[test]
    fn completion_exactly_one_day_later_continues() {
        let now = at(10, 9);
        let completion = compute_completion(&habit(4, 6, Some(now - TimeDelta::hours(24))), now);
        assert_eq!(completion.outcome, StreakOutcome::Continued);
        assert_eq!(completion.habit.current_streak, 5);
        assert_eq!(completion.habit.longest_streak, 6);
    }

    #[test]
    fn yesterday_at_any_hour_counts_as_one_day() {
        let completion = compute_completion(&habit(2, 2, Some(at(9, 23))), at(10, 1));
        assert_eq!(completion.outcome, StreakOutcome::Continued);
        assert_eq!(completion.habit.current_streak, 3);
        assert_eq!(completion.habit.longest_streak, 3);
    }

    #[test]
    fn gap_of_fifty_hours_resets_to_one() {
        let now = at(10, 12);
        let completion = compute_completion(&habit(7, 9, Some(now - TimeDelta::hours(50))), now);
        assert_eq!(completion.outcome, StreakOutcome::Reset);
        assert_eq!(completion.habit.current_streak, 1);
        assert_eq!(completion.habit.longest_streak, 9);
    }

    #[test]
    fn future_last_completion_resets() {
        let completion = compute_completion(&habit(3, 3, Some(at(12, 8))), at(10, 8));
        assert_eq!(completion.outcome, StreakOutcome::Reset);
        assert_eq!(completion.habit.current_streak, 1);
    }

    #[test]
    fn same_day_completion_is_a_noop() {
        let original = habit(3, 5, Some(at(10, 7)));
        let completion = compute_completion(&original, at(10, 22));
        assert!(completion.is_noop());
        assert_eq!(completion.habit, original);
    }

    #[test]
    fn longest_streak_is_monotonic_over_mixed_sequences() {
        let day_offsets = [0i64, 1, 2, 3, 6, 7, 7, 8, 20, 21, 22, 23, 24, 30];
        let start = at(1, 10);
        let mut current = habit(0, 0, None);
        let mut previous_longest = 0;

        for offset in day_offsets {
            let now = start + TimeDelta::days(offset) + TimeDelta::minutes(offset * 7);
            current = compute_completion(&current, now).habit;
            assert!(current.longest_streak >= previous_longest);
            assert!(current.longest_streak >= current.current_streak);
            previous_longest = current.longest_streak;
        }
        assert_eq!(current.longest_streak, 5);
        assert_eq!(current.current_streak, 1);
    }

    #[test]
    fn day_start_strips_time_of_day() {
        assert_eq!(day_start(at(10, 17)), at(10, 0));
    }
}
