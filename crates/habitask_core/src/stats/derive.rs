//! Pure derivation of a day's statistics from task and habit snapshots.

use crate::model::habit::Habit;
use crate::model::statistics::StatisticsRecord;
use crate::model::task::Task;
use chrono::NaiveDate;
use im::Vector;

/// Builds the (unpersisted) record for `today`.
///
/// `tasks_created` is the size of the task snapshot, not the number of tasks
/// created on `today`.
pub fn derive_daily_statistics(
    tasks: &Vector<Task>,
    habits: &Vector<Habit>,
    today: NaiveDate,
) -> StatisticsRecord {
    let tasks_completed = tasks.iter().filter(|task| task.completed).count();
    let habits_completed = habits
        .iter()
        .filter(|habit| {
            habit
                .last_completed_date
                .is_some_and(|at| at.date_naive() == today)
        })
        .count();
    let streak_sum: u64 = habits
        .iter()
        .map(|habit| u64::from(habit.current_streak))
        .sum();

    StatisticsRecord {
        id: None,
        date: today,
        tasks_completed: saturate(tasks_completed),
        tasks_created: saturate(tasks.len()),
        habits_completed: saturate(habits_completed),
        habits_total: saturate(habits.len()),
        average_streak: rounded_mean(streak_sum, habits.len() as u64),
    }
}

/// `sum / count` rounded half away from zero; 0 when `count` is 0.
pub(crate) fn rounded_mean(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    let mean = (2 * u128::from(sum) + u128::from(count)) / (2 * u128::from(count));
    u32::try_from(mean).unwrap_or(u32::MAX)
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
