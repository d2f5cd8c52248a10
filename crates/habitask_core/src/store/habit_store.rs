use super::cache::{position, Entity, EntityCache};
use super::error::{StoreError, StoreResult};
use crate::gateway::CollectionGateway;
use crate::model::habit::{Frequency, Habit, HabitDraft, HabitPatch};
use crate::model::{ActorId, Document, EntityId, ValidationError};
use crate::stats::derive::rounded_mean;
use crate::streak::compute_completion;
use chrono::{DateTime, Utc};
use im::Vector;
use log::{debug, error, info, warn};

/// Habit specialization of the entity cache.
pub type HabitStore<G> = EntityCache<Habit, G>;

impl Entity for Habit {
    type Draft = HabitDraft;
    type Patch = HabitPatch;

    fn from_draft(draft: HabitDraft, owner: ActorId, now: DateTime<Utc>) -> Self {
        Habit {
            id: None,
            user_id: owner,
            name: draft.name,
            description: draft.description,
            frequency: draft.frequency,
            created_at: now,
            current_streak: 0,
            longest_streak: 0,
            last_completed_date: None,
            color: draft.color,
        }
    }

    fn apply_patch(&mut self, patch: HabitPatch) {
        patch.apply_to(self);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Habit::validate(self)
    }

    fn search_fields(&self) -> (&str, Option<&str>) {
        (&self.name, self.description.as_deref())
    }
}

impl<G> EntityCache<Habit, G> {
    pub fn filter_by_frequency(&self, frequency: Frequency) -> Vector<Habit> {
        self.filtered(|habit| habit.frequency == frequency)
    }

    pub fn total_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Habits whose last completion falls on today's UTC day.
    pub fn completed_today_count(&self) -> usize {
        let today = self.clock.today();
        self.filtered(|habit| {
            habit
                .last_completed_date
                .is_some_and(|at| at.date_naive() == today)
        })
        .len()
    }

    /// Rounded mean of current streaks, 0 without habits.
    pub fn average_streak(&self) -> u32 {
        let snapshot = self.snapshot();
        let sum: u64 = snapshot
            .iter()
            .map(|habit| u64::from(habit.current_streak))
            .sum();
        rounded_mean(sum, snapshot.len() as u64)
    }
}

impl<G: CollectionGateway<Habit>> EntityCache<Habit, G> {
    /// Marks a habit completed now.
    ///
    /// The new streak is published before the gateway answers. If the
    /// gateway fails, the whole snapshot is restored to what it was when the
    /// call started, unless a reload or logout replaced it meanwhile. A repeat completion on the same day returns the habit
    /// unchanged without any gateway write.
    pub async fn complete(&self, id: &EntityId) -> StoreResult<Habit> {
        let before = self.snapshot();
        let epoch = self.epoch();
        let index = position(&before, id).ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let completion = compute_completion(&before[index], self.clock.now());
        if completion.is_noop() {
            debug!("event=habit_complete module=store status=skip id={id} reason=same_day");
            return Ok(completion.habit);
        }

        self.publish(before.update(index, completion.habit.clone()));

        match self.gateway.replace(id, &completion.habit).await {
            Ok(saved) => {
                self.replace_entry(id, saved.clone());
                info!(
                    "event=habit_complete module=store status=ok id={id} outcome={:?} streak={}",
                    completion.outcome, saved.current_streak
                );
                self.trigger.fire(Habit::COLLECTION);
                Ok(saved)
            }
            Err(err) => {
                error!("event=habit_complete module=store status=error id={id} error={err}");
                if self.epoch() == epoch {
                    self.publish(before);
                } else {
                    warn!("event=habit_rollback module=store status=skip id={id} reason=superseded");
                }
                Err(err.into())
            }
        }
    }
}
