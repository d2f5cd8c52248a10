//! Habit document.
//!
//! # Invariants
//! - `name` is non-empty after trimming.
//! - `longest_streak >= current_streak` after every streak mutation.

use super::{require_text, ActorId, Collection, Document, EntityId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Intended repetition cadence. Streaks are always counted in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub user_id: ActorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Habit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if self.longest_streak < self.current_streak {
            return Err(ValidationError::StreakBelowCurrent {
                current: self.current_streak,
                longest: self.longest_streak,
            });
        }
        Ok(())
    }
}

impl Document for Habit {
    const COLLECTION: Collection = Collection::Habits;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn owner_id(&self) -> Option<&ActorId> {
        Some(&self.user_id)
    }
}

/// Caller-supplied fields for a new habit. Streak counters start at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDraft {
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub color: Option<String>,
}

impl HabitDraft {
    pub fn daily(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency: Frequency::Daily,
            color: None,
        }
    }
}

/// Shallow partial update; see `TaskPatch` for the `Option` conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub last_completed_date: Option<Option<DateTime<Utc>>>,
    pub color: Option<Option<String>>,
}

impl HabitPatch {
    pub fn apply_to(self, habit: &mut Habit) {
        if let Some(name) = self.name {
            habit.name = name;
        }
        if let Some(description) = self.description {
            habit.description = description;
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(current) = self.current_streak {
            habit.current_streak = current;
        }
        if let Some(longest) = self.longest_streak {
            habit.longest_streak = longest;
        }
        if let Some(last) = self.last_completed_date {
            habit.last_completed_date = last;
        }
        if let Some(color) = self.color {
            habit.color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Frequency, Habit, HabitPatch};
    use crate::model::ValidationError;

    #[test]
    fn decodes_habit_without_streak_fields() {
        let json = r##"{
            "id": "h1",
            "userId": "u1",
            "name": "stretch",
            "frequency": "weekly",
            "createdAt": "2026-02-01T07:30:00Z",
            "color": "#2ecc71"
        }"##;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.frequency, Frequency::Weekly);
        assert_eq!(habit.current_streak, 0);
        assert_eq!(habit.longest_streak, 0);
        assert!(habit.last_completed_date.is_none());
        assert_eq!(habit.color.as_deref(), Some("#2ecc71"));
    }

    #[test]
    fn validate_rejects_longest_below_current() {
        let json = r#"{"userId":"u1","name":"read","frequency":"daily",
            "createdAt":"2026-02-01T07:30:00Z","currentStreak":4,"longestStreak":2}"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(
            habit.validate(),
            Err(ValidationError::StreakBelowCurrent {
                current: 4,
                longest: 2
            })
        );
    }

    #[test]
    fn patch_can_clear_color() {
        let json = r##"{"userId":"u1","name":"read","frequency":"daily",
            "createdAt":"2026-02-01T07:30:00Z","color":"#fff"}"##;
        let mut habit: Habit = serde_json::from_str(json).unwrap();
        HabitPatch {
            color: Some(None),
            ..HabitPatch::default()
        }
        .apply_to(&mut habit);
        assert!(habit.color.is_none());
        assert_eq!(habit.name, "read");
    }
}
