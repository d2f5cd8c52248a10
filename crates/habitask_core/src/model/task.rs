//! Task document.
//!
//! # Invariants
//! - `title` is non-empty after trimming.
//! - `user_id` is the owning actor and never changes after creation.

use super::de::optional_day;
use super::{require_text, ActorId, Collection, Document, EntityId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub user_id: ActorId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_day"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }
}

impl Document for Task {
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn owner_id(&self) -> Option<&ActorId> {
        Some(&self.user_id)
    }
}

/// Caller-supplied fields for a new task.
///
/// Owner and creation time are filled in by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Shallow partial update. `Some` overwrites, `None` keeps the stored value;
/// nested `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Option<Priority>>,
}

impl TaskPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }

    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Task, TaskPatch};
    use crate::model::{ActorId, ValidationError};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample() -> Task {
        Task {
            id: None,
            user_id: ActorId::new("u1"),
            title: "write report".to_string(),
            description: Some("quarterly".to_string()),
            completed: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            due_date: None,
            priority: Some(Priority::High),
        }
    }

    #[test]
    fn decodes_remote_shape_with_numeric_id_and_timestamp_due_date() {
        let json = r#"{
            "id": 12,
            "userId": "u1",
            "title": "pay rent",
            "completed": true,
            "createdAt": "2026-03-01T08:00:00.000Z",
            "dueDate": "2026-03-05T00:00:00.000Z",
            "priority": "medium"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id.as_ref().map(|id| id.as_str()), Some("12"));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 3, 5));
        assert_eq!(task.priority, Some(Priority::Medium));
        assert!(task.description.is_none());
    }

    #[test]
    fn encodes_camel_case_and_omits_absent_optionals() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["priority"], "high");
        assert!(value.get("id").is_none());
        assert!(value.get("dueDate").is_none());
    }

    #[test]
    fn patch_overwrites_present_fields_and_keeps_the_rest() {
        let mut task = sample();
        TaskPatch {
            title: Some("write summary".to_string()),
            description: Some(None),
            ..TaskPatch::default()
        }
        .apply_to(&mut task);

        assert_eq!(task.title, "write summary");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Some(Priority::High));
        assert!(!task.completed);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut task = sample();
        task.title = "   ".to_string();
        assert_eq!(task.validate(), Err(ValidationError::EmptyField("title")));
    }
}
