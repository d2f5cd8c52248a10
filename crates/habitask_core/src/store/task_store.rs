use super::cache::{Entity, EntityCache};
use super::error::{StoreError, StoreResult};
use crate::gateway::CollectionGateway;
use crate::model::task::{Task, TaskDraft, TaskPatch};
use crate::model::{ActorId, EntityId, ValidationError};
use chrono::{DateTime, Utc};
use im::Vector;

/// Task specialization of the entity cache.
pub type TaskStore<G> = EntityCache<Task, G>;

impl Entity for Task {
    type Draft = TaskDraft;
    type Patch = TaskPatch;

    fn from_draft(draft: TaskDraft, owner: ActorId, now: DateTime<Utc>) -> Self {
        Task {
            id: None,
            user_id: owner,
            title: draft.title,
            description: draft.description,
            completed: draft.completed,
            created_at: now,
            due_date: draft.due_date,
            priority: draft.priority,
        }
    }

    fn apply_patch(&mut self, patch: TaskPatch) {
        patch.apply_to(self);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Task::validate(self)
    }

    fn search_fields(&self) -> (&str, Option<&str>) {
        (&self.title, self.description.as_deref())
    }
}

impl<G> EntityCache<Task, G> {
    pub fn filter_by_status(&self, completed: bool) -> Vector<Task> {
        self.filtered(|task| task.completed == completed)
    }

    pub fn completed_count(&self) -> usize {
        self.filter_by_status(true).len()
    }

    pub fn total_count(&self) -> usize {
        self.snapshot().len()
    }
}

impl<G: CollectionGateway<Task>> EntityCache<Task, G> {
    /// Flips the completion flag through `update`.
    pub async fn toggle(&self, id: &EntityId) -> StoreResult<Task> {
        let completed = self
            .find(id)
            .map(|task| task.completed)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.update(id, TaskPatch::completed(!completed)).await
    }
}
