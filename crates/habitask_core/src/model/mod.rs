//! Document model for tasks, habits and daily statistics.
//!
//! # Responsibility
//! - Define the canonical shapes exchanged with collection gateways.
//! - Own field-level validation shared by stores and gateways.
//!
//! # Invariants
//! - Identifiers are assigned by the gateway; a document without `id` has
//!   never been persisted.
//! - Wire field names are camelCase to match the remote JSON store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod habit;
pub mod ids;
pub mod statistics;
pub mod task;

mod de;

pub use ids::{ActorId, EntityId};

/// Named remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Tasks,
    Habits,
    Statistics,
}

impl Collection {
    /// Path segment / storage key of the collection.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Habits => "habits",
            Self::Statistics => "statistics",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record stored in one remote collection.
pub trait Document: Clone + Serialize + DeserializeOwned + 'static {
    const COLLECTION: Collection;

    /// Gateway-assigned identifier, `None` before the first create.
    fn id(&self) -> Option<&EntityId>;

    /// Owning actor; `None` for collections that are not actor scoped.
    fn owner_id(&self) -> Option<&ActorId>;
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    EmptyField(&'static str),
    /// `longest_streak` fell below `current_streak`.
    StreakBelowCurrent { current: u32, longest: u32 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::StreakBelowCurrent { current, longest } => write!(
                f,
                "longest streak {longest} is below current streak {current}"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}
