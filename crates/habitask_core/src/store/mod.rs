//! Actor-scoped entity stores.
//!
//! # Responsibility
//! - Keep push-notified snapshots of the active actor's tasks and habits.
//! - Apply mutations through a `CollectionGateway` and reconcile the
//!   confirmed documents.
//!
//! # See also
//! - `crate::streak` for the completion policy used by `HabitStore`.
//! - `crate::stats` for the aggregator the stores notify.

pub mod cache;
pub mod error;
pub mod habit_store;
pub mod task_store;

pub use cache::{Entity, EntityCache, LoadState};
pub use error::{StoreError, StoreResult};
pub use habit_store::HabitStore;
pub use task_store::TaskStore;
