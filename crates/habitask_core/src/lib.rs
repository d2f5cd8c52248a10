//! Core engine for Habitask: actor-scoped task and habit caches with
//! optimistic mutations, the habit streak policy, and derived daily
//! statistics.
//!
//! Everything here is single-threaded. Async operations expect a tokio
//! current-thread runtime driving a `LocalSet`.

pub mod client;
pub mod clock;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod observer;
pub mod session;
pub mod stats;
pub mod store;
pub mod streak;

pub use client::HabitaskClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigError, LogSettings};
pub use gateway::{
    CollectionGateway, GatewayError, GatewayOperation, GatewayResult, HttpGateway,
    InMemoryGateway, ListFilter, SqliteGateway,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::habit::{Frequency, Habit, HabitDraft, HabitPatch};
pub use model::statistics::StatisticsRecord;
pub use model::task::{Priority, Task, TaskDraft, TaskPatch};
pub use model::{ActorId, Collection, Document, EntityId, ValidationError};
pub use observer::ListenerKey;
pub use session::{Actor, ActorChange, ActorSession};
pub use stats::{derive_daily_statistics, StatisticsAggregator, StatisticsSink, StatsTrigger};
pub use store::{EntityCache, HabitStore, LoadState, StoreError, StoreResult, TaskStore};
pub use streak::{compute_completion, Completion, StreakOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
