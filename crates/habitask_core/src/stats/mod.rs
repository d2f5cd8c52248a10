//! Derived daily statistics.
//!
//! # Responsibility
//! - Turn task and habit snapshots into one statistics record per day.
//! - Let entity stores schedule a recompute without owning the aggregator.
//!
//! # See also
//! - `crate::store` for the snapshots read here.

pub mod aggregator;
pub mod derive;
pub mod trigger;

pub use aggregator::StatisticsAggregator;
pub use derive::derive_daily_statistics;
pub use trigger::{StatisticsSink, StatsTrigger};
