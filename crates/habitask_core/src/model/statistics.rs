//! Daily statistics record.
//!
//! # Invariants
//! - At most one record per calendar `date`.
//! - Records are not actor scoped.

use super::{ActorId, Collection, Document, EntityId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub tasks_completed: u32,
    pub tasks_created: u32,
    pub habits_completed: u32,
    pub habits_total: u32,
    pub average_streak: u32,
}

impl Document for StatisticsRecord {
    const COLLECTION: Collection = Collection::Statistics;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn owner_id(&self) -> Option<&ActorId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::StatisticsRecord;
    use chrono::NaiveDate;

    #[test]
    fn date_roundtrips_as_plain_day_string() {
        let record = StatisticsRecord {
            id: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            tasks_completed: 1,
            tasks_created: 2,
            habits_completed: 0,
            habits_total: 3,
            average_streak: 1,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], "2026-10-18");
        assert_eq!(value["tasksCreated"], 2);
        assert_eq!(value["averageStreak"], 1);
    }
}
