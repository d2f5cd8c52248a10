//! Daily statistics snapshot and recompute.
//!
//! # Responsibility
//! - Hold the push-notified snapshot of statistics records.
//! - Derive today's record from the live task and habit snapshots and upsert
//!   it locally and through the gateway.
//!
//! # Invariants
//! - At most one record per date in the snapshot. Recomputes are serialized
//!   so two overlapping runs cannot both create today's record.
//! - The aggregator reads the entity stores and never mutates them.

use super::derive::{derive_daily_statistics, rounded_mean};
use super::trigger::StatisticsSink;
use crate::clock::Clock;
use crate::gateway::{CollectionGateway, ListFilter};
use crate::model::statistics::StatisticsRecord;
use crate::model::EntityId;
use crate::observer::{Listener, ListenerKey, Listeners};
use crate::store::{HabitStore, StoreResult, TaskStore};
use chrono::{NaiveDate, TimeDelta};
use futures::future::{FutureExt, LocalBoxFuture};
use im::Vector;
use log::{error, info};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::Mutex;

pub struct StatisticsAggregator<G> {
    gateway: Rc<G>,
    tasks: Rc<TaskStore<G>>,
    habits: Rc<HabitStore<G>>,
    clock: Rc<dyn Clock>,
    records: RefCell<Vector<StatisticsRecord>>,
    listeners: Listeners<Vector<StatisticsRecord>>,
    recompute_gate: Mutex<()>,
}

impl<G> StatisticsAggregator<G> {
    pub fn new(
        gateway: Rc<G>,
        tasks: Rc<TaskStore<G>>,
        habits: Rc<HabitStore<G>>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            tasks,
            habits,
            clock,
            records: RefCell::new(Vector::new()),
            listeners: Listeners::default(),
            recompute_gate: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Vector<StatisticsRecord> {
        self.records.borrow().clone()
    }

    /// Same semantics as the entity stores: immediate replay, then pushes.
    pub fn subscribe(&self, listener: impl Fn(&Vector<StatisticsRecord>) + 'static) -> ListenerKey {
        let listener: Listener<Vector<StatisticsRecord>> = Rc::new(listener);
        let key = self.listeners.insert(Rc::clone(&listener));
        listener(&self.snapshot());
        key
    }

    pub fn unsubscribe(&self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    /// Today's record as it would be derived right now, without persisting.
    pub fn preview_today(&self) -> StatisticsRecord {
        derive_daily_statistics(
            &self.tasks.snapshot(),
            &self.habits.snapshot(),
            self.clock.today(),
        )
    }

    pub fn by_date(&self, date: NaiveDate) -> Option<StatisticsRecord> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.date == date)
            .cloned()
    }

    pub fn today(&self) -> Option<StatisticsRecord> {
        self.by_date(self.clock.today())
    }

    /// Records dated from `days` days ago through today, newest first.
    pub fn last_days(&self, days: u32) -> Vec<StatisticsRecord> {
        let today = self.clock.today();
        let earliest = today - TimeDelta::days(i64::from(days));
        let mut recent: Vec<StatisticsRecord> = self
            .records
            .borrow()
            .iter()
            .filter(|record| record.date >= earliest && record.date <= today)
            .cloned()
            .collect();
        recent.sort_by(|left, right| right.date.cmp(&left.date));
        recent
    }

    pub fn average_tasks_completed(&self) -> u32 {
        self.rounded_average(|record| record.tasks_completed)
    }

    pub fn average_habits_completed(&self) -> u32 {
        self.rounded_average(|record| record.habits_completed)
    }

    /// Highest `average_streak` over all records, 0 when there are none.
    pub fn highest_streak(&self) -> u32 {
        self.records
            .borrow()
            .iter()
            .map(|record| record.average_streak)
            .max()
            .unwrap_or(0)
    }

    fn rounded_average(&self, field: impl Fn(&StatisticsRecord) -> u32) -> u32 {
        let records = self.records.borrow();
        let sum: u64 = records.iter().map(|record| u64::from(field(record))).sum();
        rounded_mean(sum, records.len() as u64)
    }

    fn publish(&self, records: Vector<StatisticsRecord>) {
        self.records.replace(records.clone());
        self.listeners.notify(&records);
    }

    /// Replaces the record with the same id, else appends.
    fn upsert(&self, record: StatisticsRecord) {
        let mut records = self.snapshot();
        let existing = record.id.as_ref().and_then(|id| {
            records
                .iter()
                .position(|candidate| candidate.id.as_ref() == Some(id))
        });
        match existing {
            Some(index) => {
                records.set(index, record);
            }
            None => records.push_back(record),
        }
        self.publish(records);
    }

    fn drop_record(&self, id: &EntityId) {
        let remaining = self
            .snapshot()
            .into_iter()
            .filter(|record| record.id.as_ref() != Some(id))
            .collect();
        self.publish(remaining);
    }
}

impl<G: CollectionGateway<StatisticsRecord>> StatisticsAggregator<G> {
    /// Loads every record. A gateway failure is logged and leaves an empty
    /// snapshot.
    pub async fn load(&self) {
        match self.gateway.list(&ListFilter::all()).await {
            Ok(records) => {
                info!(
                    "event=stats_load module=stats status=ok count={}",
                    records.len()
                );
                self.publish(records.into_iter().collect());
            }
            Err(err) => {
                error!("event=stats_load module=stats status=error error={err}");
                self.publish(Vector::new());
            }
        }
    }

    /// Reloads every record, reporting failures; the snapshot is kept on
    /// failure.
    pub async fn refresh(&self) -> StoreResult<Vector<StatisticsRecord>> {
        let records: Vector<StatisticsRecord> = self
            .gateway
            .list(&ListFilter::all())
            .await
            .inspect_err(|err| {
                error!("event=stats_refresh module=stats status=error error={err}");
            })?
            .into_iter()
            .collect();
        self.publish(records.clone());
        Ok(records)
    }

    pub async fn add(&self, record: StatisticsRecord) -> StoreResult<StatisticsRecord> {
        let created = self.gateway.create(&record).await?;
        self.upsert(created.clone());
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &EntityId,
        record: StatisticsRecord,
    ) -> StoreResult<StatisticsRecord> {
        let saved = self.gateway.replace(id, &record).await?;
        self.upsert(saved.clone());
        Ok(saved)
    }

    pub async fn delete(&self, id: &EntityId) -> StoreResult<()> {
        self.gateway.remove(id).await?;
        self.drop_record(id);
        Ok(())
    }

    /// Derives today's record from the current store snapshots and upserts
    /// it: `update` when a record for today exists, `add` otherwise.
    pub async fn recompute_today(&self) -> StoreResult<StatisticsRecord> {
        let _serialized = self.recompute_gate.lock().await;

        let derived = self.preview_today();
        let existing_id = self.by_date(derived.date).and_then(|record| record.id);

        let result = match existing_id {
            Some(id) => {
                let merged = StatisticsRecord {
                    id: Some(id.clone()),
                    ..derived
                };
                self.update(&id, merged).await
            }
            None => self.add(derived).await,
        };

        match &result {
            Ok(record) => info!(
                "event=stats_recompute module=stats status=ok date={} tasks_completed={} habits_completed={} average_streak={}",
                record.date, record.tasks_completed, record.habits_completed, record.average_streak
            ),
            Err(err) => error!("event=stats_recompute module=stats status=error error={err}"),
        }
        result
    }
}

impl<G: CollectionGateway<StatisticsRecord> + 'static> StatisticsSink for StatisticsAggregator<G> {
    fn recompute(self: Rc<Self>) -> LocalBoxFuture<'static, StoreResult<StatisticsRecord>> {
        async move { self.recompute_today().await }.boxed_local()
    }
}
