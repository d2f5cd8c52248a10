//! Deferred, lazily resolved statistics trigger.
//!
//! # Responsibility
//! - Let entity stores request a statistics recompute without holding the
//!   aggregator, which itself is built from those stores.
//!
//! # Invariants
//! - The target is resolved when a scheduled trigger fires, never when it is
//!   scheduled or when the trigger is created.
//! - The trigger only holds a weak reference to its target.
//! - Every `fire` schedules exactly one recompute; nothing is de-duplicated.

use crate::model::statistics::StatisticsRecord;
use crate::model::Collection;
use crate::store::StoreResult;
use futures::future::LocalBoxFuture;
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Target of the trigger.
pub trait StatisticsSink {
    fn recompute(self: Rc<Self>) -> LocalBoxFuture<'static, StoreResult<StatisticsRecord>>;
}

type Resolver = Box<dyn Fn() -> Option<Rc<dyn StatisticsSink>>>;

/// Cloneable handle; clones share the resolver and the counters.
#[derive(Clone)]
pub struct StatsTrigger {
    inner: Rc<TriggerInner>,
}

struct TriggerInner {
    delay: Duration,
    resolver: RefCell<Option<Resolver>>,
    scheduled: Cell<u64>,
}

impl StatsTrigger {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Rc::new(TriggerInner {
                delay,
                resolver: RefCell::new(None),
                scheduled: Cell::new(0),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Replaces the resolver consulted by future firings.
    pub fn install(&self, resolver: impl Fn() -> Option<Rc<dyn StatisticsSink>> + 'static) {
        self.inner.resolver.replace(Some(Box::new(resolver)));
    }

    /// Installs a resolver that upgrades a weak reference to `sink`.
    pub fn attach<S: StatisticsSink + 'static>(&self, sink: &Rc<S>) {
        let weak = Rc::downgrade(sink);
        self.install(move || {
            weak.upgrade()
                .map(|sink| -> Rc<dyn StatisticsSink> { sink })
        });
    }

    pub fn is_attached(&self) -> bool {
        self.inner.resolver.borrow().is_some()
    }

    /// Number of recomputes scheduled so far.
    pub fn scheduled_count(&self) -> u64 {
        self.inner.scheduled.get()
    }

    /// Schedules one recompute after the configured delay.
    ///
    /// Uses `tokio::task::spawn_local`; must be called inside a `LocalSet`.
    pub fn fire(&self, origin: Collection) {
        let sequence = self.inner.scheduled.get() + 1;
        self.inner.scheduled.set(sequence);
        debug!("event=stats_trigger module=stats status=start origin={origin} seq={sequence}");

        let inner = Rc::clone(&self.inner);
        tokio::task::spawn_local(async move {
            tokio::time::sleep(inner.delay).await;
            let Some(sink) = inner.resolve() else {
                warn!(
                    "event=stats_trigger module=stats status=skip origin={origin} seq={sequence} reason=unresolved"
                );
                return;
            };
            match sink.recompute().await {
                Ok(record) => info!(
                    "event=stats_trigger module=stats status=ok origin={origin} seq={sequence} date={}",
                    record.date
                ),
                Err(err) => error!(
                    "event=stats_trigger module=stats status=error origin={origin} seq={sequence} error={err}"
                ),
            }
        });
    }
}

impl TriggerInner {
    fn resolve(&self) -> Option<Rc<dyn StatisticsSink>> {
        self.resolver.borrow().as_ref().and_then(|resolve| resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::{StatisticsSink, StatsTrigger};
    use crate::model::statistics::StatisticsRecord;
    use crate::model::Collection;
    use crate::store::StoreResult;
    use chrono::NaiveDate;
    use futures::future::{FutureExt, LocalBoxFuture};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        calls: Rc<Cell<u32>>,
    }

    impl StatisticsSink for CountingSink {
        fn recompute(self: Rc<Self>) -> LocalBoxFuture<'static, StoreResult<StatisticsRecord>> {
            async move {
                self.calls.set(self.calls.get() + 1);
                Ok(StatisticsRecord {
                    id: None,
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    tasks_completed: 0,
                    tasks_created: 0,
                    habits_completed: 0,
                    habits_total: 0,
                    average_streak: 0,
                })
            }
            .boxed_local()
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn resolves_target_attached_after_scheduling() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let trigger = StatsTrigger::new(Duration::from_millis(500));
                trigger.fire(Collection::Tasks);
                trigger.fire(Collection::Habits);

                let sink = Rc::new(CountingSink::default());
                trigger.attach(&sink);
                assert_eq!(sink.calls.get(), 0);

                tokio::time::sleep(Duration::from_millis(501)).await;
                assert_eq!(sink.calls.get(), 2);
                assert_eq!(trigger.scheduled_count(), 2);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn dropped_target_is_skipped() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let trigger = StatsTrigger::new(Duration::from_millis(10));
                let sink = Rc::new(CountingSink::default());
                let calls = Rc::clone(&sink.calls);
                trigger.attach(&sink);
                assert!(trigger.is_attached());
                trigger.fire(Collection::Tasks);
                drop(sink);

                tokio::time::sleep(Duration::from_millis(20)).await;
                assert_eq!(trigger.scheduled_count(), 1);
                assert_eq!(calls.get(), 0);
            })
            .await;
    }
}
