//! Composition root wiring the stores, the aggregator and the trigger.
//!
//! Construction order: trigger, task store, habit store, aggregator, then
//! the trigger is pointed at the aggregator. The stores never see the
//! aggregator directly.

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::gateway::CollectionGateway;
use crate::model::habit::Habit;
use crate::model::statistics::StatisticsRecord;
use crate::model::task::Task;
use crate::observer::ListenerKey;
use crate::session::ActorSession;
use crate::stats::{StatisticsAggregator, StatsTrigger};
use crate::store::{HabitStore, TaskStore};
use log::info;
use std::rc::Rc;

pub struct HabitaskClient<G> {
    session: ActorSession,
    trigger: StatsTrigger,
    tasks: Rc<TaskStore<G>>,
    habits: Rc<HabitStore<G>>,
    statistics: Rc<StatisticsAggregator<G>>,
    session_bindings: Vec<ListenerKey>,
}

impl<G> HabitaskClient<G>
where
    G: CollectionGateway<Task>
        + CollectionGateway<Habit>
        + CollectionGateway<StatisticsRecord>
        + 'static,
{
    /// Builds and binds everything. If `session` is already signed in, the
    /// initial loads are spawned, so this must run inside a `LocalSet`.
    pub fn new(
        gateway: Rc<G>,
        session: ActorSession,
        clock: Rc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        let trigger = StatsTrigger::new(config.trigger_delay);
        let tasks = Rc::new(TaskStore::new(
            Rc::clone(&gateway),
            session.clone(),
            Rc::clone(&clock),
            trigger.clone(),
        ));
        let habits = Rc::new(HabitStore::new(
            Rc::clone(&gateway),
            session.clone(),
            Rc::clone(&clock),
            trigger.clone(),
        ));
        let statistics = Rc::new(StatisticsAggregator::new(
            gateway,
            Rc::clone(&tasks),
            Rc::clone(&habits),
            clock,
        ));
        trigger.attach(&statistics);

        let session_bindings = vec![tasks.bind_session(), habits.bind_session()];
        info!(
            "event=client_init module=client status=ok trigger_delay_ms={} signed_in={}",
            config.trigger_delay.as_millis(),
            session.is_logged_in()
        );

        Self {
            session,
            trigger,
            tasks,
            habits,
            statistics,
            session_bindings,
        }
    }

    /// Loads the statistics snapshot.
    pub async fn start(&self) {
        self.statistics.load().await;
    }
}

impl<G> HabitaskClient<G> {
    pub fn tasks(&self) -> &Rc<TaskStore<G>> {
        &self.tasks
    }

    pub fn habits(&self) -> &Rc<HabitStore<G>> {
        &self.habits
    }

    pub fn statistics(&self) -> &Rc<StatisticsAggregator<G>> {
        &self.statistics
    }

    pub fn session(&self) -> &ActorSession {
        &self.session
    }

    pub fn trigger(&self) -> &StatsTrigger {
        &self.trigger
    }
}

impl<G> Drop for HabitaskClient<G> {
    fn drop(&mut self) {
        for key in self.session_bindings.drain(..) {
            self.session.unsubscribe(key);
        }
    }
}
