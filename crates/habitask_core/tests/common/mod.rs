#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use habitask_core::{
    Actor, ActorId, ActorSession, Clock, ClientConfig, Frequency, Habit, HabitaskClient,
    InMemoryGateway, ManualClock, Task,
};
use std::rc::Rc;
use std::time::Duration;

pub const TRIGGER_DELAY: Duration = Duration::from_millis(500);

pub struct Harness {
    pub gateway: Rc<InMemoryGateway>,
    pub clock: Rc<ManualClock>,
    pub session: ActorSession,
    pub client: HabitaskClient<InMemoryGateway>,
}

/// 2026-06-15 09:00 UTC.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
}

/// Builds a client over `gateway` with a manual clock at `start_time`.
/// Must run inside a `LocalSet`.
pub fn harness(gateway: InMemoryGateway, session: ActorSession) -> Harness {
    let gateway = Rc::new(gateway);
    let clock = Rc::new(ManualClock::new(start_time()));
    let clock_handle: Rc<dyn Clock> = clock.clone();
    let config = ClientConfig {
        trigger_delay: TRIGGER_DELAY,
        ..ClientConfig::default()
    };
    let client = HabitaskClient::new(Rc::clone(&gateway), session.clone(), clock_handle, &config);
    Harness {
        gateway,
        clock,
        session,
        client,
    }
}

/// Lets spawned loads and zero-latency gateway calls finish.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits past the trigger delay so scheduled recomputes run.
pub async fn settle_triggers() {
    tokio::time::sleep(TRIGGER_DELAY + Duration::from_millis(1)).await;
}

pub fn actor(id: &str) -> Actor {
    Actor::new(id, id.to_uppercase())
}

pub fn task(owner: &str, title: &str, completed: bool) -> Task {
    Task {
        id: None,
        user_id: ActorId::new(owner),
        title: title.to_string(),
        description: None,
        completed,
        created_at: start_time(),
        due_date: None,
        priority: None,
    }
}

pub fn habit(
    owner: &str,
    name: &str,
    streak: u32,
    last_completed: Option<DateTime<Utc>>,
) -> Habit {
    Habit {
        id: None,
        user_id: ActorId::new(owner),
        name: name.to_string(),
        description: None,
        frequency: Frequency::Daily,
        created_at: start_time(),
        current_streak: streak,
        longest_streak: streak,
        last_completed_date: last_completed,
        color: None,
    }
}
