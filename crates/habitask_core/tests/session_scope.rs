mod common;

use common::{actor, habit, harness, settle, task, Harness};
use habitask_core::{
    ActorSession, Collection, GatewayOperation, InMemoryGateway, LoadState, TaskDraft,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

fn two_actors() -> Harness {
    let gateway = InMemoryGateway::new();
    gateway
        .seed(vec![
            task("u1", "u1 first", false),
            task("u2", "u2 first", false),
            task("u1", "u1 second", true),
        ])
        .unwrap();
    gateway
        .seed(vec![habit("u1", "u1 habit", 2, None), habit("u2", "u2 habit", 5, None)])
        .unwrap();
    harness(gateway, ActorSession::new())
}

fn owners(h: &Harness) -> Vec<String> {
    let mut owners: Vec<String> = h
        .client
        .tasks()
        .snapshot()
        .iter()
        .map(|task| task.user_id.to_string())
        .chain(
            h.client
                .habits()
                .snapshot()
                .iter()
                .map(|habit| habit.user_id.to_string()),
        )
        .collect();
    owners.dedup();
    owners
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stores_stay_unloaded_until_login() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            settle().await;

            assert_eq!(h.client.tasks().load_state(), LoadState::Unloaded);
            assert!(h.client.habits().snapshot().is_empty());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn actor_switch_shows_only_the_new_actors_entities() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;
            assert_eq!(h.client.tasks().total_count(), 2);
            assert_eq!(owners(&h), vec!["u1".to_string()]);

            h.session.login(actor("u2"));
            assert!(h.client.tasks().snapshot().is_empty());
            assert_eq!(h.client.tasks().load_state(), LoadState::Loading);

            settle().await;
            assert_eq!(h.client.tasks().total_count(), 1);
            assert_eq!(h.client.habits().snapshot()[0].current_streak, 5);
            assert_eq!(owners(&h), vec!["u2".to_string()]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn logout_empties_both_stores_and_notifies() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;

            let pushes = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&pushes);
            h.client
                .tasks()
                .subscribe(move |snapshot| sink.borrow_mut().push(snapshot.len()));

            h.session.logout();

            assert!(h.client.tasks().snapshot().is_empty());
            assert!(h.client.habits().snapshot().is_empty());
            assert_eq!(h.client.tasks().load_state(), LoadState::Unloaded);
            assert_eq!(*pushes.borrow(), vec![2, 0]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn load_finishing_after_logout_is_discarded() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.gateway.set_latency(Duration::from_millis(100));

            h.session.login(actor("u1"));
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(h.client.tasks().is_loading());
            h.session.logout();

            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(h.client.tasks().snapshot().is_empty());
            assert_eq!(h.client.tasks().load_state(), LoadState::Unloaded);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn superseded_load_for_previous_actor_is_discarded() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.gateway.set_latency(Duration::from_millis(100));

            h.session.login(actor("u1"));
            tokio::time::sleep(Duration::from_millis(30)).await;
            h.session.login(actor("u2"));

            tokio::time::sleep(Duration::from_millis(80)).await;
            assert!(h.client.tasks().snapshot().is_empty());

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(owners(&h), vec!["u2".to_string()]);
            assert_eq!(h.client.tasks().load_state(), LoadState::Ready);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn add_confirmed_after_actor_change_is_not_cached() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;
            h.gateway.set_latency(Duration::from_millis(100));

            let tasks = Rc::clone(h.client.tasks());
            let pending = tokio::task::spawn_local(async move {
                tasks.add(TaskDraft::titled("late")).await
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.session.login(actor("u2"));

            let created = pending.await.unwrap().unwrap();
            assert_eq!(created.user_id.as_str(), "u1");

            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(h
                .client
                .tasks()
                .snapshot()
                .iter()
                .all(|task| task.user_id.as_str() == "u2"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_completion_after_logout_leaves_the_store_empty() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;
            h.gateway.set_latency(Duration::from_millis(100));
            h.gateway
                .fail_next(Collection::Habits, GatewayOperation::Replace);

            let habits = Rc::clone(h.client.habits());
            let id = habits.snapshot()[0].id.clone().unwrap();
            let pending =
                tokio::task::spawn_local(async move { habits.complete(&id).await });
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(h.client.habits().snapshot()[0].current_streak, 3);

            h.session.logout();
            let pushes = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&pushes);
            h.client
                .habits()
                .subscribe(move |snapshot| sink.borrow_mut().push(snapshot.len()));

            assert!(pending.await.unwrap().is_err());
            assert!(h.client.habits().snapshot().is_empty());
            assert_eq!(h.client.habits().load_state(), LoadState::Unloaded);
            assert_eq!(*pushes.borrow(), vec![0]);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_completion_after_actor_switch_keeps_the_new_actors_habits() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;
            h.gateway.set_latency(Duration::from_millis(100));
            h.gateway
                .fail_next(Collection::Habits, GatewayOperation::Replace);

            let habits = Rc::clone(h.client.habits());
            let id = habits.snapshot()[0].id.clone().unwrap();
            let pending =
                tokio::task::spawn_local(async move { habits.complete(&id).await });
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.session.login(actor("u2"));

            assert!(pending.await.unwrap().is_err());
            tokio::time::sleep(Duration::from_millis(200)).await;

            let snapshot = h.client.habits().snapshot();
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot[0].user_id.as_str(), "u2");
            assert_eq!(snapshot[0].current_streak, 5);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn refresh_superseded_by_logout_returns_its_own_list_without_caching() {
    LocalSet::new()
        .run_until(async {
            let h = two_actors();
            h.session.login(actor("u1"));
            settle().await;
            h.gateway.set_latency(Duration::from_millis(100));

            let tasks = Rc::clone(h.client.tasks());
            let pending = tokio::task::spawn_local(async move { tasks.refresh().await });
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.session.logout();

            let fetched = pending.await.unwrap().unwrap();
            assert_eq!(fetched.len(), 2);
            assert!(fetched.iter().all(|task| task.user_id.as_str() == "u1"));
            assert!(h.client.tasks().snapshot().is_empty());
            assert_eq!(h.client.tasks().load_state(), LoadState::Unloaded);
        })
        .await;
}
