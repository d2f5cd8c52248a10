//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `habitask_core` linkage and print its version.
//! - Run a short in-memory session end to end, or summarize one actor of a
//!   remote collection server with `--remote <actor-id>`.

use habitask_core::{
    core_version, init_logging, Actor, ActorSession, ClientConfig, HabitDraft, HabitaskClient,
    HttpGateway, InMemoryGateway, StatisticsRecord, StoreError, SystemClock, TaskDraft,
};
use log::info;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

const USAGE: &str = "usage: habitask_cli [--remote <actor-id>]";

fn main() -> ExitCode {
    println!("habitask_core version={}", core_version());

    let config = match ClientConfig::load(None) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log) {
        eprintln!("logging error: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("runtime error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let local = LocalSet::new();
    let result = match args.as_slice() {
        [] => local.block_on(&runtime, demo(&config)),
        [flag, actor_id] if flag == "--remote" => {
            local.block_on(&runtime, remote_summary(&config, actor_id))
        }
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn demo(config: &ClientConfig) -> Result<(), StoreError> {
    info!("event=cli_demo module=cli status=start");
    let session = ActorSession::new();
    let client = HabitaskClient::new(
        Rc::new(InMemoryGateway::new()),
        session.clone(),
        Rc::new(SystemClock),
        config,
    );
    client.start().await;

    session.login(Actor::new("demo", "Demo User"));
    tokio::task::yield_now().await;

    let tasks = client.tasks();
    let first = tasks.add(TaskDraft::titled("Try habitask")).await?;
    tasks.add(TaskDraft::titled("Read the docs")).await?;
    if let Some(id) = first.id.as_ref() {
        tasks.toggle(id).await?;
    }

    let habit = client.habits().add(HabitDraft::daily("Stretch")).await?;
    if let Some(id) = habit.id.as_ref() {
        let done = client.habits().complete(id).await?;
        println!("habit `{}` streak={}", done.name, done.current_streak);
    }

    tokio::time::sleep(client.trigger().delay() + Duration::from_millis(50)).await;
    match client.statistics().today() {
        Some(record) => print_record("statistics", &record),
        None => println!("statistics: not recomputed yet"),
    }
    Ok(())
}

async fn remote_summary(config: &ClientConfig, actor_id: &str) -> Result<(), StoreError> {
    info!("event=cli_remote module=cli status=start base_url={}", config.api_base_url);
    let gateway = Rc::new(HttpGateway::from_config(config)?);
    let client = HabitaskClient::new(
        gateway,
        ActorSession::signed_in(Actor::new(actor_id, actor_id)),
        Rc::new(SystemClock),
        config,
    );

    let tasks = client.tasks().refresh().await?;
    let habits = client.habits().refresh().await?;
    println!(
        "actor={actor_id} tasks={} habits={}",
        tasks.len(),
        habits.len()
    );
    print_record("derived", &client.statistics().preview_today());
    Ok(())
}

fn print_record(label: &str, record: &StatisticsRecord) {
    println!(
        "{label} date={} tasks_completed={} tasks_created={} habits_completed={} habits_total={} average_streak={}",
        record.date,
        record.tasks_completed,
        record.tasks_created,
        record.habits_completed,
        record.habits_total,
        record.average_streak
    );
}
