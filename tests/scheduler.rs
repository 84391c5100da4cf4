mod common;

use apiwatch::db::MemoryStore;
use apiwatch::db::models::ExecutionResult;
use apiwatch::db::store::MonitorStore;
use apiwatch::lifecycle::Phase;
use apiwatch::probe::{ProbeExecutor, ProbeScheduler, SchedulerOptions};
use chrono::Utc;
use common::{FlakyStore, details};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scheduler<S: MonitorStore + 'static>(store: &Arc<S>, workers: usize) -> Arc<ProbeScheduler> {
    let executor = ProbeExecutor::new(store.clone(), Duration::from_secs(5)).unwrap();
    Arc::new(ProbeScheduler::new(
        store.clone(),
        executor,
        SchedulerOptions {
            workers,
            tick: Duration::from_millis(20),
            idle_poll: Duration::from_millis(5),
        },
    ))
}

#[tokio::test]
async fn due_monitors_run_once_and_recent_ones_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.upsert_monitor(details(1, "never run", server.uri())).await;
    store.upsert_monitor(details(2, "ran recently", server.uri())).await;
    let recent = ExecutionResult {
        executed_at: Utc::now() - chrono::Duration::seconds(10),
        success: true,
        status_code: 200,
        ..ExecutionResult::pending(2)
    };
    store.create_result(&recent).await.unwrap();

    let scheduler = scheduler(&store, 2);
    let shutdown = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let first = store.results_for(1).await;
    assert_eq!(first.len(), 1, "a one-minute monitor runs once across several ticks");
    assert!(first[0].success);
    assert_eq!(first[0].log_response, "up");
    assert_eq!(store.results_for(2).await.len(), 1, "no new result for the recent monitor");
    assert_eq!(scheduler.lifecycle().phase(), Phase::Stopped);
}

#[tokio::test]
async fn shutdown_waits_for_queued_probes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    for id in 1..=3 {
        store
            .upsert_monitor(details(id, "slow", format!("{}/slow", server.uri())))
            .await;
    }

    let scheduler = scheduler(&store, 1);
    let shutdown = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(store.result_count().await, 3);
    for result in store.results_for(2).await {
        assert!(result.response_time_ms >= 100);
    }
}

#[tokio::test]
async fn stops_promptly_when_nothing_is_queued() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = scheduler(&store, 3);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), scheduler.run(shutdown))
        .await
        .expect("scheduler should stop without pending work");
    assert_eq!(scheduler.lifecycle().phase(), Phase::Stopped);
}

#[tokio::test]
async fn store_errors_at_start_up_do_not_stop_scheduling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .mount(&server)
        .await;

    let memory = MemoryStore::new();
    memory.upsert_monitor(details(1, "api", server.uri())).await;
    let store = Arc::new(
        FlakyStore::new(memory)
            .failing_list_monitors(1)
            .failing_latest_result(1),
    );

    let scheduler = scheduler(&store, 1);
    let shutdown = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!handle.is_finished(), "scheduler must keep running until stopped");
    assert_eq!(scheduler.lifecycle().phase(), Phase::Running);

    shutdown.cancel();
    handle.await.unwrap();
    assert_eq!(store.inner.results_for(1).await.len(), 1);
}

#[tokio::test]
async fn panicking_job_leaves_the_worker_running() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .mount(&server)
        .await;

    let memory = MemoryStore::new();
    memory.upsert_monitor(details(1, "crashes", server.uri())).await;
    memory.upsert_monitor(details(2, "fine", server.uri())).await;
    let store = Arc::new(FlakyStore::new(memory).panicking_on_create_for(1));

    let scheduler = scheduler(&store, 1);
    let shutdown = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("drain completes after a panicking job")
        .unwrap();

    assert!(store.inner.results_for(1).await.is_empty());
    assert_eq!(store.inner.results_for(2).await.len(), 1);
    assert_eq!(scheduler.lifecycle().phase(), Phase::Stopped);
}
