//! End-to-end task dispatch through real in-process workers.

use crate::prelude::*;
use farmhand_pool::PoolError;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn executes_a_task_end_to_end() {
    let pool = ready_pool(2, Duration::from_secs(30)).await;

    let result = pool.execute_task("echo", json!({"n": 41})).await.unwrap();
    assert_eq!(result, json!({"echo": {"n": 41}}));

    // The worker reports idle again after the response.
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().idle_workers == 2
    })
    .await;
    assert_eq!(pool.stats().pending_tasks, 0);

    pool.shutdown().await;
}

#[tokio::test]
async fn completes_many_tasks_in_sequence() {
    let pool = ready_pool(2, Duration::from_secs(30)).await;

    for n in 0..5 {
        let result = pool.execute_task("echo", json!({"n": n})).await.unwrap();
        assert_eq!(result, json!({"echo": {"n": n}}));
    }

    pool.shutdown().await;
}

#[tokio::test]
async fn saturation_rejects_instead_of_queueing() {
    let pool = ready_pool(1, Duration::from_secs(30)).await;

    let slow = pool
        .submit("sleep", json!({"ms": 500}))
        .await
        .unwrap();

    // Once the lone worker reports busy, further submissions fail fast.
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().busy_workers == 1
    })
    .await;

    let err = pool.submit("echo", json!(null)).await.unwrap_err();
    assert!(matches!(err, PoolError::NoIdleWorkers));

    // The in-flight task is unaffected by the rejection.
    assert_eq!(slow.outcome().await.unwrap(), json!({"slept_ms": 500}));

    pool.shutdown().await;
}

#[tokio::test]
async fn stats_track_the_dispatch_cycle() {
    let pool = ready_pool(1, Duration::from_secs(30)).await;

    let stats = pool.stats();
    assert_eq!(stats.total_workers, 1);
    assert_eq!(stats.idle_workers, 1);
    assert_eq!(stats.pending_tasks, 0);

    let handle = pool.submit("sleep", json!({"ms": 200})).await.unwrap();
    assert_eq!(pool.stats().pending_tasks, 1);

    handle.outcome().await.unwrap();
    assert_eq!(pool.stats().pending_tasks, 0);

    pool.shutdown().await;
}
