//! Shutdown semantics.

use crate::prelude::*;
use farmhand_pool::PoolError;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn shutdown_settles_pending_tasks() {
    let pool = ready_pool(1, Duration::from_secs(30)).await;

    let handle = pool.submit("sleep", json!({"ms": 5000})).await.unwrap();
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().busy_workers == 1
    })
    .await;

    pool.shutdown().await;

    let err = handle.outcome().await.unwrap_err();
    assert!(matches!(err, PoolError::PoolShutDown));

    let stats = pool.stats();
    assert_eq!(stats.total_workers, 0);
    assert_eq!(stats.pending_tasks, 0);
}

#[tokio::test]
async fn submissions_after_shutdown_are_rejected() {
    let pool = ready_pool(2, Duration::from_secs(30)).await;
    pool.shutdown().await;

    let err = pool.submit("echo", json!(null)).await.unwrap_err();
    assert!(matches!(err, PoolError::NoIdleWorkers));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let pool = ready_pool(1, Duration::from_secs(30)).await;
    pool.shutdown().await;
    pool.shutdown().await;
    assert_eq!(pool.stats().total_workers, 0);
}
