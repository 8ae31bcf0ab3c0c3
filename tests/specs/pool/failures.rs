//! Worker failure handling: handler errors and unit crashes.

use crate::prelude::*;
use farmhand_core::PoolEvent;
use farmhand_pool::PoolError;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn handler_error_leaves_the_task_to_time_out() {
    let pool = ready_pool(1, Duration::from_millis(200)).await;
    let mut events = pool.subscribe();

    // The worker signals an error and produces no response; the caller
    // is rescued only by the timeout.
    let err = pool.execute_task("fail", json!(null)).await.unwrap_err();
    assert!(matches!(err, PoolError::TaskTimedOut { .. }));

    expect_event(&mut events, |e| {
        matches!(e, PoolEvent::WorkerError { error, .. } if error == "spec failure")
    })
    .await;

    // The worker recovered on its own and keeps serving.
    let result = pool.execute_task("echo", json!(1)).await.unwrap();
    assert_eq!(result, json!({"echo": 1}));

    pool.shutdown().await;
}

#[tokio::test]
async fn crashed_worker_is_replaced_in_its_slot() {
    let pool = ready_pool(1, Duration::from_millis(200)).await;
    let mut events = pool.subscribe();

    let err = pool.execute_task("explode", json!(null)).await.unwrap_err();
    assert!(matches!(err, PoolError::TaskTimedOut { .. }));

    expect_event(&mut events, |e| {
        matches!(
            e,
            PoolEvent::WorkerReplaced {
                worker_id,
                exit_code
            } if *worker_id == "0" && *exit_code != 0
        )
    })
    .await;

    // The replacement unit comes up and the pool serves again.
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().idle_workers == 1
    })
    .await;
    let result = pool.execute_task("echo", json!("back")).await.unwrap();
    assert_eq!(result, json!({"echo": "back"}));

    pool.shutdown().await;
}
