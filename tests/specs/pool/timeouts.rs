//! Task timeout behavior: armed deadlines and the sweep.

use crate::prelude::*;
use farmhand_adapters::LocalWorkerAdapter;
use farmhand_core::{FakeClock, PoolEvent};
use farmhand_pool::{PoolConfig, PoolError, WorkerPool};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn hanging_task_times_out_after_the_deadline() {
    let pool = ready_pool(1, Duration::from_millis(150)).await;
    let mut events = pool.subscribe();

    let start = Instant::now();
    let err = pool.execute_task("hang", json!(null)).await.unwrap_err();

    assert!(matches!(err, PoolError::TaskTimedOut { timeout_ms: 150 }));
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert_eq!(pool.stats().pending_tasks, 0);

    expect_event(&mut events, |e| matches!(e, PoolEvent::TaskTimeout { .. })).await;

    pool.shutdown().await;
}

#[tokio::test]
async fn sweep_times_out_overdue_tasks() {
    // A fake clock keeps the armed deadline from firing on its own, so
    // the sweep is observed in isolation.
    let clock = FakeClock::new();
    let pool = WorkerPool::new(
        LocalWorkerAdapter::new(SpecHandler),
        clock.clone(),
        PoolConfig {
            size: 1,
            task_timeout: Duration::from_secs(10),
            ..PoolConfig::default()
        },
    );
    pool.initialize().await.unwrap();
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().idle_workers == 1
    })
    .await;

    let handle = pool.submit("hang", json!(null)).await.unwrap();

    assert_eq!(pool.check_timeouts(), 0, "not overdue yet");

    clock.advance(Duration::from_secs(11));
    assert_eq!(pool.check_timeouts(), 1);

    let err = handle.outcome().await.unwrap_err();
    assert!(matches!(err, PoolError::TaskTimedOut { .. }));

    pool.shutdown().await;
}
