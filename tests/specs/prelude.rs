//! Shared helpers for pool specs.

use farmhand_adapters::{LocalWorkerAdapter, TaskHandler};
use farmhand_core::{PoolEvent, SystemClock};
use farmhand_pool::{PoolConfig, WorkerPool};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;

pub type LocalPool = WorkerPool<LocalWorkerAdapter, SystemClock>;

/// Handler driving all specs. Behavior is keyed on task type:
/// - `"sleep"`: sleeps `ms` from the payload, then reports how long
/// - `"hang"`: never completes (rescued only by the pool timeout)
/// - `"fail"`: returns a handler error (worker error signal, no response)
/// - `"explode"`: panics, crashing the unit
/// - anything else: echoes the payload
pub struct SpecHandler;

#[async_trait::async_trait]
impl TaskHandler for SpecHandler {
    async fn run(&self, task_type: &str, task_data: Value) -> Result<Value, String> {
        match task_type {
            "sleep" => {
                let ms = task_data.get("ms").and_then(Value::as_u64).unwrap_or(50);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!({ "slept_ms": ms }))
            }
            "hang" => {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            }
            "fail" => Err("spec failure".to_string()),
            "explode" => panic!("spec crash"),
            _ => Ok(json!({ "echo": task_data })),
        }
    }
}

/// Build, initialize, and wait for every worker to report idle.
pub async fn ready_pool(size: usize, task_timeout: Duration) -> LocalPool {
    let pool = WorkerPool::new(
        LocalWorkerAdapter::new(SpecHandler),
        SystemClock,
        PoolConfig {
            size,
            task_timeout,
            ..PoolConfig::default()
        },
    );
    pool.initialize().await.unwrap();
    let probe = pool.clone();
    wait_until(Duration::from_secs(5), move || {
        probe.stats().idle_workers == size
    })
    .await;
    pool
}

/// Poll `cond` until it holds, panicking after `deadline`.
pub async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    while !cond() {
        assert!(
            start.elapsed() < deadline,
            "condition not met within {:?}",
            deadline
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait for an event matching `pred`, skipping everything else.
pub async fn expect_event(
    events: &mut broadcast::Receiver<PoolEvent>,
    mut pred: impl FnMut(&PoolEvent) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("expected event within deadline");
}
