// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process worker units backed by tokio tasks.
//!
//! Each unit drains its own message channel and runs tasks through a
//! shared `TaskHandler`. Units self-report status around every task, so
//! the pool sees the full two-message protocol: `Status(busy)`,
//! `Response`, `Status(idle)`, in that order, per task.

use crate::{WorkerAdapter, WorkerHandle, WorkerUnitError};
use async_trait::async_trait;
use farmhand_core::{PoolMessage, WorkerEvent, WorkerId, WorkerMessage, WorkerStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Executes one task inside a worker unit.
///
/// Returning `Err` emits a worker error signal and no response; the
/// submitting caller is then rescued only by the pool-side timeout. A
/// panic crashes the unit, which reports a non-zero exit and gets its
/// slot replaced by the pool.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn run(&self, task_type: &str, task_data: Value) -> Result<Value, String>;
}

struct LocalUnit {
    msg_tx: mpsc::UnboundedSender<PoolMessage>,
    loop_task: tokio::task::JoinHandle<()>,
}

/// Runs worker execution units as in-process tokio tasks.
#[derive(Clone)]
pub struct LocalWorkerAdapter {
    handler: Arc<dyn TaskHandler>,
    units: Arc<Mutex<HashMap<WorkerId, LocalUnit>>>,
    unit_seq: Arc<AtomicU64>,
}

impl LocalWorkerAdapter {
    /// Create an adapter whose units all run tasks through `handler`.
    pub fn new(handler: impl TaskHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            units: Arc::new(Mutex::new(HashMap::new())),
            unit_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of currently live units.
    pub fn unit_count(&self) -> usize {
        self.units.lock().len()
    }
}

#[async_trait]
impl WorkerAdapter for LocalWorkerAdapter {
    async fn spawn(
        &self,
        worker_id: WorkerId,
        event_tx: mpsc::Sender<WorkerEvent>,
    ) -> Result<WorkerHandle, WorkerUnitError> {
        let unit_id = format!("unit-{}", self.unit_seq.fetch_add(1, Ordering::SeqCst));
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        let loop_task = tokio::spawn(unit_loop(
            worker_id.clone(),
            Arc::clone(&self.handler),
            msg_rx,
            event_tx,
        ));

        let unit = LocalUnit { msg_tx, loop_task };

        // Replacing an existing slot tears down the previous unit.
        if let Some(old) = self.units.lock().insert(worker_id.clone(), unit) {
            old.loop_task.abort();
        }

        tracing::debug!(worker_id = %worker_id, unit_id = %unit_id, "spawned local worker unit");
        Ok(WorkerHandle::new(worker_id, unit_id))
    }

    async fn send(
        &self,
        worker_id: &WorkerId,
        message: PoolMessage,
    ) -> Result<(), WorkerUnitError> {
        let units = self.units.lock();
        let unit = units
            .get(worker_id)
            .ok_or_else(|| WorkerUnitError::NotFound(worker_id.clone()))?;
        unit.msg_tx
            .send(message)
            .map_err(|_| WorkerUnitError::SendFailed(format!("unit {} stopped", worker_id)))
    }

    async fn kill(&self, worker_id: &WorkerId) -> Result<(), WorkerUnitError> {
        let unit = self
            .units
            .lock()
            .remove(worker_id)
            .ok_or_else(|| WorkerUnitError::NotFound(worker_id.clone()))?;
        unit.loop_task.abort();
        tracing::debug!(worker_id = %worker_id, "killed local worker unit");
        Ok(())
    }
}

/// Message loop for one unit.
///
/// Ends with a zero exit when the message channel closes, or a non-zero
/// exit when the task handler panics. Intentional kills abort the loop
/// before it can report anything.
async fn unit_loop(
    worker_id: WorkerId,
    handler: Arc<dyn TaskHandler>,
    mut msg_rx: mpsc::UnboundedReceiver<PoolMessage>,
    event_tx: mpsc::Sender<WorkerEvent>,
) {
    while let Some(msg) = msg_rx.recv().await {
        match msg {
            PoolMessage::Init { .. } => {
                report_status(&event_tx, &worker_id, WorkerStatus::Idle).await;
            }
            PoolMessage::Task {
                task_id,
                task_type,
                task_data,
            } => {
                report_status(&event_tx, &worker_id, WorkerStatus::Busy).await;

                // Run the handler in its own task so a panic is contained
                // and surfaces as a unit crash instead of unwinding silently.
                let run = {
                    let handler = Arc::clone(&handler);
                    let task_type = task_type.clone();
                    tokio::spawn(async move { handler.run(&task_type, task_data).await })
                };

                match run.await {
                    Ok(Ok(result)) => {
                        let _ = event_tx
                            .send(WorkerEvent::message(
                                worker_id.clone(),
                                WorkerMessage::Response { task_id, result },
                            ))
                            .await;
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(
                            worker_id = %worker_id,
                            task_id = %task_id,
                            error = %error,
                            "task handler failed"
                        );
                        let _ = event_tx
                            .send(WorkerEvent::errored(worker_id.clone(), error))
                            .await;
                    }
                    Err(join_err) => {
                        if join_err.is_panic() {
                            tracing::error!(
                                worker_id = %worker_id,
                                task_id = %task_id,
                                "task handler panicked, unit exiting"
                            );
                            let _ = event_tx
                                .send(WorkerEvent::exited(worker_id.clone(), 1))
                                .await;
                        }
                        return;
                    }
                }

                report_status(&event_tx, &worker_id, WorkerStatus::Idle).await;
            }
        }
    }

    let _ = event_tx.send(WorkerEvent::exited(worker_id, 0)).await;
}

async fn report_status(
    event_tx: &mpsc::Sender<WorkerEvent>,
    worker_id: &WorkerId,
    status: WorkerStatus,
) {
    let _ = event_tx
        .send(WorkerEvent::message(
            worker_id.clone(),
            WorkerMessage::Status {
                worker_id: worker_id.clone(),
                status,
            },
        ))
        .await;
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
