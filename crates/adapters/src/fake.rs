// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake worker adapter for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{WorkerAdapter, WorkerHandle, WorkerUnitError};
use async_trait::async_trait;
use farmhand_core::{PoolMessage, TaskId, WorkerEvent, WorkerId, WorkerMessage, WorkerStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded call to FakeWorkerAdapter
#[derive(Debug, Clone)]
pub enum WorkerCall {
    Spawn {
        worker_id: WorkerId,
    },
    Send {
        worker_id: WorkerId,
        message: PoolMessage,
    },
    Kill {
        worker_id: WorkerId,
    },
}

/// Fake worker adapter for testing
///
/// Units never act on their own: tests emit status, response, error, and
/// exit signals explicitly. All calls are recorded.
#[derive(Clone)]
pub struct FakeWorkerAdapter {
    inner: Arc<Mutex<FakeState>>,
}

struct FakeState {
    workers: HashMap<WorkerId, FakeWorker>,
    calls: Vec<WorkerCall>,
    spawn_counts: HashMap<WorkerId, usize>,
    unit_seq: u64,
    spawn_error: Option<WorkerUnitError>,
    send_error: Option<WorkerUnitError>,
    kill_error: Option<WorkerUnitError>,
}

struct FakeWorker {
    event_tx: mpsc::Sender<WorkerEvent>,
    messages: Vec<PoolMessage>,
}

impl Default for FakeWorkerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorkerAdapter {
    /// Create a new fake worker adapter
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                workers: HashMap::new(),
                calls: Vec::new(),
                spawn_counts: HashMap::new(),
                unit_seq: 0,
                spawn_error: None,
                send_error: None,
                kill_error: None,
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<WorkerCall> {
        self.inner.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Messages delivered to a worker, in order
    pub fn sent_messages(&self, worker_id: &WorkerId) -> Vec<PoolMessage> {
        self.inner
            .lock()
            .workers
            .get(worker_id)
            .map(|w| w.messages.clone())
            .unwrap_or_default()
    }

    /// How many times a slot has been spawned (1 = original, 2+ = replaced)
    pub fn spawn_count(&self, worker_id: &WorkerId) -> usize {
        self.inner
            .lock()
            .spawn_counts
            .get(worker_id)
            .copied()
            .unwrap_or(0)
    }

    /// Check if a worker exists
    pub fn has_worker(&self, worker_id: &WorkerId) -> bool {
        self.inner.lock().workers.contains_key(worker_id)
    }

    /// Get the number of live workers
    pub fn worker_count(&self) -> usize {
        self.inner.lock().workers.len()
    }

    /// Set error to return on next spawn
    pub fn set_spawn_error(&self, error: WorkerUnitError) {
        self.inner.lock().spawn_error = Some(error);
    }

    /// Set error to return on next send
    pub fn set_send_error(&self, error: WorkerUnitError) {
        self.inner.lock().send_error = Some(error);
    }

    /// Set error to return on next kill
    pub fn set_kill_error(&self, error: WorkerUnitError) {
        self.inner.lock().kill_error = Some(error);
    }

    /// Emit a status message from a worker
    pub async fn emit_status(&self, worker_id: &WorkerId, status: WorkerStatus) {
        self.emit(
            worker_id,
            WorkerEvent::message(
                worker_id.clone(),
                WorkerMessage::Status {
                    worker_id: worker_id.clone(),
                    status,
                },
            ),
        )
        .await;
    }

    /// Emit a task response from a worker
    pub async fn emit_response(&self, worker_id: &WorkerId, task_id: TaskId, result: Value) {
        self.emit(
            worker_id,
            WorkerEvent::message(worker_id.clone(), WorkerMessage::Response { task_id, result }),
        )
        .await;
    }

    /// Emit an internal error signal from a worker
    pub async fn emit_error(&self, worker_id: &WorkerId, error: impl Into<String>) {
        self.emit(worker_id, WorkerEvent::errored(worker_id.clone(), error))
            .await;
    }

    /// Emit an exit signal from a worker
    pub async fn emit_exit(&self, worker_id: &WorkerId, code: i32) {
        self.emit(worker_id, WorkerEvent::exited(worker_id.clone(), code))
            .await;
    }

    async fn emit(&self, worker_id: &WorkerId, event: WorkerEvent) {
        let event_tx = {
            let inner = self.inner.lock();
            inner.workers.get(worker_id).map(|w| w.event_tx.clone())
        };
        if let Some(tx) = event_tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl WorkerAdapter for FakeWorkerAdapter {
    async fn spawn(
        &self,
        worker_id: WorkerId,
        event_tx: mpsc::Sender<WorkerEvent>,
    ) -> Result<WorkerHandle, WorkerUnitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(WorkerCall::Spawn {
            worker_id: worker_id.clone(),
        });
        if let Some(error) = inner.spawn_error.take() {
            return Err(error);
        }
        inner.unit_seq += 1;
        let unit_id = format!("fake-{}", inner.unit_seq);
        *inner.spawn_counts.entry(worker_id.clone()).or_insert(0) += 1;
        inner.workers.insert(
            worker_id.clone(),
            FakeWorker {
                event_tx,
                messages: Vec::new(),
            },
        );
        Ok(WorkerHandle::new(worker_id, unit_id))
    }

    async fn send(
        &self,
        worker_id: &WorkerId,
        message: PoolMessage,
    ) -> Result<(), WorkerUnitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(WorkerCall::Send {
            worker_id: worker_id.clone(),
            message: message.clone(),
        });
        if let Some(error) = inner.send_error.take() {
            return Err(error);
        }
        let worker = inner
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| WorkerUnitError::NotFound(worker_id.clone()))?;
        worker.messages.push(message);
        Ok(())
    }

    async fn kill(&self, worker_id: &WorkerId) -> Result<(), WorkerUnitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(WorkerCall::Kill {
            worker_id: worker_id.clone(),
        });
        if let Some(error) = inner.kill_error.take() {
            return Err(error);
        }
        inner
            .workers
            .remove(worker_id)
            .ok_or_else(|| WorkerUnitError::NotFound(worker_id.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
