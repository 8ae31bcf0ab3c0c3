// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observability events emitted by the pool.

use crate::task::TaskId;
use crate::worker::{WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};

/// Events the pool emits for observers.
///
/// These are fire-and-forget: dropping or lagging behind them never affects
/// pool behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A worker reported a new lifecycle status.
    WorkerStatus {
        worker_id: WorkerId,
        status: WorkerStatus,
    },
    /// A worker unit reported an internal error. No task is failed by this.
    WorkerError { worker_id: WorkerId, error: String },
    /// A worker unit exited abnormally and was respawned in the same slot.
    WorkerReplaced { worker_id: WorkerId, exit_code: i32 },
    /// A pending task hit its deadline and was rejected.
    TaskTimeout {
        task_id: TaskId,
        task_type: String,
        timeout_ms: u64,
    },
}

impl PoolEvent {
    /// Compact single-line form for log output.
    pub fn log_summary(&self) -> String {
        match self {
            PoolEvent::WorkerStatus { worker_id, status } => {
                format!("worker:status {} {}", worker_id, status)
            }
            PoolEvent::WorkerError { worker_id, error } => {
                format!("worker:error {} {}", worker_id, error)
            }
            PoolEvent::WorkerReplaced {
                worker_id,
                exit_code,
            } => {
                format!("worker:replaced {} exit={}", worker_id, exit_code)
            }
            PoolEvent::TaskTimeout {
                task_id,
                timeout_ms,
                ..
            } => {
                format!("task:timeout {} after {}ms", task_id, timeout_ms)
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
