// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two-message worker protocol.
//!
//! A worker's busy/idle status is reported independently from task
//! completion: `Status` and `Response` are separate, asynchronously ordered
//! messages from the same worker. The pool's dispatch decision reads only
//! the latest `Status` per worker, never in-flight task counts.

use crate::task::TaskId;
use crate::worker::{WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pool options forwarded to each unit in its init message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InitOptions {
    /// Advisory cap on concurrent in-flight tasks. The pool forwards it
    /// but does not enforce it.
    pub max_concurrent: u32,
    /// Per-task timeout the pool will apply, in milliseconds.
    pub task_timeout_ms: u64,
}

/// Messages sent from the pool to a worker execution unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolMessage {
    /// Sent once per unit at creation or replacement, before any task.
    Init {
        worker_id: WorkerId,
        options: InitOptions,
    },
    /// Dispatch a unit of work. `task_type` and `task_data` are opaque to
    /// the pool and forwarded verbatim.
    Task {
        task_id: TaskId,
        task_type: String,
        task_data: Value,
    },
}

/// Protocol messages emitted by a worker execution unit back to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Worker lifecycle signal. The only mechanism by which a worker
    /// returns to idle after completing work.
    Status {
        worker_id: WorkerId,
        status: WorkerStatus,
    },
    /// Task completion signal.
    Response { task_id: TaskId, result: Value },
}

/// Everything a unit can signal on its event channel: protocol messages
/// plus out-of-band lifecycle signals.
#[derive(Debug, Clone)]
pub enum WorkerSignal {
    /// A protocol message.
    Message(WorkerMessage),
    /// The unit reported an internal error. Observability only; tasks in
    /// flight on the unit are not failed by this signal.
    Errored(String),
    /// The unit's underlying execution stopped. Non-zero codes trigger
    /// slot replacement; zero is an intentional shutdown.
    Exited(i32),
}

/// Envelope tying a signal to the slot that produced it.
#[derive(Debug, Clone)]
pub struct WorkerEvent {
    pub worker_id: WorkerId,
    pub signal: WorkerSignal,
}

impl WorkerEvent {
    pub fn message(worker_id: WorkerId, message: WorkerMessage) -> Self {
        Self {
            worker_id,
            signal: WorkerSignal::Message(message),
        }
    }

    pub fn errored(worker_id: WorkerId, error: impl Into<String>) -> Self {
        Self {
            worker_id,
            signal: WorkerSignal::Errored(error.into()),
        }
    }

    pub fn exited(worker_id: WorkerId, code: i32) -> Self {
        Self {
            worker_id,
            signal: WorkerSignal::Exited(code),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
