// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending task correlation.
//!
//! A task id lives in this set from submission until exactly one of:
//! a matching response, the timeout firing, or pool shutdown. Settle-once
//! is structural: resolving removes the entry, and the oneshot responder
//! is consumed by the send.

use crate::error::PoolError;
use farmhand_core::TaskId;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Bookkeeping entry correlating an in-flight submission to its caller.
#[derive(Debug)]
pub(crate) struct PendingTask {
    /// Retained for observability; opaque to dispatch.
    pub task_type: String,
    pub submitted_at: Instant,
    pub responder: oneshot::Sender<Result<Value, PoolError>>,
}

/// In-flight tasks keyed by task id.
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    tasks: HashMap<TaskId, PendingTask>,
}

impl PendingSet {
    pub fn insert(&mut self, task_id: TaskId, task: PendingTask) {
        self.tasks.insert(task_id, task);
    }

    pub fn remove(&mut self, task_id: &TaskId) -> Option<PendingTask> {
        self.tasks.remove(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Ids of tasks whose `submitted_at` plus `timeout` has elapsed.
    pub fn expired(&self, now: Instant, timeout: Duration) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|(_, task)| task.submitted_at + timeout <= now)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Remove and return every pending task.
    pub fn drain(&mut self) -> Vec<(TaskId, PendingTask)> {
        self.tasks.drain().collect()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
