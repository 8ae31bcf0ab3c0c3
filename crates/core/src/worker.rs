// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity and lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a worker slot.
    ///
    /// Slot ids are assigned by the pool at provisioning time (the slot
    /// index as a string) and stay stable for the pool's lifetime, even
    /// when the underlying unit is replaced after a failure.
    pub struct WorkerId;
}

impl WorkerId {
    /// WorkerId for a provisioned slot index.
    pub fn slot(index: usize) -> Self {
        Self::new(index.to_string())
    }
}

/// Lifecycle status a worker execution unit reports for itself.
///
/// The pool never moves a worker back to `Idle` on its own; only a
/// worker-emitted status message does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Unit spawned, not yet ready for work.
    Initializing,
    /// Ready to accept a task.
    Idle,
    /// Working on a task.
    Busy,
}

impl WorkerStatus {
    /// Whether the worker can be handed a task right now.
    pub fn is_idle(&self) -> bool {
        matches!(self, WorkerStatus::Idle)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerStatus::Initializing => "initializing",
            WorkerStatus::Idle => "idle",
            WorkerStatus::Busy => "busy",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
