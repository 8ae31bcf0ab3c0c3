// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Armed task deadlines.
//!
//! Deadlines are data, not spawned sleep tasks: the driver sleeps until
//! `next_deadline` and collects whatever has fired. This keeps timeout
//! logic testable against a fake clock.

use farmhand_core::TaskId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Deadline {
    fires_at: Instant,
}

/// Tracks the armed timeout deadline for each in-flight task.
#[derive(Debug, Default)]
pub(crate) struct DeadlineScheduler {
    deadlines: HashMap<TaskId, Deadline>,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline `timeout` from `now`.
    pub fn arm(&mut self, task_id: TaskId, timeout: Duration, now: Instant) {
        let fires_at = now + timeout;
        self.deadlines.insert(task_id, Deadline { fires_at });
    }

    /// Disarm a task's deadline, if still armed.
    pub fn disarm(&mut self, task_id: &TaskId) {
        self.deadlines.remove(task_id);
    }

    /// Remove and return every deadline that has fired.
    pub fn fired(&mut self, now: Instant) -> Vec<TaskId> {
        let fired: Vec<TaskId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| deadline.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &fired {
            self.deadlines.remove(id);
        }

        fired
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().map(|d| d.fires_at).min()
    }

    /// Drop every armed deadline.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
