// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pool

use farmhand_adapters::WorkerUnitError;
use thiserror::Error;

/// Errors surfaced to task submitters.
///
/// Every failure is scoped to a single task or a single worker slot;
/// nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every worker slot is busy or still initializing. The pool does not
    /// queue or wait; callers own their retry policy.
    #[error("no available workers")]
    NoIdleWorkers,
    /// The task's deadline elapsed before a matching response arrived.
    #[error("task timed out after {timeout_ms}ms")]
    TaskTimedOut { timeout_ms: u64 },
    /// The pool shut down while the task was still pending.
    #[error("worker pool shut down")]
    PoolShutDown,
    /// The assigned worker unit could not be driven.
    #[error(transparent)]
    Unit(#[from] WorkerUnitError),
}
