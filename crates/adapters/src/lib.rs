// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Worker execution unit adapters
//!
//! The pool treats worker execution units as opaque: anything that can
//! receive `PoolMessage`s and emit `WorkerEvent`s qualifies. The
//! `WorkerAdapter` trait is that seam. This crate ships one production
//! adapter (`LocalWorkerAdapter`, in-process tokio tasks) and a
//! `FakeWorkerAdapter` for deterministic tests.

mod local;

pub use local::{LocalWorkerAdapter, TaskHandler};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerAdapter, WorkerCall};

use async_trait::async_trait;
use farmhand_core::{PoolMessage, WorkerEvent, WorkerId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from worker unit operations
#[derive(Debug, Error)]
pub enum WorkerUnitError {
    #[error("worker not found: {0}")]
    NotFound(WorkerId),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("kill failed: {0}")]
    KillFailed(String),
}

/// Handle to a running worker execution unit.
///
/// `unit_id` identifies the spawned incarnation: a replacement unit keeps
/// the slot's `worker_id` but gets a fresh `unit_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub worker_id: WorkerId,
    pub unit_id: String,
}

impl WorkerHandle {
    /// Create a new worker handle
    pub fn new(worker_id: WorkerId, unit_id: impl Into<String>) -> Self {
        Self {
            worker_id,
            unit_id: unit_id.into(),
        }
    }
}

/// Adapter for spawning and driving worker execution units
#[async_trait]
pub trait WorkerAdapter: Clone + Send + Sync + 'static {
    /// Spawn a new unit for the given slot.
    ///
    /// The unit must be wired to `event_tx` before this returns, so no
    /// status message emitted during startup is lost. Spawning again with
    /// an existing slot id replaces that slot's unit.
    async fn spawn(
        &self,
        worker_id: WorkerId,
        event_tx: mpsc::Sender<WorkerEvent>,
    ) -> Result<WorkerHandle, WorkerUnitError>;

    /// Deliver a pool message to a running unit.
    async fn send(
        &self,
        worker_id: &WorkerId,
        message: PoolMessage,
    ) -> Result<(), WorkerUnitError>;

    /// Terminate a unit. Intentional kills emit no exit signal.
    async fn kill(&self, worker_id: &WorkerId) -> Result<(), WorkerUnitError>;
}
