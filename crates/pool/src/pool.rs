// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool.
//!
//! Slot bookkeeping follows a supervised-slot pattern: a fixed set of
//! worker ids, each owning the current incarnation of its unit, with
//! replacement keyed on exit code (non-zero respawns, zero does not).
//!
//! Dispatch is first-fit over slots in insertion order, reading only the
//! last status each worker reported. The pool never marks a worker busy
//! from having sent it a task; two back-to-back submissions can land on
//! the same worker if its busy report has not yet arrived.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::pending::{PendingSet, PendingTask};
use crate::scheduler::DeadlineScheduler;
use farmhand_adapters::{WorkerAdapter, WorkerHandle};
use farmhand_core::{
    Clock, IdGen, PoolEvent, PoolMessage, TaskId, TimestampIdGen, WorkerEvent, WorkerId,
    WorkerMessage, WorkerSignal, WorkerStatus,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, Notify};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Bookkeeping entry for one worker slot.
#[derive(Debug)]
struct WorkerRecord {
    status: WorkerStatus,
    handle: WorkerHandle,
}

/// Snapshot of pool occupancy. Pure read, no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total_workers: usize,
    pub idle_workers: usize,
    pub busy_workers: usize,
    pub initializing_workers: usize,
    pub pending_tasks: usize,
}

/// Handle to an in-flight task submission.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    rx: oneshot::Receiver<Result<Value, PoolError>>,
}

impl TaskHandle {
    /// Id assigned to this submission.
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Wait for the task to settle: the worker's result, a timeout, or
    /// pool shutdown.
    pub async fn outcome(self) -> Result<Value, PoolError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(PoolError::PoolShutDown),
        }
    }
}

/// Fixed-size pool of worker execution units.
///
/// An explicit, externally-owned handle: construct one at startup and pass
/// clones to consumers. Clones share the same pool.
pub struct WorkerPool<W: WorkerAdapter, C: Clock, G: IdGen = TimestampIdGen> {
    inner: Arc<PoolInner<W, C, G>>,
}

impl<W: WorkerAdapter, C: Clock, G: IdGen> Clone for WorkerPool<W, C, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<W, C, G> {
    adapter: W,
    clock: C,
    ids: G,
    config: PoolConfig,
    workers: Mutex<IndexMap<WorkerId, WorkerRecord>>,
    pending: Mutex<PendingSet>,
    scheduler: Mutex<DeadlineScheduler>,
    events: broadcast::Sender<PoolEvent>,
    event_tx: mpsc::Sender<WorkerEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<WorkerEvent>>>,
    deadline_wake: Notify,
    driver: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<W: WorkerAdapter, C: Clock> WorkerPool<W, C, TimestampIdGen> {
    /// Create a pool with the production task-id generator.
    pub fn new(adapter: W, clock: C, config: PoolConfig) -> Self {
        Self::with_id_gen(adapter, clock, config, TimestampIdGen)
    }
}

impl<W: WorkerAdapter, C: Clock, G: IdGen + 'static> WorkerPool<W, C, G> {
    /// Create a pool with an explicit task-id generator.
    pub fn with_id_gen(adapter: W, clock: C, config: PoolConfig, ids: G) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(PoolInner {
                adapter,
                clock,
                ids,
                config,
                workers: Mutex::new(IndexMap::new()),
                pending: Mutex::new(PendingSet::default()),
                scheduler: Mutex::new(DeadlineScheduler::new()),
                events,
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
                deadline_wake: Notify::new(),
                driver: Mutex::new(None),
            }),
        }
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Provision `size` worker slots and start the driver.
    ///
    /// Workers come up asynchronously: each starts `Initializing` and
    /// becomes `Idle` only once it says so itself. No readiness is
    /// awaited here. Calling this twice is a no-op.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        let Some(event_rx) = self.inner.event_rx.lock().take() else {
            tracing::warn!("worker pool already initialized");
            return Ok(());
        };

        for index in 0..self.inner.config.size {
            self.inner.provision(&WorkerId::slot(index)).await?;
        }

        let inner = Arc::clone(&self.inner);
        *self.inner.driver.lock() = Some(tokio::spawn(drive(inner, event_rx)));

        tracing::info!(size = self.inner.config.size, "worker pool initialized");
        Ok(())
    }

    /// Submit a task. Returns immediately: `Ok` with a handle that settles
    /// when the worker responds (or the timeout fires), or
    /// `Err(NoIdleWorkers)` when no slot is idle right now.
    pub async fn submit(
        &self,
        task_type: impl Into<String>,
        task_data: Value,
    ) -> Result<TaskHandle, PoolError> {
        let task_type = task_type.into();

        let worker_id = {
            let workers = self.inner.workers.lock();
            workers
                .iter()
                .find(|(_, record)| record.status.is_idle())
                .map(|(id, _)| id.clone())
        };
        let worker_id = worker_id.ok_or(PoolError::NoIdleWorkers)?;

        let task_id = TaskId::new(self.inner.ids.next());
        let (responder, rx) = oneshot::channel();
        let now = self.inner.clock.now();
        self.inner.pending.lock().insert(
            task_id.clone(),
            PendingTask {
                task_type: task_type.clone(),
                submitted_at: now,
                responder,
            },
        );
        self.inner
            .scheduler
            .lock()
            .arm(task_id.clone(), self.inner.config.task_timeout, now);
        self.inner.deadline_wake.notify_one();

        tracing::debug!(
            task_id = %task_id,
            worker_id = %worker_id,
            task_type = %task_type,
            "dispatching task"
        );

        let message = PoolMessage::Task {
            task_id: task_id.clone(),
            task_type,
            task_data,
        };
        if let Err(err) = self.inner.adapter.send(&worker_id, message).await {
            // Unwind the registration; the failure is scoped to this call.
            self.inner.take_pending(&task_id);
            return Err(err.into());
        }

        Ok(TaskHandle { task_id, rx })
    }

    /// Submit a task and wait for it to settle.
    pub async fn execute_task(
        &self,
        task_type: impl Into<String>,
        task_data: Value,
    ) -> Result<Value, PoolError> {
        self.submit(task_type, task_data).await?.outcome().await
    }

    /// Force a timeout sweep over all pending tasks.
    ///
    /// Redundant with, but independent of, each task's armed deadline;
    /// external schedulers may call this on their own cadence. Returns
    /// the number of tasks failed by this sweep.
    pub fn check_timeouts(&self) -> usize {
        let now = self.inner.clock.now();
        let expired = self
            .inner
            .pending
            .lock()
            .expired(now, self.inner.config.task_timeout);
        expired
            .into_iter()
            .filter(|task_id| self.inner.fail_timed_out(task_id))
            .count()
    }

    /// Snapshot worker and pending-task counts.
    pub fn stats(&self) -> PoolStats {
        let (total, idle, busy, initializing) = {
            let workers = self.inner.workers.lock();
            let mut idle = 0;
            let mut busy = 0;
            let mut initializing = 0;
            for record in workers.values() {
                match record.status {
                    WorkerStatus::Idle => idle += 1,
                    WorkerStatus::Busy => busy += 1,
                    WorkerStatus::Initializing => initializing += 1,
                }
            }
            (workers.len(), idle, busy, initializing)
        };
        PoolStats {
            total_workers: total,
            idle_workers: idle,
            busy_workers: busy,
            initializing_workers: initializing,
            pending_tasks: self.inner.pending.lock().len(),
        }
    }

    /// Subscribe to pool events. Observers that lag lose events; pool
    /// behavior is unaffected.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    /// Terminate every worker unit and clear all state.
    ///
    /// Outstanding task handles settle with `PoolError::PoolShutDown`.
    pub async fn shutdown(&self) {
        if let Some(driver) = self.inner.driver.lock().take() {
            driver.abort();
        }

        let worker_ids: Vec<WorkerId> = self.inner.workers.lock().keys().cloned().collect();
        for worker_id in &worker_ids {
            if let Err(err) = self.inner.adapter.kill(worker_id).await {
                tracing::warn!(
                    worker_id = %worker_id,
                    error = %err,
                    "failed to kill worker during shutdown"
                );
            }
        }
        self.inner.workers.lock().clear();

        self.inner.scheduler.lock().clear();
        let abandoned = self.inner.pending.lock().drain();
        if !abandoned.is_empty() {
            tracing::warn!(pending = abandoned.len(), "shut down with tasks still pending");
        }
        for (_, task) in abandoned {
            let _ = task.responder.send(Err(PoolError::PoolShutDown));
        }

        tracing::info!("worker pool shut down");
    }

    /// Route one worker event, exactly as the driver would.
    #[cfg(test)]
    pub(crate) async fn handle_event(&self, event: WorkerEvent) {
        self.inner.handle_event(event).await;
    }
}

impl<W: WorkerAdapter, C: Clock, G: IdGen + 'static> PoolInner<W, C, G> {
    /// Spawn (or respawn) the unit for a slot and send its init message.
    ///
    /// The adapter wires the unit to the event channel before `spawn`
    /// returns, so nothing emitted during startup is lost. Respawning
    /// keeps the slot's position in the scan order.
    async fn provision(&self, worker_id: &WorkerId) -> Result<(), PoolError> {
        let handle = self
            .adapter
            .spawn(worker_id.clone(), self.event_tx.clone())
            .await?;
        self.workers.lock().insert(
            worker_id.clone(),
            WorkerRecord {
                status: WorkerStatus::Initializing,
                handle,
            },
        );
        self.adapter
            .send(
                worker_id,
                PoolMessage::Init {
                    worker_id: worker_id.clone(),
                    options: self.config.init_options(),
                },
            )
            .await?;
        Ok(())
    }

    async fn handle_event(&self, event: WorkerEvent) {
        let WorkerEvent { worker_id, signal } = event;
        match signal {
            WorkerSignal::Message(WorkerMessage::Status { worker_id, status }) => {
                self.handle_status(worker_id, status);
            }
            WorkerSignal::Message(WorkerMessage::Response { task_id, result }) => {
                self.handle_response(task_id, result);
            }
            WorkerSignal::Errored(error) => {
                // Observability only: tasks in flight on this worker are
                // not failed here, the per-task timeout is their backstop.
                tracing::warn!(worker_id = %worker_id, error = %error, "worker reported error");
                self.emit(PoolEvent::WorkerError { worker_id, error });
            }
            WorkerSignal::Exited(code) => self.handle_exit(worker_id, code).await,
        }
    }

    fn handle_status(&self, worker_id: WorkerId, status: WorkerStatus) {
        {
            let mut workers = self.workers.lock();
            let Some(record) = workers.get_mut(&worker_id) else {
                tracing::debug!(worker_id = %worker_id, "status from unknown worker dropped");
                return;
            };
            record.status = status;
        }
        self.emit(PoolEvent::WorkerStatus { worker_id, status });
    }

    fn handle_response(&self, task_id: TaskId, result: Value) {
        match self.take_pending(&task_id) {
            Some(task) => {
                let _ = task.responder.send(Ok(result));
            }
            None => {
                // Already timed out or never existed.
                tracing::debug!(task_id = %task_id, "response for unknown task dropped");
            }
        }
    }

    async fn handle_exit(&self, worker_id: WorkerId, code: i32) {
        let old_unit = {
            let workers = self.workers.lock();
            workers.get(&worker_id).map(|r| r.handle.unit_id.clone())
        };
        let Some(old_unit) = old_unit else {
            tracing::debug!(worker_id = %worker_id, "exit from unknown worker dropped");
            return;
        };
        if code == 0 {
            tracing::info!(worker_id = %worker_id, "worker exited cleanly, not replacing");
            return;
        }
        tracing::warn!(
            worker_id = %worker_id,
            code,
            old_unit = %old_unit,
            "worker exited abnormally, replacing"
        );
        match self.provision(&worker_id).await {
            Ok(()) => self.emit(PoolEvent::WorkerReplaced {
                worker_id,
                exit_code: code,
            }),
            Err(err) => {
                tracing::error!(
                    worker_id = %worker_id,
                    error = %err,
                    "failed to replace worker"
                );
            }
        }
    }

    /// Fire every armed deadline that has elapsed. Called by the driver.
    fn fire_due_deadlines(&self) {
        let now = self.clock.now();
        for task_id in self.scheduler.lock().fired(now) {
            self.fail_timed_out(&task_id);
        }
    }

    /// Settle a task as timed out. Returns false if it already settled.
    fn fail_timed_out(&self, task_id: &TaskId) -> bool {
        let Some(task) = self.take_pending(task_id) else {
            return false;
        };
        let timeout_ms = self.config.task_timeout.as_millis() as u64;
        tracing::warn!(task_id = %task_id, timeout_ms, "task timed out");
        self.emit(PoolEvent::TaskTimeout {
            task_id: task_id.clone(),
            task_type: task.task_type,
            timeout_ms,
        });
        let _ = task.responder.send(Err(PoolError::TaskTimedOut { timeout_ms }));
        true
    }

    /// Claim a pending task for settlement, disarming its deadline.
    ///
    /// The response path and both timeout paths all pass through here, so
    /// a task id can settle at most once.
    fn take_pending(&self, task_id: &TaskId) -> Option<PendingTask> {
        self.scheduler.lock().disarm(task_id);
        self.pending.lock().remove(task_id)
    }

    fn emit(&self, event: PoolEvent) {
        tracing::debug!(event = %event.log_summary(), "pool event");
        // Ignore send errors (no subscribers)
        let _ = self.events.send(event);
    }
}

/// Driver loop: routes worker events and fires armed deadlines.
async fn drive<W, C, G>(inner: Arc<PoolInner<W, C, G>>, mut event_rx: mpsc::Receiver<WorkerEvent>)
where
    W: WorkerAdapter,
    C: Clock,
    G: IdGen + 'static,
{
    loop {
        let next = inner.scheduler.lock().next_deadline();
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => inner.handle_event(event).await,
                None => break,
            },
            _ = inner.deadline_wake.notified() => {
                // A new deadline was armed; recompute the sleep.
            }
            _ = deadline_sleep(next) => {
                inner.fire_due_deadlines();
            }
        }
    }
}

async fn deadline_sleep(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
