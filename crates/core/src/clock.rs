// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source abstraction.
//!
//! Every time-dependent code path (deadline arming, timeout sweeps, event
//! timestamps) reads time through a `Clock` so tests can advance time
//! without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at a fixed epoch and only moves when `advance` is called.
#[derive(Debug, Clone)]
pub struct FakeClock {
    start: Instant,
    epoch_start_ms: u64,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Fixed wall-clock origin for fake time.
    const EPOCH_START_MS: u64 = 1_700_000_000_000;

    /// Create a fake clock at the fixed origin.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            epoch_start_ms: Self::EPOCH_START_MS,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `duration`. Clones share the same timeline.
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock();
        *offset += duration;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }

    fn epoch_ms(&self) -> u64 {
        self.epoch_start_ms + self.offset.lock().as_millis() as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
