// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool configuration

use farmhand_core::InitOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker units provisioned at initialization.
    pub size: usize,
    /// Advisory cap on concurrent in-flight tasks. Forwarded to workers
    /// in their init options; dispatch does not enforce it.
    pub max_concurrent: u32,
    /// Maximum time a submitted task may remain unresolved.
    #[serde(rename = "task_timeout_ms", with = "duration_ms")]
    pub task_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 4,
            max_concurrent: 8,
            task_timeout: Duration::from_millis(30_000),
        }
    }
}

impl PoolConfig {
    /// The wire form of these options, sent to every unit at init.
    pub(crate) fn init_options(&self) -> InitOptions {
        InitOptions {
            max_concurrent: self.max_concurrent,
            task_timeout_ms: self.task_timeout.as_millis() as u64,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
