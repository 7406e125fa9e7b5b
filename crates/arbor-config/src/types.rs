//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Task pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPoolConfig {
    /// Total worker threads in the pool.
    pub maximum_threads: usize,
    /// Workers that service only the priority queue. Must be strictly
    /// less than `maximum_threads` so standard work can always progress.
    pub priority_threads: usize,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            maximum_threads: 8,
            priority_threads: 2,
        }
    }
}

/// Cache tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Root directory holding every cache namespace.
    pub root: PathBuf,
    /// Default cache time hint, in seconds, applied to responses whose
    /// handler did not set one.
    pub default_cache_time: u64,
    /// Item-count bound applied when trimming the response cache.
    pub max_items: usize,
    /// Byte-size bound applied when trimming the response cache.
    pub max_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Caches"),
            default_cache_time: 0,
            max_items: 1024,
            max_size: 52_428_800,
        }
    }
}

/// Tunables consumed by the runtime components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
pub struct RuntimeConfig {
    /// Base log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,
    /// When set, handler failures return full detail in the body and
    /// log frames are not elided.
    pub debug: bool,
    /// When set, a policy violation at plugin load aborts the load
    /// instead of only being logged.
    pub hardened: bool,
    /// Default timeout for outbound calls, in seconds.
    pub default_network_timeout: u64,
    /// Task pool sizing.
    pub task_pool: TaskPoolConfig,
    /// Cache tunables.
    pub cache: CacheConfig,
}

impl RuntimeConfig {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Invalid`] if the pool sizing leaves
    /// no worker able to service standard tasks, or the pool is empty.
    pub fn validate(&self) -> crate::ConfigResult<()> {
        if self.task_pool.maximum_threads == 0 {
            return Err(crate::ConfigError::Invalid(
                "task_pool.maximum_threads must be at least 1".to_string(),
            ));
        }
        if self.task_pool.priority_threads >= self.task_pool.maximum_threads {
            return Err(crate::ConfigError::Invalid(format!(
                "task_pool.priority_threads ({}) must be less than maximum_threads ({})",
                self.task_pool.priority_threads, self.task_pool.maximum_threads
            )));
        }
        Ok(())
    }
}
