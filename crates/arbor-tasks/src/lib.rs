//! Arbor Tasks - Worker pool and named synchronization primitives.
//!
//! This crate provides:
//! - Process-wide named locks, events, and counting semaphores, keyed by
//!   string or by the identity of a shared object
//! - [`TaskObject`], a unit of work executed exactly once whose completion
//!   signal fires even if the body panics
//! - [`TaskPool`], a fixed set of worker threads draining a priority and a
//!   standard queue
//! - Derived queues: [`BlockingTaskQueue`] (gated on an event) and
//!   [`LimitingTaskQueue`] (bounding in-flight tasks from one source)
//!
//! # Example
//!
//! ```
//! use arbor_tasks::{PrimitiveRegistry, TaskPool};
//!
//! # fn main() -> Result<(), arbor_tasks::TaskError> {
//! let registry = PrimitiveRegistry::new();
//! let pool = TaskPool::new(4, 1)?;
//!
//! let lock = registry.lock("refresh");
//! lock.acquire();
//! let task = pool.spawn(|| 21 * 2, false);
//! lock.release();
//!
//! assert_eq!(task.result(), Some(42));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod pool;
mod primitives;
mod queue;
mod task;

pub use error::{TaskError, TaskResult};
pub use pool::{TaskPool, spawn_thread};
pub use primitives::{
    Keyed, LockGuard, NamedEvent, NamedLock, NamedSemaphore, PrimitiveKey, PrimitiveRegistry,
};
pub use queue::{BlockingTaskQueue, LimitingTaskQueue};
pub use task::{TaskObject, Wait, wait_for_tasks};
