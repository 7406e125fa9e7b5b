//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_tasks::prelude::*;` to import all essential types.

// Errors
pub use crate::{TaskError, TaskResult};

// Named primitives
pub use crate::{
    Keyed, LockGuard, NamedEvent, NamedLock, NamedSemaphore, PrimitiveKey, PrimitiveRegistry,
};

// Pool and tasks
pub use crate::{TaskObject, TaskPool, Wait, spawn_thread, wait_for_tasks};

// Derived queues
pub use crate::{BlockingTaskQueue, LimitingTaskQueue};
