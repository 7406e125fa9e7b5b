//! Task objects.
//!
//! A [`TaskObject`] pairs a unit of work with a completion signal and a
//! result slot. The body is executed exactly once; the completion signal
//! is set exactly once, even if the body panics, so waiters never hang.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use crate::primitives::NamedEvent;

/// A scheduled unit of work with a blocking result.
#[derive(Debug)]
pub struct TaskObject<T> {
    complete: NamedEvent,
    result: Mutex<Option<T>>,
    important: bool,
}

impl<T: Send + 'static> TaskObject<T> {
    /// Create an unscheduled task object. The pool and derived queues
    /// call this internally; it is public so embedders can build their
    /// own scheduling adapters.
    #[must_use]
    pub fn new(important: bool) -> Self {
        Self {
            complete: NamedEvent::unregistered(),
            result: Mutex::new(None),
            important,
        }
    }

    /// Whether this task goes on the priority queue.
    #[must_use]
    pub fn important(&self) -> bool {
        self.important
    }

    /// Block the calling thread until the task has completed.
    pub fn wait(&self) {
        self.complete.wait();
    }

    /// Whether the task has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.is_set()
    }

    /// Block until the task completes or the timeout expires. Returns
    /// whether the task completed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        self.complete.wait_timeout(timeout)
    }

    /// Block until the task completes, then return its result.
    ///
    /// Returns `None` if the body panicked; the panic is logged where it
    /// occurred and waiters are still released.
    #[must_use]
    pub fn result(&self) -> Option<T>
    where
        T: Clone,
    {
        self.complete.wait();
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Block until the task completes, then move the result out.
    ///
    /// Later calls (and calls after a panicked body) return `None`.
    #[must_use]
    pub fn take_result(&self) -> Option<T> {
        self.complete.wait();
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Run the body, store its result, and fire the completion signal.
    ///
    /// The signal fires on every exit path. A panicking body is caught
    /// and logged; the result slot stays empty.
    pub(crate) fn exec<F: FnOnce() -> T>(&self, f: F) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        match outcome {
            Ok(value) => {
                *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(panic = %message, "task body panicked");
            }
        }
        self.complete.set();
    }
}

/// Anything that can be waited on for completion.
pub trait Wait {
    /// Block the calling thread until complete.
    fn wait(&self);
}

impl<T: Send + 'static> Wait for TaskObject<T> {
    fn wait(&self) {
        TaskObject::wait(self);
    }
}

impl<T: Send + 'static> Wait for Arc<TaskObject<T>> {
    fn wait(&self) {
        TaskObject::wait(self);
    }
}

/// Block until every listed task has completed.
pub fn wait_for_tasks<'a>(tasks: impl IntoIterator<Item = &'a dyn Wait>) {
    for task in tasks {
        task.wait();
    }
}
