//! Outbound call timeout classification.
//!
//! Synchronous outbound calls from within a handler block the calling
//! worker thread. An optional deadline turns expiry into the distinct
//! timeout failure the dispatcher maps to its own status; the call body
//! itself is never cancelled - it runs to completion or fails on its
//! own.

use std::sync::Arc;
use std::time::Duration;

use arbor_core::{FrameworkError, FrameworkResult};
use arbor_tasks::TaskPool;
use tracing::warn;

/// Run a blocking call, bounding the wait with an optional timeout.
///
/// Without a timeout the call runs inline on the current thread. With
/// one, it runs as a priority pool task while the caller waits on the
/// completion signal; if the deadline expires first the abandoned body
/// keeps running to completion on its worker.
///
/// # Errors
///
/// Returns [`FrameworkError::Timeout`] on deadline expiry, a handler
/// error if the call body panicked, or the body's own error.
pub fn call_with_timeout<T, F>(
    pool: &Arc<TaskPool>,
    timeout: Option<Duration>,
    f: F,
) -> FrameworkResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FrameworkResult<T> + Send + 'static,
{
    let Some(timeout) = timeout else {
        return f();
    };

    let task = pool.spawn(f, true);
    if !task.wait_timeout(timeout) {
        warn!(seconds = timeout.as_secs(), "outbound call timed out");
        return Err(FrameworkError::Timeout {
            seconds: timeout.as_secs(),
        });
    }
    task.take_result()
        .unwrap_or_else(|| Err(FrameworkError::handler("outbound call panicked")))
}
