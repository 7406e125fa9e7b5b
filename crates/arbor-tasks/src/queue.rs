//! Derived task queues.
//!
//! Both queues feed an underlying [`TaskPool`] from their own feeder
//! thread, so a gated or throttled source never blocks the caller that
//! enqueues work.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::TaskResult;
use crate::pool::{Job, TaskPool, spawn_thread};
use crate::primitives::{NamedEvent, NamedSemaphore};
use crate::task::TaskObject;

/// A queued job, or the end sentinel that terminates the feeder.
type FeedItem = Option<(Job, bool)>;

#[derive(Default)]
struct FeedState {
    items: Mutex<VecDeque<FeedItem>>,
    cond: Condvar,
}

fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl FeedState {
    fn push(&self, item: FeedItem) {
        relock(self.items.lock()).push_back(item);
        self.cond.notify_one();
    }

    fn pop_blocking(&self) -> FeedItem {
        let mut items = relock(self.items.lock());
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            items = relock(self.cond.wait(items));
        }
    }

    fn len(&self) -> usize {
        relock(self.items.lock()).len()
    }
}

/// A queue that releases tasks into the pool only once a gating event
/// fires. The gate is re-checked before every release, so clearing the
/// event pauses the flow again.
pub struct BlockingTaskQueue {
    state: Arc<FeedState>,
}

impl BlockingTaskQueue {
    /// Create the queue and start its feeder thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the feeder thread cannot be spawned.
    pub fn new(pool: Arc<TaskPool>, gate: Arc<NamedEvent>) -> TaskResult<Self> {
        let state = Arc::new(FeedState::default());
        let feed = Arc::clone(&state);
        spawn_thread("arbor-blocking-queue", move || {
            loop {
                gate.wait();
                match feed.pop_blocking() {
                    Some((job, important)) => pool.submit(job, important),
                    None => break,
                }
            }
            debug!("finished dispatching queued tasks to the pool - ending the thread");
        })?;
        Ok(Self { state })
    }

    /// Enqueue a closure behind the gate.
    pub fn add_task<T, F>(&self, f: F, important: bool) -> Arc<TaskObject<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let task = Arc::new(TaskObject::new(important));
        let runner = Arc::clone(&task);
        self.state
            .push(Some((Box::new(move || runner.exec(f)), important)));
        task
    }

    /// Stop the feeder thread once every queued task has been released.
    pub fn end(&self) {
        self.state.push(None);
    }

    /// Tasks still waiting behind the gate.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.len()
    }
}

/// A queue bounding how many of its tasks are in flight at once, via a
/// counting semaphore that is independent of the pool's worker budget.
pub struct LimitingTaskQueue {
    state: Arc<FeedState>,
}

impl LimitingTaskQueue {
    /// Create the queue and start its feeder thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the feeder thread cannot be spawned.
    pub fn new(pool: Arc<TaskPool>, limit: usize) -> TaskResult<Self> {
        let state = Arc::new(FeedState::default());
        let feed = Arc::clone(&state);
        let semaphore = Arc::new(NamedSemaphore::new(limit));
        spawn_thread("arbor-limiting-queue", move || {
            loop {
                match feed.pop_blocking() {
                    Some((job, important)) => {
                        semaphore.acquire();
                        let permit = Arc::clone(&semaphore);
                        pool.submit(
                            Box::new(move || {
                                job();
                                permit.release();
                            }),
                            important,
                        );
                    }
                    None => break,
                }
            }
            debug!("finished dispatching queued tasks to the pool - ending the thread");
        })?;
        Ok(Self { state })
    }

    /// Enqueue a closure behind the concurrency limit.
    pub fn add_task<T, F>(&self, f: F, important: bool) -> Arc<TaskObject<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let task = Arc::new(TaskObject::new(important));
        let runner = Arc::clone(&task);
        self.state
            .push(Some((Box::new(move || runner.exec(f)), important)));
        task
    }

    /// Stop the feeder thread once every queued task has been released.
    pub fn end(&self) {
        self.state.push(None);
    }

    /// Tasks not yet released into the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.len()
    }
}
