//! The worker task pool.
//!
//! A fixed number of worker threads drain two queues. Priority workers
//! service only the priority queue; mixed workers prefer priority work,
//! falling back to the standard queue. Every priority enqueue also pushes
//! a wake sentinel onto the standard queue so a standard worker re-checks
//! priority work instead of leaving it starving behind a backlog of
//! blocked standard workers.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::error::{TaskError, TaskResult};
use crate::task::TaskObject;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

enum StandardItem {
    Task(Job),
    Wake,
}

#[derive(Default)]
struct Queues {
    priority: Mutex<VecDeque<Job>>,
    priority_cond: Condvar,
    standard: Mutex<VecDeque<StandardItem>>,
    standard_cond: Condvar,
}

fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl Queues {
    fn push_priority(&self, job: Job) {
        relock(self.priority.lock()).push_back(job);
        self.priority_cond.notify_one();
        // Sentinel: wake a standard worker to re-check priority work.
        relock(self.standard.lock()).push_back(StandardItem::Wake);
        self.standard_cond.notify_one();
    }

    fn push_standard(&self, job: Job) {
        relock(self.standard.lock()).push_back(StandardItem::Task(job));
        self.standard_cond.notify_one();
    }

    fn pop_priority_blocking(&self) -> Job {
        let mut queue = relock(self.priority.lock());
        loop {
            if let Some(job) = queue.pop_front() {
                return job;
            }
            queue = relock(self.priority_cond.wait(queue));
        }
    }

    fn try_pop_priority(&self) -> Option<Job> {
        relock(self.priority.lock()).pop_front()
    }

    fn pop_standard_blocking(&self) -> StandardItem {
        let mut queue = relock(self.standard.lock());
        loop {
            if let Some(item) = queue.pop_front() {
                return item;
            }
            queue = relock(self.standard_cond.wait(queue));
        }
    }
}

/// A bounded pool of worker threads with a priority and a standard queue.
pub struct TaskPool {
    queues: Arc<Queues>,
    worker_count: usize,
    priority_count: usize,
}

impl TaskPool {
    /// Create a pool with `worker_count` threads, of which
    /// `priority_count` service only the priority queue.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidSizing`] unless
    /// `0 < worker_count` and `priority_count < worker_count` (at least
    /// one worker must be able to service standard tasks), or
    /// [`TaskError::Spawn`] if a worker thread cannot be started.
    pub fn new(worker_count: usize, priority_count: usize) -> TaskResult<Self> {
        if worker_count == 0 {
            return Err(TaskError::InvalidSizing(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if priority_count >= worker_count {
            return Err(TaskError::InvalidSizing(format!(
                "priority_count ({priority_count}) must be less than worker_count ({worker_count})"
            )));
        }

        let queues = Arc::new(Queues::default());
        for index in 0..worker_count {
            let priority_only = index < priority_count;
            let queues = Arc::clone(&queues);
            let name = if priority_only {
                format!("arbor-task-priority-{index}")
            } else {
                format!("arbor-task-{index}")
            };
            std::thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(&queues, priority_only))?;
        }

        debug!(worker_count, priority_count, "started task pool");
        Ok(Self {
            queues,
            worker_count,
            priority_count,
        })
    }

    /// Schedule a closure, returning a handle to wait on its result.
    pub fn spawn<T, F>(&self, f: F, important: bool) -> Arc<TaskObject<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let task = Arc::new(TaskObject::new(important));
        let runner = Arc::clone(&task);
        self.submit(Box::new(move || runner.exec(f)), important);
        task
    }

    /// Place a prepared job on the relevant queue.
    pub(crate) fn submit(&self, job: Job, important: bool) {
        if important {
            self.queues.push_priority(job);
        } else {
            self.queues.push_standard(job);
        }
    }

    /// Total worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Workers dedicated to the priority queue.
    #[must_use]
    pub fn priority_count(&self) -> usize {
        self.priority_count
    }

    /// Current queue depths `(priority, standard)`; the standard depth
    /// includes pending wake sentinels.
    #[must_use]
    pub fn queue_depths(&self) -> (usize, usize) {
        let priority = relock(self.queues.priority.lock()).len();
        let standard = relock(self.queues.standard.lock()).len();
        (priority, standard)
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("worker_count", &self.worker_count)
            .field("priority_count", &self.priority_count)
            .finish_non_exhaustive()
    }
}

fn worker_loop(queues: &Queues, priority_only: bool) {
    loop {
        let job = if priority_only {
            queues.pop_priority_blocking()
        } else if let Some(job) = queues.try_pop_priority() {
            job
        } else {
            match queues.pop_standard_blocking() {
                // Re-check the priority queue before resuming standard work.
                StandardItem::Wake => continue,
                StandardItem::Task(job) => job,
            }
        };
        job();
    }
}

/// Spawn a named thread whose entry point catches panics, so a
/// misbehaving body never crashes the process.
///
/// # Errors
///
/// Returns [`TaskError::Spawn`] if the OS refuses the thread.
pub fn spawn_thread<F>(name: &str, f: F) -> TaskResult<std::thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let thread_name = name.to_string();
    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
                error!(thread = %thread_name, "panic in thread");
            }
        })
        .map_err(TaskError::Spawn)
}
