//! Named synchronization primitives.
//!
//! Locks, events, and counting semaphores shared process-wide under a
//! stable key. Equal keys always resolve to the same primitive instance
//! for the process lifetime; acquiring an unknown key silently creates
//! the primitive.
//!
//! Acquire/release must be explicitly paired by callers. Releasing a
//! primitive that was never acquired is logged and treated as a no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::error;

/// A stable registry key: a name, or the identity of a shared object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKey {
    /// A caller-chosen name.
    Name(String),
    /// The address of a shared allocation.
    Identity(usize),
}

impl fmt::Display for PrimitiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Identity(addr) => write!(f, "#{addr:x}"),
        }
    }
}

/// Conversion into a [`PrimitiveKey`].
///
/// Strings key by value. Shared handles key by the identity of the
/// **underlying** allocation, so any wrapper that forwards to the same
/// object produces the same key: two clones of one `Arc` — or two proxy
/// layers around it — always contend on the same primitive.
pub trait Keyed {
    /// The registry key for this value.
    fn primitive_key(&self) -> PrimitiveKey;
}

impl Keyed for str {
    fn primitive_key(&self) -> PrimitiveKey {
        PrimitiveKey::Name(self.to_owned())
    }
}

impl Keyed for String {
    fn primitive_key(&self) -> PrimitiveKey {
        PrimitiveKey::Name(self.clone())
    }
}

impl<T: ?Sized> Keyed for Arc<T> {
    fn primitive_key(&self) -> PrimitiveKey {
        PrimitiveKey::Identity(Arc::as_ptr(self).cast::<()>() as usize)
    }
}

impl<K: Keyed + ?Sized> Keyed for &K {
    fn primitive_key(&self) -> PrimitiveKey {
        (**self).primitive_key()
    }
}

/// Recover a usable guard from a poisoned mutex.
///
/// Task bodies run under a panic trampoline, so a poisoned primitive
/// state is still internally consistent.
fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// A named mutual-exclusion lock with explicit acquire/release pairing.
///
/// Acquisition order is ordinary mutex fairness; FIFO is not guaranteed.
/// The lock is not reentrant.
#[derive(Debug)]
pub struct NamedLock {
    key: PrimitiveKey,
    held: Mutex<bool>,
    cond: Condvar,
}

impl NamedLock {
    fn new(key: PrimitiveKey) -> Self {
        Self {
            key,
            held: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Block until the lock is acquired.
    pub fn acquire(&self) {
        let mut held = relock(self.held.lock());
        while *held {
            held = relock(self.cond.wait(held));
        }
        *held = true;
    }

    /// Acquire the lock if it is free, without blocking.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut held = relock(self.held.lock());
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    /// Acquire the lock for the current scope, releasing on drop.
    ///
    /// Callers otherwise pair acquire/release explicitly; this is the
    /// framework-owned call site that auto-releases.
    #[must_use]
    pub fn acquire_scoped(&self) -> LockGuard<'_> {
        self.acquire();
        LockGuard { lock: self }
    }

    /// Release the lock.
    ///
    /// Releasing a lock that is not held is logged as an error and
    /// treated as a no-op; `false` is returned.
    pub fn release(&self) -> bool {
        let mut held = relock(self.held.lock());
        if *held {
            *held = false;
            drop(held);
            self.cond.notify_one();
            true
        } else {
            error!(key = %self.key, "released a lock that was not acquired");
            false
        }
    }
}

/// Scoped acquisition of a [`NamedLock`]; releases on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a NamedLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.release();
    }
}

/// A named event: a latch threads can wait on until it is set.
#[derive(Debug)]
pub struct NamedEvent {
    key: PrimitiveKey,
    set: Mutex<bool>,
    cond: Condvar,
}

impl NamedEvent {
    fn new(key: PrimitiveKey) -> Self {
        Self {
            key,
            set: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// A free-standing event, not registered under any key.
    #[must_use]
    pub fn unregistered() -> Self {
        Self::new(PrimitiveKey::Name(String::new()))
    }

    /// Set the event, unblocking every waiting thread.
    pub fn set(&self) {
        let mut set = relock(self.set.lock());
        *set = true;
        drop(set);
        self.cond.notify_all();
    }

    /// Clear the event, causing subsequent waits to block.
    pub fn clear(&self) {
        let mut set = relock(self.set.lock());
        *set = false;
    }

    /// Whether the event is currently set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *relock(self.set.lock())
    }

    /// Block until the event is set.
    pub fn wait(&self) {
        let mut set = relock(self.set.lock());
        while !*set {
            set = relock(self.cond.wait(set));
        }
    }

    /// Block until the event is set or the timeout expires. Returns
    /// whether the event was set at return.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let mut set = relock(self.set.lock());
        while !*set {
            let Some(remaining) = timeout.checked_sub(start.elapsed()).filter(|d| !d.is_zero())
            else {
                return false;
            };
            let (guard, _) = self
                .cond
                .wait_timeout(set, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            set = guard;
        }
        true
    }

    /// The registry key this event was created under.
    #[must_use]
    pub fn key(&self) -> &PrimitiveKey {
        &self.key
    }
}

/// A named counting semaphore.
#[derive(Debug)]
pub struct NamedSemaphore {
    key: PrimitiveKey,
    limit: usize,
    permits: Mutex<usize>,
    cond: Condvar,
}

impl NamedSemaphore {
    fn with_key(key: PrimitiveKey, limit: usize) -> Self {
        Self {
            key,
            limit,
            permits: Mutex::new(limit),
            cond: Condvar::new(),
        }
    }

    /// A free-standing semaphore, not registered under any key.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_key(PrimitiveKey::Name(String::new()), limit)
    }

    /// Block until a permit is available, then take it.
    pub fn acquire(&self) {
        let mut permits = relock(self.permits.lock());
        while *permits == 0 {
            permits = relock(self.cond.wait(permits));
        }
        *permits = permits.saturating_sub(1);
    }

    /// Take a permit if one is available, without blocking.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut permits = relock(self.permits.lock());
        if *permits == 0 {
            false
        } else {
            *permits = permits.saturating_sub(1);
            true
        }
    }

    /// Return a permit.
    ///
    /// Releasing more times than acquired is logged as an error and
    /// treated as a no-op; `false` is returned.
    pub fn release(&self) -> bool {
        let mut permits = relock(self.permits.lock());
        if *permits >= self.limit {
            error!(key = %self.key, "released a semaphore that was not acquired");
            false
        } else {
            *permits = permits.saturating_add(1);
            drop(permits);
            self.cond.notify_one();
            true
        }
    }

    /// The permit limit this semaphore was created with.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Process-wide registry of named primitives.
///
/// One coarse lock guards each kind's map for registration; the returned
/// primitives carry their own fine-grained state for use.
#[derive(Debug, Default)]
pub struct PrimitiveRegistry {
    locks: Mutex<HashMap<PrimitiveKey, Arc<NamedLock>>>,
    events: Mutex<HashMap<PrimitiveKey, Arc<NamedEvent>>>,
    semaphores: Mutex<HashMap<PrimitiveKey, Arc<NamedSemaphore>>>,
}

impl PrimitiveRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock registered under `key`, created on first use.
    pub fn lock<K: Keyed + ?Sized>(&self, key: &K) -> Arc<NamedLock> {
        let key = key.primitive_key();
        let mut locks = relock(self.locks.lock());
        Arc::clone(
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(NamedLock::new(key))),
        )
    }

    /// The event registered under `key`, created on first use.
    pub fn event<K: Keyed + ?Sized>(&self, key: &K) -> Arc<NamedEvent> {
        let key = key.primitive_key();
        let mut events = relock(self.events.lock());
        Arc::clone(
            events
                .entry(key.clone())
                .or_insert_with(|| Arc::new(NamedEvent::new(key))),
        )
    }

    /// The semaphore registered under `key`, created on first use with
    /// the given permit limit. The limit of an existing semaphore is
    /// left untouched.
    pub fn semaphore<K: Keyed + ?Sized>(&self, key: &K, limit: usize) -> Arc<NamedSemaphore> {
        let key = key.primitive_key();
        let mut semaphores = relock(self.semaphores.lock());
        Arc::clone(
            semaphores
                .entry(key.clone())
                .or_insert_with(|| Arc::new(NamedSemaphore::with_key(key, limit))),
        )
    }

    /// Clear the named event, causing threads that wait on it to block.
    pub fn block_event<K: Keyed + ?Sized>(&self, key: &K) {
        self.event(key).clear();
    }

    /// Set the named event, unblocking any threads waiting on it.
    pub fn unblock_event<K: Keyed + ?Sized>(&self, key: &K) {
        self.event(key).set();
    }

    /// Block until the named event is set, or the timeout expires when
    /// one is given. Returns whether the event was set at return.
    pub fn wait_for_event<K: Keyed + ?Sized>(&self, key: &K, timeout: Option<Duration>) -> bool {
        let event = self.event(key);
        match timeout {
            Some(timeout) => event.wait_timeout(timeout),
            None => {
                event.wait();
                true
            }
        }
    }
}
