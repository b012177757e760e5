//! Wait queue: sleeping threads plus registered poll observers.
//!
//! Threads sleep on a condition variable paired with the channel lock, so
//! the lock is released while asleep and reacquired before `wait` returns.
//! Poll observers are one-shot wakers with their own small lock, like the
//! spinlock inside a kernel wait queue head.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Waker;

use parking_lot::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    condvar: Condvar,
    /// Threads currently inside `wait`.
    sleepers: AtomicUsize,
    observers: Mutex<Vec<Waker>>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleep until woken, releasing `guard` for the duration.
    ///
    /// Callers re-check their condition afterwards; wake-ups may be spurious.
    pub(crate) fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.sleepers.fetch_add(1, Ordering::Relaxed);
        self.condvar.wait(guard);
        self.sleepers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Wake one sleeping thread and every registered observer.
    pub(crate) fn wake_one(&self) {
        self.condvar.notify_one();
        self.wake_observers();
    }

    /// Wake every sleeping thread and every registered observer.
    pub(crate) fn wake_all(&self) {
        self.condvar.notify_all();
        self.wake_observers();
    }

    /// Register a poll observer until the next wake-up of this queue.
    pub(crate) fn register(&self, waker: &Waker) {
        let mut observers = self.observers.lock();
        if !observers.iter().any(|w| w.will_wake(waker)) {
            observers.push(waker.clone());
        }
    }

    pub(crate) fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::Relaxed)
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    fn wake_observers(&self) {
        let observers = std::mem::take(&mut *self.observers.lock());
        for waker in observers {
            waker.wake();
        }
    }
}
