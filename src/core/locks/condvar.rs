use crate::core::locks::mutex::MutexGuard;
use crate::core::types::WaitStatus;
use crate::core::{atomic, cancel};
use parking_lot::Mutex as ParkingLotMutex;
use std::collections::VecDeque;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// One blocked thread's entry in the waiter queue
///
/// Lives for the duration of a single wait call. The wake counter is the
/// address the thread blocks on; bumping it and notifying that address is
/// what wakes the thread. `queued` mirrors list membership and is only
/// written under the condvar's internal lock.
struct Waiter {
    value: AtomicU32,
    queued: AtomicBool,
}

impl Waiter {
    fn new() -> Self {
        Waiter {
            value: AtomicU32::new(0),
            queued: AtomicBool::new(true),
        }
    }
}

/// A condition variable built from a mutex and atomic wait/notify
///
/// Condvar provides the standard wait/notify interface for use with the
/// crate's [`Mutex`](crate::Mutex), without relying on any native condition
/// variable support. Waiting threads queue themselves on the condvar, drop
/// the caller's mutex, and block on a private wake counter; notifying
/// detaches entries from the queue and wakes their counters.
///
/// Waits can return spuriously and make no fairness promise, so callers
/// must re-check their predicate in a loop (or use
/// [`wait_while`](Condvar::wait_while)).
///
/// # Example
///
/// ```no_run
/// use portsync::{Condvar, Mutex};
/// use std::sync::Arc;
/// use std::thread;
///
/// let pair = Arc::new((Mutex::new(false), Condvar::new()));
/// let pair2 = Arc::clone(&pair);
///
/// thread::spawn(move || {
///     let (lock, cvar) = &*pair2;
///     let mut started = lock.lock();
///     *started = true;
///     cvar.notify_one();
/// });
///
/// let (lock, cvar) = &*pair;
/// let mut started = lock.lock();
/// while !*started {
///     let _ = cvar.wait(&mut started);
/// }
/// ```
pub struct Condvar {
    /// Waiter queue, front = most recently arrived
    ///
    /// Notifiers may run without holding the caller's mutex, so the queue
    /// needs its own lock to keep the links and the waiters' lifetimes
    /// consistent. It is held only for short link/unlink/notify sections,
    /// never while a thread sleeps.
    waiters: ParkingLotMutex<VecDeque<Arc<Waiter>>>,
}

impl Condvar {
    /// Create a new Condvar with no waiters
    pub fn new() -> Self {
        Condvar {
            waiters: ParkingLotMutex::new(VecDeque::new()),
        }
    }

    /// Queue a new waiter at the front of the list
    fn enqueue(&self, waiter: &Arc<Waiter>) {
        self.waiters.lock().push_front(Arc::clone(waiter));
    }

    /// Remove `waiter` from the queue if a notifier has not already done so
    fn unlink(&self, waiter: &Arc<Waiter>) {
        let mut waiters = self.waiters.lock();
        if waiter.queued.load(Ordering::Relaxed) {
            if let Some(pos) = waiters.iter().position(|w| Arc::ptr_eq(w, waiter)) {
                waiters.remove(pos);
            }
            waiter.queued.store(false, Ordering::Relaxed);
        }
    }

    /// Bump a detached waiter's wake counter and wake its thread
    fn wake(waiter: &Waiter) {
        waiter.queued.store(false, Ordering::Relaxed);
        waiter.value.fetch_add(1, Ordering::Relaxed);
        atomic::notify_one(&waiter.value);
    }

    /// All wait variants funnel through here
    ///
    /// Protocol:
    /// 1. queue a waiter (caller's mutex still held, so a notifier holding
    ///    that mutex cannot miss us);
    /// 2. register the wake counter as this thread's cancellation target and
    ///    re-check for a request that raced in before registration;
    /// 3. drop the caller's mutex and block on the wake counter;
    /// 4. unlink if still queued, re-acquire the caller's mutex, deregister
    ///    and re-check cancellation.
    ///
    /// The caller's mutex is held again whenever this returns, including on
    /// the cancelled paths.
    fn wait_inner<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Option<Instant>) -> WaitStatus {
        debug_assert!(
            crate::core::tracker::is_marked(guard.lock_addr()),
            "condvar wait requires the caller to hold the mutex"
        );

        let waiter = Arc::new(Waiter::new());
        self.enqueue(&waiter);

        let registration = cancel::register_wait_address(&waiter.value);
        if cancel::is_pending() {
            self.unlink(&waiter);
            return WaitStatus::Cancelled;
        }

        let status = guard.unlocked(|| {
            let status = cancel::wait_interruptible(&waiter.value, 0, deadline);
            self.unlink(&waiter);
            status
        });

        drop(registration);
        if cancel::is_pending() {
            WaitStatus::Cancelled
        } else {
            status
        }
    }

    /// Block until notified, releasing the mutex while blocked
    ///
    /// Atomically with respect to notifiers holding the same mutex, the
    /// calling thread is queued and `guard`'s mutex released; the mutex is
    /// re-acquired before this returns.
    ///
    /// # Arguments
    /// * `guard` - Guard for the mutex protecting the caller's predicate
    ///
    /// # Returns
    /// [`WaitStatus::Woken`] (possibly spurious) or [`WaitStatus::Cancelled`]
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) -> WaitStatus {
        self.wait_inner(guard, None)
    }

    /// Block until notified or until a monotonic deadline passes
    ///
    /// A deadline already in the past reports [`WaitStatus::TimedOut`]
    /// without blocking. Timing out says nothing about the caller's
    /// predicate; re-check it either way.
    pub fn wait_until<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> WaitStatus {
        self.wait_inner(guard, Some(deadline))
    }

    /// Block until notified, for at most `timeout`
    pub fn wait_timeout<T>(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> WaitStatus {
        self.wait_inner(guard, Some(Instant::now() + timeout))
    }

    /// Block until notified or until a wall-clock deadline passes
    ///
    /// The deadline is mapped onto the monotonic clock at call time, so a
    /// subsequent wall-clock adjustment does not move it.
    pub fn wait_until_wall<T>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: SystemTime,
    ) -> WaitStatus {
        let deadline = match deadline.duration_since(SystemTime::now()) {
            Ok(delay) => Instant::now() + delay,
            // Already elapsed
            Err(_) => Instant::now(),
        };
        self.wait_inner(guard, Some(deadline))
    }

    /// Block until `condition` returns false
    ///
    /// Re-checks `condition` after every wake-up, absorbing spurious ones.
    ///
    /// # Returns
    /// [`WaitStatus::Woken`] once the condition no longer holds, or
    /// [`WaitStatus::Cancelled`] if the wait was interrupted first
    pub fn wait_while<T, F>(&self, guard: &mut MutexGuard<'_, T>, mut condition: F) -> WaitStatus
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(guard.deref_mut()) {
            if self.wait(guard).cancelled() {
                return WaitStatus::Cancelled;
            }
        }
        WaitStatus::Woken
    }

    /// Block until `condition` returns false, for at most `timeout`
    pub fn wait_timeout_while<T, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
        mut condition: F,
    ) -> WaitStatus
    where
        F: FnMut(&mut T) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while condition(guard.deref_mut()) {
            let status = self.wait_until(guard, deadline);
            if status.timed_out() || status.cancelled() {
                return status;
            }
        }
        WaitStatus::Woken
    }

    /// Wake one blocked thread
    ///
    /// Detaches the most recently arrived waiter still in the queue and
    /// wakes it. A no-op if nothing is waiting; notifications are not
    /// buffered.
    pub fn notify_one(&self) {
        let mut waiters = self.waiters.lock();
        if let Some(waiter) = waiters.pop_front() {
            Self::wake(&waiter);
        }
    }

    /// Wake every blocked thread
    ///
    /// The whole queue is detached at once, then each detached waiter is
    /// woken in turn. The internal lock is held until all of them have been
    /// signalled so none can be torn down mid-wake.
    pub fn notify_all(&self) {
        let mut waiters = self.waiters.lock();
        let detached = std::mem::take(&mut *waiters);
        for waiter in &detached {
            Self::wake(waiter);
        }
        drop(waiters);
    }

    /// Number of threads currently queued; racy, for diagnostics only
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Condvar {
    fn drop(&mut self) {
        // Dropping a condvar out from under blocked threads is a contract
        // violation; they would sleep forever.
        debug_assert!(
            self.waiters.get_mut().is_empty(),
            "condition variable dropped with waiters still queued"
        );
    }
}
