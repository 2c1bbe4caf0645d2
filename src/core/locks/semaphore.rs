use crate::core::atomic;
use crate::core::types::{SemaphoreOverflow, WaitTimedOut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// A counting semaphore with a lock-free fast path
///
/// The whole semaphore is one atomic counter in `[0, u32::MAX]`. Posting and
/// waiting are compare-and-swap loops; a waiter that observes zero blocks on
/// the counter's address via the atomic wait primitive and retries when
/// woken. There is no waiter queue, and consequently no ordering guarantee
/// among threads blocked at the same time.
///
/// Posting at the maximum saturates with [`SemaphoreOverflow`] rather than
/// wrapping, which catches post/wait mismatches. Waits are not cancellation
/// points.
///
/// # Example
///
/// ```no_run
/// use portsync::Semaphore;
/// use std::sync::Arc;
/// use std::thread;
///
/// let ready = Arc::new(Semaphore::new(0));
/// let ready2 = Arc::clone(&ready);
///
/// thread::spawn(move || {
///     // ... produce something ...
///     ready2.post().unwrap();
/// });
///
/// ready.wait(); // blocks until the post above
/// ```
pub struct Semaphore {
    value: AtomicU32,
}

impl Semaphore {
    /// Create a new semaphore with the given initial count
    pub const fn new(value: u32) -> Self {
        Semaphore {
            value: AtomicU32::new(value),
        }
    }

    /// Increment the counter, waking one blocked waiter if any
    ///
    /// # Returns
    /// `Err(SemaphoreOverflow)` if the counter is already at `u32::MAX`;
    /// the counter is left unchanged in that case.
    pub fn post(&self) -> Result<(), SemaphoreOverflow> {
        let mut expected = self.value.load(Ordering::Relaxed);
        loop {
            if expected == u32::MAX {
                return Err(SemaphoreOverflow);
            }
            match self.value.compare_exchange_weak(
                expected,
                expected + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => expected = current,
            }
        }

        // Harmless no-op when nobody is blocked
        atomic::notify_one(&self.value);
        Ok(())
    }

    /// Decrement the counter, blocking while it is zero
    pub fn wait(&self) {
        let mut expected = 1;
        loop {
            match self.value.compare_exchange_weak(
                expected,
                expected - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(0) => {
                    atomic::wait(&self.value, 0);
                    expected = 1;
                }
                Err(current) => expected = current,
            }
        }
    }

    /// Decrement the counter, blocking at most until `deadline`
    ///
    /// A deadline already in the past on a zero counter times out
    /// immediately. On timeout the counter is left unchanged.
    ///
    /// # Returns
    /// `Ok(())` once a decrement succeeded, `Err(WaitTimedOut)` if the
    /// deadline elapsed first.
    pub fn wait_until(&self, deadline: Instant) -> Result<(), WaitTimedOut> {
        let mut expected = 1;
        loop {
            match self.value.compare_exchange_weak(
                expected,
                expected - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(0) => {
                    if atomic::wait_until(&self.value, 0, deadline).timed_out() {
                        return Err(WaitTimedOut);
                    }
                    expected = 1;
                }
                Err(current) => expected = current,
            }
        }
    }

    /// Current counter value; racy, for diagnostics only
    pub fn value(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }
}
