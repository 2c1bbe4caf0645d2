//! Futex-style atomic wait/notify
//!
//! The lowest-level building block of the crate: block a thread while a
//! 32-bit atomic holds an expected value, wake threads blocked on that
//! atomic's address. Implemented over `parking_lot_core`'s global parking
//! lot, which maps to futex syscalls on Linux and degrades gracefully
//! everywhere else.
//!
//! Waits here may return spuriously. Callers re-check whatever condition the
//! atomic encodes and wait again if it still holds.

use crate::core::types::WaitStatus;
use parking_lot_core::{ParkResult, ParkToken, UnparkToken, park, unpark_all, unpark_one};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

const TOKEN: ParkToken = ParkToken(0);

/// Parking-lot key for an atomic: its address
#[inline]
fn key_of(atomic: &AtomicU32) -> usize {
    atomic as *const AtomicU32 as usize
}

/// Park the calling thread on `key` while `validate` holds
///
/// `validate` runs under the parking lot's bucket lock, so it is ordered
/// against concurrent wake-ups on the same key: a wake issued after the
/// predicate was checked is never lost.
pub(crate) fn park_on(
    key: usize,
    validate: impl FnOnce() -> bool,
    deadline: Option<Instant>,
) -> WaitStatus {
    let result = unsafe { park(key, validate, || {}, |_, _| {}, TOKEN, deadline) };
    match result {
        ParkResult::TimedOut => WaitStatus::TimedOut,
        // Invalid means the value changed before we could sleep; from the
        // caller's point of view that is just an immediate wake-up.
        ParkResult::Unparked(_) | ParkResult::Invalid => WaitStatus::Woken,
    }
}

/// Wake every thread parked on a raw key
pub(crate) fn notify_all_key(key: usize) {
    unsafe {
        unpark_all(key, UnparkToken(0));
    }
}

/// Block while `atomic` equals `expected`
///
/// Returns once the value has been observed to differ, or once the thread is
/// woken by [`notify_one`]/[`notify_all`] on the same atomic. May also
/// return spuriously.
///
/// # Arguments
/// * `atomic` - The atomic whose address the thread blocks on
/// * `expected` - The value to sleep through
pub fn wait(atomic: &AtomicU32, expected: u32) {
    let _ = park_on(
        key_of(atomic),
        || atomic.load(Ordering::Acquire) == expected,
        None,
    );
}

/// Block while `atomic` equals `expected`, up to an absolute deadline
///
/// The deadline is a monotonic [`Instant`]; a deadline already in the past
/// reports [`WaitStatus::TimedOut`] without sleeping.
///
/// # Returns
/// [`WaitStatus::Woken`] if the thread was woken (or the value had already
/// changed), [`WaitStatus::TimedOut`] if the deadline elapsed first.
pub fn wait_until(atomic: &AtomicU32, expected: u32, deadline: Instant) -> WaitStatus {
    park_on(
        key_of(atomic),
        || atomic.load(Ordering::Acquire) == expected,
        Some(deadline),
    )
}

/// Wake one thread blocked on `atomic`
///
/// A no-op if nothing is blocked there.
pub fn notify_one(atomic: &AtomicU32) {
    unsafe {
        unpark_one(key_of(atomic), |_| UnparkToken(0));
    }
}

/// Wake every thread blocked on `atomic`
pub fn notify_all(atomic: &AtomicU32) {
    notify_all_key(key_of(atomic));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_after_notify() {
        let value = Arc::new(AtomicU32::new(0));
        let value2 = Arc::clone(&value);

        let handle = thread::spawn(move || {
            while value2.load(Ordering::Acquire) == 0 {
                wait(&value2, 0);
            }
        });

        // Give the thread time to park
        thread::sleep(Duration::from_millis(50));

        value.store(1, Ordering::Release);
        notify_one(&value);
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_until_past_deadline_times_out_immediately() {
        let value = AtomicU32::new(0);
        let status = wait_until(&value, 0, Instant::now());
        assert_eq!(status, WaitStatus::TimedOut);
    }

    #[test]
    fn test_wait_skips_sleep_when_value_already_changed() {
        let value = AtomicU32::new(5);
        // Expected value does not match: must return right away.
        wait(&value, 0);
        let status = wait_until(&value, 0, Instant::now() + Duration::from_secs(10));
        assert_eq!(status, WaitStatus::Woken);
    }

    #[test]
    fn test_notify_all_wakes_every_waiter() {
        let value = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let value = Arc::clone(&value);
            handles.push(thread::spawn(move || {
                while value.load(Ordering::Acquire) == 0 {
                    wait(&value, 0);
                }
            }));
        }

        thread::sleep(Duration::from_millis(50));
        value.store(1, Ordering::Release);
        notify_all(&value);

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
