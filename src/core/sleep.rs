//! Cancellable sleeping
//!
//! Sleeps that a [`cancel`](crate::cancel) request can cut short. The
//! blocked thread parks on a private counter that nothing ever notifies, so
//! the only ways out are the deadline or a cancellation wake-up.

use crate::core::cancel;
use crate::core::types::Cancelled;
use std::sync::atomic::AtomicU32;
use std::time::{Duration, Instant};

/// Sleep until a monotonic deadline, unless cancelled first
///
/// A deadline already in the past returns immediately with `Ok(())`.
///
/// # Returns
/// `Ok(())` once the deadline passes, `Err(Cancelled)` if the calling
/// thread's cancellation flag was raised first.
pub fn sleep_until(deadline: Instant) -> Result<(), Cancelled> {
    let value = AtomicU32::new(0);

    let registration = cancel::register_wait_address(&value);
    let result = loop {
        // Pending cancellation is checked before every block and after
        // every wake-up; any wake can only come from a canceller.
        if cancel::is_pending() {
            break Err(Cancelled);
        }
        if cancel::wait_interruptible(&value, 0, Some(deadline)).timed_out() {
            break Ok(());
        }
    };
    drop(registration);

    result
}

/// Sleep for a duration, unless cancelled first
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// portsync::sleep(Duration::from_millis(1)).unwrap();
/// ```
pub fn sleep(duration: Duration) -> Result<(), Cancelled> {
    sleep_until(Instant::now() + duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_elapses() {
        let start = Instant::now();
        sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_until_past_deadline_returns_promptly() {
        sleep_until(Instant::now()).unwrap();
    }

    #[test]
    fn test_pending_cancel_interrupts_sleep() {
        cancel::handle().cancel();
        assert_eq!(sleep(Duration::from_secs(10)), Err(Cancelled));
        cancel::clear();
    }
}
