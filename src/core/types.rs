use thiserror::Error;

/// Outcome of a blocking wait
///
/// Every blocking operation in this crate reports how it came back: woken by
/// another thread, timed out, or interrupted by cooperative cancellation.
/// Timeout and cancellation are ordinary outcomes, never panics.
///
/// Note that `Woken` does not imply the condition the caller was waiting for
/// actually holds; waits may return spuriously and callers are expected to
/// re-check their predicate in a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a wait may have timed out or been cancelled"]
pub enum WaitStatus {
    /// The wait ended because the thread was notified (possibly spuriously)
    Woken,
    /// The deadline elapsed before a notification arrived
    TimedOut,
    /// The thread's cancellation flag was raised while it was waiting
    Cancelled,
}

impl WaitStatus {
    /// Check whether the wait ended because the deadline elapsed
    #[inline]
    pub fn timed_out(&self) -> bool {
        matches!(self, WaitStatus::TimedOut)
    }

    /// Check whether the wait was interrupted by cancellation
    #[inline]
    pub fn cancelled(&self) -> bool {
        matches!(self, WaitStatus::Cancelled)
    }
}

/// A blocked operation was interrupted by a cancellation request
///
/// Raised as an `Err` by operations that honor [`crate::cancel`] requests.
/// The pending flag stays set until the thread clears it, so further
/// cancellable operations on the same thread keep failing fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation interrupted by a cancellation request")]
pub struct Cancelled;

/// A semaphore post would have pushed the counter past its maximum
///
/// Posting saturates instead of wrapping; the counter is left unchanged.
/// Hitting this almost always means post/wait calls are mismatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("semaphore counter is already at its maximum")]
pub struct SemaphoreOverflow;

/// A bounded wait gave up because its deadline elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline elapsed before the wait completed")]
pub struct WaitTimedOut;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_status_accessors() {
        assert!(!WaitStatus::Woken.timed_out());
        assert!(!WaitStatus::Woken.cancelled());
        assert!(WaitStatus::TimedOut.timed_out());
        assert!(!WaitStatus::TimedOut.cancelled());
        assert!(WaitStatus::Cancelled.cancelled());
        assert!(!WaitStatus::Cancelled.timed_out());
    }

    #[test]
    fn test_error_display() {
        assert!(Cancelled.to_string().contains("cancellation"));
        assert!(SemaphoreOverflow.to_string().contains("maximum"));
        assert!(WaitTimedOut.to_string().contains("deadline"));
    }
}
