//! Cooperative cancellation for blocked waits
//!
//! Each thread owns a small cancellation state: a pending flag plus the
//! address it is currently blocked on, if any. Another thread holding a
//! [`CancelHandle`] can raise the flag and kick the blocked thread awake;
//! the interrupted operation then backs out cleanly and reports
//! [`Cancelled`](crate::Cancelled) (or [`WaitStatus::Cancelled`]) instead of
//! unwinding the stack.
//!
//! Cancellation is checked at two points around every cancellable block:
//! right after the wait address is registered (catching a request that raced
//! in earlier) and right after the thread wakes. The pending flag stays set
//! until the thread calls [`clear`], so once cancelled, further cancellable
//! operations fail fast rather than blocking again.
//!
//! Semaphore waits deliberately do not take part in any of this.

use crate::core::atomic;
use crate::core::types::WaitStatus;
use parking_lot::Mutex as PlMutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

/// Per-thread cancellation state, shared with any handles handed out
struct CancelState {
    /// Set once by a canceller, cleared only by the owning thread
    pending: AtomicBool,
    /// Parking key the owner is about to block on, 0 when not blocked.
    /// Guarded by a mutex so a canceller never wakes a key whose waiter
    /// state has already left scope.
    wait_key: PlMutex<usize>,
}

impl CancelState {
    fn new() -> Self {
        CancelState {
            pending: AtomicBool::new(false),
            wait_key: PlMutex::new(0),
        }
    }
}

thread_local! {
    static CURRENT: Arc<CancelState> = Arc::new(CancelState::new());
}

/// Handle for cancelling one specific thread's blocked waits
///
/// Obtained on the target thread via [`handle`] and typically sent to a
/// supervisor over a channel. Cloning is cheap; all clones refer to the same
/// thread.
///
/// # Example
///
/// ```no_run
/// use portsync::cancel;
/// use std::sync::mpsc;
/// use std::thread;
/// use std::time::Duration;
///
/// let (tx, rx) = mpsc::channel();
/// thread::spawn(move || {
///     tx.send(cancel::handle()).unwrap();
///     // Ends early with Err(Cancelled) instead of sleeping out the hour
///     let _ = portsync::sleep(Duration::from_secs(3600));
/// });
///
/// rx.recv().unwrap().cancel();
/// ```
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Request cancellation of the owning thread's blocked waits
    ///
    /// Raises the pending flag and wakes the thread if it is currently
    /// blocked in a cancellable operation. Idempotent; a thread that is not
    /// blocked simply observes the flag at its next checkpoint.
    pub fn cancel(&self) {
        self.state.pending.store(true, Ordering::SeqCst);

        // Hold the key lock while waking so the waiter cannot deregister
        // and invalidate the key under us.
        let key = self.state.wait_key.lock();
        if *key != 0 {
            log::debug!("cancelling thread blocked on key {:#x}", *key);
            atomic::notify_all_key(*key);
        }
    }

    /// Check whether a cancellation request is pending for the owning thread
    pub fn is_pending(&self) -> bool {
        self.state.pending.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Get a cancellation handle for the calling thread
pub fn handle() -> CancelHandle {
    CancelHandle {
        state: CURRENT.with(Arc::clone),
    }
}

/// Check whether a cancellation request is pending for the calling thread
pub fn is_pending() -> bool {
    CURRENT.with(|state| state.pending.load(Ordering::SeqCst))
}

/// Clear the calling thread's pending cancellation, if any
///
/// After an operation has reported `Cancelled`, the thread calls this to
/// acknowledge the request and make blocking operations usable again.
pub fn clear() {
    CURRENT.with(|state| state.pending.store(false, Ordering::SeqCst));
}

/// Clears the registered wait address when the registering scope exits
///
/// Dropping the guard is what makes back-out safe: after the drop, a
/// concurrent `cancel()` can no longer touch the (possibly freed) wait
/// address.
pub(crate) struct WaitAddressGuard {
    state: Arc<CancelState>,
}

impl Drop for WaitAddressGuard {
    fn drop(&mut self) {
        *self.state.wait_key.lock() = 0;
    }
}

/// Register `value`'s address as the calling thread's cancellation target
///
/// Callers must check [`is_pending`] right after registering: a request that
/// arrived before registration has no address to wake and would otherwise go
/// unnoticed until the next wake-up.
pub(crate) fn register_wait_address(value: &AtomicU32) -> WaitAddressGuard {
    let state = CURRENT.with(Arc::clone);
    *state.wait_key.lock() = value as *const AtomicU32 as usize;
    WaitAddressGuard { state }
}

/// Block while `value` equals `expected`, honoring cancellation
///
/// Like [`atomic::wait_until`], but the park predicate also re-checks the
/// calling thread's pending flag under the parking lot's bucket lock. That
/// closes the race where `cancel()` wakes the wait address in the window
/// between the caller's last pending check and the thread actually going to
/// sleep: either the flag is seen before sleeping, or the wake-up arrives
/// while the thread is parked.
///
/// A `Woken` result here still requires a pending check by the caller; this
/// function never reports `Cancelled` itself.
pub(crate) fn wait_interruptible(
    value: &AtomicU32,
    expected: u32,
    deadline: Option<Instant>,
) -> WaitStatus {
    let state = CURRENT.with(Arc::clone);
    let key = value as *const AtomicU32 as usize;

    atomic::park_on(
        key,
        || {
            value.load(Ordering::Acquire) == expected && !state.pending.load(Ordering::SeqCst)
        },
        deadline,
    )
}
