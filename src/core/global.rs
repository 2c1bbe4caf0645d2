//! Fixed pool of named process-wide mutexes
//!
//! A handful of statically initialized locks that independent subsystems can
//! share without inventing their own globals or worrying about
//! initialization order. The classic use is serializing calls into a
//! non-thread-safe foreign library from anywhere in the process.
//!
//! The pool is closed: locks are picked by [`GlobalLockId`], so there is no
//! out-of-range index to validate at runtime.

use crate::core::locks::mutex::{Mutex, MutexGuard};

/// Names for the process-wide locks
///
/// One variant per lock in the pool. The set is fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalLockId {
    /// One-time initialization of process-wide resources
    Init,
    /// Non-thread-safe cryptographic library calls
    Crypto,
    /// Non-thread-safe display/windowing library calls
    Display,
    /// Anything without a dedicated slot
    Misc,
}

/// Number of locks in the pool
pub const GLOBAL_LOCK_COUNT: usize = 4;

// Statically initialized at process start, never destroyed.
static LOCKS: [Mutex<()>; GLOBAL_LOCK_COUNT] = [
    Mutex::new(()),
    Mutex::new(()),
    Mutex::new(()),
    Mutex::new(()),
];

/// Guard for a process-wide lock, releases it when dropped
///
/// Release must happen on the acquiring thread (the guard is not `Send`),
/// which keeps acquire/release paired per thread by construction.
pub struct GlobalLockGuard {
    #[allow(dead_code)]
    guard: MutexGuard<'static, ()>,
}

/// Acquire one of the process-wide locks, blocking until it is free
///
/// # Example
///
/// ```rust
/// use portsync::global::{self, GlobalLockId};
///
/// let _guard = global::acquire(GlobalLockId::Crypto);
/// // ... call into the non-thread-safe library ...
/// ```
pub fn acquire(id: GlobalLockId) -> GlobalLockGuard {
    log::trace!("acquiring global lock {id:?}");
    GlobalLockGuard {
        guard: LOCKS[id as usize].lock(),
    }
}
