//! # portsync
//!
//! Portable fallback synchronization primitives.
//!
//! portsync provides OS-independent implementations of the classic thread
//! synchronization constructs for targets whose native threading support
//! lacks one or more of them. Everything is built from two small pieces: a
//! low-level mutex and a futex-style atomic wait/notify primitive.
//!
//! ## What you get
//!
//! - [`Condvar`] - condition variable with timed and wall-clock waits
//! - [`RwLock`] - read/write lock with recursive read-locking
//! - [`Semaphore`] - counting semaphore with a lock-free fast path
//! - [`Mutex`] - tracked mutex the other primitives are built around
//! - [`global`] - a small fixed pool of named process-wide mutexes
//! - [`cancel`] - cooperative cancellation that can interrupt blocked waits
//! - debug-only lock-mark tracking (`Mutex::is_held_by_current_thread`)

mod core;
pub use core::{
    atomic, cancel, global,
    locks::{
        condvar::Condvar,
        mutex::{Mutex, MutexGuard},
        rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard},
        semaphore::Semaphore,
    },
    sleep::{sleep, sleep_until},
    types::{Cancelled, SemaphoreOverflow, WaitStatus, WaitTimedOut},
};
