//! A read/write lock built from a mutex and a condition variable
//!
//! The lock's entire state is one signed word guarded by an internal mutex:
//!  - zero: free
//!  - positive: number of read holds
//!  - `isize::MIN`: held for writing
//!
//! No other negative value is valid. The value is negative if and only if a
//! writer holds the lock, zero if and only if nobody does.

use crate::core::locks::condvar::Condvar;
use crate::core::locks::mutex::Mutex;
use crate::core::types::Cancelled;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

/// Sentinel state value meaning "held for writing"
const WRITER: isize = isize::MIN;

/// A reader-writer lock built from the crate's generic primitives
///
/// Many readers or one writer, with recursive read-locking allowed: a
/// thread that already holds a read lock may take further read locks (each
/// returns its own guard, and all must be dropped before a writer can
/// proceed). No fairness is guaranteed; when a writer unlocks, waiting
/// readers and writers simply compete and the scheduler decides who wins.
///
/// Lock operations block by waiting on an internal condition variable, so
/// they are cancellation points: a [`cancel`](crate::cancel) request aimed
/// at a blocked thread makes the operation back out and return
/// `Err(Cancelled)` with the lock state untouched.
///
/// # Example
///
/// ```rust
/// use portsync::RwLock;
///
/// let lock = RwLock::new(5);
///
/// {
///     let r1 = lock.read().unwrap();
///     let r2 = lock.read().unwrap(); // readers share
///     assert_eq!(*r1 + *r2, 10);
/// }
///
/// *lock.write().unwrap() += 1;
/// assert_eq!(*lock.read().unwrap(), 6);
/// ```
pub struct RwLock<T> {
    /// Signed hold count, see the module comment
    state: Mutex<isize>,
    /// Readers and writers both wait here
    wait: Condvar,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

/// Guard for a shared (read) hold, releases it when dropped
pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

/// Guard for an exclusive (write) hold, releases it when dropped
pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> RwLock<T> {
    /// Create a new unlocked RwLock holding `value`
    pub fn new(value: T) -> Self {
        RwLock {
            state: Mutex::new(0),
            wait: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire a shared (read) hold
    ///
    /// Blocks while a writer holds the lock. Readers never block on other
    /// readers, and a waiting writer does not keep new readers out.
    /// Recursive read-locking by the same thread is allowed; the process
    /// aborts if the hold count would overflow, since a count that large is
    /// certainly a recursion bug.
    ///
    /// # Returns
    /// A read guard, or `Err(Cancelled)` if the wait was interrupted
    pub fn read(&self) -> Result<RwLockReadGuard<'_, T>, Cancelled> {
        let mut state = self.state.lock();
        while *state < 0 {
            debug_assert_eq!(*state, WRITER);
            if self.wait.wait(&mut state).cancelled() {
                return Err(Cancelled);
            }
        }
        if *state == isize::MAX {
            log::error!("read-lock hold count overflow, aborting");
            std::process::abort();
        }
        *state += 1;
        drop(state);
        Ok(RwLockReadGuard { lock: self })
    }

    /// Acquire an exclusive (write) hold
    ///
    /// Blocks until nobody holds the lock in any way.
    ///
    /// # Returns
    /// A write guard, or `Err(Cancelled)` if the wait was interrupted
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, T>, Cancelled> {
        let mut state = self.state.lock();
        while *state != 0 {
            if self.wait.wait(&mut state).cancelled() {
                return Err(Cancelled);
            }
        }
        *state = WRITER;
        drop(state);
        Ok(RwLockWriteGuard { lock: self })
    }

    /// Release one read hold
    fn unlock_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(*state > 0);
        *state -= 1;
        // Readers never wait for each other, so once the last read hold is
        // gone only a writer can be queued. One signal is enough.
        if *state == 0 {
            self.wait.notify_one();
        }
    }

    /// Release the write hold
    fn unlock_write(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(*state, WRITER);
        // Let queued readers and writers compete; the scheduler decides.
        *state = 0;
        self.wait.notify_all();
    }

    /// Consume the lock, returning the underlying data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Get a mutable reference to the underlying data
    ///
    /// The mutable borrow statically guarantees no holds exist.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Holding a read guard keeps writers out
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Holding the write guard excludes all other holders
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> RwLock<T> {
        RwLock::new(Default::default())
    }
}

impl<T> From<T> for RwLock<T> {
    fn from(t: T) -> Self {
        RwLock::new(t)
    }
}
