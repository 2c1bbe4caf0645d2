use crate::core::tracker;
use parking_lot::{Mutex as ParkingLotMutex, MutexGuard as ParkingLotMutexGuard};
use std::ops::{Deref, DerefMut};

/// A mutex that records its holder in the per-thread lock-mark tracker
///
/// The Mutex provides the same interface as a standard mutex, with one
/// addition: in debug builds (or with the `lock-marks` feature) every
/// acquisition is marked in the calling thread's lock-mark set, so code can
/// assert [`is_held_by_current_thread`](Mutex::is_held_by_current_thread)
/// before touching data the lock protects. It is also the mutex type the
/// crate's [`Condvar`](crate::Condvar) operates on.
///
/// # Example
///
/// ```rust
/// use portsync::Mutex;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(Mutex::new(0));
/// let counter2 = Arc::clone(&counter);
///
/// let handle = thread::spawn(move || {
///     *counter2.lock() += 1;
/// });
///
/// *counter.lock() += 10;
/// handle.join().unwrap();
/// assert!(*counter.lock() >= 10);
/// ```
pub struct Mutex<T> {
    /// The wrapped mutex
    inner: ParkingLotMutex<T>,
}

/// Guard for a [`Mutex`], unmarks the lock when dropped
pub struct MutexGuard<'a, T> {
    /// Identity of the mutex in the lock-mark tracker
    lock_addr: usize,
    /// The inner MutexGuard
    guard: ParkingLotMutexGuard<'a, T>,
}

impl<T> Mutex<T> {
    /// Create a new Mutex holding `value`
    ///
    /// `const`, so mutexes can live in statics (the global lock registry
    /// relies on this).
    ///
    /// # Example
    ///
    /// ```rust
    /// use portsync::Mutex;
    ///
    /// static LOCK: Mutex<()> = Mutex::new(());
    /// ```
    pub const fn new(value: T) -> Self {
        Mutex {
            inner: ParkingLotMutex::new(value),
        }
    }

    /// Identity used by the lock-mark tracker: the mutex's address
    #[inline]
    fn addr(&self) -> usize {
        self as *const Mutex<T> as usize
    }

    /// Acquire the lock, blocking until it is free
    ///
    /// Marks the mutex as held by the calling thread for the lifetime of the
    /// returned guard. This mutex is not recursive; locking it twice from
    /// one thread deadlocks.
    ///
    /// # Returns
    /// A guard releasing the lock when dropped
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let guard = self.inner.lock();
        tracker::mark(self.addr());
        MutexGuard {
            lock_addr: self.addr(),
            guard,
        }
    }

    /// Try to acquire the lock without blocking
    ///
    /// # Returns
    /// Some(MutexGuard) if the lock was acquired, None if it was already held
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let guard = self.inner.try_lock()?;
        tracker::mark(self.addr());
        Some(MutexGuard {
            lock_addr: self.addr(),
            guard,
        })
    }

    /// Check whether the calling thread currently holds this mutex
    ///
    /// Backed by the debug lock-mark tracker. In builds where tracking is
    /// compiled out this always reports `true`, so it is only meaningful
    /// inside assertions:
    ///
    /// ```rust
    /// use portsync::Mutex;
    ///
    /// let mutex = Mutex::new(());
    /// let guard = mutex.lock();
    /// assert!(mutex.is_held_by_current_thread());
    /// ```
    pub fn is_held_by_current_thread(&self) -> bool {
        tracker::is_marked(self.addr())
    }

    /// Consume the mutex, returning the underlying data
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    /// Get a mutable reference to the underlying data
    ///
    /// Since this call borrows the Mutex mutably, no actual locking needs to
    /// take place; the mutable borrow statically guarantees no locks exist.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<'a, T> MutexGuard<'a, T> {
    /// Release the mutex around `f`, re-acquiring it before returning
    ///
    /// Used by the condition variable's wait protocol: the caller's mutex
    /// must be dropped while the waiter sleeps and held again by the time
    /// the wait returns. The lock mark is cleared and restored to match.
    pub(crate) fn unlocked<F, U>(&mut self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        tracker::unmark(self.lock_addr);
        let result = ParkingLotMutexGuard::unlocked(&mut self.guard, f);
        tracker::mark(self.lock_addr);
        result
    }

    /// Tracker identity of the mutex this guard protects
    pub(crate) fn lock_addr(&self) -> usize {
        self.lock_addr
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        tracker::unmark(self.lock_addr);
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    /// Creates a `Mutex<T>`, with the Default value for T
    fn default() -> Mutex<T> {
        Mutex::new(Default::default())
    }
}

impl<T> From<T> for Mutex<T> {
    /// Creates a new mutex in an unlocked state ready for use
    fn from(t: T) -> Self {
        Mutex::new(t)
    }
}
