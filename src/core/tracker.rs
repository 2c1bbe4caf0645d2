//! Per-thread lock-mark tracking
//!
//! A debug diagnostic recording which locks the calling thread currently
//! holds, with a recursion count per lock. Backing store is one thread-local
//! `BTreeMap` keyed by lock address, so queries are O(log k) in the number
//! of held locks and no cross-thread synchronization is ever needed.
//!
//! Compiled in for debug builds and whenever the `lock-marks` feature is
//! enabled. Everywhere else `mark`/`unmark` vanish and [`is_marked`] reports
//! `true`, so callers can keep asserting on it unconditionally.

#[cfg(any(debug_assertions, feature = "lock-marks"))]
mod imp {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    thread_local! {
        // lock address -> recursion count (>= 1 while present)
        static LOCK_MARKS: RefCell<BTreeMap<usize, usize>> = const { RefCell::new(BTreeMap::new()) };
    }

    /// Record that the calling thread holds the lock at `addr`
    pub(crate) fn mark(addr: usize) {
        LOCK_MARKS.with(|marks| {
            *marks.borrow_mut().entry(addr).or_insert(0) += 1;
        });
    }

    /// Drop one level of the calling thread's hold on the lock at `addr`
    ///
    /// Panics if the lock was never marked: an unbalanced unmark means the
    /// tracking data is wrong, and wrong tracking data masks real
    /// double-lock bugs.
    pub(crate) fn unmark(addr: usize) {
        LOCK_MARKS.with(|marks| {
            let mut marks = marks.borrow_mut();
            let refs = marks
                .get_mut(&addr)
                .unwrap_or_else(|| panic!("unmark of lock {addr:#x} not held by this thread"));
            assert!(*refs >= 1);
            *refs -= 1;
            if *refs == 0 {
                marks.remove(&addr);
            }
        });
    }

    /// Check whether the calling thread holds the lock at `addr`
    pub(crate) fn is_marked(addr: usize) -> bool {
        LOCK_MARKS.with(|marks| marks.borrow().contains_key(&addr))
    }
}

#[cfg(not(any(debug_assertions, feature = "lock-marks")))]
mod imp {
    #[inline(always)]
    pub(crate) fn mark(_addr: usize) {}

    #[inline(always)]
    pub(crate) fn unmark(_addr: usize) {}

    /// Tracking is compiled out: report held so assertions stay vacuously true
    #[inline(always)]
    pub(crate) fn is_marked(_addr: usize) -> bool {
        true
    }
}

pub(crate) use imp::{is_marked, mark, unmark};
