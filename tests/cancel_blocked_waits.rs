use portsync::{Cancelled, Condvar, Mutex, RwLock, cancel};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

mod common;
use common::{SETTLE, init_logs};

/// A cancellation request aimed at a thread blocked in a condvar wait makes
/// the wait return Cancelled, with the caller's mutex re-acquired.
#[test]
fn test_cancel_interrupts_condvar_wait() {
    init_logs();

    let shared = Arc::new((Mutex::new(false), Condvar::new()));
    let shared2 = Arc::clone(&shared);
    let (tx, rx) = mpsc::channel();

    let waiter = thread::spawn(move || {
        tx.send(cancel::handle()).unwrap();
        let (lock, cvar) = &*shared2;
        let mut ready = lock.lock();
        loop {
            let status = cvar.wait(&mut ready);
            if status.cancelled() {
                assert!(lock.is_held_by_current_thread());
                return true;
            }
            if *ready {
                return false;
            }
        }
    });

    let handle = rx.recv().unwrap();
    thread::sleep(SETTLE);
    handle.cancel();

    assert!(waiter.join().unwrap(), "wait must report cancellation");
    let (_, cvar) = &*shared;
    assert_eq!(cvar.waiter_count(), 0, "cancelled waiter unlinks itself");
}

/// rwlock lock operations wait on the internal condvar, so they back out
/// with Err(Cancelled) and leave the lock state untouched.
#[test]
fn test_cancel_interrupts_rwlock_read() {
    init_logs();

    let lock = Arc::new(RwLock::new(0));
    let writer_guard = lock.write().unwrap();

    let lock2 = Arc::clone(&lock);
    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        tx.send(cancel::handle()).unwrap();
        lock2.read().map(|_| ()).unwrap_err()
    });

    let handle = rx.recv().unwrap();
    thread::sleep(SETTLE);
    handle.cancel();
    assert_eq!(reader.join().unwrap(), Cancelled);

    // Writer still holds cleanly, and unlocking still works
    drop(writer_guard);
    assert_eq!(*lock.read().unwrap(), 0);
}

/// sleep() is a cancellation point; a cancelled sleeper comes back early.
#[test]
fn test_cancel_interrupts_sleep() {
    init_logs();

    let (tx, rx) = mpsc::channel();
    let sleeper = thread::spawn(move || {
        tx.send(cancel::handle()).unwrap();
        let start = Instant::now();
        let result = portsync::sleep(Duration::from_secs(30));
        (result, start.elapsed())
    });

    let handle = rx.recv().unwrap();
    thread::sleep(SETTLE);
    handle.cancel();

    let (result, elapsed) = sleeper.join().unwrap();
    assert_eq!(result, Err(Cancelled));
    assert!(elapsed < Duration::from_secs(10), "cancel cut the sleep short");
}

/// A cancellation that arrives before the wait starts is caught at the
/// registration checkpoint and never blocks.
#[test]
fn test_pending_cancel_fails_waits_fast() {
    init_logs();

    let outcome = thread::spawn(|| {
        cancel::handle().cancel();

        let start = Instant::now();
        let sleep_result = portsync::sleep(Duration::from_secs(30));

        let mutex = Mutex::new(());
        let cvar = Condvar::new();
        let mut guard = mutex.lock();
        let wait_status = cvar.wait(&mut guard);
        drop(guard);

        // Acknowledging the request makes blocking work again
        cancel::clear();
        portsync::sleep(Duration::from_millis(1)).unwrap();

        (sleep_result, wait_status.cancelled(), start.elapsed())
    })
    .join()
    .unwrap();

    assert_eq!(outcome.0, Err(Cancelled));
    assert!(outcome.1);
    assert!(outcome.2 < Duration::from_secs(10));
}
