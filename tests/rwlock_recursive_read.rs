use portsync::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

mod common;
use common::{GENEROUS, SETTLE, init_logs, wait_for};

/// A thread read-locking n times must release all n holds before a pending
/// writer gets in.
#[test]
fn test_recursive_read_holds_block_writer_until_all_released() {
    init_logs();

    let lock = Arc::new(RwLock::new(String::from("before")));
    let writer_acquired = Arc::new(AtomicBool::new(false));

    // Three nested read holds on the same thread
    let g1 = lock.read().unwrap();
    let g2 = lock.read().unwrap();
    let g3 = lock.read().unwrap();
    assert_eq!(*g1, "before");

    let writer = {
        let lock = Arc::clone(&lock);
        let writer_acquired = Arc::clone(&writer_acquired);
        thread::spawn(move || {
            let mut guard = lock.write().unwrap();
            writer_acquired.store(true, Ordering::SeqCst);
            *guard = String::from("after");
        })
    };

    for guard in [g3, g2] {
        thread::sleep(SETTLE);
        assert!(
            !writer_acquired.load(Ordering::SeqCst),
            "writer must not run while read holds remain"
        );
        drop(guard);
    }

    drop(g1);
    wait_for(|| writer_acquired.load(Ordering::SeqCst), GENEROUS);
    writer.join().unwrap();

    assert_eq!(*lock.read().unwrap(), "after");
}

/// Readers coming and going concurrently never exclude each other.
#[test]
fn test_parallel_readers_share_the_lock() {
    init_logs();

    let lock = Arc::new(RwLock::new(7));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        handles.push(thread::spawn(move || {
            let guard = lock.read().unwrap();
            thread::sleep(SETTLE);
            *guard
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 7);
    }
}
