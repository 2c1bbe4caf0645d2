use portsync::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

mod common;
use common::{GENEROUS, SETTLE, init_logs, wait_for};

/// The reader/writer handoff sequence:
/// two readers hold the lock and a writer blocks; dropping the first read
/// guard wakes nobody, dropping the second lets the writer in; a reader
/// arriving while the writer holds the lock stays blocked until the writer
/// unlocks.
#[test]
fn test_writer_waits_for_last_reader_then_blocks_new_reader() {
    init_logs();

    let lock = Arc::new(RwLock::new(0));
    let writer_acquired = Arc::new(AtomicBool::new(false));
    let reader3_acquired = Arc::new(AtomicBool::new(false));

    let r1 = lock.read().unwrap();
    let r2 = lock.read().unwrap();

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let writer = {
        let lock = Arc::clone(&lock);
        let writer_acquired = Arc::clone(&writer_acquired);
        thread::spawn(move || {
            let mut guard = lock.write().unwrap();
            writer_acquired.store(true, Ordering::SeqCst);
            *guard += 1;
            // Hold the write lock until the main thread says otherwise
            release_rx.recv().unwrap();
        })
    };

    thread::sleep(SETTLE);
    assert!(
        !writer_acquired.load(Ordering::SeqCst),
        "writer must wait while readers hold the lock"
    );

    drop(r1);
    thread::sleep(SETTLE);
    assert!(
        !writer_acquired.load(Ordering::SeqCst),
        "one reader left, writer still waits"
    );

    drop(r2);
    wait_for(|| writer_acquired.load(Ordering::SeqCst), GENEROUS);

    // A reader arriving now finds the writer in place and must wait
    let reader3 = {
        let lock = Arc::clone(&lock);
        let reader3_acquired = Arc::clone(&reader3_acquired);
        thread::spawn(move || {
            let guard = lock.read().unwrap();
            reader3_acquired.store(true, Ordering::SeqCst);
            *guard
        })
    };

    thread::sleep(SETTLE);
    assert!(
        !reader3_acquired.load(Ordering::SeqCst),
        "reader must wait while the writer holds the lock"
    );

    release_tx.send(()).unwrap();
    writer.join().unwrap();

    wait_for(|| reader3_acquired.load(Ordering::SeqCst), GENEROUS);
    assert_eq!(reader3.join().unwrap(), 1, "reader sees the writer's update");
}
