#![allow(dead_code)]

use std::time::Duration;

/// Long enough for a spawned thread to reach its blocking point
pub const SETTLE: Duration = Duration::from_millis(80);

/// Upper bound for anything that should complete quickly
pub const GENEROUS: Duration = Duration::from_secs(5);

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Spin until `done` returns true or the deadline passes
pub fn wait_for(mut done: impl FnMut() -> bool, within: Duration) {
    let deadline = std::time::Instant::now() + within;
    while !done() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached within {within:?}"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}
