// Shared outcome and error types
pub mod types;
pub use types::*;

// Futex-style atomic wait/notify, the lowest building block
pub mod atomic;

// Cooperative cancellation for blocked waits
pub mod cancel;

// Debug-only per-thread lock-mark tracking
pub(crate) mod tracker;

// Fixed pool of named process-wide mutexes
pub mod global;

// The generic lock primitives
pub mod locks;

// Cancellable sleeping
pub mod sleep;
