pub mod condvar;
pub mod mutex;
pub mod rwlock;
pub mod semaphore;
