/// Thread pool and the pull-balanced range runner built on top of it
pub mod executor;
pub mod range;

pub use executor::{default_thread_count, TaskExecutor, TaskHandle};
pub use range::{parallel_for, resolve_worker_count, try_parallel_for};
