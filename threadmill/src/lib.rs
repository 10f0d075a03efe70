//! Worker-pool task execution engine.
//!
//! A [`ThreadManager`] accepts opaque units of work from arbitrary producer
//! threads, queues them on a lock-free ring ([`quadring`]), and dispatches
//! them across a fixed set of long-lived worker threads. A manager thread
//! grows and shrinks the active worker set with queue pressure. Each
//! submission returns a [`JobHandle`] from which the caller observes
//! completion and retrieves the result.
//!
//! # Example
//!
//! ```
//! use threadmill::ThreadManager;
//!
//! let pool = ThreadManager::builder().pool_size(4).queue_capacity(64).build();
//! pool.start();
//!
//! let handle = pool.submit(|| 6 * 7);
//! assert_eq!(handle.wait(), Some(42));
//!
//! pool.shutdown();
//! ```

#![warn(missing_docs)]

mod builder;
mod handle;
mod pool;
mod state;
mod work;
mod worker;

#[cfg(test)]
mod tests;

pub use builder::PoolBuilder;
pub use handle::JobHandle;
pub use pool::ThreadManager;
pub use state::State;
pub use work::WorkItem;
pub use worker::WorkerStats;
