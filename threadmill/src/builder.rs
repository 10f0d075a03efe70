//! Builder pattern for configuring a pool.

use crate::pool::ThreadManager;

/// Default worker-set size.
const DEFAULT_POOL_SIZE: usize = 10;

/// Default ring-queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Builder for a [`ThreadManager`].
///
/// Created via [`ThreadManager::builder()`]. Configure options with chained
/// methods, then call [`.build()`](Self::build) to spawn the pool.
///
/// # Example
///
/// ```
/// use threadmill::ThreadManager;
///
/// // Defaults: 10 workers, queue capacity 1000.
/// let pool = ThreadManager::builder().build();
/// drop(pool);
///
/// let pool = ThreadManager::builder()
///     .pool_size(4)
///     .queue_capacity(256)
///     .build();
/// drop(pool);
/// ```
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    pool_size: usize,
    queue_capacity: usize,
}

impl PoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Set the worker-set size. Values below 2 are silently bumped to 2.
    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the ring-queue capacity. The queue holds `capacity - 1` items;
    /// `build` panics if the capacity is below 2.
    #[must_use]
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Spawn the workers and the manager thread. The pool comes back in the
    /// created state; call [`ThreadManager::start`] to begin executing.
    #[must_use]
    pub fn build(self) -> ThreadManager {
        ThreadManager::with_config(self.pool_size, self.queue_capacity)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
