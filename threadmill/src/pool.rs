//! Pool controller: submission gating, lifecycle, and pressure-driven
//! scaling of the active worker set.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use quadring::{RingQueue, SpinLatch};
use tracing::{debug, trace};

use crate::builder::PoolBuilder;
use crate::handle::{completion, JobHandle};
use crate::state::{AtomicState, State};
use crate::work::WorkItem;
use crate::worker::{Worker, WorkerStats};

/// Fewest workers the manager keeps active while the pool is running.
/// Pool sizes below this are silently bumped up to it.
const MIN_ACTIVE: usize = 2;

/// State shared between the controller, its workers, and the manager thread.
struct PoolShared {
    queue: Arc<RingQueue<WorkItem>>,
    workers: Box<[Worker]>,
    status: AtomicState,
    /// Number of workers currently meant to be running. The inactive tail is
    /// always the high-index slots, which keeps resizes idempotent.
    active: AtomicUsize,
    /// Couples status transitions to worker-set operations: submission vs.
    /// shutdown, manager resize vs. shutdown, and start vs. submission all
    /// serialize through this latch.
    latch: SpinLatch,
    /// Companion lock + condvar for the manager's created/paused sleeps.
    lock: Mutex<()>,
    cv: Condvar,
}

impl PoolShared {
    fn notify_manager(&self) {
        // Hold the companion lock so the wakeup cannot slip between the
        // manager's status recheck and its wait.
        let _guard = self.lock.lock();
        self.cv.notify_all();
    }
}

/// Worker-pool runtime.
///
/// Accepts opaque units of work from arbitrary producer threads, queues them
/// on a lock-free ring, and executes them on a fixed set of long-lived
/// worker threads. A manager thread scales the active worker set with queue
/// pressure; the inactive remainder sleeps.
///
/// The pool follows the same created/running/paused/terminated lifecycle as
/// its workers. Dropping the pool performs a graceful [`shutdown`].
///
/// # Example
///
/// ```
/// use threadmill::ThreadManager;
///
/// let pool = ThreadManager::builder().pool_size(4).queue_capacity(64).build();
/// pool.start();
///
/// let handle = pool.submit(|| 2 + 2);
/// assert_eq!(handle.wait(), Some(4));
///
/// pool.shutdown();
/// ```
///
/// [`shutdown`]: ThreadManager::shutdown
pub struct ThreadManager {
    shared: Arc<PoolShared>,
    pool_size: usize,
    /// The manager thread; taken exactly once, by whoever joins it.
    manager: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadManager {
    /// Create a pool with the default configuration: 10 workers and a queue
    /// capacity of 1000. The pool starts in the created state; call
    /// [`start`](Self::start) to begin executing work.
    #[must_use]
    pub fn new() -> Self {
        PoolBuilder::new().build()
    }

    /// Start configuring a pool.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn with_config(pool_size: usize, queue_capacity: usize) -> Self {
        let pool_size = pool_size.max(MIN_ACTIVE);
        let queue = Arc::new(RingQueue::new(queue_capacity));
        let workers: Box<[Worker]> = (0..pool_size)
            .map(|id| Worker::spawn(id, Arc::clone(&queue)))
            .collect();

        let shared = Arc::new(PoolShared {
            queue,
            workers,
            status: AtomicState::new(State::Created),
            active: AtomicUsize::new(0),
            latch: SpinLatch::new(),
            lock: Mutex::new(()),
            cv: Condvar::new(),
        });

        let manager_shared = Arc::clone(&shared);
        let manager = thread::Builder::new()
            .name("threadmill-manager".into())
            .spawn(move || manage(&manager_shared, pool_size))
            .expect("failed to spawn manager thread");

        Self {
            shared,
            pool_size,
            manager: Mutex::new(Some(manager)),
        }
    }

    /// Current pool lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> State {
        self.shared.status.load()
    }

    /// Number of workers the manager currently keeps running.
    #[inline]
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Fixed worker-set size.
    #[inline]
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Items currently queued and not yet dequeued by a worker.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Snapshot of per-worker execution statistics, indexed by worker slot.
    #[must_use]
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.shared.workers.iter().map(Worker::stats).collect()
    }

    /// Begin executing work: created -> running.
    ///
    /// Starts an initial `min(max(2, hardware_concurrency), pool_size)`
    /// workers and wakes the manager; the remaining workers stay parked
    /// until queue pressure calls for them. A no-op unless the pool is in
    /// the created state.
    pub fn start(&self) {
        {
            let _guard = self.shared.latch.lock();
            if !self.shared.status.transition(State::Created, State::Running) {
                return;
            }
            let hw = thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            let initial = hw.max(MIN_ACTIVE).min(self.pool_size);
            self.shared.active.store(initial, Ordering::Release);
            for worker in &self.shared.workers[..initial] {
                worker.start();
            }
            debug!(initial, pool_size = self.pool_size, "pool started");
        }
        self.shared.notify_manager();
    }

    /// Pause the pool and every currently active worker: running -> paused.
    ///
    /// Workers that have already dequeued an item finish it before parking.
    /// A no-op unless the pool is running.
    pub fn pause(&self) {
        let _guard = self.shared.latch.lock();
        if !self.shared.status.transition(State::Running, State::Paused) {
            return;
        }
        let active = self.shared.active.load(Ordering::Acquire);
        for worker in &self.shared.workers[..active] {
            worker.pause();
        }
        debug!(active, "pool paused");
    }

    /// Resume a paused pool and its active workers: paused -> running.
    pub fn resume(&self) {
        {
            let _guard = self.shared.latch.lock();
            if !self.shared.status.transition(State::Paused, State::Running) {
                return;
            }
            let active = self.shared.active.load(Ordering::Acquire);
            for worker in &self.shared.workers[..active] {
                worker.resume();
            }
            debug!(active, "pool resumed");
        }
        self.shared.notify_manager();
    }

    /// Graceful shutdown: drain, then terminate.
    ///
    /// Spins until every item that was queued when this call began has been
    /// dequeued, then performs [`force_shutdown`](Self::force_shutdown) —
    /// which joins the workers, completing whatever they had in flight.
    /// The drain wait only applies while the pool is running: a created
    /// pool has an empty queue, and a paused pool cannot drain, so both go
    /// straight to the terminate path.
    pub fn shutdown(&self) {
        if self.shared.status.load() == State::Running {
            debug!("pool draining before shutdown");
            while self.shared.status.load() == State::Running && !self.shared.queue.is_empty() {
                thread::yield_now();
            }
        }
        self.force_shutdown();
    }

    /// Immediate shutdown: terminate every worker and abandon queued work.
    ///
    /// After this returns, every worker thread and the manager thread are
    /// joined. Work items that never ran are dropped; their handles observe
    /// abandonment. Repeated calls are no-ops.
    pub fn force_shutdown(&self) {
        {
            let _guard = self.shared.latch.lock();
            let prior = self.shared.status.replace(State::Terminated);
            if prior == State::Terminated {
                return;
            }
            debug!(?prior, "pool terminating");
            for worker in self.shared.workers.iter() {
                worker.shutdown();
            }
            self.shared.active.store(0, Ordering::Release);
        }

        // The manager may be sleeping if the pool was created or paused.
        self.shared.notify_manager();
        if let Some(handle) = self.manager.lock().take() {
            let _ = handle.join();
        }

        // Abandon whatever never ran: dropping the items drops their
        // completion promises, which wakes any waiting submitters.
        let mut discarded = 0usize;
        while self.shared.queue.try_pop().is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "abandoned queued work");
        }
        debug!("pool terminated");
    }

    /// Submit a unit of work, blocking until the queue accepts it.
    ///
    /// Returns an invalid handle without blocking if the pool is not
    /// running. The latch is held across the push retries, so a concurrent
    /// shutdown cannot tear the pool down mid-submission; once `submit`
    /// returns a valid handle, the item is in the queue.
    pub fn submit<F, R>(&self, f: F) -> JobHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _guard = self.shared.latch.lock();
        if self.shared.status.load() != State::Running {
            return JobHandle::invalid();
        }

        let (promise, handle) = completion();
        let mut item = WorkItem::new(move || promise.publish(f()));
        loop {
            match self.shared.queue.try_push(item) {
                Ok(()) => return handle,
                Err(full) => {
                    item = full.into_inner();
                    thread::yield_now();
                }
            }
        }
    }

    /// Submit without blocking.
    ///
    /// An invalid handle signals that the pool is not running or the queue
    /// was full; the work is dropped in either case.
    pub fn try_submit<F, R>(&self, f: F) -> JobHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.shared.status.load() != State::Running {
            return JobHandle::invalid();
        }

        let (promise, handle) = completion();
        let item = WorkItem::new(move || promise.publish(f()));
        match self.shared.queue.try_push(item) {
            Ok(()) => handle,
            Err(_dropped) => JobHandle::invalid(),
        }
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Manager thread body: scale the active worker set with queue pressure.
///
/// Each tick while the pool runs, the desired active count is the queue's
/// fill fraction scaled to the pool size (rounded up, floored at two).
/// Growth starts or resumes the parked head of the worker array; shrinkage
/// pauses the tail. The pool condvar covers the created/paused sleeps.
fn manage(shared: &PoolShared, pool_size: usize) {
    loop {
        match shared.status.load() {
            State::Terminated => break,
            State::Running => {
                let stress = shared.queue.load_factor();
                let desired =
                    ((stress * pool_size as f64).ceil() as usize).clamp(MIN_ACTIVE, pool_size);
                {
                    let _guard = shared.latch.lock();
                    // Recheck: a shutdown or pause may have won the latch
                    // between the load above and now.
                    if shared.status.load() == State::Running {
                        let observed = shared.active.load(Ordering::Acquire);
                        if desired != observed
                            && shared
                                .active
                                .compare_exchange(
                                    observed,
                                    desired,
                                    Ordering::AcqRel,
                                    Ordering::Acquire,
                                )
                                .is_ok()
                        {
                            if desired > observed {
                                for worker in &shared.workers[observed..desired] {
                                    // A grown slot may still be unstarted.
                                    worker.start();
                                    worker.resume();
                                }
                            } else {
                                for worker in &shared.workers[desired..observed] {
                                    worker.pause();
                                }
                            }
                            trace!(observed, desired, stress, "resized active worker set");
                        }
                    }
                }
                thread::yield_now();
            }
            State::Created | State::Paused => {
                let mut guard = shared.lock.lock();
                // Recheck under the lock to avoid a lost wakeup; spurious
                // wakeups fall back into the outer loop.
                if shared.status.load().is_parked() {
                    shared.cv.wait(&mut guard);
                }
            }
        }
    }
    trace!("manager exiting");
}
