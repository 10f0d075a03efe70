//! Long-lived worker threads.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use quadring::RingQueue;

use crate::state::{AtomicState, State};
use crate::work::WorkItem;

/// Smoothing factor for the per-worker task-duration average: higher values
/// weight recent tasks more heavily.
const DURATION_SMOOTHING: f64 = 0.125;

/// State shared between a [`Worker`] handle and its OS thread.
struct WorkerCore {
    status: AtomicState,
    /// Companion lock for the created/paused sleep states. Held only around
    /// the condvar wait and around the notify that ends it.
    lock: Mutex<()>,
    cv: Condvar,
    /// Total time spent executing work items, in microseconds.
    busy_us: AtomicU64,
    /// Smoothed task duration in microseconds, stored as f64 bits.
    /// Single writer: the worker thread itself.
    avg_task_us: AtomicU64,
}

/// Snapshot of a worker's execution statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerStats {
    /// Total time the worker has spent executing work items.
    pub busy: Duration,
    /// Smoothed average duration of recently executed work items.
    pub avg_task: Duration,
}

/// A long-lived thread bound to the shared work queue.
///
/// Constructed in the created state with its thread parked. The thread exits
/// once the status word reaches terminated; [`shutdown`](Worker::shutdown)
/// and the destructor both guarantee the join happens before the worker's
/// storage is released.
pub(crate) struct Worker {
    core: Arc<WorkerCore>,
    /// The OS thread; taken exactly once, by whoever joins it.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Spawn a worker bound to `queue`, parked in the created state.
    pub(crate) fn spawn(id: usize, queue: Arc<RingQueue<WorkItem>>) -> Self {
        let core = Arc::new(WorkerCore {
            status: AtomicState::new(State::Created),
            lock: Mutex::new(()),
            cv: Condvar::new(),
            busy_us: AtomicU64::new(0),
            avg_task_us: AtomicU64::new(0f64.to_bits()),
        });

        let thread_core = Arc::clone(&core);
        let handle = thread::Builder::new()
            .name(format!("threadmill-worker-{id}"))
            .spawn(move || run(&thread_core, &queue))
            .expect("failed to spawn worker thread");

        Self {
            core,
            handle: Mutex::new(Some(handle)),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> State {
        self.core.status.load()
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        WorkerStats {
            busy: Duration::from_micros(self.core.busy_us.load(Ordering::Relaxed)),
            avg_task: Duration::from_micros(
                f64::from_bits(self.core.avg_task_us.load(Ordering::Relaxed)) as u64,
            ),
        }
    }

    /// Created -> running.
    pub(crate) fn start(&self) {
        if self.core.status.transition(State::Created, State::Running) {
            self.notify();
        }
    }

    /// Running -> paused. No wakeup needed: the worker is busy-looping and
    /// observes the store on its next iteration.
    pub(crate) fn pause(&self) {
        self.core.status.transition(State::Running, State::Paused);
    }

    /// Paused -> running.
    pub(crate) fn resume(&self) {
        if self.core.status.transition(State::Paused, State::Running) {
            self.notify();
        }
    }

    /// Terminate the worker and join its thread. Safe to call repeatedly.
    pub(crate) fn shutdown(&self) {
        let prior = self.core.status.replace(State::Terminated);
        if prior.is_parked() {
            self.notify();
        }
        if let Some(handle) = self.handle.lock().take() {
            // Ignoring join errors — a work item may have unwound through
            // the worker; its promise was abandoned during the unwind.
            let _ = handle.join();
        }
    }

    fn notify(&self) {
        // Hold the companion lock so the wakeup cannot slip between the
        // worker's status recheck and its wait.
        let _guard = self.core.lock.lock();
        self.core.cv.notify_one();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker thread body: drain the queue while running, sleep while parked,
/// exit once terminated.
fn run(core: &WorkerCore, queue: &RingQueue<WorkItem>) {
    loop {
        match core.status.load() {
            State::Running => {
                if let Some(mut item) = queue.try_pop() {
                    let started = Instant::now();
                    item.invoke();
                    record(core, started.elapsed());
                } else {
                    thread::yield_now();
                }
            }
            State::Created | State::Paused => {
                let mut guard = core.lock.lock();
                // Recheck under the lock: a transition may have raced the
                // status load above, and its notify only comes after taking
                // this lock. Spurious wakeups fall back into the outer loop.
                if core.status.load().is_parked() {
                    core.cv.wait(&mut guard);
                }
            }
            State::Terminated => break,
        }
    }
}

fn record(core: &WorkerCore, elapsed: Duration) {
    let us = elapsed.as_micros() as u64;
    core.busy_us.fetch_add(us, Ordering::Relaxed);
    let prev = f64::from_bits(core.avg_task_us.load(Ordering::Relaxed));
    let next = prev + DURATION_SMOOTHING * (us as f64 - prev);
    core.avg_task_us.store(next.to_bits(), Ordering::Relaxed);
}
