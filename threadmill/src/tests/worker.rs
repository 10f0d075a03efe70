use crate::state::State;
use crate::work::WorkItem;
use crate::worker::Worker;

use quadring::RingQueue;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn counting_item(counter: &Arc<AtomicUsize>) -> WorkItem {
    let counter = Arc::clone(counter);
    WorkItem::new(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
}

fn wait_for(counter: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while counter.load(Ordering::Relaxed) < expected {
        assert!(Instant::now() < deadline, "worker never caught up");
        thread::yield_now();
    }
}

#[test]
fn created_worker_leaves_the_queue_alone() {
    let queue = Arc::new(RingQueue::new(16));
    let worker = Worker::spawn(0, Arc::clone(&queue));
    assert_eq!(worker.state(), State::Created);

    let counter = Arc::new(AtomicUsize::new(0));
    queue.try_push(counting_item(&counter)).unwrap();

    thread::sleep(Duration::from_millis(20));
    assert_eq!(counter.load(Ordering::Relaxed), 0);
    assert_eq!(queue.len(), 1);

    worker.shutdown();
    assert_eq!(worker.state(), State::Terminated);
}

#[test]
fn start_pause_resume_cycle() {
    let queue = Arc::new(RingQueue::new(16));
    let worker = Worker::spawn(0, Arc::clone(&queue));
    let counter = Arc::new(AtomicUsize::new(0));

    queue.try_push(counting_item(&counter)).unwrap();
    worker.start();
    assert_eq!(worker.state(), State::Running);
    wait_for(&counter, 1);

    worker.pause();
    assert_eq!(worker.state(), State::Paused);
    // Let the worker reach its condvar wait before queuing more work.
    thread::sleep(Duration::from_millis(20));
    queue.try_push(counting_item(&counter)).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(counter.load(Ordering::Relaxed), 1);

    worker.resume();
    wait_for(&counter, 2);

    worker.shutdown();
    assert_eq!(counter.load(Ordering::Relaxed), 2);
}

#[test]
fn shutdown_is_idempotent() {
    let queue = Arc::new(RingQueue::new(4));
    let worker = Worker::spawn(0, Arc::clone(&queue));
    worker.start();
    worker.shutdown();
    worker.shutdown();
    assert_eq!(worker.state(), State::Terminated);
}

#[test]
fn pause_of_idle_worker_is_a_noop() {
    let queue = Arc::new(RingQueue::<WorkItem>::new(4));
    let worker = Worker::spawn(0, Arc::clone(&queue));

    // Not running yet: pause must not fire Created -> Paused.
    worker.pause();
    assert_eq!(worker.state(), State::Created);

    worker.shutdown();
    // After termination neither pause nor resume revives the worker.
    worker.pause();
    worker.resume();
    assert_eq!(worker.state(), State::Terminated);
}

#[test]
fn drop_joins_the_thread() {
    let queue = Arc::new(RingQueue::<WorkItem>::new(4));
    let worker = Worker::spawn(0, Arc::clone(&queue));
    worker.start();

    drop(worker);
    // The worker thread held the only other queue reference; a completed
    // join means it released it.
    assert_eq!(Arc::strong_count(&queue), 1);
}

#[test]
fn records_execution_stats() {
    let queue = Arc::new(RingQueue::new(16));
    let worker = Worker::spawn(0, Arc::clone(&queue));
    let counter = Arc::new(AtomicUsize::new(0));

    worker.start();
    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        queue
            .try_push(WorkItem::new(move || {
                thread::sleep(Duration::from_millis(2));
                counter.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
    }
    wait_for(&counter, 5);
    worker.shutdown();

    let stats = worker.stats();
    assert!(stats.busy >= Duration::from_millis(10));
    assert!(stats.avg_task > Duration::ZERO);
}
