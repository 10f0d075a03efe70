use crate::SpinLatch;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn try_lock_fails_while_held() {
    let latch = SpinLatch::new();

    let guard = latch.try_lock();
    assert!(guard.is_some());

    // While held, try_lock should fail
    assert!(latch.try_lock().is_none());

    drop(guard);

    // Now should succeed
    assert!(latch.try_lock().is_some());
}

#[test]
fn guard_releases_on_drop() {
    let latch = SpinLatch::new();
    {
        let _guard = latch.lock();
    }
    let _guard = latch.lock();
}

#[test]
fn mutual_exclusion() {
    let latch = Arc::new(SpinLatch::new());
    let inside = Arc::new(AtomicBool::new(false));
    let entries = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let latch = Arc::clone(&latch);
            let inside = Arc::clone(&inside);
            let entries = Arc::clone(&entries);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let _guard = latch.lock();
                    assert!(!inside.swap(true, Ordering::AcqRel), "two holders at once");
                    entries.fetch_add(1, Ordering::Relaxed);
                    inside.store(false, Ordering::Release);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(entries.load(Ordering::Relaxed), 4000);
}
