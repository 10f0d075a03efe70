//! One-time-publish / one-time-observe completion handles.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Interior state of a completion pair.
enum Outcome<T> {
    /// Work accepted, result not yet published.
    Pending,
    /// Result published, not yet taken.
    Ready(T),
    /// The promise was dropped without publishing: the work was rejected,
    /// panicked, or discarded by an immediate shutdown.
    Abandoned,
    /// The observer already took the value.
    Taken,
}

struct Shared<T> {
    outcome: Mutex<Outcome<T>>,
    cv: Condvar,
}

/// Producer side of a completion pair. Publishes at most once; dropping an
/// unpublished promise abandons the handle and wakes any waiting observer.
pub(crate) struct JobPromise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> JobPromise<T> {
    /// Publish the result, waking any waiting observer.
    pub(crate) fn publish(self, value: T) {
        let mut outcome = self.shared.outcome.lock();
        *outcome = Outcome::Ready(value);
        drop(outcome);
        self.shared.cv.notify_all();
    }
}

impl<T> Drop for JobPromise<T> {
    fn drop(&mut self) {
        let mut outcome = self.shared.outcome.lock();
        if matches!(*outcome, Outcome::Pending) {
            *outcome = Outcome::Abandoned;
            drop(outcome);
            self.shared.cv.notify_all();
        }
    }
}

/// Handle from which a submitter observes completion of one unit of work.
///
/// A handle is *valid* iff the pool accepted the submission. Observers of an
/// invalid handle see a permanent no-value state. A valid handle resolves
/// exactly once: either the work published its result, or the work was
/// abandoned (discarded by an immediate shutdown, or its callable unwound).
pub struct JobHandle<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> JobHandle<T> {
    /// The permanently-unfulfilled handle returned for rejected submissions.
    pub(crate) fn invalid() -> Self {
        Self { shared: None }
    }

    /// True if the submission was accepted by the pool.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.is_some()
    }

    /// True once the outcome is known: published, abandoned, or invalid.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.shared {
            None => true,
            Some(shared) => !matches!(*shared.outcome.lock(), Outcome::Pending),
        }
    }

    /// Take the result if it has already been published. Never blocks.
    #[must_use]
    pub fn try_take(&self) -> Option<T> {
        let shared = self.shared.as_ref()?;
        let mut outcome = shared.outcome.lock();
        match core::mem::replace(&mut *outcome, Outcome::Taken) {
            Outcome::Ready(value) => Some(value),
            other => {
                *outcome = other;
                None
            }
        }
    }

    /// Block until the work completes or is abandoned.
    ///
    /// Returns `None` for invalid handles, for work discarded by an
    /// immediate shutdown, and for results already taken via
    /// [`try_take`](Self::try_take).
    pub fn wait(self) -> Option<T> {
        let shared = self.shared?;
        let mut outcome = shared.outcome.lock();
        loop {
            match core::mem::replace(&mut *outcome, Outcome::Taken) {
                Outcome::Ready(value) => return Some(value),
                Outcome::Pending => {
                    *outcome = Outcome::Pending;
                    shared.cv.wait(&mut outcome);
                }
                Outcome::Abandoned => {
                    *outcome = Outcome::Abandoned;
                    return None;
                }
                Outcome::Taken => return None,
            }
        }
    }
}

/// Create a connected promise/handle pair.
pub(crate) fn completion<T>() -> (JobPromise<T>, JobHandle<T>) {
    let shared = Arc::new(Shared {
        outcome: Mutex::new(Outcome::Pending),
        cv: Condvar::new(),
    });
    let promise = JobPromise {
        shared: Arc::clone(&shared),
    };
    let handle = JobHandle {
        shared: Some(shared),
    };
    (promise, handle)
}
