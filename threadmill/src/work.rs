//! Opaque one-shot units of work.

use core::fmt;

/// A single-shot unit of work.
///
/// Wraps an already-packaged zero-argument callable behind an owning trait
/// object. The default item is empty and invoking it does nothing; invoking
/// a non-empty item consumes the inner callable, so a second `invoke` on the
/// same item is a no-op rather than a re-run. Moving a `WorkItem` transfers
/// ownership of the callable with it.
pub struct WorkItem {
    job: Option<Box<dyn FnOnce() + Send>>,
}

impl WorkItem {
    /// Wrap a callable into a work item.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { job: Some(Box::new(f)) }
    }

    /// An empty item.
    #[must_use]
    pub fn empty() -> Self {
        Self { job: None }
    }

    /// True if the item holds no callable.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.job.is_none()
    }

    /// Run the inner callable, if any, leaving the item empty.
    #[inline]
    pub fn invoke(&mut self) {
        if let Some(job) = self.job.take() {
            job();
        }
    }
}

impl Default for WorkItem {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn empty_item_is_a_noop() {
        let mut item = WorkItem::empty();
        assert!(item.is_empty());
        item.invoke();
        assert!(item.is_empty());

        let mut item = WorkItem::default();
        item.invoke();
    }

    #[test]
    fn invokes_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let mut item = WorkItem::new(move || {
            counted.fetch_add(1, Ordering::Relaxed);
        });

        assert!(!item.is_empty());
        item.invoke();
        assert!(item.is_empty());
        item.invoke();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn moving_transfers_the_callable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let item = WorkItem::new(move || {
            counted.fetch_add(1, Ordering::Relaxed);
        });

        let mut moved = item;
        moved.invoke();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
