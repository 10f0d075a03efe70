//! Spin latch for short critical sections.

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Spin iterations before the latch starts yielding the scheduler.
/// Each `spin_loop` hint is ~5ns on x86, so 64 spins stay well under a
/// scheduler tick.
const SPIN_LIMIT: u32 = 64;

/// Test-and-set spin latch.
///
/// Intended for critical sections that are short and rare — contended
/// acquisition spins briefly with a pause hint, then yields the scheduler
/// rather than sleeping in the kernel. Unlocking happens when the returned
/// [`LatchGuard`] drops.
///
/// # Example
///
/// ```
/// use quadring::SpinLatch;
///
/// let latch = SpinLatch::new();
/// {
///     let _guard = latch.lock();
///     assert!(latch.try_lock().is_none());
/// }
/// assert!(latch.try_lock().is_some());
/// ```
pub struct SpinLatch {
    locked: AtomicBool,
}

impl SpinLatch {
    /// Create an unlocked latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the latch, spinning until it is available.
    pub fn lock(&self) -> LatchGuard<'_> {
        loop {
            // Ordering: Acquire — pairs with the Release store in the guard's
            // drop, so the previous holder's writes are visible.
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return LatchGuard { latch: self };
            }

            // Wait for the holder without hammering the cache line.
            let mut spins = 0u32;
            while self.locked.load(Ordering::Relaxed) {
                if spins < SPIN_LIMIT {
                    core::hint::spin_loop();
                    spins += 1;
                } else {
                    thread::yield_now();
                }
            }
        }
    }

    /// Acquire the latch without blocking. Returns `None` if it is held.
    #[must_use]
    pub fn try_lock(&self) -> Option<LatchGuard<'_>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(LatchGuard { latch: self })
        } else {
            None
        }
    }
}

impl Default for SpinLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that releases the latch when dropped.
pub struct LatchGuard<'a> {
    latch: &'a SpinLatch,
}

impl Drop for LatchGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        // Ordering: Release — publishes the critical section's writes to the
        // next acquirer.
        self.latch.locked.store(false, Ordering::Release);
    }
}
