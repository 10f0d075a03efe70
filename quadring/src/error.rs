//! Queue error types.

use core::fmt;

/// Error returned when pushing into a full ring.
///
/// Carries the rejected item so the caller can retry or discard it.
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Recover the rejected item.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}
