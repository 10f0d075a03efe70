//! Core implementation for `quadring`.

#![warn(missing_docs)]

mod error;
mod latch;
mod ring;

#[cfg(test)]
mod tests;

pub use error::Full;
pub use latch::{LatchGuard, SpinLatch};
pub use ring::RingQueue;
