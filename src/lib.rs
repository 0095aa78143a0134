#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! A single-slot conflating channel for latest-value handoff.
//!
//! Conflux keeps at most one element in flight: a send into an occupied
//! channel overwrites the buffered element instead of waiting, so producers
//! never block and consumers always observe the most recent value. Both
//! blocking and async handles are provided, along with select clauses for
//! racing several channels and stream adapters for async pipelines.
//!
//! The entry points are [`conflated::channel`] and [`conflated::channel_async`].

pub mod bridge;
pub mod conflated;
pub mod error;
pub mod select;
pub mod telemetry;

// Internal plumbing - not part of the public API
mod async_util;
mod internal;
mod rendezvous;

// Public re-exports for convenience
pub use error::{CloseCause, Closed, RecvTimeoutError, SendError, TryRecvError};

#[cfg(test)]
mod tests {
  fn assert_send_sync<T: Send + Sync>() {}

  #[test]
  fn handles_are_send_and_sync() {
    assert_send_sync::<crate::conflated::Sender<i32>>();
    assert_send_sync::<crate::conflated::Receiver<i32>>();
    assert_send_sync::<crate::conflated::AsyncSender<i32>>();
    assert_send_sync::<crate::conflated::AsyncReceiver<i32>>();
    assert_send_sync::<crate::Closed>();
  }
}
