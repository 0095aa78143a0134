// src/conflated/async_impl.rs

//! Future and stream plumbing for the async receiver.

use super::{AsyncReceiver, ConflatedCore};
use crate::error::Closed;
use crate::internal::waiter::{CancelOutcome, Waiter, RESUMED};
use crate::rendezvous::ParkAttempt;

use futures_core::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Drives one receive attempt, parking a waiter in `slot` when the channel
/// has nothing to deliver.
///
/// The waker is registered before the waiter is published to the queue (and
/// re-registered with a state re-check on every later poll), so a commit
/// landing between publication and the task going to sleep is never lost.
pub(super) fn poll_recv<T: Send>(
  core: &ConflatedCore<T>,
  slot: &mut Option<Arc<Waiter<T>>>,
  cx: &mut Context<'_>,
) -> Poll<Result<T, Closed>> {
  if let Some(waiter) = slot.take() {
    waiter.register(cx.waker());
    if waiter.state() == RESUMED {
      return Poll::Ready(waiter.take_outcome());
    }
    *slot = Some(waiter);
    return Poll::Pending;
  }

  match core.recv_or_park(|| {
    let waiter = Waiter::new_task();
    waiter.register(cx.waker());
    waiter
  }) {
    ParkAttempt::Ready(outcome) => Poll::Ready(outcome),
    ParkAttempt::Parked(waiter) => {
      *slot = Some(waiter);
      Poll::Pending
    }
  }
}

/// Resolves an abandoned pending receive. Either the cancellation lands and
/// the waiter is unlinked, or a concurrent delivery already committed and its
/// outcome is discarded with the abandoned call.
pub(super) fn abandon<T: Send>(core: &ConflatedCore<T>, slot: &mut Option<Arc<Waiter<T>>>) {
  if let Some(waiter) = slot.take() {
    match waiter.try_cancel() {
      CancelOutcome::Cancelled => core.unlink(&waiter),
      CancelOutcome::AlreadyResumed(outcome) => drop(outcome),
    }
  }
}

/// Future returned by [`AsyncReceiver::recv`].
///
/// Dropping it before completion cancels the parked receive through the
/// token protocol, so the cancellation and a concurrent delivery cannot both
/// take effect.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct RecvFuture<'a, T: Send> {
  receiver: &'a AsyncReceiver<T>,
  waiter: Option<Arc<Waiter<T>>>,
}

impl<'a, T: Send> RecvFuture<'a, T> {
  pub(super) fn new(receiver: &'a AsyncReceiver<T>) -> Self {
    RecvFuture {
      receiver,
      waiter: None,
    }
  }
}

impl<T: Send> Future for RecvFuture<'_, T> {
  type Output = Result<T, Closed>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    poll_recv(&this.receiver.core, &mut this.waiter, cx)
  }
}

impl<T: Send> Drop for RecvFuture<'_, T> {
  fn drop(&mut self) {
    abandon(&self.receiver.core, &mut self.waiter);
  }
}

impl<T: Send> fmt::Debug for RecvFuture<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RecvFuture")
      .field("parked", &self.waiter.is_some())
      .finish()
  }
}

impl<T: Send> Stream for AsyncReceiver<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
    let this = self.get_mut();
    poll_recv(&this.core, &mut this.stream_waiter, cx).map(|outcome| outcome.ok())
  }
}
