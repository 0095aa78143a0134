// src/rendezvous/mod.rs

//! The rendezvous core: pairs producers with parked receivers, falls back to
//! the buffer policy, and tracks the closed-state machine.
//!
//! One `parking_lot` mutex guards the buffer, the waiter queue, and the
//! lifecycle together. Every critical section is O(1) bookkeeping: resuming a
//! waiter, waking a task, and running a displaced element's destructor all
//! happen strictly after the guard is dropped, so the lock is never held
//! across user code or another channel's lock.

pub(crate) mod buffer;
pub(crate) mod lifecycle;

use crate::error::{Closed, CloseCause, SendError, TryRecvError};
use crate::internal::waiter::{ResumeToken, Waiter};
use crate::select::{ClauseId, Selector, TrySelect};
use crate::telemetry;
use buffer::Buffer;
use lifecycle::Lifecycle;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LOC_CORE: &str = "rendezvous::core";
const EVT_PAIRED: &str = "PairedWithWaiter";
const EVT_CONFLATED: &str = "BufferDisplaced";
const EVT_CLOSED: &str = "Closed";
const EVT_CANCELLED: &str = "Cancelled";
const CTR_PAIR_RETRIES: &str = "select_pair_retries";

/// Channel state guarded by the core's single lock.
struct Internal<T, B> {
  buffer: B,
  waiters: VecDeque<Arc<Waiter<T>>>,
  lifecycle: Lifecycle,
}

/// Result of one locked receive attempt.
pub(crate) enum ParkAttempt<T> {
  /// A value or the closed signal was ready; nothing was enqueued.
  Ready(Result<T, Closed>),
  /// The caller's waiter joined the queue and must now wait on it.
  Parked(Arc<Waiter<T>>),
}

/// Channel-side verdict of a select-offer, surfaced to the clause layer.
pub(crate) enum SelectSend<T> {
  /// This clause won and the element was delivered (paired or buffered).
  Delivered,
  /// Another clause won first; the element is handed back untouched.
  Lost(T),
  /// The channel is closed; reported at the operation level.
  Closed(SendError<T>),
}

/// Channel-side verdict of a select-poll, surfaced to the clause layer.
pub(crate) enum SelectRecv<T> {
  /// This clause won and took the buffered element.
  Delivered(T),
  /// Nothing buffered; the clause did not resolve the select.
  Empty,
  /// Another clause won first; the buffer was left untouched.
  Lost,
  /// The channel is closed and drained; reported at the operation level.
  Closed(Closed),
}

/// Lock-based rendezvous engine, generic over the buffer policy.
pub(crate) struct RendezvousCore<T, B> {
  internal: Mutex<Internal<T, B>>,
  sender_count: AtomicUsize,
  receiver_count: AtomicUsize,
}

impl<T: Send, B: Buffer<T>> RendezvousCore<T, B> {
  pub(crate) fn new(buffer: B) -> Self {
    RendezvousCore {
      internal: Mutex::new(Internal {
        buffer,
        waiters: VecDeque::new(),
        lifecycle: Lifecycle::Open,
      }),
      sender_count: AtomicUsize::new(1),
      receiver_count: AtomicUsize::new(1),
    }
  }

  /// Non-waiting send. Pairs with the first live waiter, else buffers.
  ///
  /// The pairing commit and the destructor of any element the buffer
  /// displaced both run after the lock is dropped.
  pub(crate) fn try_send_core(&self, value: T) -> Result<(), SendError<T>> {
    let mut internal = self.internal.lock();
    if let Some(closed) = internal.lifecycle.closed() {
      drop(internal);
      return Err(SendError::new(value, closed));
    }
    if internal.buffer.is_empty() {
      // FIFO scan; waiters cancelled between parking and now are popped and
      // skipped.
      while let Some(waiter) = internal.waiters.pop_front() {
        if let Some(token) = Waiter::try_claim(&waiter) {
          drop(internal);
          token.commit(Ok(value));
          telemetry::log_event(None, LOC_CORE, EVT_PAIRED, None);
          return Ok(());
        }
      }
    }
    let displaced = internal.buffer.accept(value);
    drop(internal);
    if displaced.is_some() {
      telemetry::log_event(None, LOC_CORE, EVT_CONFLATED, None);
    }
    drop(displaced);
    Ok(())
  }

  /// Non-waiting receive.
  pub(crate) fn try_recv_core(&self) -> Result<T, TryRecvError> {
    let mut internal = self.internal.lock();
    match internal.buffer.take() {
      Some(value) => {
        if internal.buffer.is_empty() {
          internal.lifecycle.advance_drained();
        }
        Ok(value)
      }
      None => match internal.lifecycle.closed() {
        Some(closed) => Err(TryRecvError::Closed(closed)),
        None => Err(TryRecvError::Empty),
      },
    }
  }

  /// Receive attempt that enqueues a waiter when nothing is ready.
  ///
  /// `park` builds the waiter only when it is actually needed; it runs under
  /// the lock and must not block.
  pub(crate) fn recv_or_park<F>(&self, park: F) -> ParkAttempt<T>
  where
    F: FnOnce() -> Arc<Waiter<T>>,
  {
    let mut internal = self.internal.lock();
    match internal.buffer.take() {
      Some(value) => {
        if internal.buffer.is_empty() {
          internal.lifecycle.advance_drained();
        }
        ParkAttempt::Ready(Ok(value))
      }
      None => match internal.lifecycle.closed() {
        Some(closed) => ParkAttempt::Ready(Err(closed)),
        None => {
          let waiter = park();
          internal.waiters.push_back(Arc::clone(&waiter));
          ParkAttempt::Parked(waiter)
        }
      },
    }
  }

  /// Removes a cancelled waiter from the queue, if it is still there.
  ///
  /// A close/cancel purge may already have taken it; that purge loses the
  /// claim race against the owner's cancel and drops its handle without
  /// committing, so a missing entry is normal.
  pub(crate) fn unlink(&self, waiter: &Arc<Waiter<T>>) {
    let mut internal = self.internal.lock();
    if let Some(index) = internal
      .waiters
      .iter()
      .position(|queued| Arc::ptr_eq(queued, waiter))
    {
      internal.waiters.remove(index);
    }
  }

  /// Closes the channel for sending. Returns whether this call performed the
  /// open → closed transition.
  ///
  /// A buffered element stays retrievable; with an empty buffer the channel
  /// lands in the drained state immediately. Parked receivers are purged and
  /// resumed with the closed signal. A non-empty waiter queue implies an
  /// empty buffer, so a close that wakes receivers always drains in the same
  /// call.
  pub(crate) fn close_core(&self, cause: Option<CloseCause>) -> bool {
    let mut internal = self.internal.lock();
    let closed = Closed::new(cause.clone());
    if !internal.lifecycle.close(cause) {
      return false;
    }
    if internal.buffer.is_empty() {
      internal.lifecycle.advance_drained();
    }
    let purged = std::mem::take(&mut internal.waiters);
    drop(internal);
    telemetry::log_event(None, LOC_CORE, EVT_CLOSED, None);
    for waiter in purged {
      if let Some(token) = Waiter::try_claim(&waiter) {
        token.commit(Err(closed.clone()));
      }
    }
    true
  }

  /// Forces the terminal drained state, discarding any buffered element
  /// exactly once. Returns whether this call performed the transition.
  ///
  /// The discard is guarded by the lifecycle transition under the lock, which
  /// is what makes it idempotent under concurrent calls; the discarded
  /// element's destructor runs after the guard is dropped.
  pub(crate) fn cancel_core(&self, cause: Option<CloseCause>) -> bool {
    let mut internal = self.internal.lock();
    let closed = Closed::new(cause.clone());
    if !internal.lifecycle.cancel(cause) {
      return false;
    }
    let discarded = internal.buffer.take();
    let purged = std::mem::take(&mut internal.waiters);
    drop(internal);
    telemetry::log_event(None, LOC_CORE, EVT_CANCELLED, None);
    for waiter in purged {
      if let Some(token) = Waiter::try_claim(&waiter) {
        token.commit(Err(closed.clone()));
      }
    }
    drop(discarded);
    true
  }

  /// Select-offer: the pairing/buffering structure of
  /// [`try_send_core`](Self::try_send_core), with every mutation gated on the
  /// coordinator's confirm.
  pub(crate) fn try_send_selecting(
    &self,
    value: T,
    selector: &Selector,
    id: ClauseId,
  ) -> SelectSend<T> {
    let mut internal = self.internal.lock();
    if let Some(closed) = internal.lifecycle.closed() {
      drop(internal);
      return SelectSend::Closed(SendError::new(value, closed));
    }
    if internal.buffer.is_empty() {
      loop {
        match Self::pair_attempt(&mut internal, selector, id) {
          TrySelect::Succeeded(token) => {
            drop(internal);
            token.commit(Ok(value));
            telemetry::log_event(None, LOC_CORE, EVT_PAIRED, None);
            return SelectSend::Delivered;
          }
          TrySelect::Retry => {
            telemetry::increment_counter(LOC_CORE, CTR_PAIR_RETRIES);
            continue;
          }
          TrySelect::FailedNoMatch => break,
          TrySelect::AlreadyResolvedElsewhere => {
            drop(internal);
            return SelectSend::Lost(value);
          }
        }
      }
    }
    // Buffering branch: confirm with the coordinator before touching the
    // slot.
    if !selector.try_select(id) {
      drop(internal);
      return SelectSend::Lost(value);
    }
    let displaced = internal.buffer.accept(value);
    drop(internal);
    if displaced.is_some() {
      telemetry::log_event(None, LOC_CORE, EVT_CONFLATED, None);
    }
    drop(displaced);
    SelectSend::Delivered
  }

  /// Select-poll: confirm with the coordinator, then take the element.
  pub(crate) fn try_recv_selecting(&self, selector: &Selector, id: ClauseId) -> SelectRecv<T> {
    let mut internal = self.internal.lock();
    let value = match internal.buffer.take() {
      Some(value) => value,
      None => {
        let verdict = match internal.lifecycle.closed() {
          Some(closed) => SelectRecv::Closed(closed),
          None => SelectRecv::Empty,
        };
        drop(internal);
        return verdict;
      }
    };
    if !selector.try_select(id) {
      // The lock is held across the round trip, so a lost confirm leaves the
      // buffer observably untouched.
      let displaced = internal.buffer.accept(value);
      debug_assert!(displaced.is_none());
      drop(internal);
      return SelectRecv::Lost;
    }
    if internal.buffer.is_empty() {
      internal.lifecycle.advance_drained();
    }
    drop(internal);
    SelectRecv::Delivered(value)
  }

  /// One two-phase pairing attempt against the front waiter, under the lock.
  ///
  /// Claim first, then ask the coordinator: a lost confirm revokes the claim
  /// and the waiter keeps its FIFO position. A dead front waiter is popped
  /// and reported as `Retry`.
  fn pair_attempt(
    internal: &mut Internal<T, B>,
    selector: &Selector,
    id: ClauseId,
  ) -> TrySelect<ResumeToken<T>> {
    let waiter = match internal.waiters.front() {
      Some(waiter) => Arc::clone(waiter),
      None => return TrySelect::FailedNoMatch,
    };
    match Waiter::try_claim(&waiter) {
      None => {
        internal.waiters.pop_front();
        TrySelect::Retry
      }
      Some(token) => {
        if selector.try_select(id) {
          internal.waiters.pop_front();
          TrySelect::Succeeded(token)
        } else {
          token.revoke();
          TrySelect::AlreadyResolvedElsewhere
        }
      }
    }
  }

  pub(crate) fn add_sender(&self) {
    self.sender_count.fetch_add(1, Ordering::Relaxed);
  }

  /// Count-drop for a sender handle; the last one closes gracefully.
  pub(crate) fn drop_sender(&self) {
    if self.sender_count.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.close_core(None);
    }
  }

  pub(crate) fn add_receiver(&self) {
    self.receiver_count.fetch_add(1, Ordering::Relaxed);
  }

  /// Count-drop for a receiver handle; the last one cancels, discarding any
  /// buffered element.
  pub(crate) fn drop_receiver(&self) {
    if self.receiver_count.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.cancel_core(None);
    }
  }

  pub(crate) fn sender_count(&self) -> usize {
    self.sender_count.load(Ordering::Acquire)
  }

  pub(crate) fn receiver_count(&self) -> usize {
    self.receiver_count.load(Ordering::Acquire)
  }

  pub(crate) fn len(&self) -> usize {
    self.internal.lock().buffer.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.internal.lock().buffer.is_empty()
  }

  pub(crate) fn is_full(&self) -> bool {
    self.internal.lock().buffer.is_full()
  }

  pub(crate) fn is_closed(&self) -> bool {
    !self.internal.lock().lifecycle.is_open()
  }
}
