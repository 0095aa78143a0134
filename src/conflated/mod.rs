// src/conflated/mod.rs

//! Single-slot conflating channel.
//!
//! The channel keeps at most one element. A send into an occupied slot
//! **overwrites** the previous element, which is permanently lost with no
//! notification; this is the defining behavior and the reason senders never
//! wait for capacity. When a receiver is already parked, a send bypasses the
//! slot entirely and hands the element straight to it.
//!
//! Senders close the channel (`close`/`close_with`, or dropping the last
//! sender); a buffered element stays retrievable after a close. Receivers
//! cancel it (`cancel`/`cancel_with`, or dropping the last receiver), which
//! also discards anything buffered.
//!
//! ```
//! use conflux::conflated;
//!
//! let (tx, rx) = conflated::channel();
//! tx.send(1).unwrap();
//! tx.send(2).unwrap(); // conflates: 1 is gone
//! assert_eq!(rx.recv().unwrap(), 2);
//!
//! tx.close();
//! assert!(rx.try_recv().is_err());
//! ```

mod async_impl;
mod sync_impl;

pub use async_impl::RecvFuture;

use crate::error::{Closed, CloseCause, RecvTimeoutError, SendError, TryRecvError};
use crate::internal::waiter::Waiter;
use crate::rendezvous::buffer::Buffer;
use crate::rendezvous::RendezvousCore;
use crate::select::{OfferClause, PollClause};

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

/// Single-slot buffer that keeps only the latest element.
pub(crate) struct ConflatedSlot<T> {
  value: Option<T>,
}

impl<T> ConflatedSlot<T> {
  fn new() -> Self {
    ConflatedSlot { value: None }
  }
}

impl<T: Send> Buffer<T> for ConflatedSlot<T> {
  fn len(&self) -> usize {
    usize::from(self.value.is_some())
  }

  fn is_empty(&self) -> bool {
    self.value.is_none()
  }

  fn is_full(&self) -> bool {
    self.value.is_some()
  }

  fn accept(&mut self, value: T) -> Option<T> {
    self.value.replace(value)
  }

  fn take(&mut self) -> Option<T> {
    self.value.take()
  }
}

pub(crate) type ConflatedCore<T> = RendezvousCore<T, ConflatedSlot<T>>;

/// Creates a conflating channel with blocking handles.
pub fn channel<T: Send>() -> (Sender<T>, Receiver<T>) {
  let core = Arc::new(RendezvousCore::new(ConflatedSlot::new()));
  (
    Sender {
      core: Arc::clone(&core),
    },
    Receiver { core },
  )
}

/// Creates a conflating channel with async handles.
pub fn channel_async<T: Send>() -> (AsyncSender<T>, AsyncReceiver<T>) {
  let core = Arc::new(RendezvousCore::new(ConflatedSlot::new()));
  (
    AsyncSender {
      core: Arc::clone(&core),
    },
    AsyncReceiver {
      core,
      stream_waiter: None,
    },
  )
}

/// Producer handle for the blocking side.
pub struct Sender<T: Send> {
  core: Arc<ConflatedCore<T>>,
}

/// Consumer handle for the blocking side.
pub struct Receiver<T: Send> {
  core: Arc<ConflatedCore<T>>,
}

/// Producer handle for the async side.
pub struct AsyncSender<T: Send> {
  core: Arc<ConflatedCore<T>>,
}

/// Consumer handle for the async side.
///
/// Also a [`futures_core::Stream`] of the delivered elements; the stream ends
/// when the channel is closed and drained, whatever the cause. Use
/// [`recv`](AsyncReceiver::recv) (or [`crate::bridge::try_stream`]) when the
/// cause matters.
pub struct AsyncReceiver<T: Send> {
  core: Arc<ConflatedCore<T>>,
  // Parked waiter for the Stream impl; recv() futures carry their own.
  stream_waiter: Option<Arc<Waiter<T>>>,
}

impl<T: Send> Sender<T> {
  /// Sends a value, overwriting any buffered one.
  ///
  /// Never blocks: conflation always makes room. Fails only when the channel
  /// is closed, handing the value back.
  pub fn send(&self, value: T) -> Result<(), SendError<T>> {
    self.core.try_send_core(value)
  }

  /// Same operation as [`send`](Sender::send), under the conventional name
  /// for the non-waiting form.
  pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
    self.core.try_send_core(value)
  }

  /// Closes the channel gracefully. Returns whether this call performed the
  /// transition; a buffered element stays retrievable.
  pub fn close(&self) -> bool {
    self.core.close_core(None)
  }

  /// Closes the channel with a cause that every later operation and every
  /// parked receiver observes.
  pub fn close_with(&self, cause: CloseCause) -> bool {
    self.core.close_core(Some(cause))
  }

  /// An offer clause over this channel for an external select.
  pub fn offer_clause(&self, value: T) -> OfferClause<'_, T> {
    OfferClause::new(&self.core, value)
  }

  /// Converts this handle into its async counterpart.
  pub fn to_async(self) -> AsyncSender<T> {
    let core = unsafe { std::ptr::read(&self.core) };
    mem::forget(self);
    AsyncSender { core }
  }

  /// True once the channel is closed (for send) or cancelled.
  pub fn is_closed(&self) -> bool {
    self.core.is_closed()
  }

  /// Number of buffered elements (0 or 1).
  pub fn len(&self) -> usize {
    self.core.len()
  }

  /// True when nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.core.is_empty()
  }

  /// True when an element is buffered and the next send will conflate.
  pub fn is_full(&self) -> bool {
    self.core.is_full()
  }

  /// Buffer capacity; always 1 for a conflating channel.
  pub fn capacity(&self) -> usize {
    1
  }

  /// Number of live sender handles (sync and async combined).
  pub fn sender_count(&self) -> usize {
    self.core.sender_count()
  }

  /// Number of live receiver handles (sync and async combined).
  pub fn receiver_count(&self) -> usize {
    self.core.receiver_count()
  }
}

impl<T: Send> Receiver<T> {
  /// Takes the buffered element without waiting.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.core.try_recv_core()
  }

  /// Blocks the calling thread until an element is delivered or the channel
  /// is closed and drained.
  pub fn recv(&self) -> Result<T, Closed> {
    sync_impl::recv(&self.core)
  }

  /// Like [`recv`](Receiver::recv), giving up after `timeout`.
  ///
  /// A delivery that commits in the same instant the deadline expires wins
  /// the race and is returned, never dropped.
  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
    sync_impl::recv_timeout(&self.core, timeout)
  }

  /// Cancels the channel: forces the terminal drained state and discards any
  /// buffered element. Returns whether this call performed the transition.
  pub fn cancel(&self) -> bool {
    self.core.cancel_core(None)
  }

  /// Cancels the channel with a cause.
  pub fn cancel_with(&self, cause: CloseCause) -> bool {
    self.core.cancel_core(Some(cause))
  }

  /// A poll clause over this channel for an external select.
  pub fn poll_clause(&self) -> PollClause<'_, T> {
    PollClause::new(&self.core)
  }

  /// Converts this handle into its async counterpart.
  pub fn to_async(self) -> AsyncReceiver<T> {
    let core = unsafe { std::ptr::read(&self.core) };
    mem::forget(self);
    AsyncReceiver {
      core,
      stream_waiter: None,
    }
  }

  /// True once the channel is closed (for send) or cancelled.
  pub fn is_closed(&self) -> bool {
    self.core.is_closed()
  }

  /// Number of buffered elements (0 or 1).
  pub fn len(&self) -> usize {
    self.core.len()
  }

  /// True when nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.core.is_empty()
  }

  /// True when an element is buffered.
  pub fn is_full(&self) -> bool {
    self.core.is_full()
  }

  /// Buffer capacity; always 1 for a conflating channel.
  pub fn capacity(&self) -> usize {
    1
  }

  /// Number of live sender handles (sync and async combined).
  pub fn sender_count(&self) -> usize {
    self.core.sender_count()
  }

  /// Number of live receiver handles (sync and async combined).
  pub fn receiver_count(&self) -> usize {
    self.core.receiver_count()
  }
}

impl<T: Send> AsyncSender<T> {
  /// Sends a value, overwriting any buffered one.
  ///
  /// Resolves immediately: conflation always makes room. Fails only when the
  /// channel is closed, handing the value back.
  pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
    self.core.try_send_core(value)
  }

  /// Non-waiting send; identical behavior to [`send`](AsyncSender::send).
  pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
    self.core.try_send_core(value)
  }

  /// Closes the channel gracefully. Returns whether this call performed the
  /// transition.
  pub fn close(&self) -> bool {
    self.core.close_core(None)
  }

  /// Closes the channel with a cause.
  pub fn close_with(&self, cause: CloseCause) -> bool {
    self.core.close_core(Some(cause))
  }

  /// An offer clause over this channel for an external select.
  pub fn offer_clause(&self, value: T) -> OfferClause<'_, T> {
    OfferClause::new(&self.core, value)
  }

  /// Converts this handle into its blocking counterpart.
  pub fn to_sync(self) -> Sender<T> {
    let core = unsafe { std::ptr::read(&self.core) };
    mem::forget(self);
    Sender { core }
  }

  /// True once the channel is closed (for send) or cancelled.
  pub fn is_closed(&self) -> bool {
    self.core.is_closed()
  }

  /// Number of buffered elements (0 or 1).
  pub fn len(&self) -> usize {
    self.core.len()
  }

  /// True when nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.core.is_empty()
  }

  /// True when an element is buffered and the next send will conflate.
  pub fn is_full(&self) -> bool {
    self.core.is_full()
  }

  /// Buffer capacity; always 1 for a conflating channel.
  pub fn capacity(&self) -> usize {
    1
  }

  /// Number of live sender handles (sync and async combined).
  pub fn sender_count(&self) -> usize {
    self.core.sender_count()
  }

  /// Number of live receiver handles (sync and async combined).
  pub fn receiver_count(&self) -> usize {
    self.core.receiver_count()
  }
}

impl<T: Send> AsyncReceiver<T> {
  /// Takes the buffered element without waiting.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.core.try_recv_core()
  }

  /// Waits until an element is delivered or the channel is closed and
  /// drained.
  ///
  /// Dropping the returned future cancels the parked receive; the token
  /// protocol guarantees the cancellation and a concurrent delivery cannot
  /// both win.
  pub fn recv(&self) -> RecvFuture<'_, T> {
    RecvFuture::new(self)
  }

  /// Cancels the channel: forces the terminal drained state and discards any
  /// buffered element. Returns whether this call performed the transition.
  pub fn cancel(&self) -> bool {
    self.core.cancel_core(None)
  }

  /// Cancels the channel with a cause.
  pub fn cancel_with(&self, cause: CloseCause) -> bool {
    self.core.cancel_core(Some(cause))
  }

  /// A poll clause over this channel for an external select.
  pub fn poll_clause(&self) -> PollClause<'_, T> {
    PollClause::new(&self.core)
  }

  /// Converts this handle into its blocking counterpart.
  ///
  /// A receive parked by the `Stream` impl is cancelled first, exactly as if
  /// the pending `poll_next` had been dropped.
  pub fn to_sync(mut self) -> Receiver<T> {
    async_impl::abandon(&self.core, &mut self.stream_waiter);
    let core = unsafe { std::ptr::read(&self.core) };
    mem::forget(self);
    Receiver { core }
  }

  /// True once the channel is closed (for send) or cancelled.
  pub fn is_closed(&self) -> bool {
    self.core.is_closed()
  }

  /// Number of buffered elements (0 or 1).
  pub fn len(&self) -> usize {
    self.core.len()
  }

  /// True when nothing is buffered.
  pub fn is_empty(&self) -> bool {
    self.core.is_empty()
  }

  /// True when an element is buffered.
  pub fn is_full(&self) -> bool {
    self.core.is_full()
  }

  /// Buffer capacity; always 1 for a conflating channel.
  pub fn capacity(&self) -> usize {
    1
  }

  /// Number of live sender handles (sync and async combined).
  pub fn sender_count(&self) -> usize {
    self.core.sender_count()
  }

  /// Number of live receiver handles (sync and async combined).
  pub fn receiver_count(&self) -> usize {
    self.core.receiver_count()
  }
}

impl<T: Send> Clone for Sender<T> {
  fn clone(&self) -> Self {
    self.core.add_sender();
    Sender {
      core: Arc::clone(&self.core),
    }
  }
}

impl<T: Send> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    self.core.add_receiver();
    Receiver {
      core: Arc::clone(&self.core),
    }
  }
}

impl<T: Send> Clone for AsyncSender<T> {
  fn clone(&self) -> Self {
    self.core.add_sender();
    AsyncSender {
      core: Arc::clone(&self.core),
    }
  }
}

impl<T: Send> Clone for AsyncReceiver<T> {
  fn clone(&self) -> Self {
    self.core.add_receiver();
    AsyncReceiver {
      core: Arc::clone(&self.core),
      stream_waiter: None,
    }
  }
}

impl<T: Send> Drop for Sender<T> {
  fn drop(&mut self) {
    self.core.drop_sender();
  }
}

impl<T: Send> Drop for Receiver<T> {
  fn drop(&mut self) {
    self.core.drop_receiver();
  }
}

impl<T: Send> Drop for AsyncSender<T> {
  fn drop(&mut self) {
    self.core.drop_sender();
  }
}

impl<T: Send> Drop for AsyncReceiver<T> {
  fn drop(&mut self) {
    async_impl::abandon(&self.core, &mut self.stream_waiter);
    self.core.drop_receiver();
  }
}

impl<T: Send> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sender")
      .field("closed", &self.core.is_closed())
      .field("len", &self.core.len())
      .finish_non_exhaustive()
  }
}

impl<T: Send> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Receiver")
      .field("closed", &self.core.is_closed())
      .field("len", &self.core.len())
      .finish_non_exhaustive()
  }
}

impl<T: Send> fmt::Debug for AsyncSender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncSender")
      .field("closed", &self.core.is_closed())
      .field("len", &self.core.len())
      .finish_non_exhaustive()
  }
}

impl<T: Send> fmt::Debug for AsyncReceiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncReceiver")
      .field("closed", &self.core.is_closed())
      .field("len", &self.core.len())
      .finish_non_exhaustive()
  }
}
