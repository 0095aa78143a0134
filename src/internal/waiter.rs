// src/internal/waiter.rs

//! Parked-receiver bookkeeping shared by the sync and async receive paths.
//!
//! A [`Waiter`] is one suspended receive call. Its lifecycle is a tiny atomic
//! state machine with exactly one permitted exit from `WAITING`:
//!
//! ```text
//!   WAITING --try_claim--> CLAIMED --commit--> RESUMED
//!      |                      |
//!      |                      +--revoke--> WAITING   (select clause lost)
//!      +--try_cancel--> CANCELLED
//! ```
//!
//! Claims are only taken while the channel lock is held; commits run strictly
//! after the lock is dropped. The CAS on `state` is the sole arbiter between a
//! delivery and a concurrent cancellation.

use crate::async_util::AtomicWaker;
use crate::error::Closed;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread::Thread;

pub(crate) const WAITING: u8 = 0;
pub(crate) const CLAIMED: u8 = 1;
pub(crate) const RESUMED: u8 = 2;
pub(crate) const CANCELLED: u8 = 3;

/// How a parked receiver gets woken once an outcome is committed.
pub(crate) enum WakeHandle {
  /// Blocking receiver: unpark the thread.
  Thread(Thread),
  /// Task receiver: wake through the registered waker.
  Task(AtomicWaker),
}

impl WakeHandle {
  fn wake(&self) {
    match self {
      WakeHandle::Thread(thread) => thread.unpark(),
      WakeHandle::Task(waker) => waker.wake(),
    }
  }
}

/// One suspended receive call.
///
/// Held by `Arc`: the waiter queue keeps one handle while parked, the
/// suspended caller keeps another, and a committing sender briefly holds a
/// third through its [`ResumeToken`]. Commits run after the channel lock is
/// dropped, so delivery cannot borrow queue storage.
pub(crate) struct Waiter<T> {
  state: AtomicU8,
  outcome: Mutex<Option<Result<T, Closed>>>,
  wake: WakeHandle,
}

impl<T> Waiter<T> {
  pub(crate) fn new_thread(thread: Thread) -> Arc<Self> {
    Arc::new(Waiter {
      state: AtomicU8::new(WAITING),
      outcome: Mutex::new(None),
      wake: WakeHandle::Thread(thread),
    })
  }

  pub(crate) fn new_task() -> Arc<Self> {
    Arc::new(Waiter {
      state: AtomicU8::new(WAITING),
      outcome: Mutex::new(None),
      wake: WakeHandle::Task(AtomicWaker::new()),
    })
  }

  /// Re-arms the task waker. No-op for thread waiters.
  ///
  /// Callers must re-check [`state`](Self::state) after registering; the
  /// commit side stores `RESUMED` before waking.
  pub(crate) fn register(&self, waker: &Waker) {
    if let WakeHandle::Task(atomic) = &self.wake {
      atomic.register(waker);
    }
  }

  pub(crate) fn state(&self) -> u8 {
    self.state.load(Ordering::Acquire)
  }

  /// Prepare step: claim `waiter` for one delivery.
  ///
  /// Must be called with the channel lock held. Fails when the waiter was
  /// concurrently cancelled by its owner.
  pub(crate) fn try_claim(waiter: &Arc<Self>) -> Option<ResumeToken<T>> {
    waiter
      .state
      .compare_exchange(WAITING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| ResumeToken {
        waiter: Arc::clone(waiter),
      })
  }

  /// Cancellation arbiter, called by the waiter's owner (future drop, receive
  /// timeout).
  ///
  /// A concurrent claim window is spun out: a claim either commits promptly
  /// (the committer holds no lock at that point) or is revoked under the
  /// channel lock, so the window is bounded.
  pub(crate) fn try_cancel(&self) -> CancelOutcome<T> {
    let mut spins = 0u32;
    loop {
      match self
        .state
        .compare_exchange(WAITING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return CancelOutcome::Cancelled,
        Err(CLAIMED) if spins < 32 => {
          spins += 1;
          std::hint::spin_loop();
        }
        Err(CLAIMED) => std::thread::yield_now(),
        Err(RESUMED) => return CancelOutcome::AlreadyResumed(self.take_outcome()),
        Err(state) => unreachable!("cancelling a waiter in state {}", state),
      }
    }
  }

  /// Takes the committed outcome. Only valid after `RESUMED` was observed.
  pub(crate) fn take_outcome(&self) -> Result<T, Closed> {
    self
      .outcome
      .lock()
      .take()
      .expect("resumed waiter is missing its outcome")
  }
}

/// Reports which side won the delivery/cancellation race.
pub(crate) enum CancelOutcome<T> {
  /// The cancel won; the owner must unlink the waiter from the queue.
  Cancelled,
  /// A delivery committed first; its outcome is handed to the canceller.
  AlreadyResumed(Result<T, Closed>),
}

/// Single-use proof that one waiter was claimed for delivery.
///
/// Produced under the channel lock by [`Waiter::try_claim`] and consumed
/// exactly once: by [`commit`](ResumeToken::commit) strictly after the lock is
/// dropped, or by [`revoke`](ResumeToken::revoke) while it is still held.
/// Single use is enforced by move semantics; there is no runtime re-check.
#[must_use]
pub(crate) struct ResumeToken<T> {
  waiter: Arc<Waiter<T>>,
}

impl<T> ResumeToken<T> {
  /// Commit step: deliver the outcome and wake the parked receiver.
  pub(crate) fn commit(self, outcome: Result<T, Closed>) {
    *self.waiter.outcome.lock() = Some(outcome);
    self.waiter.state.store(RESUMED, Ordering::Release);
    self.waiter.wake.wake();
  }

  /// Rolls the claim back to `WAITING`.
  ///
  /// Only valid while the channel lock is still held and the waiter is still
  /// queued; the waiter keeps its FIFO position.
  pub(crate) fn revoke(self) {
    self.waiter.state.store(WAITING, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;
  use std::time::Duration;

  #[test]
  fn claim_then_commit_delivers() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    let token = Waiter::try_claim(&waiter).unwrap();
    assert_eq!(waiter.state(), CLAIMED);

    token.commit(Ok(7));
    assert_eq!(waiter.state(), RESUMED);
    assert_eq!(waiter.take_outcome().unwrap(), 7);
  }

  #[test]
  fn claim_is_exclusive() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    let token = Waiter::try_claim(&waiter).unwrap();
    assert!(Waiter::try_claim(&waiter).is_none());
    token.revoke();
    // After a revoke, the waiter is claimable again.
    let token = Waiter::try_claim(&waiter).unwrap();
    token.commit(Ok(1));
  }

  #[test]
  fn cancel_beats_late_claim() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    assert!(matches!(waiter.try_cancel(), CancelOutcome::Cancelled));
    assert!(Waiter::try_claim(&waiter).is_none());
    assert_eq!(waiter.state(), CANCELLED);
  }

  #[test]
  fn cancel_after_commit_returns_outcome() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    let token = Waiter::try_claim(&waiter).unwrap();
    token.commit(Ok(42));
    match waiter.try_cancel() {
      CancelOutcome::AlreadyResumed(outcome) => assert_eq!(outcome.unwrap(), 42),
      CancelOutcome::Cancelled => panic!("cancel should have lost to the commit"),
    }
  }

  #[test]
  fn cancel_spins_through_claim_window() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    let token = Waiter::try_claim(&waiter).unwrap();

    let committer = {
      let delay = Duration::from_millis(20);
      thread::spawn(move || {
        thread::sleep(delay);
        token.commit(Ok(9));
      })
    };

    // The cancel call starts while the claim is outstanding and must wait for
    // the commit to land rather than winning or erroring.
    match waiter.try_cancel() {
      CancelOutcome::AlreadyResumed(outcome) => assert_eq!(outcome.unwrap(), 9),
      CancelOutcome::Cancelled => panic!("cancel must not win against a committed claim"),
    }
    committer.join().unwrap();
  }

  #[test]
  fn thread_wake_unparks_receiver() {
    let waiter: Arc<Waiter<u32>> = Waiter::new_thread(thread::current());
    let remote = Arc::clone(&waiter);
    let handle = thread::spawn(move || {
      let token = Waiter::try_claim(&remote).unwrap();
      token.commit(Ok(3));
    });
    while waiter.state() != RESUMED {
      thread::park_timeout(Duration::from_millis(5));
    }
    assert_eq!(waiter.take_outcome().unwrap(), 3);
    handle.join().unwrap();
  }
}
