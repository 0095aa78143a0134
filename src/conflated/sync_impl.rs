// src/conflated/sync_impl.rs

//! Blocking receive paths for the sync [`Receiver`](super::Receiver).

use super::ConflatedCore;
use crate::error::{Closed, RecvTimeoutError};
use crate::internal::waiter::{CancelOutcome, Waiter, RESUMED};
use crate::rendezvous::ParkAttempt;

use std::thread;
use std::time::{Duration, Instant};

/// An adaptive wait strategy that spins, yields, and then parks.
fn adaptive_wait<F>(check: F)
where
  F: Fn() -> bool,
{
  // 1. Spinning Phase (for very short waits)
  for _ in 0..10 {
    if check() {
      return;
    }
    std::hint::spin_loop();
  }

  // 2. Yielding Phase (for medium waits)
  for _ in 0..20 {
    if check() {
      return;
    }
    thread::yield_now();
  }

  // 3. Blocking Phase (for long waits)
  // An unpark that lands before the park call leaves its token behind, so
  // the wake is never lost; spurious wakeups re-check and park again.
  while !check() {
    thread::park();
  }
}

pub(super) fn recv<T: Send>(core: &ConflatedCore<T>) -> Result<T, Closed> {
  match core.recv_or_park(|| Waiter::new_thread(thread::current())) {
    ParkAttempt::Ready(outcome) => outcome,
    ParkAttempt::Parked(waiter) => {
      adaptive_wait(|| waiter.state() == RESUMED);
      waiter.take_outcome()
    }
  }
}

pub(super) fn recv_timeout<T: Send>(
  core: &ConflatedCore<T>,
  timeout: Duration,
) -> Result<T, RecvTimeoutError> {
  let waiter = match core.recv_or_park(|| Waiter::new_thread(thread::current())) {
    ParkAttempt::Ready(Ok(value)) => return Ok(value),
    ParkAttempt::Ready(Err(closed)) => return Err(RecvTimeoutError::Closed(closed)),
    ParkAttempt::Parked(waiter) => waiter,
  };

  let deadline = Instant::now() + timeout;
  loop {
    if waiter.state() == RESUMED {
      return waiter.take_outcome().map_err(RecvTimeoutError::Closed);
    }
    let now = Instant::now();
    if now >= deadline {
      break;
    }
    thread::park_timeout(deadline - now);
  }

  // Deadline reached. The token protocol arbitrates against an in-flight
  // commit: either this cancellation lands first, or the committed outcome
  // is returned as a normal delivery.
  match waiter.try_cancel() {
    CancelOutcome::Cancelled => {
      core.unlink(&waiter);
      Err(RecvTimeoutError::Timeout)
    }
    CancelOutcome::AlreadyResumed(outcome) => outcome.map_err(RecvTimeoutError::Closed),
  }
}
