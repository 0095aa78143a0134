// src/select.rs

//! Atomic multi-way choice across channels.
//!
//! A [`Selector`] owns the single "has any clause won yet" cell for one
//! select. Each participating channel hands out clause values
//! ([`OfferClause`], [`PollClause`]) that run the channel's own
//! pairing/buffering logic under its own lock and confirm against the
//! selector with one compare-and-swap. No clause ever holds two channel locks
//! at once, so selects racing each other across channels cannot form a lock
//! cycle.
//!
//! ```
//! use conflux::conflated;
//! use conflux::select::{ClauseId, Selector, TrySelect};
//!
//! let (tx_a, rx_a) = conflated::channel::<u32>();
//! let (tx_b, _rx_b) = conflated::channel::<u32>();
//!
//! let selector = Selector::new();
//! let mut offer_a = tx_a.offer_clause(1);
//! let mut offer_b = tx_b.offer_clause(2);
//!
//! assert!(matches!(
//!   offer_a.try_select(&selector, ClauseId::new(0)),
//!   Ok(TrySelect::Succeeded(()))
//! ));
//! assert!(matches!(
//!   offer_b.try_select(&selector, ClauseId::new(1)),
//!   Ok(TrySelect::AlreadyResolvedElsewhere)
//! ));
//!
//! assert_eq!(selector.winner(), Some(ClauseId::new(0)));
//! assert_eq!(offer_b.into_value(), Some(2));
//! assert_eq!(rx_a.try_recv().unwrap(), 1);
//! ```

use crate::conflated::ConflatedCore;
use crate::error::{Closed, SendError};
use crate::rendezvous::{SelectRecv, SelectSend};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

const UNRESOLVED: usize = usize::MAX;

/// Identifies one clause within a select.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClauseId(usize);

impl ClauseId {
  /// Wraps a clause index. `usize::MAX` is reserved as the unresolved
  /// sentinel and is rejected.
  pub fn new(index: usize) -> ClauseId {
    assert!(index != UNRESOLVED, "clause index usize::MAX is reserved");
    ClauseId(index)
  }

  /// The index this id was created with.
  pub fn index(self) -> usize {
    self.0
  }
}

/// Coordinates one multi-way choice.
///
/// The winner cell is a single atomic: channels confirm a tentative operation
/// with [`try_select`](Selector::try_select), and at most one confirmation
/// ever succeeds. A `Selector` is single-shot; build a new one for each
/// select round.
pub struct Selector {
  winner: AtomicUsize,
}

impl Selector {
  /// A fresh, unresolved selector.
  pub fn new() -> Selector {
    Selector {
      winner: AtomicUsize::new(UNRESOLVED),
    }
  }

  /// Atomic confirm step: true iff this clause just became the winner.
  ///
  /// Channels call this while resolving a clause; callers driving a select by
  /// hand only need it for clauses that resolve outside any channel (for
  /// example a default/timeout arm).
  pub fn try_select(&self, id: ClauseId) -> bool {
    self
      .winner
      .compare_exchange(UNRESOLVED, id.index(), Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// True once some clause has won.
  pub fn is_resolved(&self) -> bool {
    self.winner.load(Ordering::Acquire) != UNRESOLVED
  }

  /// The winning clause, once the select has resolved.
  pub fn winner(&self) -> Option<ClauseId> {
    match self.winner.load(Ordering::Acquire) {
      UNRESOLVED => None,
      index => Some(ClauseId(index)),
    }
  }
}

impl Default for Selector {
  fn default() -> Self {
    Selector::new()
  }
}

impl fmt::Debug for Selector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Selector").field("winner", &self.winner()).finish()
  }
}

/// Verdict of one two-phase select attempt.
///
/// These four variants are the complete verdict set of the try-select step;
/// channel closure is not a verdict and is reported as an operation-level
/// `Err` by the clause methods.
#[derive(Debug, PartialEq, Eq)]
pub enum TrySelect<R> {
  /// The coordinator confirmed this clause; the channel performed its
  /// mutation and `R` is the operation's normal result.
  Succeeded(R),
  /// The operation as described cannot currently match (nothing buffered for
  /// a poll); the clause stays eligible for a later attempt.
  FailedNoMatch,
  /// Another clause in the same select already won; no channel state was
  /// mutated.
  AlreadyResolvedElsewhere,
  /// Transient contention: a peeked waiter was cancelled between peek and
  /// claim. Always consumed by the clause's internal retry loop; the public
  /// clause methods never return it.
  Retry,
}

/// Offer-side clause: "if selected, deliver this element".
///
/// Obtained from a sender via `offer_clause`. The clause owns the element
/// until it wins (element delivered), the channel reports closure (element
/// returned inside the error), or the select resolves elsewhere (element
/// recoverable with [`into_value`](OfferClause::into_value)).
pub struct OfferClause<'a, T: Send> {
  core: &'a ConflatedCore<T>,
  value: Option<T>,
}

impl<'a, T: Send> OfferClause<'a, T> {
  pub(crate) fn new(core: &'a ConflatedCore<T>, value: T) -> Self {
    OfferClause {
      core,
      value: Some(value),
    }
  }

  /// Runs one full select-offer.
  ///
  /// `Retry` contention is looped away internally and the conflating buffer
  /// fallback always matches, so the verdict is either
  /// [`TrySelect::Succeeded`] or [`TrySelect::AlreadyResolvedElsewhere`]. A
  /// clause whose element was already consumed by an earlier win reports
  /// `AlreadyResolvedElsewhere`.
  pub fn try_select(
    &mut self,
    selector: &Selector,
    id: ClauseId,
  ) -> Result<TrySelect<()>, SendError<T>> {
    let value = match self.value.take() {
      Some(value) => value,
      None => return Ok(TrySelect::AlreadyResolvedElsewhere),
    };
    match self.core.try_send_selecting(value, selector, id) {
      SelectSend::Delivered => Ok(TrySelect::Succeeded(())),
      SelectSend::Lost(value) => {
        self.value = Some(value);
        Ok(TrySelect::AlreadyResolvedElsewhere)
      }
      SelectSend::Closed(error) => Err(error),
    }
  }

  /// Recovers the element after the select resolved to another clause.
  pub fn into_value(self) -> Option<T> {
    self.value
  }
}

impl<T: Send> fmt::Debug for OfferClause<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OfferClause")
      .field("armed", &self.value.is_some())
      .finish()
  }
}

/// Poll-side clause: "if selected, take the buffered element".
///
/// Obtained from a receiver via `poll_clause`.
pub struct PollClause<'a, T: Send> {
  core: &'a ConflatedCore<T>,
}

impl<'a, T: Send> PollClause<'a, T> {
  pub(crate) fn new(core: &'a ConflatedCore<T>) -> Self {
    PollClause { core }
  }

  /// Runs one select-poll.
  ///
  /// Verdicts: [`TrySelect::Succeeded`] with the element,
  /// [`TrySelect::FailedNoMatch`] when nothing is buffered, or
  /// [`TrySelect::AlreadyResolvedElsewhere`]; a closed-and-drained channel is
  /// an operation-level `Err`.
  pub fn try_select(&self, selector: &Selector, id: ClauseId) -> Result<TrySelect<T>, Closed> {
    match self.core.try_recv_selecting(selector, id) {
      SelectRecv::Delivered(value) => Ok(TrySelect::Succeeded(value)),
      SelectRecv::Empty => Ok(TrySelect::FailedNoMatch),
      SelectRecv::Lost => Ok(TrySelect::AlreadyResolvedElsewhere),
      SelectRecv::Closed(closed) => Err(closed),
    }
  }
}

impl<T: Send> fmt::Debug for PollClause<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PollClause").finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_confirm_wins() {
    let selector = Selector::new();
    assert!(!selector.is_resolved());
    assert!(selector.try_select(ClauseId::new(2)));
    assert!(!selector.try_select(ClauseId::new(3)));
    assert!(selector.is_resolved());
    assert_eq!(selector.winner(), Some(ClauseId::new(2)));
  }

  #[test]
  fn winner_is_stable() {
    let selector = Selector::new();
    assert!(selector.try_select(ClauseId::new(0)));
    for _ in 0..8 {
      assert!(!selector.try_select(ClauseId::new(1)));
      assert_eq!(selector.winner(), Some(ClauseId::new(0)));
    }
  }

  #[test]
  #[should_panic(expected = "reserved")]
  fn reserved_clause_index_rejected() {
    let _ = ClauseId::new(usize::MAX);
  }
}
