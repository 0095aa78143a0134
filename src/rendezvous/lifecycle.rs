// src/rendezvous/lifecycle.rs

use crate::error::{Closed, CloseCause};

/// Closed-state machine for one channel.
///
/// ```text
///   Open --close--> ClosedForSend --drain/cancel--> Drained
///     \______________________cancel______________________/
/// ```
///
/// `Drained` is terminal. The first closing call's cause is retained for the
/// lifetime of the channel; later calls never replace it. All methods are
/// called with the channel lock held.
pub(crate) enum Lifecycle {
  /// Accepting sends and receives.
  Open,
  /// No further sends; a buffered element may still be drained.
  ClosedForSend(Option<CloseCause>),
  /// Terminal: nothing left to drain, every operation reports closed.
  Drained(Option<CloseCause>),
}

impl Lifecycle {
  pub(crate) fn is_open(&self) -> bool {
    matches!(self, Lifecycle::Open)
  }

  /// The closed signal, once any closing transition has happened.
  pub(crate) fn closed(&self) -> Option<Closed> {
    match self {
      Lifecycle::Open => None,
      Lifecycle::ClosedForSend(cause) | Lifecycle::Drained(cause) => {
        Some(Closed::new(cause.clone()))
      }
    }
  }

  /// Open → ClosedForSend. Returns whether this call performed the
  /// transition.
  pub(crate) fn close(&mut self, cause: Option<CloseCause>) -> bool {
    match self {
      Lifecycle::Open => {
        *self = Lifecycle::ClosedForSend(cause);
        true
      }
      _ => false,
    }
  }

  /// Forces the terminal state. Returns whether this call performed the
  /// transition; the original close cause, if one was already recorded, is
  /// kept.
  pub(crate) fn cancel(&mut self, cause: Option<CloseCause>) -> bool {
    match self {
      Lifecycle::Open => {
        *self = Lifecycle::Drained(cause);
        true
      }
      Lifecycle::ClosedForSend(original) => {
        *self = Lifecycle::Drained(original.take());
        true
      }
      Lifecycle::Drained(_) => false,
    }
  }

  /// ClosedForSend → Drained, once the last buffered element is gone.
  pub(crate) fn advance_drained(&mut self) -> bool {
    match self {
      Lifecycle::ClosedForSend(cause) => {
        *self = Lifecycle::Drained(cause.take());
        true
      }
      _ => false,
    }
  }
}
