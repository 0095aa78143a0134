// src/error.rs

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Shared cause attached to a channel closure.
///
/// The cause is reference-counted because it is reported to every caller that
/// observes the closure: every pending receiver, every later send attempt, and
/// every later receive attempt sees a clone of the same underlying error.
pub type CloseCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Terminal signal reported once a channel is closed.
///
/// A closure without a cause is a normal completion; a closure with a cause is
/// a propagated failure. The cause, if any, is available through
/// [`cause`](Closed::cause) and through [`std::error::Error::source`].
#[derive(Clone, Default)]
pub struct Closed {
  cause: Option<CloseCause>,
}

impl Closed {
  pub(crate) fn new(cause: Option<CloseCause>) -> Self {
    Closed { cause }
  }

  /// The error the channel was closed with, if closure was not graceful.
  pub fn cause(&self) -> Option<&CloseCause> {
    self.cause.as_ref()
  }

  /// Consumes the signal, returning the cause.
  pub fn into_cause(self) -> Option<CloseCause> {
    self.cause
  }

  /// True when the channel was closed without an error cause.
  pub fn is_graceful(&self) -> bool {
    self.cause.is_none()
  }
}

impl fmt::Debug for Closed {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.cause {
      Some(cause) => write!(f, "Closed({:?})", cause),
      None => f.write_str("Closed"),
    }
  }
}

impl fmt::Display for Closed {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.cause {
      Some(cause) => write!(f, "channel closed: {}", cause),
      None => f.write_str("channel closed"),
    }
  }
}

impl StdError for Closed {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
  }
}

/// Error returned by `send`/`try_send` on a closed channel.
///
/// The rejected element is returned to the caller via
/// [`into_inner`](SendError::into_inner).
pub struct SendError<T> {
  value: T,
  closed: Closed,
}

impl<T> SendError<T> {
  pub(crate) fn new(value: T, closed: Closed) -> Self {
    SendError { value, closed }
  }

  /// Consumes the error, returning the element that could not be sent.
  #[inline]
  pub fn into_inner(self) -> T {
    self.value
  }

  /// The closed signal this send ran into.
  pub fn closed(&self) -> &Closed {
    &self.closed
  }

  /// Splits the error into the rejected element and the closed signal.
  pub fn into_parts(self) -> (T, Closed) {
    (self.value, self.closed)
  }
}

impl<T> fmt::Debug for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SendError({:?})", self.closed)
  }
}

impl<T> fmt::Display for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("sending on a closed channel")
  }
}

impl<T> StdError for SendError<T> {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    Some(&self.closed)
  }
}

/// Error returned by `try_recv`.
#[derive(Debug, Clone)]
pub enum TryRecvError {
  /// Nothing is buffered right now; the channel is still open.
  Empty,
  /// The channel is closed and fully drained.
  Closed(Closed),
}

impl TryRecvError {
  /// True for the transient [`Empty`](TryRecvError::Empty) case.
  pub fn is_empty(&self) -> bool {
    matches!(self, TryRecvError::Empty)
  }
}

impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => f.write_str("channel empty"),
      TryRecvError::Closed(closed) => closed.fmt(f),
    }
  }
}

impl StdError for TryRecvError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      TryRecvError::Empty => None,
      TryRecvError::Closed(closed) => closed.source(),
    }
  }
}

/// Error returned by `recv_timeout`.
#[derive(Debug, Clone)]
pub enum RecvTimeoutError {
  /// The deadline elapsed with no value delivered.
  Timeout,
  /// The channel is closed and fully drained.
  Closed(Closed),
}

impl fmt::Display for RecvTimeoutError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvTimeoutError::Timeout => f.write_str("channel receive timed out"),
      RecvTimeoutError::Closed(closed) => closed.fmt(f),
    }
  }
}

impl StdError for RecvTimeoutError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      RecvTimeoutError::Timeout => None,
      RecvTimeoutError::Closed(closed) => closed.source(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io;

  #[test]
  fn closed_display_without_cause() {
    let closed = Closed::new(None);
    assert_eq!(closed.to_string(), "channel closed");
    assert!(closed.is_graceful());
  }

  #[test]
  fn closed_display_with_cause() {
    let cause: CloseCause = Arc::new(io::Error::new(io::ErrorKind::Other, "upstream died"));
    let closed = Closed::new(Some(cause));
    assert_eq!(closed.to_string(), "channel closed: upstream died");
    assert!(!closed.is_graceful());
    assert!(closed.source().is_some());
  }

  #[test]
  fn send_error_returns_value() {
    let err = SendError::new(41, Closed::new(None));
    assert_eq!(err.to_string(), "sending on a closed channel");
    assert_eq!(err.into_inner(), 41);
  }

  #[test]
  fn try_recv_error_shapes() {
    assert!(TryRecvError::Empty.is_empty());
    let closed = TryRecvError::Closed(Closed::new(None));
    assert!(!closed.is_empty());
    assert_eq!(closed.to_string(), "channel closed");
  }
}
