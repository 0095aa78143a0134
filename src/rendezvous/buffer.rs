// src/rendezvous/buffer.rs

/// Buffer policy consulted by the rendezvous core while its lock is held.
///
/// Implementations must be plain bookkeeping: no blocking, no user code. Any
/// element an operation displaces or discards is handed back to the core so
/// its destructor can run after the lock is dropped.
pub(crate) trait Buffer<T>: Send {
  /// Number of buffered elements.
  fn len(&self) -> usize;

  /// True when nothing is buffered.
  fn is_empty(&self) -> bool;

  /// True when the buffer cannot take another element without displacing one.
  fn is_full(&self) -> bool;

  /// Accepts an element unconditionally, returning whatever it displaced.
  fn accept(&mut self, value: T) -> Option<T>;

  /// Removes and returns the buffered element, if any.
  fn take(&mut self) -> Option<T>;
}
