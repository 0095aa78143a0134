//! Waker plumbing shared by the async receive paths.

// Single seam for the waker primitive; nothing else in the crate names
// futures_util for this directly.
pub(crate) use futures_util::task::AtomicWaker;
