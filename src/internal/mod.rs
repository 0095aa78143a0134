//! Internal machinery shared by the channel implementations.

pub(crate) mod waiter;
