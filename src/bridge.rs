// src/bridge.rs

//! Adapters between conflating channels and [`futures_core::Stream`]s.

use crate::conflated::{AsyncReceiver, AsyncSender};
use crate::error::{Closed, SendError};

use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use std::error::Error as StdError;
use std::sync::Arc;

/// Forwards a fallible stream into the channel, conflating whenever the
/// consumer falls behind.
///
/// Each `Ok` item is sent, overwriting any unconsumed predecessor. The first
/// `Err` closes the channel with that error as the cause and stops the
/// forward; stream exhaustion closes it gracefully.
///
/// Returns an error only when the channel was closed from elsewhere while
/// items remained, handing back the item that could not be delivered.
pub async fn feed<S, T, E>(stream: S, sender: AsyncSender<T>) -> Result<(), SendError<T>>
where
  S: Stream<Item = Result<T, E>>,
  T: Send,
  E: StdError + Send + Sync + 'static,
{
  pin_mut!(stream);
  while let Some(item) = stream.next().await {
    match item {
      Ok(value) => sender.send(value).await?,
      Err(cause) => {
        sender.close_with(Arc::new(cause));
        return Ok(());
      }
    }
  }
  sender.close();
  Ok(())
}

/// Wraps the receiver in a stream that surfaces the close cause.
///
/// The plain `Stream` impl on [`AsyncReceiver`] ends silently on any closure.
/// This one yields a final `Err` carrying the [`Closed`] signal when the
/// channel was closed with a cause, and only then ends.
pub fn try_stream<T: Send>(receiver: AsyncReceiver<T>) -> impl Stream<Item = Result<T, Closed>> {
  futures_util::stream::unfold(Some(receiver), |state| async move {
    let receiver = state?;
    match receiver.recv().await {
      Ok(value) => Some((Ok(value), Some(receiver))),
      Err(closed) if closed.is_graceful() => None,
      Err(closed) => Some((Err(closed), None)),
    }
  })
}
