mod common;
use common::*;

use conflux::conflated;
use conflux::{RecvTimeoutError, TryRecvError};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

struct DropCounter(Arc<AtomicUsize>);
impl Drop for DropCounter {
  fn drop(&mut self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }
}

#[test]
fn conflated_sync_smoke() {
  let (tx, rx) = conflated::channel();
  tx.send(10).unwrap();
  assert_eq!(rx.recv().unwrap(), 10);
}

#[test]
fn conflated_sync_overwrites_unconsumed_value() {
  let (tx, rx) = conflated::channel();
  tx.send(1).unwrap();
  tx.send(2).unwrap();
  tx.send(3).unwrap();
  assert_eq!(rx.try_recv().unwrap(), 3);
  assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn conflated_sync_send_never_blocks_while_open() {
  let (tx, rx) = conflated::channel();
  for i in 0..ITEMS_HIGH {
    tx.send(i).unwrap();
  }
  assert_eq!(tx.len(), 1);
  assert!(tx.is_full());
  assert_eq!(rx.try_recv().unwrap(), ITEMS_HIGH - 1);
}

#[test]
fn conflated_sync_recv_blocks_until_send() {
  let (tx, rx) = conflated::channel();
  let producer = thread::spawn(move || {
    thread::sleep(SHORT_TIMEOUT);
    tx.send("hello").unwrap();
  });
  assert_eq!(rx.recv().unwrap(), "hello");
  // Whether the value was paired straight to the waiter or briefly buffered,
  // nothing may be left behind.
  assert!(rx.is_empty());
  producer.join().unwrap();
}

#[test]
fn conflated_sync_buffered_value_survives_close() {
  let (tx, rx) = conflated::channel();
  tx.send(5).unwrap();
  assert!(tx.close());
  assert!(tx.is_closed());

  let rejected = tx.send(9).unwrap_err();
  assert_eq!(rejected.into_inner(), 9);

  assert_eq!(rx.try_recv().unwrap(), 5);
  match rx.try_recv() {
    Err(TryRecvError::Closed(closed)) => assert!(closed.is_graceful()),
    other => panic!("expected closed, got {:?}", other),
  }
}

#[test]
fn conflated_sync_close_then_cancel_reports() {
  // Close with an empty buffer drains immediately; a later cancel has no
  // transition left to perform.
  let (tx, rx) = conflated::channel::<i32>();
  assert!(tx.close());
  assert!(!tx.close());
  assert!(!rx.cancel());

  // With a buffered element the channel is merely closed for send, so cancel
  // still performs the terminal transition.
  let (tx, rx) = conflated::channel();
  tx.send(5).unwrap();
  assert!(tx.close());
  assert!(rx.cancel());
  assert!(!rx.cancel());
  assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed(_))));
}

#[test]
fn conflated_sync_cancel_discards_buffered_element() {
  let drops = Arc::new(AtomicUsize::new(0));
  let (tx, rx) = conflated::channel();

  tx.send(DropCounter(drops.clone())).unwrap();
  assert!(rx.cancel());
  assert_eq!(drops.load(Ordering::SeqCst), 1);

  // A rejected send hands the element back inside the error.
  let rejected = tx.send(DropCounter(drops.clone())).unwrap_err();
  assert_eq!(drops.load(Ordering::SeqCst), 1);
  drop(rejected);
  assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn conflated_sync_close_cause_reaches_both_sides() {
  let (tx, rx) = conflated::channel::<i32>();
  assert!(tx.close_with(Arc::new(std::io::Error::new(
    std::io::ErrorKind::BrokenPipe,
    "upstream died",
  ))));

  match rx.try_recv() {
    Err(TryRecvError::Closed(closed)) => {
      assert_eq!(closed.cause().unwrap().to_string(), "upstream died");
    }
    other => panic!("expected closed, got {:?}", other),
  }

  let rejected = tx.send(1).unwrap_err();
  assert_eq!(rejected.closed().cause().unwrap().to_string(), "upstream died");
}

#[test]
fn conflated_sync_blocked_receiver_woken_by_close() {
  let (tx, rx) = conflated::channel::<i32>();
  let consumer = thread::spawn(move || rx.recv());
  thread::sleep(SHORT_TIMEOUT);
  assert!(tx.close());
  let outcome = consumer.join().unwrap();
  assert!(outcome.unwrap_err().is_graceful());
}

#[test]
fn conflated_sync_recv_timeout_expires() {
  let (tx, rx) = conflated::channel::<i32>();
  let err = rx.recv_timeout(SHORT_TIMEOUT).unwrap_err();
  assert!(matches!(err, RecvTimeoutError::Timeout));

  // The timed-out waiter must be gone: a later send buffers normally.
  tx.send(4).unwrap();
  assert_eq!(rx.try_recv().unwrap(), 4);
}

#[test]
fn conflated_sync_recv_timeout_delivery_wins() {
  let (tx, rx) = conflated::channel();
  let producer = thread::spawn(move || {
    thread::sleep(SHORT_TIMEOUT);
    tx.send(7).unwrap();
  });
  assert_eq!(rx.recv_timeout(LONG_TIMEOUT).unwrap(), 7);
  producer.join().unwrap();
}

#[test]
fn conflated_sync_recv_timeout_on_closed_channel() {
  let (tx, rx) = conflated::channel::<i32>();
  assert!(tx.close());
  assert!(matches!(
    rx.recv_timeout(SHORT_TIMEOUT),
    Err(RecvTimeoutError::Closed(_))
  ));
}

#[test]
fn conflated_sync_last_sender_drop_closes() {
  let (tx, rx) = conflated::channel();
  tx.send(3).unwrap();
  drop(tx);
  assert_eq!(rx.recv().unwrap(), 3);
  assert!(rx.recv().unwrap_err().is_graceful());
}

#[test]
fn conflated_sync_last_receiver_drop_cancels() {
  let (tx, rx) = conflated::channel();
  drop(rx);
  assert!(tx.is_closed());
  assert_eq!(tx.send(1).unwrap_err().into_inner(), 1);
}

#[test]
fn conflated_sync_handle_counts() {
  let (tx, rx) = conflated::channel::<i32>();
  assert_eq!(tx.sender_count(), 1);
  assert_eq!(tx.receiver_count(), 1);

  let tx2 = tx.clone();
  let rx2 = rx.clone();
  assert_eq!(tx.sender_count(), 2);
  assert_eq!(rx.receiver_count(), 2);

  drop(tx2);
  drop(rx2);
  assert_eq!(tx.sender_count(), 1);
  assert_eq!(rx.receiver_count(), 1);
  assert!(!tx.is_closed());
}

#[test]
fn conflated_sync_no_element_outlives_the_channel() {
  let drops = Arc::new(AtomicUsize::new(0));
  let (tx, rx) = conflated::channel();
  tx.send(DropCounter(drops.clone())).unwrap();
  drop(tx); // closes; the element stays buffered
  assert_eq!(drops.load(Ordering::SeqCst), 0);
  drop(rx); // cancels; the element is discarded
  assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn conflated_sync_at_most_one_delivery() {
  let (tx, rx) = conflated::channel();
  for round in 0..100 {
    tx.send(round).unwrap();
    tx.send(round).unwrap();
    assert_eq!(rx.try_recv().unwrap(), round);
    assert!(rx.try_recv().is_err());
  }
}
