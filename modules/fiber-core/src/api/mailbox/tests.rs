use core::time::Duration;

use super::*;
use crate::api::coroutine::{CoroutineError, Fiber};
use crate::api::test_support::ThreadQueue;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn delivery_order_equals_send_order() {
  let mailbox: Mailbox<u32> = Mailbox::new();
  for value in 0..8 {
    mailbox.send(value).unwrap();
  }
  assert_eq!(mailbox.len(), 8);
  for expected in 0..8 {
    assert_eq!(mailbox.try_recv(), Some(expected));
  }
  assert!(mailbox.is_empty());
}

#[test]
fn send_after_close_hands_the_message_back() {
  let mailbox: Mailbox<u32> = Mailbox::new();
  mailbox.close();
  assert!(mailbox.is_closed());
  match mailbox.send(9) {
    Err(SendError::Closed(value)) => assert_eq!(value, 9),
    other => panic!("expected closed error, got {:?}", other),
  }
}

#[test]
fn empty_receive_suspends_until_a_send_arrives() {
  let binding = ThreadQueue::binding("mailbox-park");
  let mailbox: Mailbox<u32> = Mailbox::new();
  let consumer = {
    let mailbox = mailbox.clone();
    Fiber::launch(&binding, move |ctx, ()| async move {
      match mailbox.recv(&ctx).await {
        Ok(value) => Ok(value),
        Err(error) => Err(CoroutineError::execution(error.to_string())),
      }
    })
  };

  // The consumer parks on the empty mailbox before this send lands.
  std::thread::sleep(Duration::from_millis(50));
  mailbox.send(77).unwrap();
  assert_eq!(consumer.completion().wait_timeout(WAIT), Some(Ok(77)));
}

#[test]
fn concurrent_producers_preserve_per_producer_order() {
  let binding = ThreadQueue::binding("mailbox-mpsc");
  let mailbox: Mailbox<(u8, u32)> = Mailbox::new();
  const PER_PRODUCER: u32 = 50;

  let consumer = {
    let mailbox = mailbox.clone();
    Fiber::launch(&binding, move |ctx, ()| async move {
      let mut received = Vec::new();
      while received.len() < (PER_PRODUCER as usize) * 3 {
        match mailbox.recv(&ctx).await {
          Ok(pair) => received.push(pair),
          Err(error) => return Err(CoroutineError::execution(error.to_string())),
        }
      }
      Ok(received)
    })
  };

  let mut producers = Vec::new();
  for producer in 0..3_u8 {
    let mailbox = mailbox.clone();
    producers.push(std::thread::spawn(move || {
      for sequence in 0..PER_PRODUCER {
        mailbox.send((producer, sequence)).unwrap();
      }
    }));
  }
  for producer in producers {
    producer.join().unwrap();
  }

  let received = consumer.completion().wait_timeout(WAIT).unwrap().unwrap();
  assert_eq!(received.len(), (PER_PRODUCER as usize) * 3);
  let mut next: [u32; 3] = [0; 3];
  for (producer, sequence) in received {
    assert_eq!(sequence, next[producer as usize], "producer {} out of order", producer);
    next[producer as usize] += 1;
  }
}

#[test]
fn close_disconnects_after_the_queue_drains() {
  let binding = ThreadQueue::binding("mailbox-close");
  let mailbox: Mailbox<u32> = Mailbox::new();
  mailbox.send(1).unwrap();
  mailbox.close();

  let consumer = {
    let mailbox = mailbox.clone();
    Fiber::launch(&binding, move |ctx, ()| async move {
      let mut drained: Vec<u32> = Vec::new();
      loop {
        match mailbox.recv(&ctx).await {
          Ok(value) => drained.push(value),
          Err(RecvError::Disconnected) => break,
          Err(RecvError::Cancelled) => return Err(CoroutineError::Cancelled),
        }
      }
      Ok(drained)
    })
  };

  assert_eq!(consumer.completion().wait_timeout(WAIT), Some(Ok(vec![1])));
}
