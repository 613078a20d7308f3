use core::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;

use super::*;
use crate::api::test_support::ThreadQueue;

#[test]
fn wrap_caches_by_underlying_queue_identity() {
  let queue = ThreadQueue::new("cache");
  let first = QueueBinding::wrap(queue.clone());
  let second = QueueBinding::wrap(queue);
  assert_eq!(first, second);
  assert_eq!(first.id(), second.id());

  let other = ThreadQueue::binding("cache-other");
  assert_ne!(first, other);
}

#[test]
fn current_is_set_only_while_a_job_runs() {
  let binding = ThreadQueue::binding("current");
  assert_eq!(QueueBinding::current(), None);

  let (tx, rx) = channel();
  let probe = binding.clone();
  binding.run_async(move || {
    let _ = tx.send(QueueBinding::current() == Some(probe.clone()) && probe.is_current());
  });
  assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
  assert_eq!(QueueBinding::current(), None);
}

#[test]
fn run_inline_executes_synchronously_when_already_driven() {
  let binding = ThreadQueue::binding("inline");
  let (tx, rx) = channel();
  let inner = binding.clone();
  binding.run_async(move || {
    let ran_inline = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran_inline);
    inner.run_inline(move || flag.store(true, Ordering::SeqCst));
    // Inline execution happens before run_inline returns.
    let _ = tx.send(ran_inline.load(Ordering::SeqCst));
  });
  assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
}

#[test]
fn run_inline_enqueues_from_a_foreign_context() {
  let binding = ThreadQueue::binding("inline-foreign");
  let (tx, rx) = channel();
  binding.run_inline(move || {
    let _ = tx.send(QueueBinding::current().map(|binding| binding.id()));
  });
  // Not driven by the queue here, so the block hops onto it asynchronously.
  let observed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
  assert_eq!(observed, Some(binding.id()));
}

#[test]
fn run_after_delays_execution() {
  let binding = ThreadQueue::binding("after");
  let (tx, rx) = channel();
  let start = std::time::Instant::now();
  binding.run_after(Duration::from_millis(40), move || {
    let _ = tx.send(start.elapsed());
  });
  let elapsed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
  assert!(elapsed >= Duration::from_millis(40));
}

#[test]
fn timer_fires_repeatedly_until_invalidated() {
  let binding = ThreadQueue::binding("timer");
  let fired = Arc::new(AtomicUsize::new(0));
  let timer = {
    let fired = Arc::clone(&fired);
    binding.start_timer(Duration::from_millis(15), move || {
      fired.fetch_add(1, Ordering::SeqCst);
    })
  };

  while fired.load(Ordering::SeqCst) < 3 {
    std::thread::sleep(Duration::from_millis(5));
  }
  timer.invalidate();
  let after_invalidate = fired.load(Ordering::SeqCst);
  std::thread::sleep(Duration::from_millis(80));
  assert_eq!(fired.load(Ordering::SeqCst), after_invalidate);
}

#[test]
fn timer_invalidated_before_first_fire_never_fires() {
  let binding = ThreadQueue::binding("timer-early");
  let fired = Arc::new(AtomicUsize::new(0));
  let timer = {
    let fired = Arc::clone(&fired);
    binding.start_timer(Duration::from_millis(30), move || {
      fired.fetch_add(1, Ordering::SeqCst);
    })
  };
  timer.invalidate();
  timer.invalidate();
  assert!(timer.is_cancelled());
  std::thread::sleep(Duration::from_millis(100));
  assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_the_timer_handle_invalidates_it() {
  let binding = ThreadQueue::binding("timer-drop");
  let fired = Arc::new(AtomicUsize::new(0));
  {
    let fired = Arc::clone(&fired);
    let _timer = binding.start_timer(Duration::from_millis(30), move || {
      fired.fetch_add(1, Ordering::SeqCst);
    });
  }
  std::thread::sleep(Duration::from_millis(100));
  assert_eq!(fired.load(Ordering::SeqCst), 0);
}
