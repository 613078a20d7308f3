use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

#[test]
fn unlock_releases_the_single_permit() {
  let lock = CoLock::new();
  lock.lock();
  assert!(!lock.try_lock());
  lock.unlock();
  assert!(lock.try_lock());
  lock.unlock();
}

#[test]
fn guard_releases_on_early_return() {
  fn bail_early(lock: &CoLock, bail: bool) -> u32 {
    let _guard = lock.guard();
    if bail {
      return 1;
    }
    2
  }

  let lock = CoLock::new();
  assert_eq!(bail_early(&lock, true), 1);
  // The early return dropped the guard; the permit is back.
  assert!(lock.try_lock());
  lock.unlock();
}

#[test]
fn guard_releases_on_panic() {
  let lock = Arc::new(CoLock::new());
  let panicking = Arc::clone(&lock);
  let result = std::panic::catch_unwind(move || {
    let _guard = panicking.guard();
    panic!("poisoned scope");
  });
  assert!(result.is_err());
  assert!(lock.try_lock());
  lock.unlock();
}

#[test]
fn with_returns_the_closure_value() {
  let lock = CoLock::new();
  let value = lock.with(|| 41 + 1);
  assert_eq!(value, 42);
  assert!(lock.try_lock());
  lock.unlock();
}

#[test]
fn contended_increments_stay_exclusive() {
  let lock = Arc::new(CoLock::new());
  let counter = Arc::new(AtomicUsize::new(0));
  let mut workers = Vec::new();
  for _ in 0..4 {
    let lock = Arc::clone(&lock);
    let counter = Arc::clone(&counter);
    workers.push(std::thread::spawn(move || {
      for _ in 0..100 {
        lock.with(|| {
          let read = counter.load(Ordering::SeqCst);
          std::thread::sleep(Duration::from_micros(10));
          counter.store(read + 1, Ordering::SeqCst);
        });
      }
    }));
  }
  for worker in workers {
    worker.join().unwrap();
  }
  assert_eq!(counter.load(Ordering::SeqCst), 400);
}
