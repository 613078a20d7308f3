
mod future;

pub use future::PromiseFuture;

use core::fmt;
use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Wake, Waker};
use std::thread::Thread;
use std::time::Instant;

use crate::api::coroutine::CoroutineError;

/// Single-assignment future: settled at most once, observed by any number of
/// awaiters.
///
/// Cloning the handle is cheap and every clone refers to the same settlement
/// state. `complete`/`fail` accept the first settlement and turn every later
/// call into a no-op, so a value produced concurrently with an error can
/// never be observed twice or torn.
pub struct Promise<T> {
  shared: Arc<PromiseShared<T>>,
}

pub(crate) struct PromiseShared<T> {
  pub(crate) inner: Mutex<PromiseInner<T>>,
}

pub(crate) struct PromiseInner<T> {
  pub(crate) settled:  Option<Result<T, CoroutineError>>,
  pub(crate) waiters:  Vec<(u64, Waker)>,
  pub(crate) next_key: u64,
}

pub(crate) fn lock_inner<T>(shared: &PromiseShared<T>) -> MutexGuard<'_, PromiseInner<T>> {
  shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Promise<T> {
  /// Creates an unsettled promise.
  pub fn new() -> Self {
    Self {
      shared: Arc::new(PromiseShared {
        inner: Mutex::new(PromiseInner {
          settled:  None,
          waiters:  Vec::new(),
          next_key: 0,
        }),
      }),
    }
  }

  /// Settles the promise with `value`. Returns false when already settled;
  /// the first settlement wins and later calls have no effect.
  pub fn complete(&self, value: T) -> bool {
    self.settle(Ok(value))
  }

  /// Settles the promise with `error`. Same first-wins contract as
  /// [`Promise::complete`].
  pub fn fail(&self, error: CoroutineError) -> bool {
    self.settle(Err(error))
  }

  fn settle(&self, result: Result<T, CoroutineError>) -> bool {
    let waiters = {
      let mut inner = lock_inner(&self.shared);
      if inner.settled.is_some() {
        return false;
      }
      inner.settled = Some(result);
      core::mem::take(&mut inner.waiters)
    };
    // Wake outside the lock, in registration order.
    for (_, waker) in waiters {
      waker.wake();
    }
    true
  }

  /// Returns true once a settlement has been accepted.
  pub fn is_settled(&self) -> bool {
    lock_inner(&self.shared).settled.is_some()
  }
}

impl<T: Clone> Promise<T> {
  /// Non-suspending snapshot of the settlement, if any.
  pub fn try_value(&self) -> Option<Result<T, CoroutineError>> {
    lock_inner(&self.shared).settled.clone()
  }

  /// Future resolving when the promise settles.
  ///
  /// Ready immediately when already settled; a captured error is re-raised at
  /// the await point. Inside a coroutine the registered waker re-schedules
  /// the coroutine onto the queue binding that was driving it when the await
  /// began. Prefer
  /// [`CoroutineContext::await_promise`](crate::api::coroutine::CoroutineContext::await_promise)
  /// inside coroutine bodies so cancellation is observed at the await point.
  pub fn value(&self) -> PromiseFuture<T> {
    PromiseFuture::new(self.shared.clone())
  }

  /// Blocks the calling worker until settlement or `timeout`, whichever comes
  /// first. Bridge for non-coroutine callers (process entry points, tests);
  /// never call it from a coroutine body.
  pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, CoroutineError>> {
    let deadline = Instant::now() + timeout;
    let waker = Waker::from(Arc::new(ThreadWaker(std::thread::current())));
    let mut registered = None;
    loop {
      {
        let mut inner = lock_inner(&self.shared);
        if let Some(result) = &inner.settled {
          return Some(result.clone());
        }
        if registered.is_none() {
          let key = inner.next_key;
          inner.next_key += 1;
          inner.waiters.push((key, waker.clone()));
          registered = Some(key);
        }
      }
      let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
        let mut inner = lock_inner(&self.shared);
        if let Some(key) = registered {
          inner.waiters.retain(|(k, _)| *k != key);
        }
        return inner.settled.clone();
      };
      std::thread::park_timeout(remaining);
    }
  }
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
  fn wake(self: Arc<Self>) {
    self.0.unpark();
  }

  fn wake_by_ref(self: &Arc<Self>) {
    self.0.unpark();
  }
}

impl<T> Clone for Promise<T> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> Default for Promise<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for Promise<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Promise").field("settled", &self.is_settled()).finish()
  }
}
