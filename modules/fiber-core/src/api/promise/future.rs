use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::Arc;

use super::{lock_inner, PromiseShared};
use crate::api::coroutine::CoroutineError;

/// Future returned by [`Promise::value`](super::Promise::value).
///
/// Each instance registers a single waiter slot, keyed so re-polls replace
/// the stored waker instead of stacking duplicates; dropping the future
/// before settlement deregisters the slot.
pub struct PromiseFuture<T> {
  shared: Arc<PromiseShared<T>>,
  key:    Option<u64>,
}

impl<T> PromiseFuture<T> {
  pub(super) fn new(shared: Arc<PromiseShared<T>>) -> Self {
    Self { shared, key: None }
  }
}

impl<T: Clone> Future for PromiseFuture<T> {
  type Output = Result<T, CoroutineError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let mut inner = lock_inner(&this.shared);
    if let Some(result) = &inner.settled {
      this.key = None;
      return Poll::Ready(result.clone());
    }
    match this.key {
      Some(key) => {
        if let Some(slot) = inner.waiters.iter_mut().find(|(k, _)| *k == key) {
          slot.1 = cx.waker().clone();
        } else {
          let key = inner.next_key;
          inner.next_key += 1;
          inner.waiters.push((key, cx.waker().clone()));
          this.key = Some(key);
        }
      }
      None => {
        let key = inner.next_key;
        inner.next_key += 1;
        inner.waiters.push((key, cx.waker().clone()));
        this.key = Some(key);
      }
    }
    Poll::Pending
  }
}

impl<T> Unpin for PromiseFuture<T> {}

impl<T> Drop for PromiseFuture<T> {
  fn drop(&mut self) {
    if let Some(key) = self.key {
      let mut inner = lock_inner(&self.shared);
      inner.waiters.retain(|(k, _)| *k != key);
    }
  }
}
