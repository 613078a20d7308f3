use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::CoroutineError;
use crate::api::promise::{Promise, PromiseFuture};
use crate::internal::machine::ContextCore;

/// Handle a coroutine body uses to talk to its own engine: explicit
/// suspension, cancellation checks, and cancellation-aware awaits.
///
/// The context holds only the suspend-point slots, not the machine, so a body
/// capturing its context does not keep its own coroutine alive (the engine
/// holds the sole strong ownership of the body).
pub struct CoroutineContext<Y, R> {
  core: Arc<ContextCore<Y, R>>,
}

impl<Y, R> CoroutineContext<Y, R> {
  pub(crate) fn from_core(core: Arc<ContextCore<Y, R>>) -> Self {
    Self { core }
  }

  /// Transfers control back to the most recent resumer carrying `value`; the
  /// returned future resolves with the value passed to the next `resume`.
  ///
  /// This is the generator-style suspend point. Cancellation is observed
  /// here: once the coroutine is cancelled the future resolves to
  /// `Err(CoroutineError::Cancelled)` instead of a resume value.
  pub fn suspend(&self, value: Y) -> Suspend<'_, Y, R> {
    Suspend {
      core:  &self.core,
      value: Some(value),
    }
  }

  /// Returns `Err(CoroutineError::Cancelled)` once the coroutine has been
  /// cancelled; a cheap cooperative cancellation check for compute loops.
  pub fn checkpoint(&self) -> Result<(), CoroutineError> {
    if self.core.is_cancelled() {
      Err(CoroutineError::Cancelled)
    } else {
      Ok(())
    }
  }

  /// True once `cancel` has been called on this coroutine.
  pub fn is_cancelled(&self) -> bool {
    self.core.is_cancelled()
  }

  /// Awaits `promise`, observing cancellation at the await point.
  ///
  /// Suspends the coroutine when the promise is unsettled; settlement resumes
  /// it on the queue binding that was driving it when the await began. An
  /// error settlement re-raises here.
  pub fn await_promise<T: Clone>(&self, promise: &Promise<T>) -> AwaitValue<T> {
    AwaitValue {
      flag:  self.core.cancel_flag(),
      inner: promise.value(),
    }
  }

  pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
    self.core.cancel_flag()
  }
}

impl<Y, R> Clone for CoroutineContext<Y, R> {
  fn clone(&self) -> Self {
    Self {
      core: Arc::clone(&self.core),
    }
  }
}

/// Future returned by [`CoroutineContext::suspend`].
pub struct Suspend<'a, Y, R> {
  core:  &'a ContextCore<Y, R>,
  value: Option<Y>,
}

impl<Y, R> Future for Suspend<'_, Y, R> {
  type Output = Result<R, CoroutineError>;

  fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    if this.core.is_cancelled() {
      return Poll::Ready(Err(CoroutineError::Cancelled));
    }
    if let Some(resume) = this.core.take_resume() {
      return Poll::Ready(Ok(resume));
    }
    if let Some(value) = this.value.take() {
      this.core.set_yield(value);
    }
    Poll::Pending
  }
}

impl<Y, R> Unpin for Suspend<'_, Y, R> {}

/// Cancellation-aware promise await returned by
/// [`CoroutineContext::await_promise`].
pub struct AwaitValue<T> {
  flag:  Arc<AtomicBool>,
  inner: PromiseFuture<T>,
}

impl<T: Clone> Future for AwaitValue<T> {
  type Output = Result<T, CoroutineError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    if this.flag.load(Ordering::Acquire) {
      return Poll::Ready(Err(CoroutineError::Cancelled));
    }
    Pin::new(&mut this.inner).poll(cx)
  }
}

impl<T> Unpin for AwaitValue<T> {}
