use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{lock_inner, MailboxShared, RecvError};

/// Future returned by [`Mailbox::recv`](super::Mailbox::recv).
///
/// Registers the consumer waker before re-checking the queue so a send
/// landing between the empty check and the registration is never lost.
pub struct Recv<M> {
  shared: Arc<MailboxShared<M>>,
  cancel: Arc<AtomicBool>,
}

impl<M> Recv<M> {
  pub(super) fn new(shared: Arc<MailboxShared<M>>, cancel: Arc<AtomicBool>) -> Self {
    Self { shared, cancel }
  }

  fn try_take(&self) -> Option<Result<M, RecvError>> {
    let mut inner = lock_inner(&self.shared);
    if let Some(message) = inner.queue.pop_front() {
      return Some(Ok(message));
    }
    if inner.closed {
      return Some(Err(RecvError::Disconnected));
    }
    None
  }
}

impl<M> Future for Recv<M> {
  type Output = Result<M, RecvError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    if this.cancel.load(Ordering::Acquire) {
      return Poll::Ready(Err(RecvError::Cancelled));
    }
    if let Some(outcome) = this.try_take() {
      return Poll::Ready(outcome);
    }
    this.shared.consumer.register(cx.waker());
    if let Some(outcome) = this.try_take() {
      return Poll::Ready(outcome);
    }
    Poll::Pending
  }
}

impl<M> Unpin for Recv<M> {}
