#[cfg(test)]
mod tests;

mod recv;

pub use recv::Recv;

use core::fmt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::task::AtomicWaker;

use crate::api::coroutine::CoroutineContext;

/// Ordered multi-producer single-consumer queue of messages.
///
/// Delivery order equals send order: a single interior lock serializes
/// producers, so concurrent sends are delivered in the order the lock
/// admitted them. The single logical consumer (the owning actor's coroutine)
/// parks on an empty mailbox; the next send wakes it through its registered
/// waker, which re-schedules it on its own queue binding.
pub struct Mailbox<M> {
  shared: Arc<MailboxShared<M>>,
}

pub(super) struct MailboxShared<M> {
  pub(super) inner:    Mutex<MailboxInner<M>>,
  pub(super) consumer: AtomicWaker,
}

pub(super) struct MailboxInner<M> {
  pub(super) queue:  VecDeque<M>,
  pub(super) closed: bool,
}

pub(super) fn lock_inner<M>(shared: &MailboxShared<M>) -> MutexGuard<'_, MailboxInner<M>> {
  shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Send-side failure; hands the message back.
#[derive(Debug)]
pub enum SendError<M> {
  /// The mailbox was closed; the message was not enqueued.
  Closed(M),
}

impl<M> fmt::Display for SendError<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | SendError::Closed(_) => write!(f, "mailbox is closed"),
    }
  }
}

/// Receive-side failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecvError {
  /// The mailbox was closed and fully drained.
  Disconnected,
  /// The receiving coroutine was cancelled at this suspend point.
  Cancelled,
}

impl fmt::Display for RecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | RecvError::Disconnected => write!(f, "mailbox closed and drained"),
      | RecvError::Cancelled => write!(f, "receive cancelled"),
    }
  }
}

impl<M: Send + 'static> Mailbox<M> {
  /// Creates an empty, open mailbox.
  pub fn new() -> Self {
    Self {
      shared: Arc::new(MailboxShared {
        inner:    Mutex::new(MailboxInner {
          queue:  VecDeque::new(),
          closed: false,
        }),
        consumer: AtomicWaker::new(),
      }),
    }
  }

  /// Appends `message` to the tail and wakes a parked consumer. Callable
  /// from any context, concurrently from multiple senders.
  ///
  /// # Errors
  /// [`SendError::Closed`] returns the message when the mailbox was closed.
  pub fn send(&self, message: M) -> Result<(), SendError<M>> {
    {
      let mut inner = lock_inner(&self.shared);
      if inner.closed {
        return Err(SendError::Closed(message));
      }
      inner.queue.push_back(message);
    }
    self.shared.consumer.wake();
    Ok(())
  }

  /// Receives the head message, suspending the owning coroutine while the
  /// mailbox is empty. Callable only from the single consumer coroutine;
  /// cancellation of that coroutine is observed here.
  pub fn recv<Y, R>(&self, ctx: &CoroutineContext<Y, R>) -> Recv<M> {
    Recv::new(Arc::clone(&self.shared), ctx.cancel_flag())
  }

  /// Pops the head message without suspending.
  pub fn try_recv(&self) -> Option<M> {
    lock_inner(&self.shared).queue.pop_front()
  }

  /// Number of queued messages.
  pub fn len(&self) -> usize {
    lock_inner(&self.shared).queue.len()
  }

  /// True when no messages are queued.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Closes the mailbox: later sends fail, and receives disconnect once the
  /// queue drains. Wakes a parked consumer.
  pub fn close(&self) {
    lock_inner(&self.shared).closed = true;
    self.shared.consumer.wake();
  }

  /// True once the mailbox has been closed.
  pub fn is_closed(&self) -> bool {
    lock_inner(&self.shared).closed
  }
}

impl<M: Send + 'static> Default for Mailbox<M> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M> Clone for Mailbox<M> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<M> fmt::Debug for Mailbox<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = lock_inner(&self.shared);
    f.debug_struct("Mailbox")
      .field("len", &inner.queue.len())
      .field("closed", &inner.closed)
      .finish()
  }
}
