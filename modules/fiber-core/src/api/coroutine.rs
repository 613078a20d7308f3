#[cfg(test)]
mod tests;

mod context;
mod error;
mod state;

pub use context::{AwaitValue, CoroutineContext, Suspend};
pub use error::{CoroutineError, UsageViolation};
pub use state::{CoroutineId, CoroutineState, CoroutineStep};

use core::fmt;
use core::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::api::dispatch::QueueBinding;
use crate::api::promise::Promise;
use crate::internal::machine::{self, BodyFn, Machine};

/// Identity of the coroutine whose body the calling thread is currently
/// polling, or `None` outside any coroutine.
pub fn current_coroutine_id() -> Option<CoroutineId> {
  machine::current_id()
}

/// A cooperatively scheduled unit of sequential execution.
///
/// Type parameters: `Y` is the value carried out at an explicit suspend, `R`
/// the value carried back in by a resume (and the body's initial argument),
/// `T` the terminal value. Plain tasks that never yield use the [`Fiber`]
/// alias.
///
/// The handle is cheap to clone; all clones drive the same coroutine.
/// `T: Clone` because the terminal value fans out to both the resumer and
/// every awaiter of the completion promise.
pub struct Coroutine<Y, R, T> {
  machine: Arc<Machine<Y, R, T>>,
}

/// A coroutine that never yields and takes no resume values: the common
/// launch-and-await shape.
pub type Fiber<T> = Coroutine<(), (), T>;

impl<Y, R, T> Coroutine<Y, R, T>
where
  Y: Send + 'static,
  R: Send + 'static,
  T: Clone + Send + 'static,
{
  /// Creates the coroutine in state `Created` without polling anything.
  ///
  /// The body runs lazily: it is constructed at the first resume, receiving
  /// the coroutine's [`CoroutineContext`] and the first resume value as its
  /// initial argument. `binding` seeds where wakes re-schedule the coroutine
  /// until a resume records a different driving queue.
  pub fn create<F, Fut>(binding: &QueueBinding, body: F) -> Self
  where
    F: FnOnce(CoroutineContext<Y, R>, R) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, CoroutineError>> + Send + 'static, {
    let body: BodyFn<Y, R, T> =
      Box::new(move |ctx, initial| AssertUnwindSafe(body(ctx, initial)).catch_unwind().boxed());
    Self {
      machine: Machine::new(binding.clone(), body),
    }
  }

  /// Process-unique identity.
  pub fn id(&self) -> CoroutineId {
    self.machine.id()
  }

  /// Lifecycle snapshot.
  pub fn state(&self) -> CoroutineState {
    self.machine.state()
  }

  /// True once the coroutine reached Completed, Failed or Cancelled.
  pub fn is_finished(&self) -> bool {
    self.state().is_terminal()
  }

  /// Transfers control onto the coroutine's stack, passing `value` as the
  /// result of the point where it last suspended (or as the initial body
  /// argument from `Created`), and blocks the caller's logical flow until the
  /// coroutine suspends again or terminates.
  ///
  /// Legal only from `Created` or `Suspended`: resuming a running coroutine
  /// or one in a terminal state returns a
  /// [`CoroutineError::Usage`] without touching its state. A value delivered
  /// while the body is parked on a future (rather than an explicit suspend)
  /// is stored and consumed by the body's next explicit suspend.
  ///
  /// # Errors
  /// [`CoroutineError::Usage`] on an illegal resume;
  /// [`CoroutineError::Execution`] when the body faults before suspending
  /// again.
  pub fn resume(&self, value: R) -> Result<CoroutineStep<Y, T>, CoroutineError> {
    self.machine.resume(value)
  }

  /// Requests cooperative cancellation.
  ///
  /// Sets a flag observed only at the coroutine's own suspend points; a body
  /// that never reaches one cannot be cancelled externally. A suspended
  /// coroutine is re-scheduled onto its binding so it can observe the flag
  /// and unwind.
  pub fn cancel(&self) {
    self.machine.cancel();
  }

  /// Promise settled on the terminal transition: the body's value, its
  /// captured error, or [`CoroutineError::Cancelled`].
  pub fn completion(&self) -> Promise<T> {
    self.machine.completion()
  }
}

impl<Y, T> Coroutine<Y, (), T>
where
  Y: Send + 'static,
  T: Clone + Send + 'static,
{
  /// Creates the coroutine and schedules its first step on `binding`.
  pub fn launch<F, Fut>(binding: &QueueBinding, body: F) -> Self
  where
    F: FnOnce(CoroutineContext<Y, ()>, ()) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, CoroutineError>> + Send + 'static, {
    let coroutine = Self::create(binding, body);
    coroutine.machine.schedule_start(());
    coroutine
  }
}

impl<Y, R, T> Clone for Coroutine<Y, R, T> {
  fn clone(&self) -> Self {
    Self {
      machine: Arc::clone(&self.machine),
    }
  }
}

impl<Y, R, T> fmt::Debug for Coroutine<Y, R, T>
where
  Y: Send + 'static,
  R: Send + 'static,
  T: Clone + Send + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Coroutine")
      .field("id", &self.id())
      .field("state", &self.state())
      .finish()
  }
}
