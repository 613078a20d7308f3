
mod behavior;

pub use behavior::{ActorBehavior, Behaviors, FnBehavior};

use core::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;

use crate::api::coroutine::{CoroutineContext, CoroutineError, Fiber};
use crate::api::dispatch::QueueBinding;
use crate::api::mailbox::{Mailbox, RecvError, SendError};
use crate::api::message::{Envelope, Payload};
use crate::api::promise::Promise;
use crate::internal::machine::panic_message;

/// Context handed to actor behaviors; the actor loop's coroutine context.
pub type ActorContext = CoroutineContext<(), ()>;

/// Lifecycle of an actor's receive/handle loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorState {
  /// Between messages.
  Idle,
  /// Parked on the mailbox.
  Receiving,
  /// Running the behavior for one envelope.
  Handling,
  /// Terminal: stopped explicitly or mailbox disconnected.
  Stopped,
}

impl ActorState {
  fn from_u8(value: u8) -> Self {
    match value {
      | 1 => ActorState::Receiving,
      | 2 => ActorState::Handling,
      | 3 => ActorState::Stopped,
      | _ => ActorState::Idle,
    }
  }
}

/// A coroutine permanently bound to one queue and one mailbox, running a
/// receive-handle-complete loop that serializes all message processing.
///
/// Within one actor, message N+1 begins only after message N's promise has
/// settled: the loop settles each envelope before the next receive, either
/// with the behavior's returned value or, when the behavior errors or panics
/// without settling, with that error on the behavior's behalf. Every sent
/// promise is guaranteed to eventually settle and a bad message never kills
/// the loop.
pub struct Actor {
  shared: Arc<ActorShared>,
}

struct ActorShared {
  mailbox:  Mailbox<Envelope>,
  binding:  QueueBinding,
  state:    Arc<AtomicU8>,
  stopping: Arc<AtomicBool>,
  fiber:    Fiber<()>,
}

impl Actor {
  /// Creates the mailbox, binds the loop coroutine to `binding`, and
  /// schedules the receive/handle loop to begin.
  pub fn spawn<B>(binding: &QueueBinding, behavior: B) -> Self
  where
    B: ActorBehavior, {
    let mailbox: Mailbox<Envelope> = Mailbox::new();
    let state = Arc::new(AtomicU8::new(ActorState::Idle as u8));
    let stopping = Arc::new(AtomicBool::new(false));

    let fiber = {
      let mailbox = mailbox.clone();
      let state = Arc::clone(&state);
      let stopping = Arc::clone(&stopping);
      Fiber::launch(binding, move |ctx, ()| {
        run_loop(ctx, mailbox, state, stopping, behavior)
      })
    };

    Self {
      shared: Arc::new(ActorShared {
        mailbox,
        binding: binding.clone(),
        state,
        stopping,
        fiber,
      }),
    }
  }

  /// Constructs an envelope with a fresh promise, enqueues it, and returns
  /// the promise without blocking the caller.
  ///
  /// After `stop` the returned promise is already failed with
  /// [`CoroutineError::Stopped`]; a send never dangles.
  pub fn send(&self, payload: impl Into<Payload>) -> Promise<Payload> {
    let promise = Promise::new();
    if self.shared.stopping.load(Ordering::Acquire) {
      promise.fail(CoroutineError::Stopped);
      return promise;
    }
    let envelope = Envelope::new(payload.into(), promise.clone());
    if let Err(SendError::Closed(envelope)) = self.shared.mailbox.send(envelope) {
      envelope.fail(CoroutineError::Stopped);
    }
    promise
  }

  /// Requests shutdown: the mailbox closes, queued envelopes are failed with
  /// [`CoroutineError::Stopped`], and the loop transitions to
  /// [`ActorState::Stopped`].
  pub fn stop(&self) {
    self.shared.stopping.store(true, Ordering::Release);
    self.shared.mailbox.close();
  }

  /// Loop state snapshot.
  pub fn state(&self) -> ActorState {
    ActorState::from_u8(self.shared.state.load(Ordering::Acquire))
  }

  /// The queue binding the loop runs on.
  pub fn binding(&self) -> &QueueBinding {
    &self.shared.binding
  }

  /// Promise settled when the loop coroutine terminates.
  pub fn terminated(&self) -> Promise<()> {
    self.shared.fiber.completion()
  }
}

impl Clone for Actor {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl fmt::Debug for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Actor")
      .field("state", &self.state())
      .field("queue", &self.shared.binding.id())
      .finish()
  }
}

async fn run_loop<B>(
  ctx: ActorContext,
  mailbox: Mailbox<Envelope>,
  state: Arc<AtomicU8>,
  stopping: Arc<AtomicBool>,
  mut behavior: B,
) -> Result<(), CoroutineError>
where
  B: ActorBehavior, {
  loop {
    state.store(ActorState::Receiving as u8, Ordering::Release);
    match mailbox.recv(&ctx).await {
      Ok(envelope) => {
        if stopping.load(Ordering::Acquire) {
          envelope.fail(CoroutineError::Stopped);
          continue;
        }
        state.store(ActorState::Handling as u8, Ordering::Release);
        let outcome = AssertUnwindSafe(behavior.handle(ctx.clone(), envelope.clone()))
          .catch_unwind()
          .await;
        match outcome {
          Ok(Ok(value)) => {
            envelope.complete(value);
          }
          Ok(Err(error)) => {
            tracing::warn!(error = %error, "actor behavior failed; envelope promise auto-failed");
            envelope.fail(error);
          }
          Err(panic) => {
            let error = CoroutineError::execution(panic_message(&panic));
            tracing::warn!(error = %error, "actor behavior panicked; envelope promise auto-failed");
            envelope.fail(error);
          }
        }
        state.store(ActorState::Idle as u8, Ordering::Release);
      }
      Err(RecvError::Disconnected) => break,
      Err(RecvError::Cancelled) => {
        mailbox.close();
        while let Some(envelope) = mailbox.try_recv() {
          envelope.fail(CoroutineError::Cancelled);
        }
        state.store(ActorState::Stopped as u8, Ordering::Release);
        return Err(CoroutineError::Cancelled);
      }
    }
  }
  state.store(ActorState::Stopped as u8, Ordering::Release);
  Ok(())
}
