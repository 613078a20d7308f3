use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::ActorContext;
use crate::api::coroutine::CoroutineError;
use crate::api::message::{Envelope, Payload};

/// User-supplied message handler run by the actor loop, one envelope at a
/// time.
///
/// Returning `Ok(value)` completes the envelope's promise with `value`;
/// returning `Err` (or panicking) fails it. A behavior may also settle the
/// envelope itself mid-handling, in which case the loop's settlement is a
/// no-op.
#[async_trait]
pub trait ActorBehavior: Send + 'static {
  /// Handles one envelope. The context is the actor loop's own coroutine
  /// context: nested awaits through it suspend the whole actor, preserving
  /// the one-message-at-a-time contract.
  async fn handle(&mut self, ctx: ActorContext, envelope: Envelope) -> Result<Payload, CoroutineError>;
}

/// Constructors for closure-backed behaviors.
pub struct Behaviors;

impl Behaviors {
  /// Wraps an async closure as an [`ActorBehavior`].
  pub fn receive<F, Fut>(mut handler: F) -> FnBehavior
  where
    F: FnMut(ActorContext, Envelope) -> Fut + Send + 'static,
    Fut: core::future::Future<Output = Result<Payload, CoroutineError>> + Send + 'static, {
    FnBehavior {
      handler: Box::new(move |ctx, envelope| handler(ctx, envelope).boxed()),
    }
  }
}

type BoxedHandler = Box<dyn FnMut(ActorContext, Envelope) -> BoxFuture<'static, Result<Payload, CoroutineError>> + Send>;

/// Closure-backed behavior returned by [`Behaviors::receive`].
pub struct FnBehavior {
  handler: BoxedHandler,
}

#[async_trait]
impl ActorBehavior for FnBehavior {
  async fn handle(&mut self, ctx: ActorContext, envelope: Envelope) -> Result<Payload, CoroutineError> {
    (self.handler)(ctx, envelope).await
  }
}
