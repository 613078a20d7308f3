use core::fmt;
use std::sync::Arc;

/// Errors produced by the coroutine engine and the layers built on it.
///
/// The type is cheap to clone so a single failure can fan out through a
/// [`Promise`](crate::api::promise::Promise) to every registered awaiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoroutineError {
  /// Uncaught fault inside a coroutine body, captured at the point of
  /// occurrence and re-surfaced to whichever resumer is waiting.
  Execution(Arc<str>),
  /// Cooperative abort observed at a suspend point. Not a fault.
  Cancelled,
  /// API misuse reported synchronously to the caller.
  Usage(UsageViolation),
  /// The target actor stopped before the message could be handled.
  Stopped,
}

/// The ways the engine API can be misused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageViolation {
  /// `resume` was called on a coroutine already in a terminal state.
  ResumeAfterTerminal,
  /// `resume` was called while another worker was executing the body.
  ResumeWhileRunning,
  /// The coroutine was started a second time.
  AlreadyStarted,
}

impl CoroutineError {
  /// Builds an [`CoroutineError::Execution`] from any printable message.
  pub fn execution(message: impl Into<Arc<str>>) -> Self {
    CoroutineError::Execution(message.into())
  }

  /// Returns true when this error is the cooperative cancellation signal.
  pub fn is_cancelled(&self) -> bool {
    matches!(self, CoroutineError::Cancelled)
  }
}

impl fmt::Display for CoroutineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | CoroutineError::Execution(message) => write!(f, "coroutine body failed: {}", message),
      | CoroutineError::Cancelled => write!(f, "coroutine was cancelled"),
      | CoroutineError::Usage(violation) => write!(f, "coroutine API misuse: {}", violation),
      | CoroutineError::Stopped => write!(f, "actor stopped before the message was handled"),
    }
  }
}

impl std::error::Error for CoroutineError {}

impl fmt::Display for UsageViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | UsageViolation::ResumeAfterTerminal => write!(f, "resume called on a terminal coroutine"),
      | UsageViolation::ResumeWhileRunning => write!(f, "resume called while the coroutine body is running"),
      | UsageViolation::AlreadyStarted => write!(f, "coroutine started twice"),
    }
  }
}
