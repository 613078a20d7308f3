use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique coroutine identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoroutineId(u64);

static NEXT_COROUTINE_ID: AtomicU64 = AtomicU64::new(1);

impl CoroutineId {
  pub(crate) fn next() -> Self {
    CoroutineId(NEXT_COROUTINE_ID.fetch_add(1, Ordering::Relaxed))
  }

  /// Returns the raw numeric identity, for logging.
  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl fmt::Display for CoroutineId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "co-{}", self.0)
  }
}

/// Lifecycle of a coroutine.
///
/// Legal edges: Created→Running, Running→Suspended,
/// Running→Completed|Failed|Cancelled, Suspended→Running. Terminal values and
/// errors travel through the coroutine's completion promise rather than this
/// snapshot enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoroutineState {
  /// Created, body not yet polled.
  Created,
  /// Exactly one worker is executing the body.
  Running,
  /// Parked at a suspend point, waiting for a resume or a registered wake.
  Suspended,
  /// Terminal: body returned a value.
  Completed,
  /// Terminal: body surfaced an error or panicked.
  Failed,
  /// Terminal: the cancellation flag was observed at a suspend point.
  Cancelled,
}

impl CoroutineState {
  /// Returns true for Completed, Failed and Cancelled.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      CoroutineState::Completed | CoroutineState::Failed | CoroutineState::Cancelled
    )
  }

  pub(crate) fn as_u8(self) -> u8 {
    match self {
      | CoroutineState::Created => 0,
      | CoroutineState::Running => 1,
      | CoroutineState::Suspended => 2,
      | CoroutineState::Completed => 3,
      | CoroutineState::Failed => 4,
      | CoroutineState::Cancelled => 5,
    }
  }

  pub(crate) fn from_u8(value: u8) -> Self {
    match value {
      | 1 => CoroutineState::Running,
      | 2 => CoroutineState::Suspended,
      | 3 => CoroutineState::Completed,
      | 4 => CoroutineState::Failed,
      | 5 => CoroutineState::Cancelled,
      | _ => CoroutineState::Created,
    }
  }
}

/// What a `resume` call observed when control came back to the resumer.
#[derive(Debug, PartialEq, Eq)]
pub enum CoroutineStep<Y, T> {
  /// The body called `suspend(value)`; the next `resume` continues it.
  Yielded(Y),
  /// The body parked on a future (promise await, mailbox receive). It will be
  /// rescheduled onto its binding by the registered wake; resuming it by hand
  /// is not required.
  Awaiting,
  /// Terminal: the body returned this value. Also delivered through the
  /// completion promise.
  Completed(T),
  /// Terminal: the body observed cancellation and unwound.
  Cancelled,
}
