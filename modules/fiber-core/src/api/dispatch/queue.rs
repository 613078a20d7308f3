use core::fmt;
use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of an underlying dispatch queue.
///
/// Binding equality and the wrapper cache key off this identity, never off
/// wrapper instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueId(u64);

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

impl QueueId {
  /// Allocates a fresh identity. Called once per underlying queue, at queue
  /// construction.
  pub fn next() -> Self {
    QueueId(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed))
  }

  /// Returns the raw numeric identity, for logging.
  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl fmt::Display for QueueId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "queue-{}", self.0)
  }
}

/// Unit of work enqueued onto a dispatch queue.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The native queue primitive this crate requires from its host.
///
/// Implementations must run jobs one at a time in enqueue order and mark the
/// drain scope with [`CurrentQueueScope`](super::CurrentQueueScope) so
/// [`QueueBinding::current`](super::QueueBinding::current) and inline
/// execution work. `coru-fiber-std-rs` provides the Tokio-backed
/// implementation; [`test_support::ThreadQueue`](crate::api::test_support::ThreadQueue)
/// provides a plain-thread one.
pub trait DispatchQueue: Send + Sync + 'static {
  /// Identity assigned at queue construction via [`QueueId::next`].
  fn queue_id(&self) -> QueueId;

  /// Enqueues `job` for asynchronous execution.
  fn dispatch(&self, job: Job);

  /// Enqueues `job` after `delay` has elapsed.
  fn dispatch_after(&self, delay: Duration, job: Job);

  /// Human-readable queue label, for logging.
  fn label(&self) -> &str {
    "dispatch-queue"
  }
}
