use core::fmt;
use core::time::Duration;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::{current_queue_id, DispatchQueue, DispatchTimer, Job, QueueId};

static BINDINGS: OnceLock<DashMap<QueueId, QueueBinding>> = OnceLock::new();

fn bindings() -> &'static DashMap<QueueId, QueueBinding> {
  BINDINGS.get_or_init(DashMap::new)
}

/// Wrapper around one underlying dispatch queue, deciding whether a unit of
/// work runs inline or is enqueued.
///
/// Wrappers are cached per queue identity: [`QueueBinding::wrap`] returns the
/// existing wrapper for a queue it has seen before, and equality is by
/// underlying-queue identity, never by wrapper instance. A binding lives for
/// the lifetime of its queue.
pub struct QueueBinding {
  queue: Arc<dyn DispatchQueue>,
}

impl QueueBinding {
  /// Returns the cached binding for `queue`, creating it on first sight.
  pub fn wrap(queue: Arc<dyn DispatchQueue>) -> Self {
    let id = queue.queue_id();
    bindings()
      .entry(id)
      .or_insert_with(|| QueueBinding { queue })
      .value()
      .clone()
  }

  /// Returns the binding of whichever queue is actively driving the calling
  /// context, or `None` when off any tracked queue.
  pub fn current() -> Option<Self> {
    let id = current_queue_id()?;
    bindings().get(&id).map(|entry| entry.value().clone())
  }

  /// Identity of the wrapped queue.
  pub fn id(&self) -> QueueId {
    self.queue.queue_id()
  }

  /// Human-readable label of the wrapped queue.
  pub fn label(&self) -> &str {
    self.queue.label()
  }

  /// True when the calling context is currently driven by this binding's
  /// queue.
  pub fn is_current(&self) -> bool {
    current_queue_id() == Some(self.id())
  }

  /// Runs `f` synchronously in place when the calling context is already
  /// driven by this binding (avoiding an unnecessary hop and the deadlock of
  /// re-entering a serial queue); otherwise enqueues it and returns
  /// immediately.
  pub fn run_inline<F>(&self, f: F)
  where
    F: FnOnce() + Send + 'static, {
    if self.is_current() {
      f();
    } else {
      self.queue.dispatch(Box::new(f));
    }
  }

  /// Always enqueues `f` for asynchronous execution, regardless of the
  /// current context.
  pub fn run_async<F>(&self, f: F)
  where
    F: FnOnce() + Send + 'static, {
    self.queue.dispatch(Box::new(f));
  }

  /// Enqueues `f` after `delay` has elapsed.
  pub fn run_after<F>(&self, delay: Duration, f: F)
  where
    F: FnOnce() + Send + 'static, {
    self.queue.dispatch_after(delay, Box::new(f));
  }

  /// Enqueues an already-boxed job; the trait-object form of
  /// [`QueueBinding::run_async`].
  pub fn run_job(&self, job: Job) {
    self.queue.dispatch(job);
  }

  /// Schedules `callback` to fire every `interval` on this binding until the
  /// returned timer is invalidated or dropped.
  pub fn start_timer<F>(&self, interval: Duration, callback: F) -> DispatchTimer
  where
    F: Fn() + Send + Sync + 'static, {
    DispatchTimer::start(self.clone(), interval, Arc::new(callback))
  }
}

impl Clone for QueueBinding {
  fn clone(&self) -> Self {
    Self {
      queue: Arc::clone(&self.queue),
    }
  }
}

impl PartialEq for QueueBinding {
  fn eq(&self, other: &Self) -> bool {
    self.id() == other.id()
  }
}

impl Eq for QueueBinding {}

impl fmt::Debug for QueueBinding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueueBinding")
      .field("id", &self.id())
      .field("label", &self.label())
      .finish()
  }
}
