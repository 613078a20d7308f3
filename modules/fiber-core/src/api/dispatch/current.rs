use std::cell::Cell;

use super::QueueId;

thread_local! {
  static CURRENT_QUEUE: Cell<Option<QueueId>> = const { Cell::new(None) };
}

/// Returns the identity of the queue driving the calling thread, if any.
pub fn current_queue_id() -> Option<QueueId> {
  CURRENT_QUEUE.with(Cell::get)
}

/// RAII marker a queue implementation holds while running one job.
///
/// Entering replaces the thread's current-queue mark and restores the
/// previous one on drop, so nested drains (a queue draining inline inside
/// another queue's job) stay correct.
pub struct CurrentQueueScope {
  previous: Option<QueueId>,
}

impl CurrentQueueScope {
  /// Marks the calling thread as driven by `id` until the scope is dropped.
  pub fn enter(id: QueueId) -> Self {
    let previous = CURRENT_QUEUE.with(|current| current.replace(Some(id)));
    Self { previous }
  }
}

impl Drop for CurrentQueueScope {
  fn drop(&mut self) {
    let previous = self.previous;
    CURRENT_QUEUE.with(|current| current.set(previous));
  }
}
