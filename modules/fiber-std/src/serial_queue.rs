
use core::time::Duration;
use std::sync::Arc;

use coru_fiber_core_rs::{CurrentQueueScope, DispatchQueue, Job, QueueBinding, QueueId};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Serial dispatch queue drained by one Tokio task.
///
/// Jobs run strictly one at a time in enqueue order; the drain task marks
/// each job's scope with [`CurrentQueueScope`] so
/// [`QueueBinding::current`] and inline execution observe the queue. The
/// physical worker thread may change between jobs (Tokio migrates tasks),
/// which is exactly the hop the coroutine layer's queue-affinity contract is
/// built for.
pub struct TokioSerialQueue {
  id:     QueueId,
  label:  String,
  sender: UnboundedSender<Job>,
}

impl TokioSerialQueue {
  /// Spawns the drain task on the current Tokio runtime and returns the
  /// queue.
  ///
  /// # Panics
  /// Panics when called outside a Tokio runtime, as `tokio::spawn` does.
  pub fn new(label: &str) -> Arc<Self> {
    SerialQueueBuilder::new(label).build()
  }

  /// New queue, already wrapped in its cached [`QueueBinding`].
  pub fn binding(label: &str) -> QueueBinding {
    QueueBinding::wrap(Self::new(label))
  }
}

impl DispatchQueue for TokioSerialQueue {
  fn queue_id(&self) -> QueueId {
    self.id
  }

  fn dispatch(&self, job: Job) {
    if self.sender.send(job).is_err() {
      tracing::warn!(queue = %self.id, label = %self.label, "job dropped: drain task is gone");
    }
  }

  fn dispatch_after(&self, delay: Duration, job: Job) {
    let sender = self.sender.clone();
    let id = self.id;
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if sender.send(job).is_err() {
        tracing::debug!(queue = %id, "delayed job dropped: drain task is gone");
      }
    });
  }

  fn label(&self) -> &str {
    &self.label
  }
}

/// Configures and spawns a [`TokioSerialQueue`].
pub struct SerialQueueBuilder {
  label: String,
}

impl SerialQueueBuilder {
  /// Starts a builder for a queue labelled `label`.
  pub fn new(label: &str) -> Self {
    Self {
      label: label.to_string(),
    }
  }

  /// Spawns the drain task and returns the queue.
  ///
  /// # Panics
  /// Panics when called outside a Tokio runtime, as `tokio::spawn` does.
  pub fn build(self) -> Arc<TokioSerialQueue> {
    let id = QueueId::next();
    let (sender, receiver) = unbounded_channel::<Job>();
    tokio::spawn(drain(id, receiver));
    Arc::new(TokioSerialQueue {
      id,
      label: self.label,
      sender,
    })
  }
}

async fn drain(id: QueueId, mut receiver: UnboundedReceiver<Job>) {
  while let Some(job) = receiver.recv().await {
    let _scope = CurrentQueueScope::enter(id);
    job();
  }
}

/// Convenience constructor: a fresh serial queue wrapped in its binding.
///
/// # Panics
/// Panics when called outside a Tokio runtime, as `tokio::spawn` does.
pub fn serial_binding(label: &str) -> QueueBinding {
  TokioSerialQueue::binding(label)
}
