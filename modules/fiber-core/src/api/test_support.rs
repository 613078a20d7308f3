//! Thread-backed dispatch queue.
//!
//! A serial queue driven by one plain `std::thread`, for unit tests and
//! hosts without an async runtime. The Tokio-backed production queue lives
//! in `coru-fiber-std-rs`.

use core::time::Duration;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::dispatch::{CurrentQueueScope, DispatchQueue, Job, QueueBinding, QueueId};

/// Serial dispatch queue drained by a dedicated thread.
pub struct ThreadQueue {
  id:     QueueId,
  label:  String,
  sender: Mutex<Sender<Job>>,
}

impl ThreadQueue {
  /// Spawns the drain thread and returns the queue.
  pub fn new(label: &str) -> Arc<Self> {
    let id = QueueId::next();
    let (sender, receiver) = channel::<Job>();
    let thread_label = format!("fiber-queue-{}", label);
    let _ = std::thread::Builder::new().name(thread_label).spawn(move || {
      while let Ok(job) = receiver.recv() {
        let _scope = CurrentQueueScope::enter(id);
        job();
      }
    });
    Arc::new(Self {
      id,
      label: label.to_string(),
      sender: Mutex::new(sender),
    })
  }

  /// New queue, already wrapped in its cached [`QueueBinding`].
  pub fn binding(label: &str) -> QueueBinding {
    QueueBinding::wrap(Self::new(label))
  }

  fn sender(&self) -> Sender<Job> {
    self.sender.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl DispatchQueue for ThreadQueue {
  fn queue_id(&self) -> QueueId {
    self.id
  }

  fn dispatch(&self, job: Job) {
    let _ = self.sender().send(job);
  }

  fn dispatch_after(&self, delay: Duration, job: Job) {
    let sender = self.sender();
    let _ = std::thread::Builder::new().name("fiber-queue-delay".to_string()).spawn(move || {
      std::thread::sleep(delay);
      let _ = sender.send(job);
    });
  }

  fn label(&self) -> &str {
    &self.label
  }
}
