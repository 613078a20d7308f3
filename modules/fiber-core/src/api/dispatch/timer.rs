use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::QueueBinding;
use crate::api::sync::CoLock;

type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle to a repeating timer scheduled on one [`QueueBinding`].
///
/// Dropping the handle invalidates the timer.
pub struct DispatchTimer {
  core: Arc<TimerCore>,
}

struct TimerCore {
  fence:     CoLock,
  cancelled: AtomicBool,
}

impl DispatchTimer {
  pub(super) fn start(binding: QueueBinding, interval: Duration, callback: TimerCallback) -> Self {
    let core = Arc::new(TimerCore {
      fence:     CoLock::new(),
      cancelled: AtomicBool::new(false),
    });
    arm(core.clone(), binding, interval, callback);
    Self { core }
  }

  /// Stops the timer. Idempotent and thread-safe; once this returns, no
  /// firing is in flight and none is pending. The callback runs under the
  /// same fence `invalidate` takes, so a tick that already started finishes
  /// before `invalidate` returns and every later tick observes the cancelled
  /// flag before running the callback.
  pub fn invalidate(&self) {
    self.core.fence.with(|| {
      self.core.cancelled.store(true, Ordering::Release);
    });
  }

  /// True once the timer has been invalidated.
  pub fn is_cancelled(&self) -> bool {
    self.core.cancelled.load(Ordering::Acquire)
  }
}

impl Drop for DispatchTimer {
  fn drop(&mut self) {
    self.invalidate();
  }
}

fn arm(core: Arc<TimerCore>, binding: QueueBinding, interval: Duration, callback: TimerCallback) {
  let tick_binding = binding.clone();
  binding.run_after(interval, move || {
    let fired = core.fence.with(|| {
      if core.cancelled.load(Ordering::Acquire) {
        return false;
      }
      callback();
      true
    });
    if fired {
      arm(core, tick_binding, interval, callback);
    }
  });
}
