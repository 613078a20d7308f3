
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use crate::api::coroutine::{current_coroutine_id, CoroutineId};
use crate::internal::scope_registry;

/// A resource registered into a pool frame; released exactly once when the
/// owning frame is popped or its stack is torn down.
pub trait ScopedResource: Send + Sync {
  /// Releases the resource.
  fn release(self: Box<Self>);
}

impl<F> ScopedResource for F
where
  F: FnOnce() + Send + Sync,
{
  fn release(self: Box<Self>) {
    (*self)();
  }
}

/// Which logical stack a frame lives on.
///
/// With the bridge enabled, pool operations performed inside a running
/// coroutine key off the coroutine's identity, so a frame opened before a
/// suspension unwinds correctly no matter which worker resumes the
/// coroutine. Off any coroutine (or with the bridge disabled) the native
/// worker-affinity behavior applies unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKey {
  /// Keyed by the coroutine that was running at push time.
  Coroutine(CoroutineId),
  /// Keyed by the native worker thread.
  Worker(ThreadId),
}

/// Opaque handle naming one frame on one logical stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHandle {
  pub(crate) key:   ScopeKey,
  pub(crate) index: usize,
}

impl FrameHandle {
  /// The logical stack this frame was pushed onto.
  pub fn key(&self) -> ScopeKey {
    self.key
  }
}

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Switches pool affinity from workers to running coroutines, process-wide.
/// Call once at process start, before any coroutine pushes a frame.
pub fn enable() {
  ENABLED.store(true, Ordering::Release);
}

/// True once [`enable`] has been called.
pub fn is_enabled() -> bool {
  ENABLED.load(Ordering::Acquire)
}

fn current_key() -> ScopeKey {
  if is_enabled() {
    if let Some(id) = current_coroutine_id() {
      return ScopeKey::Coroutine(id);
    }
  }
  ScopeKey::Worker(std::thread::current().id())
}

/// Pushes a new frame onto the current logical stack and returns its handle.
pub fn push() -> FrameHandle {
  scope_registry::push(current_key())
}

/// Pops and releases all resources registered at or above `handle`, from the
/// same logical stack the matching push targeted. This holds even when the
/// popping worker differs from the pushing worker.
pub fn pop(handle: FrameHandle) {
  scope_registry::pop(handle);
}

/// Attaches `resource` to the top frame of the current logical stack; it is
/// released when that frame is popped. With no frame open, an implicit base
/// frame is created (released only at stack teardown) and a warning logged.
pub fn register(resource: Box<dyn ScopedResource>) {
  scope_registry::register(current_key(), resource);
}

/// Convenience form of [`register`] for closures.
pub fn register_fn<F>(release: F)
where
  F: FnOnce() + Send + Sync + 'static, {
  register(Box::new(release));
}

/// Tears down the entire logical stack `handle` lives on, releasing every
/// registered resource.
pub fn dealloc(handle: FrameHandle) {
  scope_registry::dealloc(handle.key);
}

/// Logs every live logical stack with its frame and resource counts, for
/// leak debugging.
pub fn print_state() {
  scope_registry::print_state();
}
