//! Storage behind [`api::scope_pool`](crate::api::scope_pool): one frame
//! stack per logical key, in a concurrent map so any worker can unwind any
//! coroutine's stack.
//!
//! Resources are always released outside the map's shard locks, so a release
//! closure may itself call back into the pool without deadlocking.

use std::sync::OnceLock;

use dashmap::DashMap;

use crate::api::coroutine::CoroutineId;
use crate::api::scope_pool::{FrameHandle, ScopeKey, ScopedResource};

struct Frame {
  resources: Vec<Box<dyn ScopedResource>>,
}

impl Frame {
  fn new() -> Self {
    Self { resources: Vec::new() }
  }
}

struct ScopeStack {
  frames: Vec<Frame>,
}

static STACKS: OnceLock<DashMap<ScopeKey, ScopeStack>> = OnceLock::new();

fn stacks() -> &'static DashMap<ScopeKey, ScopeStack> {
  STACKS.get_or_init(DashMap::new)
}

pub(crate) fn push(key: ScopeKey) -> FrameHandle {
  let mut entry = stacks().entry(key).or_insert_with(|| ScopeStack { frames: Vec::new() });
  entry.frames.push(Frame::new());
  FrameHandle {
    key,
    index: entry.frames.len() - 1,
  }
}

pub(crate) fn register(key: ScopeKey, resource: Box<dyn ScopedResource>) {
  let mut entry = stacks().entry(key).or_insert_with(|| ScopeStack { frames: Vec::new() });
  if entry.frames.is_empty() {
    tracing::warn!(?key, "resource registered with no open pool frame; using implicit base frame");
    entry.frames.push(Frame::new());
  }
  if let Some(top) = entry.frames.last_mut() {
    top.resources.push(resource);
  }
}

pub(crate) fn pop(handle: FrameHandle) {
  let drained = {
    let Some(mut entry) = stacks().get_mut(&handle.key) else {
      tracing::warn!(key = ?handle.key, "pool pop against a missing stack");
      return;
    };
    if handle.index >= entry.frames.len() {
      tracing::warn!(key = ?handle.key, index = handle.index, "pool pop against an already-unwound frame");
      return;
    }
    entry.frames.split_off(handle.index)
  };
  release_frames(drained);
  remove_if_empty(handle.key);
}

pub(crate) fn dealloc(key: ScopeKey) {
  if let Some((_, stack)) = stacks().remove(&key) {
    release_frames(stack.frames);
  }
}

/// Unwinds whatever the finished coroutine left behind.
pub(crate) fn teardown_coroutine(id: CoroutineId) {
  let key = ScopeKey::Coroutine(id);
  if let Some((_, stack)) = stacks().remove(&key) {
    let leftover: usize = stack.frames.iter().map(|frame| frame.resources.len()).sum();
    if leftover > 0 {
      tracing::warn!(%id, leftover, "coroutine finished with unpopped pool frames; releasing");
    }
    release_frames(stack.frames);
  }
}

pub(crate) fn print_state() {
  let map = stacks();
  tracing::info!(stacks = map.len(), "scope pool state");
  for entry in map.iter() {
    let resources: usize = entry.value().frames.iter().map(|frame| frame.resources.len()).sum();
    tracing::info!(key = ?entry.key(), frames = entry.value().frames.len(), resources, "scope pool stack");
  }
}

/// LIFO across frames and within each frame.
fn release_frames(frames: Vec<Frame>) {
  for frame in frames.into_iter().rev() {
    for resource in frame.resources.into_iter().rev() {
      resource.release();
    }
  }
}

fn remove_if_empty(key: ScopeKey) {
  stacks().remove_if(&key, |_, stack| stack.frames.is_empty());
}
