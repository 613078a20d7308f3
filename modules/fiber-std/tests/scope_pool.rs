//! Scoped-resource bridge scenarios.
//!
//! The bridge enable switch is process-global, so the disabled-then-enabled
//! progression runs inside one test function to keep the order deterministic
//! (integration test binaries get their own process).

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use coru_fiber_core_rs::api::scope_pool::{self, FrameHandle, ScopeKey};
use coru_fiber_std_rs::prelude::*;

type TestResult<T = ()> = Result<T, String>;

fn counting_release(counter: &Arc<AtomicUsize>) -> Box<dyn scope_pool::ScopedResource> {
  let counter = Arc::clone(counter);
  Box::new(move || {
    counter.fetch_add(1, Ordering::SeqCst);
  })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bridge_redirects_affinity_from_workers_to_coroutines() -> TestResult {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
  // Enabled: a push inside a coroutine keys off the coroutine. (The
  // disabled default keeps worker affinity; see scope_pool_disabled.rs,
  // which needs a process where nothing ever enables the bridge.)
  scope_pool::enable();
  assert!(scope_pool::is_enabled());

  let released = Arc::new(AtomicUsize::new(0));
  let handle_out: Promise<FrameHandle> = Promise::new();
  let gate: Promise<i32> = Promise::new();
  let fiber = {
    let released = Arc::clone(&released);
    let handle_out = handle_out.clone();
    let gate = gate.clone();
    Fiber::launch(&serial_binding("scope-enabled"), move |ctx, ()| async move {
      let frame = scope_pool::push();
      assert!(matches!(frame.key(), ScopeKey::Coroutine(_)));
      scope_pool::register(counting_release(&released));
      handle_out.complete(frame);
      // Park with the frame open; the frame must survive the suspension.
      ctx.await_promise(&gate).await?;
      Ok(released.load(Ordering::SeqCst))
    })
  };

  // The frame was pushed inside the coroutine; unwinding it from this test
  // context (a different worker) still releases exactly that resource, once.
  let frame = handle_out.value().await.map_err(|err| err.to_string())?;
  assert_eq!(released.load(Ordering::SeqCst), 0);
  scope_pool::pop(frame);
  assert_eq!(released.load(Ordering::SeqCst), 1);
  scope_pool::pop(frame);
  assert_eq!(released.load(Ordering::SeqCst), 1, "pop releases exactly once");

  gate.complete(0);
  let seen_inside = fiber.completion().value().await.map_err(|err| err.to_string())?;
  assert_eq!(seen_inside, 1);

  scope_pool::print_state();
  Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn frame_survives_suspension_and_unwinds_on_resume() -> TestResult {
  scope_pool::enable();
  let released = Arc::new(AtomicUsize::new(0));
  let gate: Promise<i32> = Promise::new();
  let fiber = {
    let released = Arc::clone(&released);
    let gate = gate.clone();
    Fiber::launch(&serial_binding("scope-survive"), move |ctx, ()| async move {
      let frame = scope_pool::push();
      scope_pool::register(counting_release(&released));
      ctx.await_promise(&gate).await?;
      // Resumed, possibly on a different physical worker; the pop still
      // targets the coroutine-keyed stack from before the suspension.
      scope_pool::pop(frame);
      Ok(released.load(Ordering::SeqCst))
    })
  };

  tokio::time::sleep(Duration::from_millis(30)).await;
  assert_eq!(released.load(Ordering::SeqCst), 0, "no release before the pop");
  gate.complete(0);
  let observed = fiber.completion().value().await.map_err(|err| err.to_string())?;
  assert_eq!(observed, 1);
  assert_eq!(released.load(Ordering::SeqCst), 1);
  Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_frames_unwind_when_the_coroutine_finishes() -> TestResult {
  scope_pool::enable();
  let released = Arc::new(AtomicUsize::new(0));
  let fiber = {
    let released = Arc::clone(&released);
    Fiber::launch(&serial_binding("scope-abandon"), move |_ctx, ()| async move {
      let _leaked = scope_pool::push();
      scope_pool::register(counting_release(&released));
      Ok(())
    })
  };

  fiber.completion().value().await.map_err(|err| err.to_string())?;
  assert_eq!(released.load(Ordering::SeqCst), 1);
  Ok(())
}
