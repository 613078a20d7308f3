use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::*;
use crate::api::dispatch::current_queue_id;
use crate::api::promise::Promise;
use crate::api::test_support::ThreadQueue;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn generator_round_trips_values_both_directions() {
  let binding = ThreadQueue::binding("generator");
  let coroutine: Coroutine<i32, i32, i32> = Coroutine::create(&binding, |ctx, initial| async move {
    let a = ctx.suspend(initial * 2).await?;
    let b = ctx.suspend(a + 10).await?;
    Ok(b * initial)
  });

  assert_eq!(coroutine.state(), CoroutineState::Created);
  assert_eq!(coroutine.resume(3).ok(), Some(CoroutineStep::Yielded(6)));
  assert_eq!(coroutine.state(), CoroutineState::Suspended);
  assert_eq!(coroutine.resume(5).ok(), Some(CoroutineStep::Yielded(15)));
  assert_eq!(coroutine.resume(4).ok(), Some(CoroutineStep::Completed(12)));
  assert_eq!(coroutine.state(), CoroutineState::Completed);
}

#[test]
fn resume_after_terminal_is_rejected_without_side_effect() {
  let binding = ThreadQueue::binding("terminal");
  let coroutine: Coroutine<(), i32, i32> = Coroutine::create(&binding, |_ctx, initial| async move { Ok(initial) });

  assert_eq!(coroutine.resume(7).ok(), Some(CoroutineStep::Completed(7)));
  assert_eq!(
    coroutine.resume(8),
    Err(CoroutineError::Usage(UsageViolation::ResumeAfterTerminal))
  );
  assert_eq!(coroutine.state(), CoroutineState::Completed);
  assert_eq!(coroutine.completion().try_value(), Some(Ok(7)));
}

#[test]
fn body_error_propagates_to_the_resumer() {
  let binding = ThreadQueue::binding("failure");
  let coroutine: Coroutine<i32, (), i32> = Coroutine::create(&binding, |ctx, ()| async move {
    ctx.suspend(1).await?;
    Err(CoroutineError::execution("deliberate fault"))
  });

  assert_eq!(coroutine.resume(()).ok(), Some(CoroutineStep::Yielded(1)));
  assert_eq!(coroutine.resume(()), Err(CoroutineError::execution("deliberate fault")));
  assert_eq!(coroutine.state(), CoroutineState::Failed);
  assert_eq!(
    coroutine.completion().try_value(),
    Some(Err(CoroutineError::execution("deliberate fault")))
  );
}

#[test]
fn body_panic_is_captured_not_propagated() {
  let binding = ThreadQueue::binding("panic");
  let coroutine: Fiber<i32> = Coroutine::create(&binding, |_ctx, ()| async move {
    if true {
      panic!("boom");
    }
    Ok(1)
  });

  let error = coroutine.resume(()).err();
  match error {
    Some(CoroutineError::Execution(message)) => assert!(message.contains("boom")),
    other => panic!("expected execution error, got {:?}", other),
  }
  assert_eq!(coroutine.state(), CoroutineState::Failed);
}

#[test]
fn cancel_is_observed_at_the_next_suspend_point() {
  let binding = ThreadQueue::binding("cancel");
  let coroutine: Coroutine<i32, (), i32> = Coroutine::create(&binding, |ctx, ()| async move {
    ctx.suspend(1).await?;
    Ok(99)
  });

  assert_eq!(coroutine.resume(()).ok(), Some(CoroutineStep::Yielded(1)));
  coroutine.cancel();
  let settled = coroutine.completion().wait_timeout(WAIT);
  assert_eq!(settled, Some(Err(CoroutineError::Cancelled)));
  assert_eq!(coroutine.state(), CoroutineState::Cancelled);
}

#[test]
fn cancel_never_interrupts_a_body_between_suspend_points() {
  let binding = ThreadQueue::binding("cancel-late");
  let observed = Arc::new(AtomicBool::new(false));
  let coroutine: Fiber<i32> = {
    let observed = Arc::clone(&observed);
    Coroutine::create(&binding, move |_ctx, ()| async move {
      observed.store(true, Ordering::SeqCst);
      Ok(5)
    })
  };

  coroutine.cancel();
  // The flag is set, but a body that never reaches a suspend point runs to
  // completion.
  assert_eq!(coroutine.resume(()).ok(), Some(CoroutineStep::Completed(5)));
  assert!(observed.load(Ordering::SeqCst));
}

#[test]
fn launch_runs_on_the_binding_and_settles_completion() {
  let binding = ThreadQueue::binding("launch");
  let expected = binding.id();
  let fiber = Fiber::launch(&binding, move |_ctx, ()| async move {
    Ok(current_queue_id() == Some(expected))
  });

  assert_eq!(fiber.completion().wait_timeout(WAIT), Some(Ok(true)));
}

#[test]
fn awaited_promise_resumes_on_the_original_binding() {
  let binding = ThreadQueue::binding("await");
  let expected = binding.id();
  let promise: Promise<i32> = Promise::new();
  let fiber = {
    let promise = promise.clone();
    Fiber::launch(&binding, move |ctx, ()| async move {
      let value = ctx.await_promise(&promise).await?;
      assert_eq!(current_queue_id(), Some(expected));
      Ok(value + 1)
    })
  };

  // Let the fiber reach its await, then settle from this foreign thread.
  std::thread::sleep(Duration::from_millis(50));
  assert!(promise.complete(41));
  assert_eq!(fiber.completion().wait_timeout(WAIT), Some(Ok(42)));
}

#[test]
fn already_settled_promise_is_returned_without_suspending() {
  let binding = ThreadQueue::binding("await-ready");
  let promise: Promise<i32> = Promise::new();
  promise.complete(10);
  let fiber = {
    let promise = promise.clone();
    Fiber::launch(&binding, move |ctx, ()| async move { ctx.await_promise(&promise).await })
  };

  assert_eq!(fiber.completion().wait_timeout(WAIT), Some(Ok(10)));
}

#[test]
fn current_coroutine_id_tracks_the_running_body() {
  let binding = ThreadQueue::binding("current-id");
  assert_eq!(current_coroutine_id(), None);
  let fiber = Fiber::launch(&binding, move |_ctx, ()| async move {
    Ok(current_coroutine_id().map(CoroutineId::as_u64))
  });

  let inside = fiber.completion().wait_timeout(WAIT);
  assert_eq!(inside, Some(Ok(Some(fiber.id().as_u64()))));
  assert_eq!(current_coroutine_id(), None);
}

#[test]
fn resume_while_running_is_rejected() {
  let binding = ThreadQueue::binding("reentrant");
  let coroutine: Arc<std::sync::Mutex<Option<Coroutine<i32, (), i32>>>> = Arc::new(std::sync::Mutex::new(None));
  let handle = Arc::clone(&coroutine);
  let created: Coroutine<i32, (), i32> = Coroutine::create(&binding, move |ctx, ()| async move {
    let nested = handle.lock().map_err(|_| CoroutineError::execution("lock"))?.clone();
    if let Some(this) = nested {
      // Resuming ourselves from inside our own body must be rejected.
      assert_eq!(
        this.resume(()),
        Err(CoroutineError::Usage(UsageViolation::ResumeWhileRunning))
      );
    }
    ctx.suspend(1).await?;
    Ok(0)
  });
  *coroutine.lock().unwrap() = Some(created.clone());

  assert_eq!(created.resume(()).ok(), Some(CoroutineStep::Yielded(1)));
}
