//! The coroutine state machine.
//!
//! A [`Machine`] owns the body future (the coroutine's private "stack"),
//! drives it with a waker that re-schedules the coroutine onto the queue
//! binding recorded at step entry, and fences concurrent wakes with a small
//! schedule-state automaton so exactly one worker ever polls the body.
//!
//! The lifecycle snapshot lives in a lone atomic, readable without touching
//! the body mutex, so `state` and `cancel` stay safe to call from inside the
//! coroutine's own body.

use std::any::Any;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, Wake, Waker};

use futures::future::BoxFuture;

use crate::api::coroutine::{
  CoroutineContext, CoroutineError, CoroutineId, CoroutineState, CoroutineStep, UsageViolation,
};
use crate::api::dispatch::QueueBinding;
use crate::api::promise::Promise;
use crate::internal::scope_registry;

thread_local! {
  static CURRENT_COROUTINE: Cell<Option<CoroutineId>> = const { Cell::new(None) };
}

/// Identity of the coroutine whose body the calling thread is polling.
pub(crate) fn current_id() -> Option<CoroutineId> {
  CURRENT_COROUTINE.with(Cell::get)
}

struct CurrentCoroutineScope {
  previous: Option<CoroutineId>,
}

impl CurrentCoroutineScope {
  fn enter(id: CoroutineId) -> Self {
    let previous = CURRENT_COROUTINE.with(|current| current.replace(Some(id)));
    Self { previous }
  }
}

impl Drop for CurrentCoroutineScope {
  fn drop(&mut self) {
    let previous = self.previous;
    CURRENT_COROUTINE.with(|current| current.set(previous));
  }
}

/// Suspend-point slots shared between a body's [`CoroutineContext`] and its
/// machine. The context holds this instead of the machine itself, so the
/// machine keeps the sole strong ownership of the body closure (no cycle
/// through captured contexts).
pub(crate) struct ContextCore<Y, R> {
  yield_slot:  Mutex<Option<Y>>,
  resume_slot: Mutex<Option<R>>,
  cancelled:   Arc<AtomicBool>,
}

impl<Y, R> ContextCore<Y, R> {
  fn new() -> Self {
    Self {
      yield_slot:  Mutex::new(None),
      resume_slot: Mutex::new(None),
      cancelled:   Arc::new(AtomicBool::new(false)),
    }
  }

  pub(crate) fn set_yield(&self, value: Y) {
    *lock(&self.yield_slot) = Some(value);
  }

  pub(crate) fn take_yield(&self) -> Option<Y> {
    lock(&self.yield_slot).take()
  }

  pub(crate) fn deliver_resume(&self, value: R) {
    *lock(&self.resume_slot) = Some(value);
  }

  pub(crate) fn take_resume(&self) -> Option<R> {
    lock(&self.resume_slot).take()
  }

  pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.cancelled)
  }

  pub(crate) fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }

  fn set_cancelled(&self) {
    self.cancelled.store(true, Ordering::Release);
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type PanicPayload = Box<dyn Any + Send>;

/// Body future, already wrapped in `catch_unwind` by the public constructor.
pub(crate) type BodyFuture<T> = BoxFuture<'static, Result<Result<T, CoroutineError>, PanicPayload>>;

/// Deferred body constructor; invoked at the first resume with the initial
/// resume value as the body argument.
pub(crate) type BodyFn<Y, R, T> = Box<dyn FnOnce(CoroutineContext<Y, R>, R) -> BodyFuture<T> + Send>;

enum BodySlot<Y, R, T> {
  Unstarted(BodyFn<Y, R, T>),
  Active(BodyFuture<T>),
  Finished,
}

/// What a step invocation carries into the machine.
enum StepInput<R> {
  /// First step scheduled by `launch`; delivers nothing when the body
  /// already started.
  Start(R),
  /// Explicit `resume(value)`.
  Resume(R),
  /// Re-poll triggered by a registered waker (or cancellation).
  Wake,
}

// Schedule-state automaton guarding the body against concurrent polls.
const SCHED_IDLE: u8 = 0;
const SCHED_QUEUED: u8 = 1;
const SCHED_RUNNING: u8 = 2;
const SCHED_NOTIFIED: u8 = 3;

struct MachineInner<Y, R, T> {
  body:    BodySlot<Y, R, T>,
  binding: QueueBinding,
}

pub(crate) struct Machine<Y, R, T> {
  id:         CoroutineId,
  core:       Arc<ContextCore<Y, R>>,
  state:      AtomicU8,
  schedule:   AtomicU8,
  inner:      Mutex<MachineInner<Y, R, T>>,
  completion: Promise<T>,
}

impl<Y, R, T> Machine<Y, R, T>
where
  Y: Send + 'static,
  R: Send + 'static,
  T: Clone + Send + 'static,
{
  pub(crate) fn new(binding: QueueBinding, body: BodyFn<Y, R, T>) -> Arc<Self> {
    Arc::new(Self {
      id:         CoroutineId::next(),
      core:       Arc::new(ContextCore::new()),
      state:      AtomicU8::new(CoroutineState::Created.as_u8()),
      schedule:   AtomicU8::new(SCHED_IDLE),
      inner:      Mutex::new(MachineInner {
        body: BodySlot::Unstarted(body),
        binding,
      }),
      completion: Promise::new(),
    })
  }

  pub(crate) fn id(&self) -> CoroutineId {
    self.id
  }

  pub(crate) fn state(&self) -> CoroutineState {
    CoroutineState::from_u8(self.state.load(Ordering::Acquire))
  }

  fn set_state(&self, state: CoroutineState) {
    self.state.store(state.as_u8(), Ordering::Release);
  }

  pub(crate) fn completion(&self) -> Promise<T> {
    self.completion.clone()
  }

  /// Sets the cancellation flag and schedules a step so a suspended body
  /// observes it at its suspend point. Called from inside the body itself,
  /// the flag alone suffices: the body's next suspend-point poll sees it.
  pub(crate) fn cancel(self: &Arc<Self>) {
    self.core.set_cancelled();
    if current_id() == Some(self.id) {
      return;
    }
    if !self.state().is_terminal() {
      self.wake();
    }
  }

  /// Explicit resume: claims the schedule token and drives the body on the
  /// caller's stack until the next suspension or a terminal transition.
  pub(crate) fn resume(self: &Arc<Self>, value: R) -> Result<CoroutineStep<Y, T>, CoroutineError> {
    if self.state().is_terminal() {
      // Report without disturbing a queued wake.
      return Err(CoroutineError::Usage(UsageViolation::ResumeAfterTerminal));
    }
    self.claim_schedule()?;
    self.step(StepInput::Resume(value))
  }

  /// Schedules the first step on the recorded binding (the `launch` path).
  pub(crate) fn schedule_start(self: &Arc<Self>, initial: R) {
    let binding = lock(&self.inner).binding.clone();
    let this = Arc::clone(self);
    binding.run_async(move || {
      if this.claim_schedule().is_ok() {
        let _ = this.step(StepInput::Start(initial));
      }
    });
  }

  /// Waker entry: coalesces concurrent wakes and queues at most one step.
  fn wake(self: &Arc<Self>) {
    loop {
      match self.schedule.load(Ordering::Acquire) {
        SCHED_IDLE => {
          if self
            .schedule
            .compare_exchange(SCHED_IDLE, SCHED_QUEUED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            let binding = lock(&self.inner).binding.clone();
            let this = Arc::clone(self);
            binding.run_async(move || this.run_queued_step());
            return;
          }
        }
        SCHED_RUNNING => {
          if self
            .schedule
            .compare_exchange(SCHED_RUNNING, SCHED_NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            return;
          }
        }
        // Already queued or already notified: the pending step re-checks
        // every wake source, nothing is lost.
        _ => return,
      }
    }
  }

  fn run_queued_step(self: Arc<Self>) {
    if self
      .schedule
      .compare_exchange(SCHED_QUEUED, SCHED_RUNNING, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      // An explicit resume consumed the queued token; its poll observed
      // whatever this wake was signalling.
      return;
    }
    let _ = self.step(StepInput::Wake);
  }

  fn claim_schedule(self: &Arc<Self>) -> Result<(), CoroutineError> {
    loop {
      match self.schedule.load(Ordering::Acquire) {
        SCHED_IDLE => {
          if self
            .schedule
            .compare_exchange(SCHED_IDLE, SCHED_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            return Ok(());
          }
        }
        SCHED_QUEUED => {
          if self
            .schedule
            .compare_exchange(SCHED_QUEUED, SCHED_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            return Ok(());
          }
        }
        _ => return Err(CoroutineError::Usage(UsageViolation::ResumeWhileRunning)),
      }
    }
  }

  /// Drives the body, then releases the schedule token. A wake that landed
  /// mid-poll forces a re-poll when the body is genuinely awaiting, or when
  /// cancellation must reach a freshly-yielded suspend point.
  fn step(self: &Arc<Self>, input: StepInput<R>) -> Result<CoroutineStep<Y, T>, CoroutineError> {
    let mut result = self.drive(input);
    loop {
      match self
        .schedule
        .compare_exchange(SCHED_RUNNING, SCHED_IDLE, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => break,
        Err(_) => {
          self.schedule.store(SCHED_RUNNING, Ordering::Release);
          let repoll = match &result {
            Ok(CoroutineStep::Awaiting) => true,
            Ok(CoroutineStep::Yielded(_)) => self.core.is_cancelled(),
            _ => false,
          };
          if repoll {
            result = self.drive(StepInput::Wake);
          }
        }
      }
    }
    result
  }

  fn drive(self: &Arc<Self>, input: StepInput<R>) -> Result<CoroutineStep<Y, T>, CoroutineError> {
    let mut inner = lock(&self.inner);
    match self.state() {
      CoroutineState::Created => match input {
        StepInput::Start(initial) | StepInput::Resume(initial) => {
          let BodySlot::Unstarted(body) = core::mem::replace(&mut inner.body, BodySlot::Finished) else {
            return Err(CoroutineError::Usage(UsageViolation::AlreadyStarted));
          };
          let ctx = CoroutineContext::from_core(Arc::clone(&self.core));
          inner.body = BodySlot::Active(body(ctx, initial));
        }
        // A wake reached a coroutine that has not started; leave it for the
        // scheduled start.
        StepInput::Wake => return Ok(CoroutineStep::Awaiting),
      },
      CoroutineState::Suspended => {
        if let StepInput::Resume(value) = input {
          self.core.deliver_resume(value);
        }
        // A stale Start against an already-suspended body delivers nothing.
      }
      CoroutineState::Running => return Err(CoroutineError::Usage(UsageViolation::ResumeWhileRunning)),
      _ => return Err(CoroutineError::Usage(UsageViolation::ResumeAfterTerminal)),
    }

    self.set_state(CoroutineState::Running);
    if let Some(current) = QueueBinding::current() {
      inner.binding = current;
    }

    let waker = Waker::from(Arc::new(StepWaker {
      machine: Arc::downgrade(self),
    }));
    let mut cx = Context::from_waker(&waker);
    let poll = {
      let BodySlot::Active(future) = &mut inner.body else {
        self.set_state(CoroutineState::Failed);
        return Err(CoroutineError::execution("coroutine body storage corrupted"));
      };
      let _scope = CurrentCoroutineScope::enter(self.id);
      future.as_mut().poll(&mut cx)
    };

    match poll {
      Poll::Pending => {
        self.set_state(CoroutineState::Suspended);
        match self.core.take_yield() {
          Some(value) => Ok(CoroutineStep::Yielded(value)),
          None => Ok(CoroutineStep::Awaiting),
        }
      }
      Poll::Ready(outcome) => {
        inner.body = BodySlot::Finished;
        drop(inner);
        match outcome {
          Ok(Ok(value)) => {
            self.set_state(CoroutineState::Completed);
            self.finish();
            self.completion.complete(value.clone());
            Ok(CoroutineStep::Completed(value))
          }
          Ok(Err(error)) if error.is_cancelled() => {
            self.set_state(CoroutineState::Cancelled);
            self.finish();
            self.completion.fail(CoroutineError::Cancelled);
            Ok(CoroutineStep::Cancelled)
          }
          Ok(Err(error)) => {
            self.set_state(CoroutineState::Failed);
            self.finish();
            self.completion.fail(error.clone());
            Err(error)
          }
          Err(panic) => {
            let error = CoroutineError::execution(panic_message(&panic));
            self.set_state(CoroutineState::Failed);
            self.finish();
            self.completion.fail(error.clone());
            Err(error)
          }
        }
      }
    }
  }

  /// Terminal housekeeping: unwind any resource-pool stack still keyed to
  /// this coroutine.
  fn finish(&self) {
    scope_registry::teardown_coroutine(self.id);
  }
}

struct StepWaker<Y, R, T> {
  machine: Weak<Machine<Y, R, T>>,
}

impl<Y, R, T> Wake for StepWaker<Y, R, T>
where
  Y: Send + 'static,
  R: Send + 'static,
  T: Clone + Send + 'static,
{
  fn wake(self: Arc<Self>) {
    self.wake_by_ref();
  }

  fn wake_by_ref(self: &Arc<Self>) {
    if let Some(machine) = self.machine.upgrade() {
      machine.wake();
    }
  }
}

/// Renders a panic payload into a readable message.
pub(crate) fn panic_message(payload: &PanicPayload) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "coroutine body panicked".to_string()
  }
}
